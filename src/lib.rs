mod config;
pub use config::*;
mod context;
pub use context::*;
mod error;
pub use error::*;
mod event;
pub use event::*;
pub mod logging;
mod notifier;
pub use notifier::*;
mod provider;
pub use provider::*;
mod registry;
pub use registry::*;
mod session;
pub use session::*;
