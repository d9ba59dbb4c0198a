use crate::{provider::UserProfile, Error};
use std::rc::Rc;

/// Lifecycle event names an adapter can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	Initialized,
	Authenticated,
	Logout,
	SessionExpired,
	Error,
}

impl EventKind {
	pub const ALL: [Self; 5] = [
		Self::Initialized,
		Self::Authenticated,
		Self::Logout,
		Self::SessionExpired,
		Self::Error,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Initialized => "initialized",
			Self::Authenticated => "authenticated",
			Self::Logout => "logout",
			Self::SessionExpired => "session_expired",
			Self::Error => "error",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// A lifecycle event with its payload. Transient; never persisted.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
	Initialized { authenticated: bool, user: Option<UserProfile> },
	Authenticated { user: UserProfile },
	Logout,
	SessionExpired { error: Error },
	Error { error: Error },
}

impl Event {
	pub fn kind(&self) -> EventKind {
		match self {
			Self::Initialized { .. } => EventKind::Initialized,
			Self::Authenticated { .. } => EventKind::Authenticated,
			Self::Logout => EventKind::Logout,
			Self::SessionExpired { .. } => EventKind::SessionExpired,
			Self::Error { .. } => EventKind::Error,
		}
	}
}

/// The single sink an adapter reports through. Fan-out to multiple
/// observers happens one layer up, in the [`Notifier`](crate::Notifier).
pub type EventSink = Rc<dyn Fn(Event)>;
