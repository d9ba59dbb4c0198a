use crate::{event::EventSink, Error, FlowOptions};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

pub mod auth0;
#[cfg(test)]
pub(crate) mod stub;

/// Future returned by adapter operations. Everything runs on the browser's
/// single-threaded scheduler, so these are local (non-`Send`) futures.
pub type OpFuture<'a, T> = LocalBoxFuture<'a, Result<T, Error>>;

/// Opaque profile record reported by the identity provider, with accessors
/// for the common OIDC claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(serde_json::Value);

impl UserProfile {
	pub fn new(record: serde_json::Value) -> Self {
		Self(record)
	}

	pub fn claim(&self, name: &str) -> Option<&str> {
		self.0.get(name).and_then(|value| value.as_str())
	}

	pub fn subject(&self) -> Option<&str> {
		self.claim("sub")
	}

	pub fn name(&self) -> Option<&str> {
		self.claim("name")
	}

	pub fn email(&self) -> Option<&str> {
		self.claim("email")
	}

	pub fn record(&self) -> &serde_json::Value {
		&self.0
	}
}

/// Uniform operation set over one concrete identity-provider SDK.
///
/// Expected failures never panic and never throw synchronously: they come
/// back as the operation's `Err` and, best-effort, as an emitted event
/// through the registered sink, so callers that ignore one channel still
/// observe the failure on the other.
pub trait IdentityProvider {
	/// One-time bootstrap: attach the vendor runtime, consume an in-flight
	/// redirect callback if the navigation context carries one, and report
	/// the current session. Emits exactly one `initialized` event on
	/// success, or fails and emits `error`. Call at most once per instance.
	fn initialize(&self) -> OpFuture<'_, ()>;

	/// Starts a redirect-based login. Resolution means the navigation to
	/// the provider began, nothing more; the outcome is observed by a fresh
	/// [`initialize`](Self::initialize) after the page reloads.
	fn login(&self, options: FlowOptions) -> OpFuture<'_, ()>;

	/// Popup-based login; resolves with the resulting profile and emits
	/// `authenticated`.
	fn login_with_popup(&self, options: FlowOptions) -> OpFuture<'_, UserProfile>;

	/// Clears the vendor session and emits `logout`.
	fn logout(&self, options: FlowOptions) -> OpFuture<'_, bool>;

	/// Returns a valid access token, refreshing silently where the vendor
	/// supports it. A login-required condition emits `session_expired`;
	/// any other failure emits `error`.
	fn access_token(&self) -> OpFuture<'_, String>;

	/// Never fails; an internal failure emits `error` and resolves `false`.
	fn is_authenticated(&self) -> LocalBoxFuture<'_, bool>;

	fn user_profile(&self) -> OpFuture<'_, UserProfile>;

	/// Registers the sole event sink; a later registration replaces the
	/// prior one.
	fn set_event_sink(&self, sink: EventSink);
}

impl std::fmt::Debug for dyn IdentityProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.pad("IdentityProvider")
	}
}
