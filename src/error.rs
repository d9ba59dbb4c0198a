/// Failure modes surfaced by providers and the session store.
///
/// Every adapter failure is delivered twice on purpose: as the `Err` of the
/// operation that caused it, and as an emitted [`Event`](crate::Event) for
/// passive observers. Variants are cheap to clone so they can live inside
/// reactive state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
	#[error("{0}")]
	Configuration(String),
	#[error("identity provider is not initialized")]
	NotInitialized,
	#[error("failed to bootstrap the provider runtime: {0}")]
	Bootstrap(String),
	#[error("authentication flow failed: {0}")]
	AuthFlow(String),
	#[error("session expired; interactive login is required")]
	SessionExpired,
	#[error("token request failed: {0}")]
	Token(String),
}

impl Error {
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired)
	}
}
