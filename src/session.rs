use crate::{
	event::{Event, EventKind},
	notifier::{ListenerHandle, Notifier},
	provider::{IdentityProvider, UserProfile},
	Error, FlowOptions, ProviderConfig, Registry,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use yewdux::prelude::*;

/// The in-memory view of the user's authentication state, derived from
/// adapter events. Created loading; destroyed with the owning UI scope.
#[derive(Clone, Debug, PartialEq, Store)]
pub struct Session {
	pub loading: bool,
	pub authenticated: bool,
	pub user: Option<UserProfile>,
	pub last_error: Option<Error>,
}

impl Default for Session {
	fn default() -> Self {
		Self {
			loading: true,
			authenticated: false,
			user: None,
			last_error: None,
		}
	}
}

/// Optional external hooks invoked on the corresponding state transitions.
#[derive(Clone, Default)]
pub struct SessionCallbacks {
	pub on_login: Option<Rc<dyn Fn(&UserProfile)>>,
	pub on_logout: Option<Rc<dyn Fn()>>,
	pub on_error: Option<Rc<dyn Fn(&Error)>>,
}

struct Shared {
	state: RefCell<Session>,
	publish: Box<dyn Fn(&Session)>,
	callbacks: SessionCallbacks,
	// Cleared on teardown so a torn-down session stops reacting; there is
	// no way to abort an in-flight adapter call, only to ignore its result.
	live: Cell<bool>,
}

impl Shared {
	fn mutate(&self, apply: impl FnOnce(&mut Session)) {
		if !self.live.get() {
			return;
		}
		let snapshot = {
			let mut state = self.state.borrow_mut();
			apply(&mut state);
			state.clone()
		};
		(self.publish)(&snapshot);
	}

	fn apply_event(&self, event: &Event) {
		if !self.live.get() {
			log::trace!(target: "auth", "Ignoring {} event after teardown", event.kind());
			return;
		}
		match event {
			Event::Initialized { authenticated, user } => {
				self.mutate(|session| {
					session.loading = false;
					session.authenticated = *authenticated;
					if user.is_some() {
						session.user = user.clone();
					}
				});
			}
			Event::Authenticated { user } => {
				self.mutate(|session| {
					session.authenticated = true;
					session.user = Some(user.clone());
				});
				if let Some(on_login) = &self.callbacks.on_login {
					on_login(user);
				}
			}
			Event::Logout => {
				self.mutate(|session| {
					session.authenticated = false;
					session.user = None;
				});
				if let Some(on_logout) = &self.callbacks.on_logout {
					on_logout();
				}
			}
			Event::SessionExpired { .. } => {
				self.mutate(|session| {
					session.authenticated = false;
					session.user = None;
				});
			}
			Event::Error { error } => {
				self.mutate(|session| session.last_error = Some(error.clone()));
				if let Some(on_error) = &self.callbacks.on_error {
					on_error(error);
				}
			}
		}
	}
}

/// Owns at most one adapter and keeps a [`Session`] in step with its
/// events. Operations delegate to the adapter, toggling `loading` around
/// the call and recording rejections into `last_error` before returning
/// them.
pub struct SessionHandle {
	shared: Rc<Shared>,
	notifier: Notifier,
	adapter: RefCell<Option<Rc<dyn IdentityProvider>>>,
	subscriptions: Vec<(EventKind, ListenerHandle)>,
}

impl SessionHandle {
	pub fn new<F>(publish: F, callbacks: SessionCallbacks) -> Self
	where
		F: Fn(&Session) + 'static,
	{
		let shared = Rc::new(Shared {
			state: RefCell::new(Session::default()),
			publish: Box::new(publish),
			callbacks,
			live: Cell::new(true),
		});
		let notifier = Notifier::new();
		let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());
		for kind in EventKind::ALL {
			let handle = ListenerHandle::new({
				let shared = shared.clone();
				move |event: &Event| shared.apply_event(event)
			});
			notifier.on(kind, &handle);
			subscriptions.push((kind, handle));
		}
		// Surface the initial loading state to the reactive layer.
		shared.mutate(|_| {});
		Self {
			shared,
			notifier,
			adapter: RefCell::new(None),
			subscriptions,
		}
	}

	pub fn notifier(&self) -> &Notifier {
		&self.notifier
	}

	pub fn session(&self) -> Session {
		self.shared.state.borrow().clone()
	}

	/// Asks the registry for the tag's adapter and takes exclusive
	/// ownership of it. A construction failure is recorded and returned.
	pub fn attach(&self, registry: &Registry, tag: &str, config: &ProviderConfig) -> Result<(), Error> {
		match registry.create(tag, config, &self.notifier) {
			Ok(adapter) => {
				*self.adapter.borrow_mut() = Some(adapter);
				Ok(())
			}
			Err(error) => {
				self.shared.mutate(|session| {
					session.loading = false;
					session.last_error = Some(error.clone());
				});
				Err(error)
			}
		}
	}

	/// Stops all further state updates and discards the adapter. The
	/// adapter is never reused across configurations.
	pub fn teardown(&self) {
		self.shared.live.set(false);
		for (kind, handle) in &self.subscriptions {
			self.notifier.off(*kind, handle);
		}
		self.adapter.borrow_mut().take();
	}

	pub async fn initialize(&self) -> Result<(), Error> {
		let adapter = self.adapter().map_err(|error| self.record(error))?;
		let result = adapter.initialize().await;
		if let Err(error) = &result {
			self.shared.mutate(|session| {
				session.loading = false;
				session.last_error = Some(error.clone());
			});
		}
		result
	}

	pub async fn login(&self, options: FlowOptions) -> Result<(), Error> {
		let adapter = self.adapter().map_err(|error| self.record(error))?;
		self.begin();
		let result = adapter.login(options).await;
		self.finish(result)
	}

	pub async fn login_with_popup(&self, options: FlowOptions) -> Result<UserProfile, Error> {
		let adapter = self.adapter().map_err(|error| self.record(error))?;
		self.begin();
		let result = adapter.login_with_popup(options).await;
		self.finish(result)
	}

	pub async fn logout(&self, options: FlowOptions) -> Result<bool, Error> {
		let adapter = self.adapter().map_err(|error| self.record(error))?;
		self.begin();
		let result = adapter.logout(options).await;
		self.finish(result)
	}

	pub async fn access_token(&self) -> Result<String, Error> {
		let adapter = self.adapter().map_err(|error| self.record(error))?;
		self.begin();
		let result = adapter.access_token().await;
		self.finish(result)
	}

	pub async fn is_authenticated(&self) -> bool {
		match self.adapter() {
			Ok(adapter) => adapter.is_authenticated().await,
			Err(_) => false,
		}
	}

	pub async fn user_profile(&self) -> Result<UserProfile, Error> {
		let adapter = self.adapter().map_err(|error| self.record(error))?;
		adapter.user_profile().await
	}

	fn adapter(&self) -> Result<Rc<dyn IdentityProvider>, Error> {
		self.adapter.borrow().clone().ok_or(Error::NotInitialized)
	}

	fn record(&self, error: Error) -> Error {
		self.shared.mutate(|session| session.last_error = Some(error.clone()));
		error
	}

	fn begin(&self) {
		self.shared.mutate(|session| session.loading = true);
	}

	fn finish<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
		match &result {
			Ok(_) => self.shared.mutate(|session| session.loading = false),
			Err(error) => {
				let error = error.clone();
				self.shared.mutate(move |session| {
					session.loading = false;
					session.last_error = Some(error);
				});
			}
		}
		result
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::provider::auth0::{Auth0Provider, SdkError};
	use crate::provider::stub::{StubEnvironment, StubSdk};
	use futures::executor::block_on;

	struct Harness {
		handle: SessionHandle,
		environment: Rc<StubEnvironment>,
		published: Rc<RefCell<Vec<Session>>>,
		logins: Rc<Cell<usize>>,
		logouts: Rc<Cell<usize>>,
		errors: Rc<Cell<usize>>,
	}

	impl Harness {
		fn new() -> Self {
			let environment = Rc::new(StubEnvironment::default());
			let published = Rc::new(RefCell::new(Vec::new()));
			let logins = Rc::new(Cell::new(0));
			let logouts = Rc::new(Cell::new(0));
			let errors = Rc::new(Cell::new(0));
			let callbacks = SessionCallbacks {
				on_login: Some({
					let logins = logins.clone();
					Rc::new(move |_user: &UserProfile| logins.set(logins.get() + 1))
				}),
				on_logout: Some({
					let logouts = logouts.clone();
					Rc::new(move || logouts.set(logouts.get() + 1))
				}),
				on_error: Some({
					let errors = errors.clone();
					Rc::new(move |_error: &Error| errors.set(errors.get() + 1))
				}),
			};
			let handle = SessionHandle::new(
				{
					let published = published.clone();
					move |session: &Session| published.borrow_mut().push(session.clone())
				},
				callbacks,
			);
			Self { handle, environment, published, logins, logouts, errors }
		}

		fn sdk(&self) -> &StubSdk {
			&self.environment.sdk
		}

		fn registry(&self) -> Registry {
			let environment = self.environment.clone();
			let mut registry = Registry::new();
			registry.register("auth0", move |config| {
				let adapter: Rc<dyn IdentityProvider> = Rc::new(Auth0Provider::new(config, environment.clone())?);
				Ok(adapter)
			});
			registry
		}

		fn attach(&self) {
			let config = ProviderConfig::new()
				.with("domain", "x.example.com")
				.with("client_id", "abc");
			self.handle.attach(&self.registry(), "auth0", &config).unwrap();
		}
	}

	fn profile() -> UserProfile {
		UserProfile::new(serde_json::json!({ "sub": "auth0|123", "name": "Ada" }))
	}

	#[test]
	fn initial_state_is_loading_and_published() {
		let harness = Harness::new();
		assert_eq!(harness.handle.session(), Session::default());
		assert_eq!(*harness.published.borrow(), vec![Session::default()]);
	}

	#[test]
	fn initialize_without_session_clears_loading() {
		let harness = Harness::new();
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		let session = harness.handle.session();
		assert!(!session.loading);
		assert!(!session.authenticated);
		assert_eq!(session.user, None);
	}

	#[test]
	fn initialize_with_session_reports_user() {
		let harness = Harness::new();
		harness.sdk().authenticated.set(true);
		*harness.sdk().user.borrow_mut() = Some(profile());
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		let session = harness.handle.session();
		assert!(session.authenticated);
		assert_eq!(session.user, Some(profile()));
	}

	#[test]
	fn initialize_failure_records_error_and_clears_loading() {
		let harness = Harness::new();
		harness.environment.fail_bootstrap.set(true);
		harness.attach();
		let err = block_on(harness.handle.initialize()).unwrap_err();
		let session = harness.handle.session();
		assert!(!session.loading);
		assert_eq!(session.last_error, Some(err));
		assert_eq!(harness.errors.get(), 1);
	}

	#[test]
	fn popup_login_updates_state_and_invokes_hook_once() {
		let harness = Harness::new();
		*harness.sdk().user.borrow_mut() = Some(profile());
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		let user = block_on(harness.handle.login_with_popup(FlowOptions::new())).unwrap();
		assert_eq!(user, profile());
		let session = harness.handle.session();
		assert!(session.authenticated);
		assert!(!session.loading);
		assert_eq!(harness.logins.get(), 1);
	}

	#[test]
	fn logout_clears_state_and_invokes_hook_once() {
		let harness = Harness::new();
		harness.sdk().authenticated.set(true);
		*harness.sdk().user.borrow_mut() = Some(profile());
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		assert!(block_on(harness.handle.logout(FlowOptions::new())).unwrap());
		let session = harness.handle.session();
		assert!(!session.authenticated);
		assert_eq!(session.user, None);
		assert_eq!(harness.logouts.get(), 1);
	}

	#[test]
	fn operations_toggle_loading_around_the_call() {
		let harness = Harness::new();
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		harness.published.borrow_mut().clear();
		block_on(harness.handle.access_token()).unwrap();
		let loading: Vec<bool> = harness.published.borrow().iter().map(|session| session.loading).collect();
		assert_eq!(loading, vec![true, false]);
	}

	#[test]
	fn operation_before_attach_fails_not_initialized() {
		let harness = Harness::new();
		let err = block_on(harness.handle.access_token()).unwrap_err();
		assert_eq!(err, Error::NotInitialized);
		assert_eq!(harness.handle.session().last_error, Some(Error::NotInitialized));
	}

	#[test]
	fn expired_session_forces_reauthentication_state() {
		let harness = Harness::new();
		harness.sdk().authenticated.set(true);
		*harness.sdk().user.borrow_mut() = Some(profile());
		*harness.sdk().token.borrow_mut() = Err(SdkError::new(Some("login_required".into()), "refresh denied"));
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		assert!(harness.handle.session().authenticated);
		let err = block_on(harness.handle.access_token()).unwrap_err();
		assert_eq!(err, Error::SessionExpired);
		let session = harness.handle.session();
		assert!(!session.authenticated);
		assert_eq!(session.user, None);
		assert_eq!(session.last_error, Some(Error::SessionExpired));
	}

	#[test]
	fn attach_with_unknown_tag_records_configuration_error() {
		let harness = Harness::new();
		let config = ProviderConfig::new();
		let err = harness.handle.attach(&Registry::new(), "auth0", &config).unwrap_err();
		assert!(matches!(err, Error::Configuration(_)), "{err:?}");
		let session = harness.handle.session();
		assert!(!session.loading);
		assert_eq!(session.last_error, Some(err));
	}

	#[test]
	fn simulated_initialized_event_updates_state() {
		let harness = Harness::new();
		harness.handle.notifier().dispatch(&Event::Initialized { authenticated: false, user: None });
		let session = harness.handle.session();
		assert!(!session.loading);
		assert!(!session.authenticated);
		assert_eq!(session.user, None);
	}

	#[test]
	fn error_event_records_last_error_and_invokes_hook() {
		let harness = Harness::new();
		let error = Error::AuthFlow("denied".into());
		harness.handle.notifier().dispatch(&Event::Error { error: error.clone() });
		assert_eq!(harness.handle.session().last_error, Some(error));
		assert_eq!(harness.errors.get(), 1);
	}

	#[test]
	fn teardown_stops_state_updates() {
		let harness = Harness::new();
		harness.attach();
		block_on(harness.handle.initialize()).unwrap();
		let before = harness.handle.session();
		harness.published.borrow_mut().clear();
		harness.handle.teardown();
		harness.handle.notifier().dispatch(&Event::Authenticated { user: profile() });
		assert_eq!(harness.handle.session(), before);
		assert!(harness.published.borrow().is_empty());
		assert_eq!(harness.logins.get(), 0);
	}

	#[test]
	fn teardown_discards_the_adapter() {
		let harness = Harness::new();
		harness.attach();
		harness.handle.teardown();
		assert!(!block_on(harness.handle.is_authenticated()));
	}
}
