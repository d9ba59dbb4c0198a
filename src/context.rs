use crate::{
	session::{Session, SessionCallbacks, SessionHandle},
	Error, FlowOptions, ProviderConfig, Registry, UserProfile,
};
use std::rc::Rc;
use yew::prelude::*;
use yewdux::prelude::*;

/// Context handle components use to drive the session. Cheap to clone;
/// equality is identity so reconfiguration re-renders consumers.
#[derive(Clone)]
pub struct Auth {
	handle: Rc<SessionHandle>,
}

impl PartialEq for Auth {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.handle, &other.handle)
	}
}

impl Auth {
	pub async fn sign_in(&self, options: FlowOptions) -> Result<(), Error> {
		self.handle.login(options).await
	}

	pub async fn sign_in_with_popup(&self, options: FlowOptions) -> Result<UserProfile, Error> {
		self.handle.login_with_popup(options).await
	}

	pub async fn sign_out(&self, options: FlowOptions) -> Result<bool, Error> {
		self.handle.logout(options).await
	}

	pub async fn access_token(&self) -> Result<String, Error> {
		self.handle.access_token().await
	}

	pub fn session(&self) -> Session {
		self.handle.session()
	}
}

#[derive(Clone, PartialEq, Properties)]
pub struct SessionProviderProps {
	/// Provider tag resolved through the registry.
	#[prop_or(AttrValue::Static("auth0"))]
	pub provider: AttrValue,
	/// Opaque configuration for that provider.
	pub config: ProviderConfig,
	#[prop_or_default]
	pub on_login: Option<Callback<UserProfile>>,
	#[prop_or_default]
	pub on_logout: Option<Callback<()>>,
	#[prop_or_default]
	pub on_error: Option<Callback<Error>>,
	#[prop_or_default]
	pub children: Html,
}

/// Owns the session for its subtree: constructs the adapter for the given
/// tag, runs its one-time bootstrap, publishes [`Session`] updates through
/// the global store, and exposes an [`Auth`] context. Changing the tag or
/// config discards the adapter and starts over with a fresh one.
#[function_component]
pub fn SessionProvider(props: &SessionProviderProps) -> Html {
	let auth = use_memo((props.provider.clone(), props.config.clone()), {
		let on_login = props.on_login.clone();
		let on_logout = props.on_logout.clone();
		let on_error = props.on_error.clone();
		move |(provider, config): &(AttrValue, ProviderConfig)| {
			let callbacks = SessionCallbacks {
				on_login: on_login.map(|callback| {
					Rc::new(move |user: &UserProfile| callback.emit(user.clone())) as Rc<dyn Fn(&UserProfile)>
				}),
				on_logout: on_logout.map(|callback| Rc::new(move || callback.emit(())) as Rc<dyn Fn()>),
				on_error: on_error.map(|callback| {
					Rc::new(move |error: &Error| callback.emit(error.clone())) as Rc<dyn Fn(&Error)>
				}),
			};
			let handle = SessionHandle::new(
				|session: &Session| Dispatch::<Session>::global().set(session.clone()),
				callbacks,
			);
			if let Err(err) = handle.attach(&Registry::default(), provider, config) {
				log::error!(target: "auth", "Failed to construct `{provider}` identity provider: {err}");
			}
			Auth { handle: Rc::new(handle) }
		}
	});
	use_effect_with((*auth).clone(), |auth: &Auth| {
		let handle = auth.handle.clone();
		wasm_bindgen_futures::spawn_local(async move {
			if let Err(err) = handle.initialize().await {
				log::error!(target: "auth", "Identity provider bootstrap failed: {err}");
			}
		});
		let handle = auth.handle.clone();
		move || handle.teardown()
	});
	html! {
		<ContextProvider<Auth> context={(*auth).clone()}>
			{props.children.clone()}
		</ContextProvider<Auth>>
	}
}

#[hook]
pub fn use_auth() -> Auth {
	use_context::<Auth>().expect("no SessionProvider above this component")
}

#[hook]
pub fn use_session() -> Rc<Session> {
	use_store_value::<Session>()
}

/// Runs the callback once each time the session transitions from
/// unauthenticated to authenticated.
#[hook]
pub fn use_on_auth_success<F>(callback: F)
where
	F: Fn(&Session) + 'static,
{
	let callback = yew_hooks::use_latest(callback);
	let session = use_store_value::<Session>();
	let was_authenticated = use_state_eq({
		let session = session.clone();
		move || session.authenticated
	});
	use_effect_with((session, was_authenticated), move |(session, was_authenticated)| {
		let is_authenticated = session.authenticated;
		if is_authenticated && !**was_authenticated {
			(*callback.current())(session);
		}
		was_authenticated.set(is_authenticated);
	});
}
