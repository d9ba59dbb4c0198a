use super::{IdentityProvider, OpFuture, UserProfile};
use crate::{event::EventSink, Error, Event, FlowOptions, ProviderConfig};
use futures::future::{FutureExt, LocalBoxFuture};
use serde::Deserialize;
use std::{cell::RefCell, rc::Rc};

pub mod sdk;

pub const TAG: &str = "auth0";
const DEFAULT_SCOPE: &str = "openid profile email";

/// Typed view of the opaque [`ProviderConfig`] for this adapter.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Auth0Config {
	pub domain: String,
	#[serde(alias = "clientId")]
	pub client_id: String,
	#[serde(default, alias = "redirectUri")]
	pub redirect_uri: Option<String>,
	#[serde(default)]
	pub audience: Option<String>,
	#[serde(default)]
	pub scope: Option<Scope>,
}

impl Auth0Config {
	pub fn scope(&self) -> String {
		match &self.scope {
			None => DEFAULT_SCOPE.to_owned(),
			Some(scope) => scope.join(),
		}
	}

	fn validate(&self) -> Result<(), Error> {
		if self.domain.is_empty() {
			return Err(Error::Configuration("provider config field `domain` must not be empty".into()));
		}
		if self.client_id.is_empty() {
			return Err(Error::Configuration("provider config field `client_id` must not be empty".into()));
		}
		Ok(())
	}
}

/// Scopes accepted either as one space-delimited string or as a list.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scope {
	Single(String),
	List(Vec<String>),
}

impl Scope {
	pub fn join(&self) -> String {
		match self {
			Self::Single(value) => value.clone(),
			Self::List(values) => values.join(" "),
		}
	}
}

/// Failure reported by the vendor SDK, before it is mapped onto [`Error`].
#[derive(Clone, Debug, PartialEq)]
pub struct SdkError {
	pub code: Option<String>,
	pub message: String,
}

impl SdkError {
	pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
		Self { code, message: message.into() }
	}

	/// True when silent refresh is impossible and the user must log in
	/// interactively again.
	pub fn requires_login(&self) -> bool {
		matches!(self.code.as_deref(), Some("login_required" | "consent_required"))
	}
}

impl std::fmt::Display for SdkError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.code {
			Some(code) => write!(f, "{code}: {}", self.message),
			None => write!(f, "{}", self.message),
		}
	}
}

/// Operation set of a constructed vendor client.
pub trait VendorSdk {
	fn login_with_redirect(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>>;
	fn login_with_popup(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>>;
	fn logout(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>>;
	fn token_silently(&self) -> LocalBoxFuture<'_, Result<String, SdkError>>;
	fn is_authenticated(&self) -> LocalBoxFuture<'_, Result<bool, SdkError>>;
	fn user(&self) -> LocalBoxFuture<'_, Result<Option<UserProfile>, SdkError>>;
	fn handle_redirect_callback(&self) -> LocalBoxFuture<'_, Result<(), SdkError>>;
}

/// Access to the mutable browser state the adapter depends on: the vendor
/// runtime's global factory and the navigation context. Injected so the
/// adapter logic runs (and tests) without a real browser.
pub trait Environment {
	/// Constructs the vendor client, fetching and attaching the hosted
	/// runtime first when its global factory is absent.
	fn create_client(&self, config: &Auth0Config) -> LocalBoxFuture<'_, Result<Rc<dyn VendorSdk>, SdkError>>;
	/// Whether the current navigation context carries an OAuth redirect
	/// callback (`code`/`error` plus `state` query parameters).
	fn has_callback_params(&self) -> bool;
	/// Strips the callback parameters from the visible URL.
	fn clear_callback_params(&self);
	fn current_origin(&self) -> Option<String>;
}

/// The one stock adapter: drives an Auth0-style SPA client through the
/// uniform [`IdentityProvider`] surface.
pub struct Auth0Provider {
	config: Auth0Config,
	environment: Rc<dyn Environment>,
	client: RefCell<Option<Rc<dyn VendorSdk>>>,
	sink: RefCell<Option<EventSink>>,
}

impl Auth0Provider {
	pub fn new(config: &ProviderConfig, environment: Rc<dyn Environment>) -> Result<Self, Error> {
		let config = config.parse::<Auth0Config>()?;
		config.validate()?;
		Ok(Self {
			config,
			environment,
			client: RefCell::new(None),
			sink: RefCell::new(None),
		})
	}

	/// Adapter backed by the real browser window.
	pub fn browser(config: &ProviderConfig) -> Result<Self, Error> {
		Self::new(config, Rc::new(sdk::BrowserEnvironment::default()))
	}

	pub fn config(&self) -> &Auth0Config {
		&self.config
	}

	fn emit(&self, event: Event) {
		let sink = self.sink.borrow().clone();
		match sink {
			Some(sink) => sink(event),
			None => log::debug!(target: "auth", "Dropping {} event: no sink registered", event.kind()),
		}
	}

	/// Dual delivery: every failure is emitted for passive observers and
	/// returned to the active caller.
	fn fail(&self, error: Error) -> Error {
		log::error!(target: "auth", "{error}");
		self.emit(Event::Error { error: error.clone() });
		error
	}

	fn client(&self) -> Result<Rc<dyn VendorSdk>, Error> {
		self.client.borrow().clone().ok_or(Error::NotInitialized)
	}

	fn redirect_uri(&self) -> Option<String> {
		self.config.redirect_uri.clone().or_else(|| self.environment.current_origin())
	}

	fn login_options(&self, options: FlowOptions) -> serde_json::Value {
		with_nested_default(options.into_value(), "authorizationParams", "redirect_uri", self.redirect_uri())
	}

	fn logout_options(&self, options: FlowOptions) -> serde_json::Value {
		with_nested_default(options.into_value(), "logoutParams", "returnTo", self.redirect_uri())
	}
}

/// Fills `root[group][key] = value` unless the caller already set it.
fn with_nested_default(mut root: serde_json::Value, group: &str, key: &str, value: Option<String>) -> serde_json::Value {
	let Some(value) = value else {
		return root;
	};
	let Some(object) = root.as_object_mut() else {
		return root;
	};
	let params = object
		.entry(group)
		.or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
	if let Some(params) = params.as_object_mut() {
		params.entry(key).or_insert_with(|| serde_json::Value::String(value));
	}
	root
}

impl std::fmt::Debug for Auth0Provider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Auth0Provider").field("config", &self.config).finish_non_exhaustive()
	}
}

impl IdentityProvider for Auth0Provider {
	fn initialize(&self) -> OpFuture<'_, ()> {
		async move {
			log::debug!(target: "auth", "Initializing {TAG} provider for {}", self.config.domain);
			let client = match self.environment.create_client(&self.config).await {
				Ok(client) => client,
				Err(err) => return Err(self.fail(Error::Bootstrap(err.to_string()))),
			};
			if self.environment.has_callback_params() {
				log::debug!(target: "auth", "Consuming redirect callback parameters");
				let callback = client.handle_redirect_callback().await;
				// The URL is scrubbed even when the exchange fails, so a
				// reload does not replay a spent callback.
				self.environment.clear_callback_params();
				if let Err(err) = callback {
					return Err(self.fail(Error::AuthFlow(err.to_string())));
				}
			}
			let authenticated = match client.is_authenticated().await {
				Ok(value) => value,
				Err(err) => return Err(self.fail(Error::AuthFlow(err.to_string()))),
			};
			let user = match authenticated {
				false => None,
				true => match client.user().await {
					Ok(user) => user,
					Err(err) => return Err(self.fail(Error::AuthFlow(err.to_string()))),
				},
			};
			*self.client.borrow_mut() = Some(client);
			self.emit(Event::Initialized { authenticated, user });
			Ok(())
		}
		.boxed_local()
	}

	fn login(&self, options: FlowOptions) -> OpFuture<'_, ()> {
		async move {
			let client = self.client().map_err(|err| self.fail(err))?;
			let options = self.login_options(options);
			client
				.login_with_redirect(options)
				.await
				.map_err(|err| self.fail(Error::AuthFlow(err.to_string())))?;
			// Navigation has begun; whether login succeeds is only known to
			// the initialize() that runs after the provider redirects back.
			Ok(())
		}
		.boxed_local()
	}

	fn login_with_popup(&self, options: FlowOptions) -> OpFuture<'_, UserProfile> {
		async move {
			let client = self.client().map_err(|err| self.fail(err))?;
			let options = self.login_options(options);
			client
				.login_with_popup(options)
				.await
				.map_err(|err| self.fail(Error::AuthFlow(err.to_string())))?;
			let user = client
				.user()
				.await
				.map_err(|err| self.fail(Error::AuthFlow(err.to_string())))?;
			let Some(user) = user else {
				return Err(self.fail(Error::AuthFlow("popup login finished without a user profile".into())));
			};
			self.emit(Event::Authenticated { user: user.clone() });
			Ok(user)
		}
		.boxed_local()
	}

	fn logout(&self, options: FlowOptions) -> OpFuture<'_, bool> {
		async move {
			let client = self.client().map_err(|err| self.fail(err))?;
			let options = self.logout_options(options);
			client
				.logout(options)
				.await
				.map_err(|err| self.fail(Error::AuthFlow(err.to_string())))?;
			self.emit(Event::Logout);
			Ok(true)
		}
		.boxed_local()
	}

	fn access_token(&self) -> OpFuture<'_, String> {
		async move {
			let client = self.client().map_err(|err| self.fail(err))?;
			match client.token_silently().await {
				Ok(token) => Ok(token),
				Err(err) if err.requires_login() => {
					let error = Error::SessionExpired;
					log::debug!(target: "auth", "Silent token refresh unavailable: {err}");
					self.emit(Event::SessionExpired { error: error.clone() });
					Err(error)
				}
				Err(err) => Err(self.fail(Error::Token(err.to_string()))),
			}
		}
		.boxed_local()
	}

	fn is_authenticated(&self) -> LocalBoxFuture<'_, bool> {
		async move {
			let Some(client) = self.client.borrow().clone() else {
				return false;
			};
			match client.is_authenticated().await {
				Ok(value) => value,
				Err(err) => {
					self.emit(Event::Error { error: Error::AuthFlow(err.to_string()) });
					false
				}
			}
		}
		.boxed_local()
	}

	fn user_profile(&self) -> OpFuture<'_, UserProfile> {
		async move {
			let client = self.client().map_err(|err| self.fail(err))?;
			match client.user().await {
				Ok(Some(user)) => Ok(user),
				Ok(None) => Err(self.fail(Error::AuthFlow("no authenticated user".into()))),
				Err(err) => Err(self.fail(Error::AuthFlow(err.to_string()))),
			}
		}
		.boxed_local()
	}

	fn set_event_sink(&self, sink: EventSink) {
		*self.sink.borrow_mut() = Some(sink);
	}
}
