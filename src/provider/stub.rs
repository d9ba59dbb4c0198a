use super::auth0::{Auth0Config, Environment, SdkError, VendorSdk};
use super::UserProfile;
use futures::future::{FutureExt, LocalBoxFuture};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

/// Scriptable stand-in for a constructed vendor client.
pub struct StubSdk {
	pub authenticated: Cell<bool>,
	pub user: RefCell<Option<UserProfile>>,
	pub token: RefCell<Result<String, SdkError>>,
	pub callback_result: RefCell<Result<(), SdkError>>,
	pub popup_result: RefCell<Result<(), SdkError>>,
	pub fail_is_authenticated: Cell<bool>,
	pub calls: RefCell<Vec<&'static str>>,
	pub last_options: RefCell<Option<serde_json::Value>>,
}

impl Default for StubSdk {
	fn default() -> Self {
		Self {
			authenticated: Cell::new(false),
			user: RefCell::new(None),
			token: RefCell::new(Ok("stub-token".into())),
			callback_result: RefCell::new(Ok(())),
			popup_result: RefCell::new(Ok(())),
			fail_is_authenticated: Cell::new(false),
			calls: RefCell::new(Vec::new()),
			last_options: RefCell::new(None),
		}
	}
}

impl StubSdk {
	fn record(&self, call: &'static str, options: Option<serde_json::Value>) {
		self.calls.borrow_mut().push(call);
		if let Some(options) = options {
			*self.last_options.borrow_mut() = Some(options);
		}
	}
}

impl VendorSdk for StubSdk {
	fn login_with_redirect(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		self.record("login_with_redirect", Some(options));
		async move { Ok(()) }.boxed_local()
	}

	fn login_with_popup(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		self.record("login_with_popup", Some(options));
		async move {
			let result = self.popup_result.borrow().clone();
			if result.is_ok() {
				self.authenticated.set(true);
			}
			result
		}
		.boxed_local()
	}

	fn logout(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		self.record("logout", Some(options));
		async move {
			self.authenticated.set(false);
			self.user.borrow_mut().take();
			Ok(())
		}
		.boxed_local()
	}

	fn token_silently(&self) -> LocalBoxFuture<'_, Result<String, SdkError>> {
		self.record("token_silently", None);
		async move { self.token.borrow().clone() }.boxed_local()
	}

	fn is_authenticated(&self) -> LocalBoxFuture<'_, Result<bool, SdkError>> {
		self.record("is_authenticated", None);
		async move {
			match self.fail_is_authenticated.get() {
				true => Err(SdkError::new(None, "vendor client misbehaved")),
				false => Ok(self.authenticated.get()),
			}
		}
		.boxed_local()
	}

	fn user(&self) -> LocalBoxFuture<'_, Result<Option<UserProfile>, SdkError>> {
		self.record("user", None);
		async move { Ok(self.user.borrow().clone()) }.boxed_local()
	}

	fn handle_redirect_callback(&self) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		self.record("handle_redirect_callback", None);
		async move {
			let result = self.callback_result.borrow().clone();
			if result.is_ok() {
				self.authenticated.set(true);
			}
			result
		}
		.boxed_local()
	}
}

/// Browser-free [`Environment`] whose client is a shared [`StubSdk`].
pub struct StubEnvironment {
	pub sdk: Rc<StubSdk>,
	pub fail_bootstrap: Cell<bool>,
	pub callback_params: Cell<bool>,
	pub cleared: Cell<u32>,
}

impl StubEnvironment {
	pub const ORIGIN: &'static str = "https://app.example.com";
}

impl Default for StubEnvironment {
	fn default() -> Self {
		Self {
			sdk: Rc::new(StubSdk::default()),
			fail_bootstrap: Cell::new(false),
			callback_params: Cell::new(false),
			cleared: Cell::new(0),
		}
	}
}

impl Environment for StubEnvironment {
	fn create_client(&self, _config: &Auth0Config) -> LocalBoxFuture<'_, Result<Rc<dyn VendorSdk>, SdkError>> {
		async move {
			match self.fail_bootstrap.get() {
				true => Err(SdkError::new(None, "script failed to load")),
				false => Ok(self.sdk.clone() as Rc<dyn VendorSdk>),
			}
		}
		.boxed_local()
	}

	fn has_callback_params(&self) -> bool {
		self.callback_params.get()
	}

	fn clear_callback_params(&self) {
		self.cleared.set(self.cleared.get() + 1);
	}

	fn current_origin(&self) -> Option<String> {
		Some(Self::ORIGIN.to_owned())
	}
}
