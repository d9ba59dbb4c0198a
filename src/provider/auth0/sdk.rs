use super::{Auth0Config, Environment, SdkError, VendorSdk};
use crate::provider::UserProfile;
use futures::future::{FutureExt, LocalBoxFuture};
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

pub const DEFAULT_SCRIPT_URL: &str = "https://cdn.auth0.com/js/auth0-spa-js/2.1/auth0-spa-js.production.js";
pub const DEFAULT_FACTORY_NAME: &str = "createAuth0Client";

impl SdkError {
	fn from_js(value: JsValue) -> Self {
		let code = js_sys::Reflect::get(&value, &JsValue::from_str("error"))
			.ok()
			.and_then(|field| field.as_string());
		let message = js_sys::Reflect::get(&value, &JsValue::from_str("message"))
			.ok()
			.and_then(|field| field.as_string())
			.unwrap_or_else(|| format!("{value:?}"));
		Self { code, message }
	}
}

/// The real browser: loads the vendor script on demand, constructs the
/// client through its global factory, and owns the query-string handling
/// for redirect callbacks. The script URL and factory name are plain
/// fields so a self-hosted or differently-branded build of the same SDK
/// shape can be pointed at.
#[derive(Clone, Debug, PartialEq)]
pub struct BrowserEnvironment {
	pub script_url: String,
	pub factory_name: String,
}

impl Default for BrowserEnvironment {
	fn default() -> Self {
		Self {
			script_url: DEFAULT_SCRIPT_URL.to_owned(),
			factory_name: DEFAULT_FACTORY_NAME.to_owned(),
		}
	}
}

impl BrowserEnvironment {
	fn global_factory(&self) -> Option<js_sys::Function> {
		let window = web_sys::window()?;
		let factory = js_sys::Reflect::get(&window, &JsValue::from_str(&self.factory_name)).ok()?;
		factory.dyn_into::<js_sys::Function>().ok()
	}

	async fn ensure_runtime(&self) -> Result<js_sys::Function, SdkError> {
		if let Some(factory) = self.global_factory() {
			return Ok(factory);
		}
		log::debug!(target: "auth::sdk", "Attaching provider runtime from {}", self.script_url);
		self.load_script().await?;
		self.global_factory().ok_or_else(|| {
			SdkError::new(
				None,
				format!("global `{}` is missing after loading {}", self.factory_name, self.script_url),
			)
		})
	}

	async fn load_script(&self) -> Result<(), SdkError> {
		let document = gloo_utils::document();
		let script = document
			.create_element("script")
			.ok()
			.and_then(|element| element.dyn_into::<web_sys::HtmlScriptElement>().ok())
			.ok_or_else(|| SdkError::new(None, "failed to create script element"))?;
		script.set_src(&self.script_url);
		script.set_async(true);
		let loaded = js_sys::Promise::new(&mut |resolve, reject| {
			script.set_onload(Some(&resolve));
			script.set_onerror(Some(&reject));
		});
		let head = document
			.head()
			.ok_or_else(|| SdkError::new(None, "document has no head"))?;
		head.append_child(&script)
			.map_err(|_| SdkError::new(None, "failed to attach script element"))?;
		JsFuture::from(loaded)
			.await
			.map_err(|_| SdkError::new(None, format!("failed to load {}", self.script_url)))?;
		Ok(())
	}

	fn vendor_options(&self, config: &Auth0Config) -> JsValue {
		let mut params = serde_json::Map::new();
		params.insert("scope".into(), config.scope().into());
		if let Some(redirect_uri) = config.redirect_uri.clone().or_else(|| self.current_origin()) {
			params.insert("redirect_uri".into(), redirect_uri.into());
		}
		if let Some(audience) = &config.audience {
			params.insert("audience".into(), audience.clone().into());
		}
		let options = serde_json::json!({
			"domain": config.domain,
			"clientId": config.client_id,
			"authorizationParams": params,
		});
		serde_wasm_bindgen::to_value(&options).unwrap_or(JsValue::UNDEFINED)
	}
}

impl Environment for BrowserEnvironment {
	fn create_client(&self, config: &Auth0Config) -> LocalBoxFuture<'_, Result<Rc<dyn VendorSdk>, SdkError>> {
		let options = self.vendor_options(config);
		async move {
			let factory = self.ensure_runtime().await?;
			let pending = factory
				.call1(&JsValue::UNDEFINED, &options)
				.map_err(SdkError::from_js)?
				.dyn_into::<js_sys::Promise>()
				.map_err(|_| SdkError::new(None, "client factory did not return a promise"))?;
			let client = JsFuture::from(pending).await.map_err(SdkError::from_js)?;
			Ok(Rc::new(JsClient(client.unchecked_into())) as Rc<dyn VendorSdk>)
		}
		.boxed_local()
	}

	fn has_callback_params(&self) -> bool {
		let Some(window) = web_sys::window() else {
			return false;
		};
		let Ok(search) = window.location().search() else {
			return false;
		};
		let Ok(params) = web_sys::UrlSearchParams::new_with_str(&search) else {
			return false;
		};
		params.has("state") && (params.has("code") || params.has("error"))
	}

	fn clear_callback_params(&self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		let Ok(path) = window.location().pathname() else {
			return;
		};
		let Ok(history) = window.history() else {
			return;
		};
		let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&path));
	}

	fn current_origin(&self) -> Option<String> {
		web_sys::window()?.location().origin().ok()
	}
}

/// A constructed vendor client held as an untyped JS object; operations
/// resolve its methods by name and await whatever promise they return.
pub struct JsClient(js_sys::Object);

impl JsClient {
	fn method(&self, name: &str) -> Result<js_sys::Function, SdkError> {
		js_sys::Reflect::get(&self.0, &JsValue::from_str(name))
			.ok()
			.and_then(|value| value.dyn_into::<js_sys::Function>().ok())
			.ok_or_else(|| SdkError::new(None, format!("vendor client has no `{name}` method")))
	}

	async fn invoke(&self, name: &str, argument: Option<JsValue>) -> Result<JsValue, SdkError> {
		let method = self.method(name)?;
		let returned = match argument {
			Some(argument) => method.call1(&self.0, &argument),
			None => method.call0(&self.0),
		}
		.map_err(SdkError::from_js)?;
		match returned.dyn_into::<js_sys::Promise>() {
			Ok(promise) => JsFuture::from(promise).await.map_err(SdkError::from_js),
			Err(value) => Ok(value),
		}
	}

	fn to_js(options: serde_json::Value) -> JsValue {
		serde_wasm_bindgen::to_value(&options).unwrap_or(JsValue::UNDEFINED)
	}
}

impl VendorSdk for JsClient {
	fn login_with_redirect(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		let options = Self::to_js(options);
		async move { self.invoke("loginWithRedirect", Some(options)).await.map(|_| ()) }.boxed_local()
	}

	fn login_with_popup(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		let options = Self::to_js(options);
		async move { self.invoke("loginWithPopup", Some(options)).await.map(|_| ()) }.boxed_local()
	}

	fn logout(&self, options: serde_json::Value) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		let options = Self::to_js(options);
		async move { self.invoke("logout", Some(options)).await.map(|_| ()) }.boxed_local()
	}

	fn token_silently(&self) -> LocalBoxFuture<'_, Result<String, SdkError>> {
		async move {
			let token = self.invoke("getTokenSilently", None).await?;
			token
				.as_string()
				.ok_or_else(|| SdkError::new(None, "vendor client returned a non-string token"))
		}
		.boxed_local()
	}

	fn is_authenticated(&self) -> LocalBoxFuture<'_, Result<bool, SdkError>> {
		async move {
			let value = self.invoke("isAuthenticated", None).await?;
			Ok(value.as_bool().unwrap_or(false))
		}
		.boxed_local()
	}

	fn user(&self) -> LocalBoxFuture<'_, Result<Option<UserProfile>, SdkError>> {
		async move {
			let value = self.invoke("getUser", None).await?;
			if value.is_undefined() || value.is_null() {
				return Ok(None);
			}
			let record: serde_json::Value =
				serde_wasm_bindgen::from_value(value).map_err(|err| SdkError::new(None, err.to_string()))?;
			Ok(Some(UserProfile::new(record)))
		}
		.boxed_local()
	}

	fn handle_redirect_callback(&self) -> LocalBoxFuture<'_, Result<(), SdkError>> {
		async move { self.invoke("handleRedirectCallback", None).await.map(|_| ()) }.boxed_local()
	}
}
