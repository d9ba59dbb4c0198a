use crate::{notifier::Notifier, provider::IdentityProvider, Error, ProviderConfig};
use std::{collections::HashMap, rc::Rc};

pub type ProviderConstructor = Rc<dyn Fn(&ProviderConfig) -> Result<Rc<dyn IdentityProvider>, Error>>;

/// Open mapping from provider tag to adapter constructor. Adding a provider
/// is a registration, not an edit to shared code.
#[derive(Clone)]
pub struct Registry {
	constructors: HashMap<String, ProviderConstructor>,
}

impl Registry {
	pub fn new() -> Self {
		Self { constructors: HashMap::new() }
	}

	pub fn register<F>(&mut self, tag: impl Into<String>, constructor: F)
	where
		F: Fn(&ProviderConfig) -> Result<Rc<dyn IdentityProvider>, Error> + 'static,
	{
		self.constructors.insert(tag.into(), Rc::new(constructor));
	}

	pub fn tags(&self) -> impl Iterator<Item = &str> {
		self.constructors.keys().map(String::as_str)
	}

	/// Constructs the adapter registered for `tag` and wires the notifier's
	/// dispatch as its sole event sink before handing it out. No other side
	/// effects.
	pub fn create(
		&self,
		tag: &str,
		config: &ProviderConfig,
		notifier: &Notifier,
	) -> Result<Rc<dyn IdentityProvider>, Error> {
		let Some(constructor) = self.constructors.get(tag) else {
			return Err(Error::Configuration(format!("unsupported identity provider `{tag}`")));
		};
		let adapter = constructor(config)?;
		adapter.set_event_sink(notifier.sink());
		log::debug!(target: "auth", "Constructed `{tag}` identity provider");
		Ok(adapter)
	}
}

impl Default for Registry {
	/// The stock registry; on browser targets it knows the `auth0` tag.
	fn default() -> Self {
		#[allow(unused_mut)]
		let mut registry = Self::new();
		#[cfg(target_family = "wasm")]
		registry.register(crate::provider::auth0::TAG, |config| {
			let adapter: Rc<dyn IdentityProvider> = Rc::new(crate::provider::auth0::Auth0Provider::browser(config)?);
			Ok(adapter)
		});
		registry
	}
}
