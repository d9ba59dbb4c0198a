use crate::Error;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Immutable provider configuration passed at construction. Opaque to the
/// core; only the adapter selected for its tag interprets the keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig(serde_json::Map<String, serde_json::Value>);

impl ProviderConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.0.insert(key.into(), value.into());
		self
	}

	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.0.get(key)
	}

	/// Deserializes into an adapter's typed configuration. Missing or
	/// malformed fields surface as [`Error::Configuration`].
	pub fn parse<T: DeserializeOwned>(&self) -> Result<T, Error> {
		serde_json::from_value(serde_json::Value::Object(self.0.clone()))
			.map_err(|err| Error::Configuration(format!("invalid provider config: {err}")))
	}
}

/// Per-call options for login/logout flows, forwarded opaquely to the
/// vendor SDK.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowOptions(serde_json::Map<String, serde_json::Value>);

impl FlowOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.0.insert(key.into(), value.into());
		self
	}

	pub(crate) fn into_value(self) -> serde_json::Value {
		serde_json::Value::Object(self.0)
	}
}
