//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! [`ProviderDescriptor`] names the token endpoint (optionally templated per tenant) and the
//! client authentication style. `strategy` defines [`ProviderStrategy`], the hook that decides
//! which rejected exchanges are rotation races and how other rejections are classified.

pub mod endpoint;
pub mod strategy;

pub use endpoint::*;
pub use strategy::*;

// self
use crate::{_prelude::*, auth::ProviderId};

/// Supported client authentication methods at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Authorization server the coordinator refreshes against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Token endpoint, possibly templated by tenant.
	pub token_endpoint: TokenEndpoint,
	/// How client credentials are presented.
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a descriptor using HTTP Basic client authentication.
	pub fn new(id: ProviderId, token_endpoint: TokenEndpoint) -> Self {
		Self { id, token_endpoint, client_auth_method: ClientAuthMethod::default() }
	}

	/// Overrides the client authentication method.
	pub fn with_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn descriptor_deserializes_with_default_auth_method() {
		let descriptor: ProviderDescriptor = crate::config::from_json(
			r#"{"id":"cafe24","token_endpoint":"https://{tenant}.cafe24api.com/api/v2/oauth/token"}"#,
		)
		.expect("Descriptor should parse.");

		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretBasic);
		assert!(descriptor.token_endpoint.is_templated());

		let post = descriptor.with_client_auth_method(ClientAuthMethod::ClientSecretPost);

		assert_eq!(post.client_auth_method, ClientAuthMethod::ClientSecretPost);
	}

	#[test]
	fn descriptor_rejects_insecure_endpoint() {
		let err = crate::config::from_json::<ProviderDescriptor>(
			r#"{"id":"cafe24","token_endpoint":"http://auth.example.com/token"}"#,
		)
		.expect_err("Plain HTTP endpoint should be rejected.");

		assert_eq!(err.to_string(), "Configuration is invalid at `token_endpoint`.");
	}
}
