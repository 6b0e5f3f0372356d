//! Refresh-token exchange contract and its `oauth2`-backed implementation.
//!
//! The orchestrator sees the token endpoint only through [`OAuthRefreshClient`]. A rejected
//! exchange is *data* ([`ExchangeResponse`] with a status and OAuth error fields) because the
//! refresh protocol branches on it; only transport and parsing failures are `Err`.

pub mod basic;

pub use basic::*;

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenItem, TokenSecret},
	config::ClientAuth,
};

/// Boxed future returned by [`OAuthRefreshClient::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<ExchangeResponse>> + 'a + Send>>;

/// Performs the `refresh_token` grant against a provider.
pub trait OAuthRefreshClient
where
	Self: Send + Sync,
{
	/// Exchanges `request.refresh_token` for a new token set.
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a>;
}

/// Inputs of a single exchange.
#[derive(Clone, Copy, Debug)]
pub struct ExchangeRequest<'a> {
	/// Tenant whose tokens are rotated.
	pub tenant: &'a TenantId,
	/// Refresh token presented to the provider.
	pub refresh_token: &'a TokenSecret,
	/// Client credentials.
	pub client_auth: &'a ClientAuth,
}

/// Token endpoint reply, successful or rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeResponse {
	/// HTTP status code.
	pub status: u16,
	/// OAuth `error` code for rejected exchanges.
	pub error: Option<String>,
	/// OAuth `error_description` (or a body preview when the provider sent no JSON).
	pub error_description: Option<String>,
	/// `Retry-After` hint, when the provider sent one.
	pub retry_after: Option<Duration>,
	/// Issued token set for successful exchanges.
	pub token: Option<TokenItem>,
}
impl ExchangeResponse {
	/// Builds a successful response.
	pub fn success(status: u16, token: TokenItem) -> Self {
		Self { status, error: None, error_description: None, retry_after: None, token: Some(token) }
	}

	/// Builds a rejected response.
	pub fn rejected(
		status: u16,
		error: Option<impl Into<String>>,
		error_description: Option<impl Into<String>>,
	) -> Self {
		Self {
			status,
			error: error.map(Into::into),
			error_description: error_description.map(Into::into),
			retry_after: None,
			token: None,
		}
	}

	/// Attaches a `Retry-After` hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Returns `true` for a 2xx status carrying a token set.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status) && self.token.is_some()
	}

	/// Case-insensitive comparison against the OAuth `error` code.
	pub fn has_error_code(&self, code: &str) -> bool {
		self.error.as_deref().is_some_and(|error| error.eq_ignore_ascii_case(code))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ExpiringToken;

	#[test]
	fn success_requires_token_and_2xx() {
		let item = TokenItem::new(ExpiringToken::new("at-1", None), OffsetDateTime::now_utc());

		assert!(ExchangeResponse::success(200, item.clone()).is_success());
		assert!(!ExchangeResponse::success(302, item).is_success());
		assert!(!ExchangeResponse::rejected(200, None::<String>, None::<String>).is_success());
	}

	#[test]
	fn error_code_comparison_ignores_case() {
		let response = ExchangeResponse::rejected(400, Some("INVALID_GRANT"), Some("expired"));

		assert!(response.has_error_code("invalid_grant"));
		assert!(!response.has_error_code("invalid_client"));
		assert_eq!(response.error_description.as_deref(), Some("expired"));
	}
}
