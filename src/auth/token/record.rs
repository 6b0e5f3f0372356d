//! Repository records and exchange results.

// self
use crate::{
	_prelude::*,
	auth::{TenantId, token::secret::TokenSecret},
};

/// A token value paired with its expiry instant, when the provider reports one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiringToken {
	/// Secret token value.
	pub value: TokenSecret,
	/// Expiry instant reported by the provider.
	pub expires_at: Option<OffsetDateTime>,
}
impl ExpiringToken {
	/// Creates a token with an optional expiry.
	pub fn new(value: impl Into<String>, expires_at: Option<OffsetDateTime>) -> Self {
		Self { value: TokenSecret::new(value), expires_at }
	}

	/// Returns `true` if the token has a known expiry at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}

/// Authoritative per-tenant token state owned by a [`TokenRepository`](crate::store::TokenRepository).
///
/// The orchestrator only reads records. Whoever completes a refresh persists the rotated pair
/// (see [`TokenRecord::apply_rotation`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Tenant the record belongs to.
	pub tenant: TenantId,
	/// Current access token, if one was ever issued.
	pub access_token: Option<ExpiringToken>,
	/// Current refresh token, if one was ever issued.
	pub refresh_token: Option<ExpiringToken>,
}
impl TokenRecord {
	/// Creates an empty record for the tenant.
	pub fn new(tenant: TenantId) -> Self {
		Self { tenant, access_token: None, refresh_token: None }
	}

	/// Sets the access token.
	pub fn with_access_token(
		mut self,
		value: impl Into<String>,
		expires_at: Option<OffsetDateTime>,
	) -> Self {
		self.access_token = Some(ExpiringToken::new(value, expires_at));

		self
	}

	/// Sets the refresh token.
	pub fn with_refresh_token(
		mut self,
		value: impl Into<String>,
		expires_at: Option<OffsetDateTime>,
	) -> Self {
		self.refresh_token = Some(ExpiringToken::new(value, expires_at));

		self
	}

	/// Returns the stored refresh token unless it is missing or blank.
	pub fn refresh_secret(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref().map(|token| &token.value).filter(|secret| !secret.is_blank())
	}

	/// Replaces the stored tokens with a freshly exchanged item.
	///
	/// Providers that do not rotate refresh tokens omit them from the response; the stored
	/// refresh token is kept in that case.
	pub fn apply_rotation(&mut self, item: &TokenItem) {
		self.access_token = Some(item.access_token.clone());

		if let Some(refresh) = &item.refresh_token {
			self.refresh_token = Some(refresh.clone());
		}
	}
}

/// Token set returned by a refresh exchange (or read back from a [`TokenRecord`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenItem {
	/// Access token usable against the provider API.
	pub access_token: ExpiringToken,
	/// Rotated refresh token, when the provider issued one.
	pub refresh_token: Option<ExpiringToken>,
	/// Scopes granted to the access token.
	pub scopes: Vec<String>,
	/// Instant the provider (or the broker, as a fallback) stamped on the token set.
	pub issued_at: OffsetDateTime,
	/// Provider-side user identifier, when reported.
	pub user_id: Option<String>,
}
impl TokenItem {
	/// Creates an item with only an access token.
	pub fn new(access_token: ExpiringToken, issued_at: OffsetDateTime) -> Self {
		Self { access_token, refresh_token: None, scopes: Vec::new(), issued_at, user_id: None }
	}

	/// Attaches the rotated refresh token.
	pub fn with_refresh_token(mut self, refresh_token: ExpiringToken) -> Self {
		self.refresh_token = Some(refresh_token);

		self
	}

	/// Attaches granted scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Attaches the provider user identifier.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Builds an item from a stored record; `None` if the record holds no usable access token.
	pub fn from_record(record: &TokenRecord, observed_at: OffsetDateTime) -> Option<Self> {
		let access_token =
			record.access_token.as_ref().filter(|token| !token.value.is_blank())?.clone();

		Some(Self {
			access_token,
			refresh_token: record.refresh_token.clone(),
			scopes: Vec::new(),
			issued_at: observed_at,
			user_id: None,
		})
	}
}
