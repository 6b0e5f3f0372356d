//! [`OAuthRefreshClient`] built on the `oauth2` crate.

// crates.io
use oauth2::{
	AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, RefreshToken, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
use time::{PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description};
// self
use crate::{
	_prelude::*,
	auth::{ExpiringToken, TenantId, TokenItem},
	config::ClientAuth,
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{ExchangeFuture, ExchangeRequest, ExchangeResponse, OAuthRefreshClient},
	provider::{ClientAuthMethod, ProviderDescriptor},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Token response carrying the rotation fields some providers add next to the standard ones.
pub type RotationTokenResponse = StandardTokenResponse<RotationTokenFields, BasicTokenType>;

/// [`BasicRefreshClient`] over reqwest.
#[cfg(feature = "reqwest")]
pub type ReqwestRefreshClient = BasicRefreshClient<ReqwestHttpClient>;

type RefreshOAuthClient = Client<
	BasicErrorResponse,
	RotationTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Non-standard token response fields.
///
/// `expires_at` and `refresh_token_expires_at` are absolute timestamps (RFC 3339, or an
/// offset-less `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationTokenFields {
	/// Absolute access token expiry, used when `expires_in` is absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<String>,
	/// Relative refresh token lifetime in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token_expires_in: Option<u64>,
	/// Absolute refresh token expiry.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token_expires_at: Option<String>,
	/// Issue instant stamped by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issued_at: Option<String>,
	/// Provider-side user identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	/// Granted scopes as a JSON array.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scopes: Option<Vec<String>>,
}
impl ExtraTokenFields for RotationTokenFields {}

/// Refresh client that resolves the descriptor's token endpoint per tenant.
pub struct BasicRefreshClient<C>
where
	C: TokenHttpClient,
{
	descriptor: ProviderDescriptor,
	http_client: Arc<C>,
}
impl<C> BasicRefreshClient<C>
where
	C: TokenHttpClient,
{
	/// Creates a client for `descriptor` over `http_client`.
	pub fn new(descriptor: ProviderDescriptor, http_client: impl Into<Arc<C>>) -> Self {
		Self { descriptor, http_client: http_client.into() }
	}

	/// Returns the provider descriptor.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	fn oauth_client(&self, tenant: &TenantId, auth: &ClientAuth) -> Result<RefreshOAuthClient> {
		let token_url = TokenUrl::from_url(self.descriptor.token_endpoint.resolve(tenant)?);
		let mut client: RefreshOAuthClient =
			Client::new(ClientId::new(auth.client_id.clone())).set_token_uri(token_url);

		if let Some(secret) = &auth.client_secret {
			client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}
		if matches!(self.descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			client = client.set_auth_type(AuthType::RequestBody);
		}

		Ok(client)
	}
}
impl<C> OAuthRefreshClient for BasicRefreshClient<C>
where
	C: TokenHttpClient,
{
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		let slot = ResponseMetadataSlot::default();

		Box::pin(async move {
			let oauth_client = self.oauth_client(request.tenant, request.client_auth)?;
			let handle = self.http_client.with_metadata(slot.clone());
			let refresh_token = RefreshToken::new(request.refresh_token.expose().to_owned());
			let result =
				oauth_client.exchange_refresh_token(&refresh_token).request_async(&handle).await;
			let meta = slot.take().unwrap_or_default();

			match result {
				Ok(response) => {
					let item = map_token_response(&response, OffsetDateTime::now_utc())?;

					Ok(ExchangeResponse::success(meta.status.unwrap_or(200), item))
				},
				Err(e) => map_request_error(meta, e),
			}
		})
	}
}
impl<C> Debug for BasicRefreshClient<C>
where
	C: TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BasicRefreshClient").field("descriptor", &self.descriptor).finish()
	}
}

/// Converts a successful token response into a [`TokenItem`].
pub fn map_token_response(
	response: &RotationTokenResponse,
	now: OffsetDateTime,
) -> Result<TokenItem, ConfigError> {
	let extra = response.extra_fields();
	let expires_at = match response.expires_in() {
		Some(expires_in) => expiry_after(now, expires_in.as_secs())?,
		None => extra
			.expires_at
			.as_deref()
			.map(|value| parse_timestamp("expires_at", value))
			.transpose()?
			.ok_or(ConfigError::MissingExpiry)?,
	};
	let issued_at = extra
		.issued_at
		.as_deref()
		.and_then(|value| parse_timestamp("issued_at", value).ok())
		.unwrap_or(now);
	let mut item = TokenItem::new(
		ExpiringToken::new(response.access_token().secret().to_owned(), Some(expires_at)),
		issued_at,
	);

	if let Some(refresh) = response.refresh_token() {
		let refresh_expires_at = match (extra.refresh_token_expires_in, &extra.refresh_token_expires_at)
		{
			(Some(secs), _) => Some(expiry_after(now, secs)?),
			(None, Some(value)) => Some(parse_timestamp("refresh_token_expires_at", value)?),
			(None, None) => None,
		};

		item = item
			.with_refresh_token(ExpiringToken::new(refresh.secret().to_owned(), refresh_expires_at));
	}
	if let Some(scopes) = response.scopes() {
		item = item.with_scopes(scopes.iter().map(|scope| scope.as_str()));
	} else if let Some(scopes) = &extra.scopes {
		item = item.with_scopes(scopes.iter().map(String::as_str));
	}
	if let Some(user_id) = &extra.user_id {
		item = item.with_user_id(user_id.as_str());
	}

	Ok(item)
}

// `OffsetDateTime` tops out at year 9999; larger relative expiries are out of range.
fn expiry_after(now: OffsetDateTime, secs: u64) -> Result<OffsetDateTime, ConfigError> {
	now.checked_add(positive_seconds(secs)?).ok_or(ConfigError::ExpiresInOutOfRange)
}

fn positive_seconds(secs: u64) -> Result<Duration, ConfigError> {
	let secs = i64::try_from(secs).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if secs <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn);
	}

	Ok(Duration::seconds(secs))
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<OffsetDateTime, ConfigError> {
	if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
		return Ok(instant);
	}

	let local = format_description!(
		"[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
	);

	PrimitiveDateTime::parse(value, local)
		.map(PrimitiveDateTime::assume_utc)
		.map_err(|_| ConfigError::InvalidTimestamp { field, value: value.to_owned() })
}

fn map_request_error<E>(
	meta: ResponseMetadata,
	e: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
) -> Result<ExchangeResponse>
where
	E: 'static + Send + Sync + StdError,
{
	let rejected_status = meta.status.filter(|status| !(200..300).contains(status));

	match e {
		RequestTokenError::ServerResponse(response) => Ok(ExchangeResponse::rejected(
			meta.status.unwrap_or(400),
			Some(AsRef::<str>::as_ref(response.error())),
			response.error_description().cloned(),
		)
		.with_retry_after(meta.retry_after)),
		// Non-JSON error bodies still carry a status worth classifying.
		RequestTokenError::Parse(source, body) => match rejected_status {
			Some(status) =>
				Ok(ExchangeResponse::rejected(status, None::<String>, Some(body_preview(&body)))
					.with_retry_after(meta.retry_after)),
			None => Err(TransientError::TokenResponseParse { source, status: meta.status }.into()),
		},
		RequestTokenError::Other(message) => match rejected_status {
			Some(status) => Ok(ExchangeResponse::rejected(status, None::<String>, Some(message))
				.with_retry_after(meta.retry_after)),
			None => Err(TransientError::TokenEndpoint { message, status: meta.status }.into()),
		},
		RequestTokenError::Request(e) => Err(map_transport_error(e)),
	}
}

fn map_transport_error<E>(e: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match e {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			TransientError::TokenEndpoint { message, status: None }.into(),
		_ => TransientError::TokenEndpoint {
			message: "HTTP client failed while calling the token endpoint".into(),
			status: None,
		}
		.into(),
	}
}

fn body_preview(body: &[u8]) -> String {
	String::from_utf8_lossy(body).chars().take(BODY_PREVIEW_LIMIT).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn response(json: &str) -> RotationTokenResponse {
		serde_json::from_str(json).expect("Token response fixture should deserialize.")
	}

	#[test]
	fn expires_in_takes_precedence() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let item = map_token_response(
			&response(
				r#"{"access_token":"at-1","token_type":"bearer","expires_in":7200,
				"expires_at":"2030-01-01T00:00:00Z","refresh_token":"rt-1",
				"refresh_token_expires_in":1209600,"scope":"mall.read_product mall.read_order"}"#,
			),
			now,
		)
		.expect("Response should map.");

		assert_eq!(item.access_token.expires_at, Some(now + Duration::hours(2)));
		assert_eq!(
			item.refresh_token.as_ref().and_then(|token| token.expires_at),
			Some(now + Duration::days(14))
		);
		assert_eq!(item.scopes, vec!["mall.read_product", "mall.read_order"]);
		assert_eq!(item.issued_at, now);
	}

	#[test]
	fn absolute_expiry_fields_are_supported() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let item = map_token_response(
			&response(
				r#"{"access_token":"at-1","token_type":"bearer",
				"expires_at":"2025-01-01T02:00:00.000","refresh_token":"rt-1",
				"refresh_token_expires_at":"2025-01-15T00:00:00+09:00",
				"issued_at":"2024-12-31T23:59:59.000","user_id":"admin",
				"scopes":["mall.read_store"]}"#,
			),
			now,
		)
		.expect("Response should map.");

		assert_eq!(item.access_token.expires_at, Some(macros::datetime!(2025-01-01 02:00 UTC)));
		assert_eq!(
			item.refresh_token.as_ref().and_then(|token| token.expires_at),
			Some(macros::datetime!(2025-01-14 15:00 UTC))
		);
		assert_eq!(item.issued_at, macros::datetime!(2024-12-31 23:59:59 UTC));
		assert_eq!(item.user_id.as_deref(), Some("admin"));
		assert_eq!(item.scopes, vec!["mall.read_store"]);
	}

	#[test]
	fn missing_or_invalid_expiry_is_rejected() {
		let now = OffsetDateTime::now_utc();

		assert!(matches!(
			map_token_response(&response(r#"{"access_token":"a","token_type":"bearer"}"#), now),
			Err(ConfigError::MissingExpiry)
		));
		assert!(matches!(
			map_token_response(
				&response(r#"{"access_token":"a","token_type":"bearer","expires_in":0}"#),
				now
			),
			Err(ConfigError::NonPositiveExpiresIn)
		));
		assert!(matches!(
			map_token_response(
				&response(r#"{"access_token":"a","token_type":"bearer","expires_at":"tomorrow"}"#),
				now
			),
			Err(ConfigError::InvalidTimestamp { field: "expires_at", .. })
		));
	}

	#[test]
	fn relative_expiries_past_the_calendar_are_out_of_range() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(matches!(
			map_token_response(
				&response(r#"{"access_token":"a","token_type":"bearer","expires_in":1000000000000}"#),
				now
			),
			Err(ConfigError::ExpiresInOutOfRange)
		));
		assert!(matches!(
			map_token_response(
				&response(
					r#"{"access_token":"a","token_type":"bearer","expires_in":60,
					"refresh_token":"r","refresh_token_expires_in":1000000000000}"#,
				),
				now
			),
			Err(ConfigError::ExpiresInOutOfRange)
		));
		assert!(matches!(
			map_token_response(
				&response(&format!(
					r#"{{"access_token":"a","token_type":"bearer","expires_in":{}}}"#,
					u64::MAX
				)),
				now
			),
			Err(ConfigError::ExpiresInOutOfRange)
		));
	}

	#[test]
	fn rejected_responses_keep_status_and_error_fields() {
		let server_error: BasicErrorResponse = serde_json::from_str(
			r#"{"error":"invalid_grant","error_description":"Validation failed on refresh_token"}"#,
		)
		.expect("Error fixture should deserialize.");
		let meta = ResponseMetadata { status: Some(400), retry_after: None };
		let response = map_request_error::<std::io::Error>(
			meta,
			RequestTokenError::ServerResponse(server_error),
		)
		.expect("Server responses should map to data.");

		assert_eq!(response.status, 400);
		assert!(response.has_error_code("invalid_grant"));
		assert_eq!(
			response.error_description.as_deref(),
			Some("Validation failed on refresh_token")
		);

		let meta = ResponseMetadata { status: Some(503), retry_after: Some(Duration::seconds(5)) };
		let response = map_request_error::<std::io::Error>(
			meta,
			RequestTokenError::Other("server returned empty error response".into()),
		)
		.expect("Empty error bodies with a status should map to data.");

		assert_eq!(response.status, 503);
		assert_eq!(response.retry_after, Some(Duration::seconds(5)));
		assert!(
			map_request_error::<std::io::Error>(
				ResponseMetadata::default(),
				RequestTokenError::Other("unexpected content type".into()),
			)
			.is_err()
		);
	}
}
