//! Provider strategy hooks for interpreting rejected exchanges.
//!
//! Strategies work on [`ExchangeResponse`] (plain status + OAuth fields), so they never depend on
//! a particular HTTP client.

// self
use crate::{_prelude::*, oauth::ExchangeResponse};

/// Decides how the coordinator reads a provider's rejections.
///
/// Override [`is_rotation_candidate`](ProviderStrategy::is_rotation_candidate) for providers that
/// report a stale refresh token with a different status or error code.
pub trait ProviderStrategy: Send + Sync {
	/// Classifies a rejected exchange for reporting.
	fn classify_rejection(&self, response: &ExchangeResponse) -> RejectionKind;

	/// Returns `true` when the rejection may mean the presented refresh token was already
	/// rotated by another caller, so the stored token should be consulted.
	///
	/// Defaults to HTTP 400 with `error=invalid_grant`.
	fn is_rotation_candidate(&self, response: &ExchangeResponse) -> bool {
		response.status == 400 && response.has_error_code("invalid_grant")
	}
}

/// Canonical rejection categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
	/// The refresh token was rejected.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Scopes exceed what the grant covers.
	InsufficientScope,
	/// Temporary failure; retry later.
	Transient,
	/// Nothing in the response identified the cause.
	Unknown,
}
impl RejectionKind {
	/// Returns a stable label suitable for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidGrant => "invalid_grant",
			Self::InvalidClient => "invalid_client",
			Self::InsufficientScope => "insufficient_scope",
			Self::Transient => "transient",
			Self::Unknown => "unknown",
		}
	}
}
impl Display for RejectionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// RFC 6749 heuristics: the OAuth `error` code first, then the description, then the status.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_rejection(&self, response: &ExchangeResponse) -> RejectionKind {
		response
			.error
			.as_deref()
			.and_then(match_error_code)
			.or_else(|| response.error_description.as_deref().and_then(match_description))
			.unwrap_or_else(|| classify_status(response.status))
	}
}

fn match_error_code(code: &str) -> Option<RejectionKind> {
	let code = code.to_ascii_lowercase();

	match code.as_str() {
		"invalid_grant" | "access_denied" => Some(RejectionKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(RejectionKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(RejectionKind::InsufficientScope),
		"temporarily_unavailable" | "server_error" => Some(RejectionKind::Transient),
		_ => None,
	}
}

fn match_description(description: &str) -> Option<RejectionKind> {
	let lowered = description.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") => Some(RejectionKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(RejectionKind::InvalidClient),
		text if text.contains("insufficient_scope") || text.contains("invalid_scope") =>
			Some(RejectionKind::InsufficientScope),
		text if text.contains("temporarily_unavailable") => Some(RejectionKind::Transient),
		_ => None,
	}
}

fn classify_status(status: u16) -> RejectionKind {
	match status {
		401 => RejectionKind::InvalidClient,
		403 => RejectionKind::InsufficientScope,
		429 | 500..=599 => RejectionKind::Transient,
		_ => RejectionKind::Unknown,
	}
}
