//! Coordinator-level error types.
//!
//! Normal OAuth outcomes and lock contention are *returned* as
//! [`RefreshOutcome`](crate::flows::RefreshOutcome) values. [`Error`] carries everything that
//! aborts a call: collaborator failures, invalid input, and the two fault classes
//! ([`Error::DataIntegrity`], [`Error::RetryExhausted`]) that indicate state the caller cannot
//! safely interpret or retry around.

// self
use crate::{
	_prelude::*,
	auth::{TenantId, ValidationError},
};

/// Coordinator-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Lock store failure.
	#[error("{0}")]
	Lock(
		#[from]
		#[source]
		crate::lock::LockStoreError,
	),
	/// Token repository failure.
	#[error("{0}")]
	Repository(
		#[from]
		#[source]
		crate::store::RepositoryError,
	),
	/// Caller input failed validation.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The authoritative token record is missing or incomplete.
	#[error("Token record for tenant `{tenant}` is unusable: {reason}.")]
	DataIntegrity {
		/// Tenant whose record is unusable.
		tenant: TenantId,
		/// What was missing.
		reason: String,
	},
	/// Stale-token reconciliation ran past its retry bound.
	#[error("Refresh for tenant `{tenant}` stopped after {current} retries (limit {limit}).")]
	RetryExhausted {
		/// Tenant being refreshed.
		tenant: TenantId,
		/// Retry counter at the time of the abort.
		current: u32,
		/// Configured retry limit.
		limit: u32,
	},
}
impl Error {
	/// Taxonomy entry for the fault classes; `None` for collaborator and input failures.
	pub fn kind(&self) -> Option<ErrorKind> {
		match self {
			Self::DataIntegrity { .. } => Some(ErrorKind::DataIntegrity),
			Self::RetryExhausted { .. } => Some(ErrorKind::RetryExhausted),
			_ => None,
		}
	}

	/// Returns `true` for errors that should alert an operator.
	pub fn is_fault(&self) -> bool {
		self.kind().is_some()
	}
}

/// Closed taxonomy covering both returned failures and raised faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Another caller owns the refresh lock.
	Locked,
	/// The provider rejected the exchange for a reason other than a rotation race.
	Provider,
	/// invalid_grant confirmed against the authoritative stored token.
	InvalidCredential,
	/// Authoritative token record missing or incomplete during reconciliation.
	DataIntegrity,
	/// Reconciliation retry bound exceeded.
	RetryExhausted,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Locked => "locked",
			Self::Provider => "provider",
			Self::InvalidCredential => "invalid_credential",
			Self::DataIntegrity => "data_integrity",
			Self::RetryExhausted => "retry_exhausted",
		}
	}

	/// Default user-facing action for the kind.
	pub const fn user_action(self) -> UserAction {
		match self {
			Self::Locked => UserAction::RetryShortly,
			Self::Provider => UserAction::RetryLater,
			Self::InvalidCredential => UserAction::Reauthorize,
			Self::DataIntegrity | Self::RetryExhausted => UserAction::ContactOperator,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a failure should be presented to an end user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
	/// Another refresh is in flight; try again in a moment.
	RetryShortly,
	/// Upstream refused for now; retry with backoff.
	RetryLater,
	/// The stored grant is dead; the tenant must authorize the app again.
	Reauthorize,
	/// Generic operational failure; an operator must look at it.
	ContactOperator,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Configuration document could not be deserialized.
	#[error("Configuration is invalid at `{path}`.", path = .source.path())]
	Parse {
		/// Field-precise parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint template does not resolve to a valid URL.
	#[error("Token endpoint `{endpoint}` is not a valid URL.")]
	InvalidEndpoint {
		/// Endpoint (template or resolved) that failed to parse.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint uses plain HTTP against a non-loopback host.
	#[error("Token endpoint `{endpoint}` must use HTTPS.")]
	InsecureEndpoint {
		/// Offending endpoint.
		endpoint: String,
	},
	/// Token endpoint response carried neither `expires_in` nor `expires_at`.
	#[error("Token endpoint response is missing the access token expiry.")]
	MissingExpiry,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned a timestamp in an unsupported format.
	#[error("Token endpoint field `{field}` is not a supported timestamp: `{value}`.")]
	InvalidTimestamp {
		/// Response field name.
		field: &'static str,
		/// Raw value returned by the provider.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
