//! Coordinator configuration, loadable from JSON with field-precise errors.

// std
use std::num::NonZeroU64;
// crates.io
use serde::{
	Deserializer,
	de::{DeserializeOwned, Error as _},
};
// self
use crate::{
	_prelude::*,
	auth::{LockNamespace, TokenSecret},
	error::ConfigError,
};

/// Tunables for [`RefreshOrchestrator`](crate::flows::RefreshOrchestrator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
	/// How long the wait path sleeps before reading the repository, in milliseconds.
	pub wait_delay_ms: u64,
	/// Maximum number of stale-token reconciliations per refresh attempt, at most
	/// [`MAX_RETRY_LIMIT`](Self::MAX_RETRY_LIMIT).
	#[serde(deserialize_with = "deserialize_retry_limit")]
	pub retry_limit: u32,
	/// Lock key layout and expiry.
	pub lock: LockConfig,
}
impl CoordinatorConfig {
	/// Default wait-path delay.
	pub const DEFAULT_WAIT_DELAY_MS: u64 = 2_000;
	/// Default reconciliation bound.
	pub const DEFAULT_RETRY_LIMIT: u32 = 1;
	/// Upper bound on [`retry_limit`](Self::retry_limit).
	pub const MAX_RETRY_LIMIT: u32 = 8;

	/// Parses a JSON document, reporting the offending field path on failure.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		from_json(json)
	}

	/// Wait-path delay as a std duration (what `tokio::time::sleep` takes).
	pub fn wait_delay(&self) -> StdDuration {
		StdDuration::from_millis(self.wait_delay_ms)
	}

	/// Overrides the wait-path delay.
	pub fn with_wait_delay(mut self, delay: StdDuration) -> Self {
		self.wait_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);

		self
	}

	/// Reconciliation bound actually enforced, clamped to [`MAX_RETRY_LIMIT`](Self::MAX_RETRY_LIMIT).
	pub fn bounded_retry_limit(&self) -> u32 {
		self.retry_limit.min(Self::MAX_RETRY_LIMIT)
	}

	/// Overrides the reconciliation bound, clamped to [`MAX_RETRY_LIMIT`](Self::MAX_RETRY_LIMIT).
	pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
		self.retry_limit = retry_limit.min(Self::MAX_RETRY_LIMIT);

		self
	}

	/// Overrides the lock settings.
	pub fn with_lock(mut self, lock: LockConfig) -> Self {
		self.lock = lock;

		self
	}
}
impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self {
			wait_delay_ms: Self::DEFAULT_WAIT_DELAY_MS,
			retry_limit: Self::DEFAULT_RETRY_LIMIT,
			lock: LockConfig::default(),
		}
	}
}

/// Lock key namespace and expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
	/// Prefix for every lock key (`<namespace>:<tenant>`).
	pub namespace: LockNamespace,
	/// Lock lifetime in seconds, between 1 and [`MAX_TTL_SECS`](Self::MAX_TTL_SECS); `None` keeps
	/// the key until something clears it.
	#[serde(deserialize_with = "deserialize_ttl_secs")]
	pub ttl_secs: Option<NonZeroU64>,
}
impl LockConfig {
	/// Default lock lifetime.
	pub const DEFAULT_TTL_SECS: u64 = 60;
	/// Longest accepted lock lifetime (30 days).
	pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

	/// Lock lifetime as a [`Duration`], clamped to [`MAX_TTL_SECS`](Self::MAX_TTL_SECS).
	pub fn ttl(&self) -> Option<Duration> {
		self.ttl_secs.map(|secs| {
			Duration::seconds(i64::try_from(secs.get().min(Self::MAX_TTL_SECS)).unwrap_or(i64::MAX))
		})
	}

	/// Overrides the lock lifetime in seconds; zero disables expiry.
	pub fn with_ttl_secs(mut self, secs: u64) -> Self {
		self.ttl_secs = NonZeroU64::new(secs.min(Self::MAX_TTL_SECS));

		self
	}
}
impl Default for LockConfig {
	fn default() -> Self {
		Self {
			namespace: LockNamespace::default(),
			ttl_secs: NonZeroU64::new(Self::DEFAULT_TTL_SECS),
		}
	}
}

/// OAuth client credentials presented on every exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAuth {
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret; public clients omit it.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
}
impl ClientAuth {
	/// Creates credentials for a confidential client.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: Some(TokenSecret::new(client_secret)) }
	}

	/// Creates credentials for a public client.
	pub fn public(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: None }
	}
}

fn deserialize_retry_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
	D: Deserializer<'de>,
{
	let retry_limit = u32::deserialize(deserializer)?;

	if retry_limit > CoordinatorConfig::MAX_RETRY_LIMIT {
		return Err(D::Error::custom(format!(
			"retry_limit must be at most {}",
			CoordinatorConfig::MAX_RETRY_LIMIT
		)));
	}

	Ok(retry_limit)
}

fn deserialize_ttl_secs<'de, D>(deserializer: D) -> Result<Option<NonZeroU64>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<u64>::deserialize(deserializer)? {
		None => Ok(None),
		Some(0) => Err(D::Error::custom("ttl_secs must be positive; use null to disable expiry")),
		Some(secs) if secs > LockConfig::MAX_TTL_SECS => Err(D::Error::custom(format!(
			"ttl_secs must be at most {}",
			LockConfig::MAX_TTL_SECS
		))),
		secs => Ok(secs.and_then(NonZeroU64::new)),
	}
}

/// Deserializes any config type from JSON through `serde_path_to_error`.
pub fn from_json<T>(json: &str) -> Result<T, ConfigError>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_str(json);

	serde_path_to_error::deserialize(&mut de).map_err(|source| ConfigError::Parse { source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = CoordinatorConfig::default();

		assert_eq!(config.wait_delay(), StdDuration::from_secs(2));
		assert_eq!(config.retry_limit, 1);
		assert_eq!(config.lock.namespace.as_ref(), "lock");
		assert_eq!(config.lock.ttl(), Some(Duration::seconds(60)));
	}

	#[test]
	fn partial_documents_fill_in_defaults() {
		let config = CoordinatorConfig::from_json_str(
			r#"{"wait_delay_ms":250,"lock":{"namespace":"cafe24","ttl_secs":null}}"#,
		)
		.expect("Partial config should parse.");

		assert_eq!(config.wait_delay(), StdDuration::from_millis(250));
		assert_eq!(config.retry_limit, 1);
		assert_eq!(config.lock.namespace.as_ref(), "cafe24");
		assert_eq!(config.lock.ttl(), None);
	}

	#[test]
	fn nested_errors_report_their_path() {
		let err = CoordinatorConfig::from_json_str(r#"{"lock":{"namespace":"has space"}}"#)
			.expect_err("Whitespace namespace should be rejected.");

		assert_eq!(err.to_string(), "Configuration is invalid at `lock.namespace`.");
	}

	#[test]
	fn client_auth_redacts_secret() {
		let auth: ClientAuth = from_json(r#"{"client_id":"mall","client_secret":"s3cret"}"#)
			.expect("Client auth should parse.");

		assert_eq!(auth, ClientAuth::new("mall", "s3cret"));
		assert!(!format!("{auth:?}").contains("s3cret"));
		assert_eq!(from_json::<ClientAuth>(r#"{"client_id":"mall"}"#).ok(), Some(ClientAuth::public("mall")));
	}

	#[test]
	fn builders_override_fields() {
		let config = CoordinatorConfig::default()
			.with_wait_delay(StdDuration::from_millis(5))
			.with_retry_limit(3)
			.with_lock(LockConfig::default().with_ttl_secs(5));

		assert_eq!(config.wait_delay_ms, 5);
		assert_eq!(config.retry_limit, 3);
		assert_eq!(config.lock.ttl(), Some(Duration::seconds(5)));
		assert_eq!(LockConfig::default().with_ttl_secs(0).ttl(), None);
	}

	#[test]
	fn zero_lock_ttl_is_rejected() {
		let err = CoordinatorConfig::from_json_str(r#"{"lock":{"ttl_secs":0}}"#)
			.expect_err("Zero lock TTL should be rejected.");

		assert_eq!(err.to_string(), "Configuration is invalid at `lock.ttl_secs`.");
	}

	#[test]
	fn oversized_lock_ttl_is_rejected_or_clamped() {
		let err = CoordinatorConfig::from_json_str(&format!(
			r#"{{"lock":{{"ttl_secs":{}}}}}"#,
			u64::MAX
		))
		.expect_err("Oversized lock TTL should be rejected.");

		assert_eq!(err.to_string(), "Configuration is invalid at `lock.ttl_secs`.");

		let config = LockConfig { ttl_secs: NonZeroU64::new(u64::MAX), ..Default::default() };
		let max = i64::try_from(LockConfig::MAX_TTL_SECS).expect("Max TTL should fit in i64.");

		assert_eq!(config.ttl(), Some(Duration::seconds(max)));
		assert_eq!(
			LockConfig::default().with_ttl_secs(u64::MAX).ttl(),
			Some(Duration::seconds(max))
		);
	}

	#[test]
	fn retry_limit_is_bounded() {
		let err = CoordinatorConfig::from_json_str(r#"{"retry_limit":4294967295}"#)
			.expect_err("Unbounded retry limit should be rejected.");

		assert_eq!(err.to_string(), "Configuration is invalid at `retry_limit`.");
		assert_eq!(
			CoordinatorConfig::default().with_retry_limit(u32::MAX).retry_limit,
			CoordinatorConfig::MAX_RETRY_LIMIT
		);

		let config = CoordinatorConfig { retry_limit: u32::MAX, ..Default::default() };

		assert_eq!(config.bounded_retry_limit(), CoordinatorConfig::MAX_RETRY_LIMIT);
		assert_eq!(
			CoordinatorConfig::from_json_str(r#"{"retry_limit":8}"#)
				.expect("Retry limit at the bound should parse.")
				.retry_limit,
			8
		);
	}
}
