//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
//! feature.

pub use crate::_prelude::*;

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{
	auth::{ExpiringToken, TenantId, TokenItem, TokenRecord},
	config::{ClientAuth, CoordinatorConfig},
	error::TransientError,
	flows::RefreshOrchestrator,
	lock::{LockFuture, LockStore, MemoryLockStore},
	oauth::{ExchangeFuture, ExchangeRequest, ExchangeResponse, OAuthRefreshClient},
	store::MemoryTokenRepository,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Client id used by test orchestrators.
pub const TEST_CLIENT_ID: &str = "client-refresh";
/// Client secret used by test orchestrators.
pub const TEST_CLIENT_SECRET: &str = "secret-refresh";

/// [`OAuthRefreshClient`] that replays queued responses and records presented tokens.
#[derive(Debug, Default)]
pub struct ScriptedExchangeClient {
	responses: Mutex<VecDeque<ExchangeResponse>>,
	presented: Mutex<Vec<String>>,
	delay: Option<StdDuration>,
}
impl ScriptedExchangeClient {
	/// Creates a client replaying `responses` in order.
	pub fn new(responses: impl IntoIterator<Item = ExchangeResponse>) -> Self {
		Self { responses: Mutex::new(responses.into_iter().collect()), ..Default::default() }
	}

	/// Delays every exchange, keeping concurrent callers inside the refresh.
	pub fn with_delay(mut self, delay: StdDuration) -> Self {
		self.delay = Some(delay);

		self
	}

	/// Refresh tokens presented so far, in call order.
	pub fn presented(&self) -> Vec<String> {
		self.presented.lock().clone()
	}

	/// Number of exchanges performed.
	pub fn calls(&self) -> usize {
		self.presented.lock().len()
	}
}
impl OAuthRefreshClient for ScriptedExchangeClient {
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		Box::pin(async move {
			self.presented.lock().push(request.refresh_token.expose().to_owned());

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			let next = self.responses.lock().pop_front();

			next.ok_or_else(|| {
				Error::from(TransientError::TokenEndpoint {
					message: "no scripted response left".into(),
					status: None,
				})
			})
		})
	}
}

/// [`MemoryLockStore`] wrapper counting acquire attempts and wins.
#[derive(Debug, Default)]
pub struct RecordingLockStore {
	inner: MemoryLockStore,
	acquire_attempts: AtomicUsize,
	acquisitions: AtomicUsize,
}
impl RecordingLockStore {
	/// Number of `set_if_absent` calls.
	pub fn acquire_attempts(&self) -> usize {
		self.acquire_attempts.load(Ordering::SeqCst)
	}

	/// Number of `set_if_absent` calls that installed the key.
	pub fn acquisitions(&self) -> usize {
		self.acquisitions.load(Ordering::SeqCst)
	}

	/// Writes `value` under `key` directly, bypassing the counters.
	pub async fn preset(&self, key: &str, value: &str) -> bool {
		self.inner
			.set_if_absent(key, value, None)
			.await
			.expect("Memory lock store should not fail.")
	}
}
impl LockStore for RecordingLockStore {
	fn get<'a>(&'a self, key: &'a str) -> LockFuture<'a, Option<String>> {
		self.inner.get(key)
	}

	fn set_if_absent<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> LockFuture<'a, bool> {
		Box::pin(async move {
			self.acquire_attempts.fetch_add(1, Ordering::SeqCst);

			let acquired = self.inner.set_if_absent(key, value, ttl).await?;

			if acquired {
				self.acquisitions.fetch_add(1, Ordering::SeqCst);
			}

			Ok(acquired)
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> LockFuture<'a, bool> {
		self.inner.delete(key)
	}
}

/// Orchestrator plus handles on its in-memory collaborators.
#[derive(Debug)]
pub struct TestHarness {
	/// Orchestrator under test.
	pub orchestrator: RefreshOrchestrator,
	/// Lock store shared with the orchestrator.
	pub lock_store: Arc<RecordingLockStore>,
	/// Repository shared with the orchestrator.
	pub repository: Arc<MemoryTokenRepository>,
}

/// Builds an orchestrator over in-memory collaborators and `exchange_client`.
pub fn build_test_orchestrator(
	exchange_client: Arc<dyn OAuthRefreshClient>,
	config: CoordinatorConfig,
) -> TestHarness {
	let lock_store = Arc::new(RecordingLockStore::default());
	let repository = Arc::new(MemoryTokenRepository::default());
	let orchestrator = RefreshOrchestrator::new(
		lock_store.clone(),
		repository.clone(),
		exchange_client,
		ClientAuth::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET),
		config,
	);

	TestHarness { orchestrator, lock_store, repository }
}

/// Config with a short wait delay so wait-path tests stay fast.
pub fn fast_config() -> CoordinatorConfig {
	CoordinatorConfig::default().with_wait_delay(StdDuration::from_millis(20))
}

/// Parses a tenant fixture.
pub fn tenant(id: &str) -> TenantId {
	TenantId::new(id).expect("Tenant fixture should be valid.")
}

/// `400 invalid_grant`, the rotation-race signature.
pub fn invalid_grant() -> ExchangeResponse {
	ExchangeResponse::rejected(400, Some("invalid_grant"), Some("Validation failed on refresh_token"))
}

/// Successful token set with a rotated refresh token.
pub fn token_item(access_token: &str, refresh_token: &str) -> TokenItem {
	let issued_at = OffsetDateTime::now_utc();

	TokenItem::new(ExpiringToken::new(access_token, Some(issued_at + Duration::hours(2))), issued_at)
		.with_refresh_token(ExpiringToken::new(refresh_token, Some(issued_at + Duration::days(14))))
}

/// `200` response carrying [`token_item`].
pub fn exchange_success(access_token: &str, refresh_token: &str) -> ExchangeResponse {
	ExchangeResponse::success(200, token_item(access_token, refresh_token))
}

/// Stored record holding both tokens.
pub fn record(tenant: &TenantId, access_token: &str, refresh_token: &str) -> TokenRecord {
	let now = OffsetDateTime::now_utc();

	TokenRecord::new(tenant.clone())
		.with_access_token(access_token, Some(now + Duration::hours(2)))
		.with_refresh_token(refresh_token, Some(now + Duration::days(14)))
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}
