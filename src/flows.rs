//! Lock-guarded refresh orchestration.

pub mod common;
pub mod outcome;
pub mod refresh;

pub use common::*;
pub use outcome::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	config::{ClientAuth, CoordinatorConfig},
	lock::{LockCoordinator, LockStore},
	oauth::OAuthRefreshClient,
	provider::{DefaultProviderStrategy, ProviderStrategy},
	store::TokenRepository,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::BasicRefreshClient, provider::ProviderDescriptor};

/// Refreshes tenant tokens so that at most one refresh per tenant is in flight.
///
/// All collaborators are shared trait objects, so one orchestrator can be cloned into every
/// request handler. Exclusion across processes comes entirely from the [`LockStore`] the
/// [`LockCoordinator`] wraps.
#[derive(Clone)]
pub struct RefreshOrchestrator {
	/// Per-tenant lock.
	pub lock: LockCoordinator,
	/// Authoritative token records.
	pub repository: Arc<dyn TokenRepository>,
	/// Token endpoint client.
	pub exchange_client: Arc<dyn OAuthRefreshClient>,
	/// Rejection classification and rotation-race detection.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Client credentials presented on every exchange.
	pub client_auth: ClientAuth,
	/// Wait delay, retry bound, and lock settings.
	pub config: CoordinatorConfig,
	/// In-process counters.
	pub metrics: Arc<RefreshMetrics>,
}
impl RefreshOrchestrator {
	/// Wires the orchestrator with the default provider strategy.
	pub fn new(
		lock_store: Arc<dyn LockStore>,
		repository: Arc<dyn TokenRepository>,
		exchange_client: Arc<dyn OAuthRefreshClient>,
		client_auth: ClientAuth,
		config: CoordinatorConfig,
	) -> Self {
		Self {
			lock: LockCoordinator::new(lock_store, &config.lock),
			repository,
			exchange_client,
			strategy: Arc::new(DefaultProviderStrategy),
			client_auth,
			config,
			metrics: Default::default(),
		}
	}

	/// Replaces the provider strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}
}
#[cfg(feature = "reqwest")]
impl RefreshOrchestrator {
	/// Wires the orchestrator with a reqwest-backed [`BasicRefreshClient`] for `descriptor`.
	pub fn with_provider(
		lock_store: Arc<dyn LockStore>,
		repository: Arc<dyn TokenRepository>,
		descriptor: ProviderDescriptor,
		client_auth: ClientAuth,
		config: CoordinatorConfig,
	) -> Result<Self> {
		let exchange_client =
			BasicRefreshClient::<ReqwestHttpClient>::new(descriptor, ReqwestHttpClient::new()?);

		Ok(Self::new(lock_store, repository, Arc::new(exchange_client), client_auth, config))
	}
}
impl Debug for RefreshOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshOrchestrator")
			.field("lock", &self.lock)
			.field("client_id", &self.client_auth.client_id)
			.field("client_secret_set", &self.client_auth.client_secret.is_some())
			.field("config", &self.config)
			.finish()
	}
}
