//! Per-tenant refresh lock backed by a shared key-value store.
//!
//! [`LockCoordinator`] is the only component that touches lock keys. It reads status with a plain
//! `GET` and acquires with a single atomic set-if-absent (`SET key value NX` on Redis), so two
//! callers racing on [`LockCoordinator::try_acquire`] can never both win. Keys are never released
//! by the refresh protocol; they expire through the store's TTL or are cleared by whoever
//! persists the refresh result.

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::MemoryLockStore;
#[cfg(feature = "redis")] pub use redis::RedisLockStore;

// self
use crate::{
	_prelude::*,
	auth::{LockNamespace, TenantId},
	config::LockConfig,
};

/// Boxed future returned by [`LockStore`] operations.
pub type LockFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LockStoreError>> + 'a + Send>>;

/// Key-value contract the lock is built on.
pub trait LockStore
where
	Self: Send + Sync,
{
	/// Reads the value stored at `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> LockFuture<'a, Option<String>>;

	/// Atomically stores `value` at `key` only if the key is absent.
	///
	/// Returns `true` iff this call created the key. `ttl` bounds how long the key lives.
	fn set_if_absent<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> LockFuture<'a, bool>;

	/// Removes `key`, returning `true` if it existed.
	fn delete<'a>(&'a self, key: &'a str) -> LockFuture<'a, bool>;
}

/// Error type produced by [`LockStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum LockStoreError {
	/// Backend-level failure (connection, protocol, command).
	#[error("Lock store failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Refresh status observed under a tenant's lock key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LockStatus {
	/// No lock key exists.
	Absent,
	/// A refresh is in flight.
	Refreshing,
	/// The key holds a value written by something other than this coordinator.
	Other(String),
}
impl LockStatus {
	/// Value written under the key while a refresh is in flight.
	pub const REFRESHING_VALUE: &'static str = "REFRESHING";

	/// Interprets a raw store value.
	pub fn from_value(value: Option<String>) -> Self {
		match value {
			None => Self::Absent,
			Some(raw) if raw == Self::REFRESHING_VALUE => Self::Refreshing,
			Some(raw) => Self::Other(raw),
		}
	}

	/// Returns `true` when a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(self, Self::Refreshing)
	}
}

/// Namespaced lock key for one tenant (`<namespace>:<tenant>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey(String);
impl LockKey {
	/// Derives the key; identical inputs produce identical keys in every process.
	pub fn new(namespace: &LockNamespace, tenant: &TenantId) -> Self {
		Self(format!("{namespace}:{tenant}"))
	}

	/// Returns the raw key.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for LockKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Per-tenant status reads and atomic acquisition over a shared [`LockStore`].
#[derive(Clone)]
pub struct LockCoordinator {
	store: Arc<dyn LockStore>,
	namespace: LockNamespace,
	ttl: Option<Duration>,
}
impl LockCoordinator {
	/// Creates a coordinator using the namespace and TTL from `config`.
	pub fn new(store: Arc<dyn LockStore>, config: &LockConfig) -> Self {
		Self { store, namespace: config.namespace.clone(), ttl: config.ttl() }
	}

	/// Derives the lock key for `tenant`.
	pub fn key_for(&self, tenant: &TenantId) -> LockKey {
		LockKey::new(&self.namespace, tenant)
	}

	/// Reads the tenant's refresh status without side effects.
	pub async fn status(&self, tenant: &TenantId) -> Result<LockStatus> {
		let key = self.key_for(tenant);
		let value = self.store.get(key.as_str()).await?;

		Ok(LockStatus::from_value(value))
	}

	/// Installs the `REFRESHING` marker if no key exists; `true` iff this call won.
	pub async fn try_acquire(&self, tenant: &TenantId) -> Result<bool> {
		let key = self.key_for(tenant);
		let acquired = self
			.store
			.set_if_absent(key.as_str(), LockStatus::REFRESHING_VALUE, self.ttl)
			.await?;

		Ok(acquired)
	}

	/// Removes the tenant's lock key.
	///
	/// The refresh protocol never calls this. It exists for the hook that persists refresh
	/// results and for operators clearing a stuck tenant.
	pub async fn clear(&self, tenant: &TenantId) -> Result<bool> {
		let key = self.key_for(tenant);

		Ok(self.store.delete(key.as_str()).await?)
	}
}
impl Debug for LockCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LockCoordinator")
			.field("namespace", &self.namespace)
			.field("ttl", &self.ttl)
			.finish()
	}
}
