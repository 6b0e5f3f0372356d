//! Thread-safe in-memory [`TokenRepository`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenItem, TokenRecord},
	store::{RepositoryError, RepositoryFuture, TokenRepository},
};

type RecordMap = Arc<RwLock<HashMap<TenantId, TokenRecord>>>;

/// Repository that keeps tenant records in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenRepository(RecordMap);
impl MemoryTokenRepository {
	/// Inserts or replaces the tenant's record.
	pub fn save(&self, record: TokenRecord) {
		self.0.write().insert(record.tenant.clone(), record);
	}

	/// Removes the tenant's record, returning it if present.
	pub fn remove(&self, tenant: &TenantId) -> Option<TokenRecord> {
		self.0.write().remove(tenant)
	}

	/// Applies a refresh result to the tenant's record.
	///
	/// Fails when the tenant has no record; rotations never create one.
	pub fn record_rotation(
		&self,
		tenant: &TenantId,
		item: &TokenItem,
	) -> Result<TokenRecord, RepositoryError> {
		let mut guard = self.0.write();
		let record = guard.get_mut(tenant).ok_or_else(|| RepositoryError::Backend {
			message: format!("no token record for tenant `{tenant}`"),
		})?;

		record.apply_rotation(item);

		Ok(record.clone())
	}

	fn fetch_now(map: RecordMap, tenant: &TenantId) -> Option<TokenRecord> {
		map.read().get(tenant).cloned()
	}
}
impl TokenRepository for MemoryTokenRepository {
	fn fetch<'a>(&'a self, tenant: &'a TenantId) -> RepositoryFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::fetch_now(map, tenant)) })
	}
}
