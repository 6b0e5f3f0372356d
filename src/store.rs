//! Read contract for the authoritative per-tenant token repository.
//!
//! The refresh protocol only ever reads records. Persisting the rotated pair after a successful
//! exchange belongs to the caller (see [`MemoryTokenRepository::record_rotation`] for the
//! in-memory variant).

pub mod memory;

pub use memory::MemoryTokenRepository;

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenRecord},
};

/// Boxed future returned by [`TokenRepository`] operations.
pub type RepositoryFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + 'a + Send>>;

/// Source of truth for the tokens currently stored per tenant.
pub trait TokenRepository
where
	Self: Send + Sync,
{
	/// Fetches the tenant's record, if one exists.
	fn fetch<'a>(&'a self, tenant: &'a TenantId) -> RepositoryFuture<'a, Option<TokenRecord>>;
}

/// Error type produced by [`TokenRepository`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RepositoryError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Repository failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
