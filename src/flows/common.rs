//! Request and retry-state types shared by the refresh paths.

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenSecret, ValidationError},
};

/// Caller input for [`RefreshOrchestrator::get_access_token`](crate::flows::RefreshOrchestrator::get_access_token).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshRequest {
	/// Tenant to refresh.
	pub tenant: TenantId,
	/// Refresh token the caller believes is current.
	pub refresh_token: TokenSecret,
	/// Why the caller asked; only used in logs.
	pub reason: String,
}
impl RefreshRequest {
	/// Creates a request, rejecting blank refresh tokens.
	pub fn new(
		tenant: TenantId,
		refresh_token: impl Into<String>,
		reason: impl Into<String>,
	) -> Result<Self, ValidationError> {
		let refresh_token = TokenSecret::non_empty("Refresh token", refresh_token)?;

		Ok(Self { tenant, refresh_token, reason: reason.into() })
	}
}

/// Reconciliation counter for one refresh attempt.
///
/// `current` only grows; the attempt aborts once it passes `limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryState {
	/// Maximum number of reconciliations.
	pub limit: u32,
	/// Reconciliations performed so far.
	pub current: u32,
}
impl RetryState {
	/// Fresh state for a new attempt.
	pub const fn new(limit: u32) -> Self {
		Self { limit, current: 0 }
	}

	/// Returns `true` once the bound has been passed, or once the counter saturates.
	pub const fn is_exhausted(&self) -> bool {
		self.current > self.limit || self.current == u32::MAX
	}

	/// State for the next reconciliation.
	pub const fn next(self) -> Self {
		Self { limit: self.limit, current: self.current.saturating_add(1) }
	}
}
