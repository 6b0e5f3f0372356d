//! Values returned by the refresh paths.

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenItem},
	error::{ErrorKind, UserAction},
	oauth::ExchangeResponse,
	provider::{ProviderStrategy, RejectionKind},
};

/// Where a successful token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
	/// Freshly exchanged by this call.
	Exchange,
	/// Read from the repository after waiting on another caller's refresh.
	Repository,
}

/// Result of a refresh call that did not abort.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// A usable token set.
	Success {
		/// Token set.
		token: TokenItem,
		/// Origin of the token set.
		source: TokenSource,
	},
	/// The refresh did not produce a token.
	Failure(RefreshFailure),
}
impl RefreshOutcome {
	/// Maps a raw exchange response, classifying rejections with `strategy`.
	///
	/// A 2xx response without a token set is reported as an unclassified provider failure.
	pub fn from_exchange(response: ExchangeResponse, strategy: &dyn ProviderStrategy) -> Self {
		let success_status = (200..300).contains(&response.status);
		let kind = if success_status {
			RejectionKind::Unknown
		} else {
			strategy.classify_rejection(&response)
		};

		match response.token {
			Some(token) if success_status => Self::Success { token, source: TokenSource::Exchange },
			_ => Self::Failure(RefreshFailure::Provider {
				status: response.status,
				kind,
				error: response.error,
				description: response.error_description,
				retry_after: response.retry_after,
			}),
		}
	}

	/// Returns the token set on success.
	pub fn token(&self) -> Option<&TokenItem> {
		match self {
			Self::Success { token, .. } => Some(token),
			Self::Failure(_) => None,
		}
	}

	/// Returns the failure, if any.
	pub fn failure(&self) -> Option<&RefreshFailure> {
		match self {
			Self::Success { .. } => None,
			Self::Failure(failure) => Some(failure),
		}
	}

	/// Returns `true` on success.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}
}

/// Failures returned (not raised) by the refresh paths.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// Another caller holds the tenant's refresh lock.
	#[error("A refresh for tenant `{tenant}` is already in progress.")]
	Locked {
		/// Tenant whose lock is held.
		tenant: TenantId,
	},
	/// The provider rejected the exchange for a reason other than a stale refresh token.
	#[error("Token endpoint rejected the refresh with status {status} ({kind}).")]
	Provider {
		/// HTTP status.
		status: u16,
		/// Strategy classification.
		kind: RejectionKind,
		/// OAuth `error` code.
		error: Option<String>,
		/// OAuth `error_description`.
		description: Option<String>,
		/// `Retry-After` hint.
		retry_after: Option<Duration>,
	},
	/// The provider rejected the refresh token that is also the stored one.
	#[error("Token endpoint rejected the stored refresh token with status {status}.")]
	InvalidCredential {
		/// HTTP status of the rejection.
		status: u16,
		/// OAuth `error` code.
		error: Option<String>,
		/// OAuth `error_description`.
		description: Option<String>,
	},
}
impl RefreshFailure {
	/// HTTP status reported for lock contention.
	pub const LOCKED_STATUS: u16 = 422;

	/// HTTP status to surface to callers.
	pub fn status(&self) -> u16 {
		match self {
			Self::Locked { .. } => Self::LOCKED_STATUS,
			Self::Provider { status, .. } | Self::InvalidCredential { status, .. } => *status,
		}
	}

	/// Taxonomy entry.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Locked { .. } => ErrorKind::Locked,
			Self::Provider { .. } => ErrorKind::Provider,
			Self::InvalidCredential { .. } => ErrorKind::InvalidCredential,
		}
	}

	/// Suggested user-facing action.
	///
	/// Provider failures refine the kind's default with the rejection classification.
	pub fn user_action(&self) -> UserAction {
		match self {
			Self::Provider { kind: RejectionKind::InvalidGrant, .. } => UserAction::Reauthorize,
			Self::Provider {
				kind: RejectionKind::InvalidClient | RejectionKind::InsufficientScope,
				..
			} => UserAction::ContactOperator,
			_ => self.kind().user_action(),
		}
	}
}
