//! Optional observability helpers for refresh coordination.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `oauth2_refresh_coordinator.refresh` with `tenant`,
//!   `stage`, and `path` fields, plus events for lock contention, reconciliation, and faults.
//!   Tokens only ever appear as fingerprints.
//! - Enable `metrics` to increment the `oauth2_refresh_coordinator_total` counter, labeled by
//!   `path` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

pub(crate) use tracing::flow_event;

// self
use crate::_prelude::*;

/// Branch taken by `get_access_token` after reading the lock status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshPath {
	/// Another caller is refreshing; read the repository after the wait delay.
	Wait,
	/// Try to take the lock and refresh.
	Acquire,
}
impl RefreshPath {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshPath::Wait => "wait",
			RefreshPath::Acquire => "acquire",
		}
	}
}
impl Display for RefreshPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to `get_access_token`.
	Attempt,
	/// A token was returned.
	Success,
	/// A [`RefreshFailure`](crate::flows::RefreshFailure) was returned.
	Failure,
	/// The call aborted with an error.
	Fault,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Fault => "fault",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
