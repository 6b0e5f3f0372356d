// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh calls.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	waits: AtomicU64,
	contended: AtomicU64,
	reconciliations: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	faults: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of `get_access_token` calls.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns how many calls took the wait path.
	pub fn waits(&self) -> u64 {
		self.waits.load(Ordering::Relaxed)
	}

	/// Returns how many calls lost the acquire race.
	pub fn contended(&self) -> u64 {
		self.contended.load(Ordering::Relaxed)
	}

	/// Returns how many stale refresh tokens were replaced by the stored one.
	pub fn reconciliations(&self) -> u64 {
		self.reconciliations.load(Ordering::Relaxed)
	}

	/// Returns the number of calls that returned a token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of calls that returned a failure outcome.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of calls that aborted with an error.
	pub fn faults(&self) -> u64 {
		self.faults.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_wait(&self) {
		self.waits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_contended(&self) {
		self.contended.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reconciliation(&self) {
		self.reconciliations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fault(&self) {
		self.faults.fetch_add(1, Ordering::Relaxed);
	}
}
