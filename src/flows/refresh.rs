//! The refresh protocol: wait on an in-flight refresh, or take the lock and refresh.
//!
//! [`RefreshOrchestrator::get_access_token`] reads the tenant's lock status once. When another
//! caller is refreshing, it sleeps for the configured delay and returns whatever access token the
//! repository holds by then. Otherwise it tries to install the lock; losing that race returns
//! [`RefreshFailure::Locked`] without touching the provider, and winning it runs
//! [`RefreshOrchestrator::refresh_with_retry`].
//!
//! Refresh tokens rotate on every exchange, so a caller holding an old copy gets `invalid_grant`
//! even though the tenant's grant is healthy. `refresh_with_retry` checks the rejected token
//! against the repository and, when they differ, repeats the exchange with the stored token, at
//! most `retry_limit` times. The lock is never released here; it expires through its TTL or is
//! cleared by whoever persists the new tokens.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenItem},
	flows::{RefreshFailure, RefreshOrchestrator, RefreshOutcome, RefreshRequest, RetryState, TokenSource},
	oauth::ExchangeRequest,
	obs::{self, FlowOutcome, FlowSpan, RefreshPath, flow_event},
};

/// Outcome of [`RefreshOrchestrator::refresh_with_retry`] plus the retry state it ended with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshReport {
	/// Outcome returned to the caller.
	pub outcome: RefreshOutcome,
	/// Retry state at the time the outcome was produced.
	pub retry: RetryState,
}

impl RefreshOrchestrator {
	/// Returns a usable access token for `request.tenant`, refreshing it if no one else is.
	///
	/// Contention and provider rejections are returned as [`RefreshOutcome::Failure`]. Only
	/// collaborator failures and the fault classes ([`Error::DataIntegrity`],
	/// [`Error::RetryExhausted`]) are raised.
	pub async fn get_access_token(&self, request: &RefreshRequest) -> Result<RefreshOutcome> {
		let span = FlowSpan::new("get_access_token", &request.tenant);

		self.metrics.record_attempt();

		span.instrument(async {
			let status = match self.lock.status(&request.tenant).await {
				Ok(status) => status,
				// No wait began, so the fault counts against the acquire path.
				Err(e) => return self.finish(RefreshPath::Acquire, Err(e)),
			};
			let path = if status.is_refreshing() { RefreshPath::Wait } else { RefreshPath::Acquire };

			span.record_path(path);
			obs::record_flow_outcome(path, FlowOutcome::Attempt);
			flow_event!(debug, reason = %request.reason, "Refresh requested.");

			let result = match path {
				RefreshPath::Wait => self.await_in_flight_refresh(&request.tenant).await,
				RefreshPath::Acquire => self.acquire_and_refresh(request).await,
			};

			self.finish(path, result)
		})
		.await
	}

	/// Runs the bounded stale-token reconciliation loop.
	///
	/// The caller must hold the tenant's lock. Each iteration exchanges the current refresh
	/// token; a rotation-race rejection is checked against the stored token and retried with it
	/// when the two differ. Raises [`Error::RetryExhausted`] once `retry.current` passes
	/// `retry.limit`, and [`Error::DataIntegrity`] when there is no stored token to compare with.
	pub async fn refresh_with_retry(
		&self,
		request: &RefreshRequest,
		retry: RetryState,
	) -> Result<RefreshReport> {
		let tenant = &request.tenant;
		let mut retry = retry;
		let mut refresh_token = request.refresh_token.clone();

		loop {
			if retry.is_exhausted() {
				flow_event!(
					error,
					current = retry.current,
					limit = retry.limit,
					"Refresh token reconciliation exceeded its retry bound."
				);

				return Err(Error::RetryExhausted {
					tenant: tenant.clone(),
					current: retry.current,
					limit: retry.limit,
				});
			}

			let response = self
				.exchange_client
				.exchange(ExchangeRequest {
					tenant,
					refresh_token: &refresh_token,
					client_auth: &self.client_auth,
				})
				.await?;

			if !self.strategy.is_rotation_candidate(&response) {
				let outcome = RefreshOutcome::from_exchange(response, self.strategy.as_ref());

				return Ok(RefreshReport { outcome, retry });
			}

			let record = self.repository.fetch(tenant).await?.ok_or_else(|| {
				Error::DataIntegrity { tenant: tenant.clone(), reason: "token record is missing".into() }
			})?;
			let stored = record.refresh_secret().cloned().ok_or_else(|| Error::DataIntegrity {
				tenant: tenant.clone(),
				reason: "stored refresh token is missing".into(),
			})?;

			if stored == refresh_token {
				flow_event!(
					info,
					fingerprint = %stored.fingerprint(),
					"Provider rejected the stored refresh token."
				);

				let outcome = RefreshOutcome::Failure(RefreshFailure::InvalidCredential {
					status: response.status,
					error: response.error,
					description: response.error_description,
				});

				return Ok(RefreshReport { outcome, retry });
			}

			self.metrics.record_reconciliation();
			flow_event!(
				info,
				presented = %refresh_token.fingerprint(),
				stored = %stored.fingerprint(),
				retry = retry.current + 1,
				"Presented refresh token is stale; retrying with the stored token."
			);

			refresh_token = stored;
			retry = retry.next();
		}
	}

	async fn await_in_flight_refresh(&self, tenant: &TenantId) -> Result<RefreshOutcome> {
		self.metrics.record_wait();
		flow_event!(
			debug,
			delay_ms = self.config.wait_delay_ms,
			"Refresh in flight; waiting before reading the repository."
		);

		tokio::time::sleep(self.config.wait_delay()).await;

		let record = self.repository.fetch(tenant).await?.ok_or_else(|| Error::DataIntegrity {
			tenant: tenant.clone(),
			reason: "token record is missing".into(),
		})?;
		let token = TokenItem::from_record(&record, OffsetDateTime::now_utc()).ok_or_else(|| {
			Error::DataIntegrity {
				tenant: tenant.clone(),
				reason: "stored access token is missing".into(),
			}
		})?;

		Ok(RefreshOutcome::Success { token, source: TokenSource::Repository })
	}

	async fn acquire_and_refresh(&self, request: &RefreshRequest) -> Result<RefreshOutcome> {
		if !self.lock.try_acquire(&request.tenant).await? {
			self.metrics.record_contended();
			flow_event!(info, "Refresh lock is held by another caller.");

			return Ok(RefreshOutcome::Failure(RefreshFailure::Locked {
				tenant: request.tenant.clone(),
			}));
		}

		let retry = RetryState::new(self.config.bounded_retry_limit());
		let report = self.refresh_with_retry(request, retry).await?;

		Ok(report.outcome)
	}

	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	fn finish(&self, path: RefreshPath, result: Result<RefreshOutcome>) -> Result<RefreshOutcome> {
		match &result {
			Ok(RefreshOutcome::Success { .. }) => {
				self.metrics.record_success();
				obs::record_flow_outcome(path, FlowOutcome::Success);
			},
			Ok(RefreshOutcome::Failure(failure)) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(path, FlowOutcome::Failure);
				flow_event!(
					info,
					kind = %failure.kind(),
					status = failure.status(),
					"Refresh returned a failure."
				);
			},
			Err(e) => {
				self.metrics.record_fault();
				obs::record_flow_outcome(path, FlowOutcome::Fault);
				flow_event!(error, error = %e, fault = e.is_fault(), "Refresh aborted.");
			},
		}

		result
	}
}
