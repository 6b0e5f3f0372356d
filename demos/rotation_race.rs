//! Two callers race to refresh the same tenant against a mock token endpoint: one takes the lock
//! and exchanges, the other waits and reads the repository. The winner then persists the rotated
//! pair and clears the lock, which is the caller-side hook the coordinator leaves open.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_refresh_coordinator::{
	auth::{ProviderId, TenantId, TokenRecord},
	config::{ClientAuth, CoordinatorConfig},
	flows::{RefreshOrchestrator, RefreshOutcome, RefreshRequest},
	lock::MemoryLockStore,
	provider::{ProviderDescriptor, TokenEndpoint},
	store::MemoryTokenRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenants/gitple/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access-2\",\"refresh_token\":\"demo-refresh-2\",\"token_type\":\"bearer\",\"expires_in\":7200}",
			);
		})
		.await;
	let tenant = TenantId::new("gitple")?;
	let repository = Arc::new(MemoryTokenRepository::default());

	repository.save(
		TokenRecord::new(tenant.clone())
			.with_access_token("demo-access-1", None)
			.with_refresh_token("demo-refresh-1", None),
	);

	let descriptor = ProviderDescriptor::new(
		ProviderId::new("demo-provider")?,
		TokenEndpoint::new(server.url("/tenants/{tenant}/oauth/token"))?,
	);
	let orchestrator = RefreshOrchestrator::with_provider(
		Arc::new(MemoryLockStore::default()),
		repository.clone(),
		descriptor,
		ClientAuth::new("demo-client", "super-secret"),
		CoordinatorConfig::default().with_wait_delay(Duration::from_millis(100)),
	)?;
	let request = RefreshRequest::new(tenant.clone(), "demo-refresh-1", "access token expired")?;
	let (first, second) = tokio::join!(
		orchestrator.get_access_token(&request),
		orchestrator.get_access_token(&request),
	);

	for outcome in [first?, second?] {
		match outcome {
			RefreshOutcome::Success { token, source } => {
				println!("{source:?}: access token {}.", token.access_token.value.expose());

				if token.refresh_token.is_some() {
					repository.record_rotation(&tenant, &token)?;
					orchestrator.lock.clear(&tenant).await?;
				}
			},
			RefreshOutcome::Failure(failure) => {
				println!("Refresh failed ({}): {failure}", failure.kind());
			},
		}
	}

	token_mock.assert_async().await;

	Ok(())
}
