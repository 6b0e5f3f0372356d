#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oauth2_refresh_coordinator::{
	_preludet::*,
	auth::{ProviderId, TokenSecret},
	config::{ClientAuth, CoordinatorConfig},
	flows::{
		RefreshFailure, RefreshOrchestrator, RefreshOutcome, RefreshRequest, RetryState, TokenSource,
	},
	http::ReqwestHttpClient,
	lock::MemoryLockStore,
	oauth::{BasicRefreshClient, ExchangeRequest, OAuthRefreshClient},
	provider::{ClientAuthMethod, ProviderDescriptor, RejectionKind, TokenEndpoint},
	store::MemoryTokenRepository,
};

const BASIC_AUTHORIZATION: &str = "Basic Y2xpZW50LXJlZnJlc2g6c2VjcmV0LXJlZnJlc2g=";

fn build_descriptor(server: &MockServer, path: &str) -> ProviderDescriptor {
	ProviderDescriptor::new(
		ProviderId::new("mock-shop").expect("Provider identifier should be valid."),
		TokenEndpoint::new(server.url(path)).expect("Mock token endpoint should be valid."),
	)
}

fn build_orchestrator(
	descriptor: ProviderDescriptor,
) -> (RefreshOrchestrator, Arc<MemoryTokenRepository>) {
	let repository = Arc::new(MemoryTokenRepository::default());
	let client = BasicRefreshClient::<ReqwestHttpClient>::new(descriptor, test_reqwest_http_client());
	let orchestrator = RefreshOrchestrator::new(
		Arc::new(MemoryLockStore::default()),
		repository.clone(),
		Arc::new(client),
		ClientAuth::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET),
		CoordinatorConfig::default().with_wait_delay(StdDuration::from_millis(20)),
	);

	(orchestrator, repository)
}

fn request(refresh_token: &str) -> RefreshRequest {
	RefreshRequest::new(tenant("gitple"), refresh_token, "access token expired")
		.expect("Refresh request fixture should be valid.")
}

#[tokio::test]
async fn rotated_tokens_are_returned_from_the_provider() {
	let server = MockServer::start_async().await;
	let (orchestrator, _) = build_orchestrator(build_descriptor(&server, "/token"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.header("authorization", BASIC_AUTHORIZATION);
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"at-2\",\"refresh_token\":\"rt-2\",\"token_type\":\"bearer\",\"expires_in\":7200,\"refresh_token_expires_at\":\"2030-01-01T00:00:00.000\",\"scopes\":[\"mall.read_product\"],\"user_id\":\"operator\"}",
				);
		})
		.await;
	let outcome = orchestrator
		.get_access_token(&request("rt-1"))
		.await
		.expect("Refresh should not fail.");

	mock.assert_async().await;

	let RefreshOutcome::Success { token, source } = outcome else {
		panic!("Refresh should succeed, got {outcome:?}.");
	};

	assert_eq!(source, TokenSource::Exchange);
	assert_eq!(token.access_token.value.expose(), "at-2");
	assert!(token.access_token.expires_at.is_some());

	let refresh = token.refresh_token.expect("Rotated refresh token should be present.");

	assert_eq!(refresh.value.expose(), "rt-2");
	assert_eq!(refresh.expires_at.map(|expires_at| expires_at.year()), Some(2030));
	assert_eq!(token.scopes, vec!["mall.read_product".to_owned()]);
	assert_eq!(token.user_id.as_deref(), Some("operator"));
}

#[tokio::test]
async fn invalid_grant_on_the_stored_token_is_an_invalid_credential() {
	let server = MockServer::start_async().await;
	let (orchestrator, repository) = build_orchestrator(build_descriptor(&server, "/token"));
	let gitple = tenant("gitple");

	repository.save(record(&gitple, "at-1", "rt-1"));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(
					"{\"error\":\"invalid_grant\",\"error_description\":\"Validation failed on refresh_token\"}",
				);
		})
		.await;
	let outcome = orchestrator
		.get_access_token(&request("rt-1"))
		.await
		.expect("Invalid credential should be returned, not raised.");

	mock.assert_calls_async(1).await;

	assert_eq!(
		outcome,
		RefreshOutcome::Failure(RefreshFailure::InvalidCredential {
			status: 400,
			error: Some("invalid_grant".into()),
			description: Some("Validation failed on refresh_token".into()),
		})
	);
}

#[tokio::test]
async fn stale_token_is_retried_once_with_the_stored_token() {
	let server = MockServer::start_async().await;
	let (orchestrator, repository) = build_orchestrator(build_descriptor(&server, "/token"));
	let gitple = tenant("gitple");

	repository.save(record(&gitple, "at-2", "rt-new"));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let report = orchestrator
		.refresh_with_retry(&request("rt-old"), RetryState::new(1))
		.await
		.expect("Invalid credential should be returned, not raised.");

	mock.assert_calls_async(2).await;

	assert_eq!(report.retry.current, 1);
	assert!(matches!(
		report.outcome,
		RefreshOutcome::Failure(RefreshFailure::InvalidCredential { status: 400, .. })
	));
}

#[tokio::test]
async fn server_errors_are_provider_failures_with_retry_hints() {
	let server = MockServer::start_async().await;
	let (orchestrator, _) = build_orchestrator(build_descriptor(&server, "/token"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503)
				.header("content-type", "application/json")
				.header("retry-after", "30")
				.body("{\"error\":\"temporarily_unavailable\"}");
		})
		.await;
	let outcome = orchestrator
		.get_access_token(&request("rt-1"))
		.await
		.expect("Provider rejection should be returned, not raised.");

	mock.assert_async().await;

	let Some(RefreshFailure::Provider { status, kind, retry_after, .. }) = outcome.failure() else {
		panic!("Server error should be a provider failure, got {outcome:?}.");
	};

	assert_eq!(*status, 503);
	assert_eq!(*kind, RejectionKind::Transient);
	assert_eq!(*retry_after, Some(Duration::seconds(30)));
}

#[tokio::test]
async fn non_json_rejections_keep_their_status() {
	let server = MockServer::start_async().await;
	let (orchestrator, _) = build_orchestrator(build_descriptor(&server, "/token"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(502).header("content-type", "text/html").body("<html>Bad gateway</html>");
		})
		.await;
	let outcome = orchestrator
		.get_access_token(&request("rt-1"))
		.await
		.expect("Provider rejection should be returned, not raised.");

	mock.assert_async().await;

	assert_eq!(outcome.failure().map(RefreshFailure::status), Some(502));
}

#[tokio::test]
async fn templated_endpoint_is_resolved_per_tenant_with_post_auth() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server, "/tenants/{tenant}/oauth/token")
		.with_client_auth_method(ClientAuthMethod::ClientSecretPost);
	let client = BasicRefreshClient::<ReqwestHttpClient>::new(descriptor, test_reqwest_http_client());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenants/gitple/oauth/token").header_missing("authorization");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"at-2\",\"token_type\":\"bearer\",\"expires_at\":\"2030-01-01T00:00:00Z\"}",
				);
		})
		.await;
	let refresh_token = TokenSecret::new("rt-1");
	let client_auth = ClientAuth::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET);
	let response = client
		.exchange(ExchangeRequest {
			tenant: &tenant("gitple"),
			refresh_token: &refresh_token,
			client_auth: &client_auth,
		})
		.await
		.expect("Exchange should not fail.");

	mock.assert_async().await;

	assert!(response.is_success());
	assert_eq!(response.status, 200);

	let token = response.token.expect("Successful exchange should carry a token.");

	assert!(token.refresh_token.is_none());
	assert_eq!(token.access_token.expires_at.map(|expires_at| expires_at.year()), Some(2030));
}

#[tokio::test]
async fn success_without_expiry_is_a_configuration_error() {
	let server = MockServer::start_async().await;
	let (orchestrator, _) = build_orchestrator(build_descriptor(&server, "/token"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"at-2\",\"token_type\":\"bearer\"}");
		})
		.await;
	let err = orchestrator
		.get_access_token(&request("rt-1"))
		.await
		.expect_err("Token without expiry should be rejected.");

	mock.assert_async().await;

	assert!(matches!(err, Error::Config(_)));
}
