#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use dax_client::{
	auth::{Credential, CredentialCache},
	error::Error,
	http::ReqwestHttpClient,
};

fn build_cache(server: &MockServer) -> CredentialCache<ReqwestHttpClient> {
	CredentialCache::with_http_client(&config(&server.base_url()), test_reqwest_http_client())
		.expect("Credential cache should build against the mock server.")
}

#[tokio::test]
async fn concurrent_callers_share_a_single_fetch() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(token_body("A", 3_600));
		})
		.await;
	let cache = build_cache(&server);
	let (first, second, third) = tokio::join!(cache.token(), cache.token(), cache.token());

	for token in [first, second, third] {
		assert_eq!(token.expect("Every caller should receive the token.").expose(), "A");
	}

	mock.assert_calls_async(1).await;

	assert_eq!(cache.metrics().fetches(), 1);
}

#[tokio::test]
async fn credential_valid_beyond_buffer_is_served_from_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("unused", 3_600));
		})
		.await;
	let cache = build_cache(&server);

	cache.prime(Credential::expiring_in("cached", OffsetDateTime::now_utc(), Duration::minutes(5)));

	let token = cache.token().await.expect("Cached credential should be served.");

	assert_eq!(token.expose(), "cached");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn credential_inside_buffer_is_refetched() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("renewed", 3_600));
		})
		.await;
	let cache = build_cache(&server);

	cache.prime(Credential::expiring_in(
		"expiring",
		OffsetDateTime::now_utc(),
		Duration::seconds(30),
	));

	let token = cache.token().await.expect("Renewed credential should be fetched.");

	assert_eq!(token.expose(), "renewed");

	mock.assert_calls_async(1).await;

	let cached = cache.cached().expect("Renewed credential should be cached.");

	assert!(cached.is_valid_at(OffsetDateTime::now_utc(), cache.safety_buffer()));
	assert_eq!(cached.token_type, "bearer");
}

#[tokio::test]
async fn rejected_grant_is_shared_and_not_cached() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(50))
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"bad password\"}");
		})
		.await;
	let cache = build_cache(&server);
	let (first, second) = tokio::join!(cache.token(), cache.token());

	for outcome in [first, second] {
		let err = outcome.expect_err("Rejected grant should fail every waiter.");
		let Error::Authentication(inner) = err else {
			panic!("Expected an authentication error, got {err:?}.");
		};

		assert_eq!(inner.status, Some(400));
		assert!(inner.reason.contains("invalid_grant"));
	}

	mock.assert_calls_async(1).await;

	assert!(cache.cached().is_none());

	let _ = cache.token().await.expect_err("The failure must not be cached.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn non_json_error_page_keeps_status() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(503).header("content-type", "text/html").body("<h1>down</h1>");
		})
		.await;
	let cache = build_cache(&server);
	let err = cache.token().await.expect_err("A 503 page is not a token response.");
	let Error::Authentication(inner) = err else {
		panic!("Expected an authentication error, got {err:?}.");
	};

	assert_eq!(inner.status, Some(503));
}

#[tokio::test]
async fn invalidate_forces_a_new_fetch() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("again", 3_600));
		})
		.await;
	let cache = Arc::new(build_cache(&server));
	let _ = cache.token().await.expect("First fetch should succeed.");
	let _ = cache.token().await.expect("Second call should hit the cache.");

	mock.assert_calls_async(1).await;

	cache.invalidate();

	let _ = cache.token().await.expect("Fetch after invalidation should succeed.");

	mock.assert_calls_async(2).await;

	assert_eq!(cache.metrics().invalidations(), 1);
}

#[tokio::test]
async fn password_grant_form_carries_every_field() {
	let transport = ScriptedTransport::new([Scripted::token("form-token")], []);
	let config = config("https://partner.example/api");
	let cache: CredentialCache<ScriptedTransport> =
		CredentialCache::with_shared_http_client(&config, transport.clone())
			.expect("Credential cache should build.");
	let token = cache.token().await.expect("Scripted grant should succeed.");

	assert_eq!(token.expose(), "form-token");

	let requests = transport.token_requests();

	assert_eq!(requests.len(), 1);

	let request = &requests[0];

	assert_eq!(request.method(), "POST");
	assert_eq!(request.uri().to_string(), "https://partner.example/api/oauth/token");
	assert_eq!(
		request.headers().get("content-type").and_then(|value| value.to_str().ok()),
		Some("application/x-www-form-urlencoded")
	);

	let body = String::from_utf8(request.body().clone()).expect("Form body should be UTF-8.");
	let mut fields = body.split('&').collect::<Vec<_>>();

	fields.sort_unstable();

	assert_eq!(fields, [
		"client_id=door-portal",
		"grant_type=password",
		"password=hunter2",
		"username=operator",
	]);
}

#[tokio::test]
async fn token_fetch_respects_timeout() {
	let transport = ScriptedTransport::new([Scripted::Hang, Scripted::token("late")], []);
	let config = config_builder("https://partner.example")
		.token_timeout(std::time::Duration::from_millis(50))
		.build()
		.expect("Config should build.");
	let cache: CredentialCache<ScriptedTransport> =
		CredentialCache::with_shared_http_client(&config, transport.clone())
			.expect("Credential cache should build.");
	let err = cache.token().await.expect_err("Hung fetch should time out.");

	assert!(matches!(err, Error::Authentication(_)));

	let token = cache.token().await.expect("Next call should fetch again.");

	assert_eq!(token.expose(), "late");
	assert_eq!(transport.token_requests().len(), 2);
}

#[tokio::test]
async fn created_token_response_is_accepted() {
	let transport = ScriptedTransport::new(
		[Scripted::Respond(201, token_body("created", 3_600)), Scripted::status(204)],
		[],
	);
	let cache: CredentialCache<ScriptedTransport> =
		CredentialCache::with_shared_http_client(&config("https://partner.example"), transport)
			.expect("Credential cache should build.");
	let token = cache.token().await.expect("A 201 token response is a success.");

	assert_eq!(token.expose(), "created");

	cache.invalidate();

	let err = cache.token().await.expect_err("A 2xx without a token body is still a failure.");
	let Error::Authentication(inner) = err else {
		panic!("Expected an authentication error, got {err:?}.");
	};

	assert_eq!(inner.status, Some(204));
}

#[tokio::test]
async fn transport_timeout_fails_the_fetch_without_status() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(500))
				.body(token_body("slow", 3_600));
		})
		.await;
	let transport = ReqwestHttpClient::with_timeout(std::time::Duration::from_millis(50))
		.expect("Timed transport should build.");
	let cache = CredentialCache::with_http_client(&config(&server.base_url()), transport)
		.expect("Credential cache should build.");
	let err = cache.token().await.expect_err("Slow token endpoint should time out.");
	let Error::Authentication(inner) = err else {
		panic!("Expected an authentication error, got {err:?}.");
	};

	assert_eq!(inner.status, None);
	assert!(cache.cached().is_none());
}

#[tokio::test]
async fn timed_transport_does_not_follow_redirects() {
	let server = MockServer::start_async().await;
	let redirect = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(302).header("location", "/elsewhere");
		})
		.await;
	let elsewhere = server
		.mock_async(|when, then| {
			when.path("/elsewhere");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("redirected", 3_600));
		})
		.await;
	let transport = ReqwestHttpClient::with_timeout(std::time::Duration::from_secs(5))
		.expect("Timed transport should build.");
	let cache = CredentialCache::with_http_client(&config(&server.base_url()), transport)
		.expect("Credential cache should build.");
	let err = cache.token().await.expect_err("A redirect is not a token response.");
	let Error::Authentication(inner) = err else {
		panic!("Expected an authentication error, got {err:?}.");
	};

	assert_eq!(inner.status, Some(302));

	redirect.assert_calls_async(1).await;
	elsewhere.assert_calls_async(0).await;
}
