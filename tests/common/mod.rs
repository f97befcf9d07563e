//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, future::Future, io, pin::Pin, sync::Arc};
// crates.io
use dax_client::{
	config::{PartnerConfig, PartnerConfigBuilder},
	http::{PartnerHttpClient, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	reqwest::Client as ReqwestClient,
	signing::SigningKey,
	url::Url,
};
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::Response};
use parking_lot::Mutex;

pub const CLIENT_ID: &str = "door-portal";
pub const USERNAME: &str = "operator";
pub const PASSWORD: &str = "hunter2";
pub const PARTNER_ID: &str = "p-1";
pub const INSTANCE_ID: &str = "i-1";
pub const TOKEN_PATH: &str = "/oauth/token";

/// Builds a reqwest transport that tolerates the self-signed certificates `httpmock` serves.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Config builder pointed at `base_url` with the fixture credentials and instance.
pub fn config_builder(base_url: &str) -> PartnerConfigBuilder {
	PartnerConfig::builder(Url::parse(base_url).expect("Fixture base URL should parse."))
		.client_id(CLIENT_ID)
		.credentials(USERNAME, PASSWORD)
		.instance(PARTNER_ID, INSTANCE_ID)
}

/// Default config pointed at `base_url`.
pub fn config(base_url: &str) -> PartnerConfig {
	config_builder(base_url).build().expect("Fixture config should build.")
}

/// PKCS#8 signing key fixture.
pub fn signing_key() -> SigningKey {
	SigningKey::from_pem(include_str!("../fixtures/signing_key.pem"))
		.expect("Signing key fixture should parse.")
}

/// Successful password-grant body.
pub fn token_body(access_token: &str, expires_in: u64) -> String {
	format!(
		"{{\"access_token\":\"{access_token}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in}}}"
	)
}

/// One scripted transport outcome.
#[derive(Clone, Debug)]
pub enum Scripted {
	/// Respond with a status and JSON body.
	Respond(u16, String),
	/// Fail at the network level.
	Fail(io::ErrorKind),
	/// Never complete.
	Hang,
}
impl Scripted {
	pub fn token(access_token: &str) -> Self {
		Self::Respond(200, token_body(access_token, 3_600))
	}

	pub fn ok(body: &str) -> Self {
		Self::Respond(200, body.to_owned())
	}

	pub fn status(status: u16) -> Self {
		Self::Respond(status, "{}".to_owned())
	}
}

#[derive(Debug, Default)]
struct ScriptState {
	token: VecDeque<Scripted>,
	resource: VecDeque<Scripted>,
	token_requests: Vec<HttpRequest>,
	resource_requests: Vec<HttpRequest>,
}

/// In-process transport that replays scripted outcomes and records every request.
///
/// Requests to the token endpoint and to resources are scripted separately; an exhausted
/// script fails with a network error.
#[derive(Debug, Default)]
pub struct ScriptedTransport(Arc<Mutex<ScriptState>>);
impl ScriptedTransport {
	pub fn new(
		token: impl IntoIterator<Item = Scripted>,
		resource: impl IntoIterator<Item = Scripted>,
	) -> Arc<Self> {
		let transport = Self::default();

		{
			let mut state = transport.0.lock();

			state.token.extend(token);
			state.resource.extend(resource);
		}

		Arc::new(transport)
	}

	pub fn token_requests(&self) -> Vec<HttpRequest> {
		self.0.lock().token_requests.clone()
	}

	pub fn resource_requests(&self) -> Vec<HttpRequest> {
		self.0.lock().resource_requests.clone()
	}

	pub fn resource_header(&self, index: usize, name: &str) -> Option<String> {
		self.0.lock().resource_requests.get(index).and_then(|request| {
			request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
		})
	}
}
impl PartnerHttpClient for ScriptedTransport {
	type Handle = ScriptedHandle;
	type TransportError = io::Error;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { state: Arc::clone(&self.0), slot }
	}
}

pub struct ScriptedHandle {
	state: Arc<Mutex<ScriptState>>,
	slot: ResponseMetadataSlot,
}
impl ScriptedHandle {
	fn next(&self, request: HttpRequest) -> Scripted {
		let mut state = self.state.lock();
		let is_token = request.uri().path().ends_with(TOKEN_PATH);
		let next = if is_token {
			state.token_requests.push(request);
			state.token.pop_front()
		} else {
			state.resource_requests.push(request);
			state.resource.pop_front()
		};

		next.unwrap_or(Scripted::Fail(io::ErrorKind::ConnectionRefused))
	}
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<io::Error>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		self.slot.take();

		let next = self.next(request);
		let slot = self.slot.clone();

		Box::pin(async move {
			match next {
				Scripted::Respond(status, body) => {
					slot.store(ResponseMetadata { status: Some(status) });

					let response = Response::builder()
						.status(status)
						.header("content-type", "application/json")
						.body(body.into_bytes())
						.expect("Scripted response should build.");

					Ok(response)
				},
				Scripted::Fail(kind) =>
					Err(HttpClientError::Io(io::Error::new(kind, "scripted network failure"))),
				Scripted::Hang => std::future::pending().await,
			}
		})
	}
}
