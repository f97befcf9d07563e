//! Authenticated, signed and retried partner API calls.
//!
//! Every attempt obtains a bearer token from the shared [`CredentialCache`], signs the
//! request with the partner key, and sends it with `Authorization`, `Signature` and `Date`
//! headers. A `401` invalidates the cached credential and retries once with a fresh token.
//! Transient failures (network errors, timeouts and `5xx` responses) are retried according
//! to the caller's [`BackoffScheduler`]; every other non-2xx status is returned as
//! [`Error::Rejected`] without retrying.

mod request;

pub use oauth2::http::Method;
pub use request::*;

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{
		Request as HttpRequestBuilder,
		header::{AUTHORIZATION, CONTENT_TYPE, DATE},
	},
};
use serde::de::DeserializeOwned;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::CredentialCache,
	backoff::{BackoffScheduler, STOP},
	config::PartnerConfig,
	error::{ConfigError, TransientError},
	http::{PartnerHttpClient, ResponseMetadataSlot, map_transport_error},
	obs::{Operation, OperationKind},
	signing::{RequestSigner, SIGNATURE_HEADER, SigningContext, SigningKey, signature_date_now},
};

/// Partner API client composing the credential cache, the request signer and backoff.
///
/// The client is cheap to clone; clones share the credential cache and the signing key.
pub struct ResilientClient<C>
where
	C: ?Sized + PartnerHttpClient,
{
	config: Arc<PartnerConfig>,
	credentials: Arc<CredentialCache<C>>,
	key: Arc<SigningKey>,
	signer: RequestSigner,
}
impl<C> ResilientClient<C>
where
	C: ?Sized + PartnerHttpClient,
{
	/// Creates a client that authenticates through `credentials` and sends requests over
	/// the same transport.
	pub fn new(
		config: &PartnerConfig,
		credentials: Arc<CredentialCache<C>>,
		key: impl Into<Arc<SigningKey>>,
	) -> Self {
		Self {
			config: Arc::new(config.clone()),
			credentials,
			key: key.into(),
			signer: RequestSigner,
		}
	}

	/// Returns the shared credential cache.
	pub fn credentials(&self) -> &Arc<CredentialCache<C>> {
		&self.credentials
	}

	/// Returns the configuration the client was built with.
	pub fn config(&self) -> &PartnerConfig {
		&self.config
	}

	/// Builds `/partners/{partner_id}/instances/{instance_id}/{suffix}`.
	pub fn instance_path(&self, suffix: &str) -> Result<String> {
		Ok(self.config.instance_path(suffix)?)
	}

	/// Sends a signed `GET` request.
	pub async fn get(
		&self,
		target: &str,
		backoff: &mut BackoffScheduler,
		cancel: &CancellationToken,
	) -> Result<PartnerResponse> {
		self.execute(&PartnerRequest::get(target), backoff, cancel).await
	}

	/// Sends a signed `GET` request and decodes the JSON body.
	pub async fn get_json<T>(
		&self,
		target: &str,
		backoff: &mut BackoffScheduler,
		cancel: &CancellationToken,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.get(target, backoff, cancel).await?.json()
	}

	/// Sends `request`, retrying transient failures per `backoff` until it succeeds, the
	/// schedule stops, `max_attempts` is reached, or `cancel` fires.
	///
	/// When retries are exhausted the error of the last attempt is returned unchanged.
	pub async fn execute(
		&self,
		request: &PartnerRequest,
		backoff: &mut BackoffScheduler,
		cancel: &CancellationToken,
	) -> Result<PartnerResponse> {
		let mut operation = Operation::start(OperationKind::SignedCall, "execute");
		let span = operation.span().clone();

		span.instrument(async move {
			loop {
				if cancel.is_cancelled() {
					return operation.finish(Err(Error::Cancelled));
				}

				let attempt = operation.attempt();
				let outcome = tokio::select! {
					biased;
					_ = cancel.cancelled() => Err(Error::Cancelled),
					outcome = self.authorized_attempt(request) => outcome,
				};
				let err = match outcome {
					Ok(response) => return operation.finish(Ok(response)),
					Err(err) => err,
				};

				if !err.is_retryable()
					|| self.config.max_attempts.is_some_and(|max| attempt >= max)
				{
					return operation.finish(Err(err));
				}

				let delay = backoff.next_interval();

				if delay == STOP {
					return operation.finish(Err(err));
				}

				operation.retry(delay, &err);

				let pause = std::time::Duration::from_millis(delay.max(0).unsigned_abs());

				tokio::select! {
					biased;
					_ = cancel.cancelled() => return operation.finish(Err(Error::Cancelled)),
					_ = tokio::time::sleep(pause) => {},
				}
			}
		})
		.await
	}

	/// One logical attempt: a `401` invalidates the credential and is retried exactly once.
	async fn authorized_attempt(&self, request: &PartnerRequest) -> Result<PartnerResponse> {
		let response = self.send_signed(request).await?;

		if response.status != 401 {
			return classify(response);
		}

		self.credentials.invalidate();

		let response = self.send_signed(request).await?;

		if response.status == 401 {
			return Err(Error::AuthorizationExpired);
		}

		classify(response)
	}

	async fn send_signed(&self, request: &PartnerRequest) -> Result<PartnerResponse> {
		let token = self.credentials.token().await?;
		let url = self.config.resolve(&request.target)?;
		let request_target = match url.query() {
			Some(query) => format!("{}?{query}", url.path()),
			None => url.path().to_owned(),
		};
		let date = signature_date_now();
		let context = SigningContext::new(request.method.as_str(), &request_target, &date)
			.with_body(&request.body);
		let signature = self.signer.sign(&context, &self.key)?;
		let mut builder = HttpRequestBuilder::builder()
			.method(request.method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, token.bearer())
			.header(SIGNATURE_HEADER, signature.header_value())
			.header(DATE, date.as_str());

		if let Some(content_type) = &request.content_type {
			builder = builder.header(CONTENT_TYPE, content_type.as_str());
		}

		let http_request = builder.body(request.body.clone()).map_err(ConfigError::from)?;
		let handle = self.credentials.http_client().with_metadata(ResponseMetadataSlot::default());
		let call = handle.call(http_request);
		let response = match self.config.request_timeout {
			Some(limit) => tokio::time::timeout(limit, call)
				.await
				.map_err(|_| TransientError::Timeout { after: limit })?,
			None => call.await,
		}
		.map_err(map_transport_error)?;

		Ok(response.into())
	}
}
#[cfg(feature = "reqwest")]
impl ResilientClient<ReqwestHttpClient> {
	/// Builds a client and a dedicated credential cache over a default reqwest transport.
	pub fn from_config(config: &PartnerConfig, key: SigningKey) -> Result<Self> {
		let credentials = Arc::new(CredentialCache::new(config)?);

		Ok(Self::new(config, credentials, key))
	}
}
impl<C> Clone for ResilientClient<C>
where
	C: ?Sized + PartnerHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			config: Arc::clone(&self.config),
			credentials: Arc::clone(&self.credentials),
			key: Arc::clone(&self.key),
			signer: self.signer,
		}
	}
}
impl<C> Debug for ResilientClient<C>
where
	C: ?Sized + PartnerHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResilientClient")
			.field("api_url", &self.config.api_url.as_str())
			.field("key", &self.key)
			.field("credentials", &self.credentials)
			.finish()
	}
}

fn classify(response: PartnerResponse) -> Result<PartnerResponse> {
	match response.status {
		200..=299 => Ok(response),
		401 => Err(Error::AuthorizationExpired),
		500..=599 => Err(TransientError::Server {
			status: response.status,
			body_preview: response.body_preview(),
		}
		.into()),
		status => Err(Error::Rejected { status, body_preview: response.body_preview() }),
	}
}
