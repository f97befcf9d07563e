//! Bearer credential cache with single-flight refresh.
//!
//! [`CredentialCache::token`] returns the cached credential while
//! `now + safety_buffer < expires_at` and otherwise performs exactly one password-grant
//! request. The check-then-fetch section runs behind an async mutex: callers arriving
//! while a fetch is in flight wait for it and then observe its outcome, success or
//! failure, instead of issuing their own request. A dropped (cancelled or timed-out)
//! fetch releases the mutex without recording an outcome, so the next caller simply
//! fetches again.

mod metrics;

pub use metrics::CacheMetrics;

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, grant::PasswordGrant},
	config::PartnerConfig,
	error::AuthenticationError,
	http::PartnerHttpClient,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

#[derive(Debug, Default)]
struct CacheState {
	credential: Option<Credential>,
	completed_fetches: u64,
	last_outcome: Option<Result<Credential, AuthenticationError>>,
}

/// Acquires and caches the partner bearer credential.
///
/// The cache is an explicit value rather than process-wide state: wrap it in an [`Arc`] and
/// hand it to every [`ResilientClient`](crate::client::ResilientClient) that should share
/// the same credential, or build one cache per tenant.
pub struct CredentialCache<C>
where
	C: ?Sized + PartnerHttpClient,
{
	http_client: Arc<C>,
	grant: PasswordGrant,
	safety_buffer: Duration,
	fetch_timeout: Option<std::time::Duration>,
	state: Mutex<CacheState>,
	flight: AsyncMutex<()>,
	metrics: Arc<CacheMetrics>,
}
impl<C> CredentialCache<C>
where
	C: ?Sized + PartnerHttpClient,
{
	/// Creates a cache that owns the caller-provided transport.
	pub fn with_http_client(config: &PartnerConfig, http_client: C) -> Result<Self>
	where
		C: Sized,
	{
		Self::with_shared_http_client(config, Arc::new(http_client))
	}

	/// Creates a cache over a transport that is also used elsewhere.
	pub fn with_shared_http_client(config: &PartnerConfig, http_client: Arc<C>) -> Result<Self> {
		Ok(Self {
			http_client,
			grant: PasswordGrant::from_config(config)?,
			safety_buffer: config.safety_buffer,
			fetch_timeout: config.token_timeout,
			state: Default::default(),
			flight: AsyncMutex::new(()),
			metrics: Default::default(),
		})
	}

	/// Returns a valid bearer token, fetching one when the cache is empty or stale.
	pub async fn token(&self) -> Result<TokenSecret> {
		self.credential().await.map(|credential| credential.access_token)
	}

	/// Returns the full cached credential, fetching one when the cache is empty or stale.
	pub async fn credential(&self) -> Result<Credential> {
		let span = OperationSpan::new(OperationKind::TokenFetch, "credential");

		span.instrument(async move { self.credential_singleflight().await.map_err(Error::from) })
			.await
	}

	/// Drops the cached credential so the next call fetches a fresh one.
	pub fn invalidate(&self) {
		let mut state = self.state.lock();

		state.credential = None;
		state.last_outcome = None;

		self.metrics.record_invalidation();
	}

	/// Installs a credential obtained elsewhere (e.g., restored from storage).
	pub fn prime(&self, credential: Credential) {
		self.state.lock().credential = Some(credential);
	}

	/// Returns the cached credential, valid or not, without touching the network.
	pub fn cached(&self) -> Option<Credential> {
		self.state.lock().credential.clone()
	}

	/// Returns the margin subtracted from credential expiry.
	pub fn safety_buffer(&self) -> Duration {
		self.safety_buffer
	}

	/// Returns the shared activity counters.
	pub fn metrics(&self) -> &Arc<CacheMetrics> {
		&self.metrics
	}

	/// Returns the transport used for token fetches.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	async fn credential_singleflight(&self) -> Result<Credential, AuthenticationError> {
		let observed = match self.lookup(OffsetDateTime::now_utc()) {
			Ok(credential) => return Ok(credential),
			Err(completed_fetches) => completed_fetches,
		};
		let _singleflight = self.flight.lock().await;

		if let Some(outcome) = self.settled_since(observed) {
			return outcome;
		}

		self.metrics.record_fetch();
		obs::record_operation_outcome(OperationKind::TokenFetch, OperationOutcome::Attempt);

		let exchange = self.grant.exchange(self.http_client.as_ref());
		let outcome = match self.fetch_timeout {
			Some(limit) => tokio::time::timeout(limit, exchange).await.unwrap_or_else(|_| {
				Err(AuthenticationError::new(format!(
					"token endpoint did not respond within {limit:?}"
				)))
			}),
			None => exchange.await,
		};

		self.settle(outcome)
	}

	/// Returns the fresh credential, or the fetch generation observed before waiting.
	fn lookup(&self, now: OffsetDateTime) -> Result<Credential, u64> {
		let state = self.state.lock();

		match &state.credential {
			Some(credential) if credential.is_valid_at(now, self.safety_buffer) => {
				self.metrics.record_hit();

				Ok(credential.clone())
			},
			_ => Err(state.completed_fetches),
		}
	}

	/// Re-checks the cache after acquiring the single-flight guard.
	fn settled_since(&self, observed: u64) -> Option<Result<Credential, AuthenticationError>> {
		let state = self.state.lock();
		let now = OffsetDateTime::now_utc();

		if let Some(credential) = state
			.credential
			.as_ref()
			.filter(|credential| credential.is_valid_at(now, self.safety_buffer))
		{
			self.metrics.record_hit();

			return Some(Ok(credential.clone()));
		}
		if state.completed_fetches != observed {
			return state.last_outcome.clone();
		}

		None
	}

	fn settle(
		&self,
		outcome: Result<Credential, AuthenticationError>,
	) -> Result<Credential, AuthenticationError> {
		let mut state = self.state.lock();

		state.completed_fetches = state.completed_fetches.wrapping_add(1);

		match &outcome {
			Ok(credential) => {
				state.credential = Some(credential.clone());
				obs::record_operation_outcome(OperationKind::TokenFetch, OperationOutcome::Success);
			},
			Err(_) => {
				state.credential = None;
				self.metrics.record_failure();
				obs::record_operation_outcome(OperationKind::TokenFetch, OperationOutcome::Failure);
			},
		}

		state.last_outcome = Some(outcome.clone());

		outcome
	}
}
#[cfg(feature = "reqwest")]
impl CredentialCache<ReqwestHttpClient> {
	/// Creates a cache backed by a default reqwest transport.
	pub fn new(config: &PartnerConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}
}
impl<C> Debug for CredentialCache<C>
where
	C: ?Sized + PartnerHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialCache")
			.field("safety_buffer", &self.safety_buffer)
			.field("fetch_timeout", &self.fetch_timeout)
			.field("credential", &self.state.lock().credential)
			.finish()
	}
}
