//! Client-level error types shared by the credential cache, signer, and resilient client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;
type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token endpoint was unreachable or rejected the password grant.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Request signing failed; the key is unusable.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Temporary failure; retry according to the caller's backoff schedule.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Partner API answered 401 for the presented bearer token.
	#[error("Partner API rejected the bearer token.")]
	AuthorizationExpired,
	/// Partner API answered with a non-retryable status.
	#[error("Partner API responded with HTTP {status}: {body_preview}.")]
	Rejected {
		/// HTTP status code returned by the partner API.
		status: u16,
		/// Leading part of the response body.
		body_preview: String,
	},
	/// Response body could not be decoded into the requested type.
	#[error("Partner API response could not be decoded.")]
	Decode(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// The caller cancelled the operation.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns `true` when the failure may succeed if retried after a delay.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_))
	}
}

/// Token endpoint failure.
///
/// The type is cheap to clone so every caller coalesced onto one token fetch observes the
/// identical outcome.
#[derive(Clone, Debug, ThisError)]
#[error("Token endpoint authentication failed: {reason}.")]
pub struct AuthenticationError {
	/// Human-readable failure summary.
	pub reason: String,
	/// HTTP status code returned by the token endpoint, when one was observed.
	pub status: Option<u16>,
	#[source]
	source: Option<SharedError>,
}
impl AuthenticationError {
	/// Creates an error without an underlying cause.
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into(), status: None, source: None }
	}

	/// Attaches the HTTP status observed on the token endpoint.
	pub fn with_status(mut self, status: Option<u16>) -> Self {
		self.status = status;

		self
	}

	/// Attaches the underlying cause.
	pub fn with_source(mut self, source: impl 'static + Send + Sync + StdError) -> Self {
		self.source = Some(Arc::new(source));

		self
	}
}

/// Signing failures; never retried.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// Private key material could not be parsed as an RSA key.
	#[error("Signing key is not a usable RSA private key.")]
	InvalidKey {
		/// Underlying decoding failure.
		#[source]
		source: BoxError,
	},
	/// RSA primitive rejected the digest (e.g., key too small).
	#[error("RSA signing failed.")]
	Sign(#[source] rsa::Error),
	/// Signature could not be decoded or did not verify.
	#[error("Signature verification failed.")]
	Verify {
		/// Underlying decoding or verification failure.
		#[source]
		source: BoxError,
	},
}
impl SigningError {
	/// Wraps a key decoding failure.
	pub fn invalid_key(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::InvalidKey { source: Box::new(src) }
	}

	/// Wraps a verification failure.
	pub fn verify(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Verify { source: Box::new(src) }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the partner API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within the configured timeout.
	#[error("Partner API did not respond within {after:?}.")]
	Timeout {
		/// Timeout that elapsed.
		after: std::time::Duration,
	},
	/// Partner API answered with a 5xx status.
	#[error("Partner API responded with server error HTTP {status}.")]
	Server {
		/// HTTP status code returned by the partner API.
		status: u16,
		/// Leading part of the response body.
		body_preview: String,
	},
}
impl TransientError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransientError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Token endpoint URL derived from the API URL is invalid.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Request target cannot be appended to the API URL.
	#[error("Request target `{target}` is invalid.")]
	InvalidTarget {
		/// Offending request target.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Instance-scoped paths need both partner and instance identifiers.
	#[error("Partner and instance identifiers are not configured.")]
	MissingInstance,
	/// Partner configuration failed validation.
	#[error(transparent)]
	Partner(#[from] crate::config::PartnerConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<crate::config::PartnerConfigError> for Error {
	fn from(e: crate::config::PartnerConfigError) -> Self {
		Self::Config(e.into())
	}
}
