//! Partner connection settings and their validating builder.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Errors raised while constructing or validating a [`PartnerConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PartnerConfigError {
	/// OAuth client identifier is mandatory.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// Resource-owner username is mandatory for the password grant.
	#[error("Missing username.")]
	MissingUsername,
	/// Resource-owner password is mandatory for the password grant.
	#[error("Missing password.")]
	MissingPassword,
	/// API URL must use HTTP(S).
	#[error("The API URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// API URL must be able to carry a path.
	#[error("The API URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// URL that failed validation.
		url: String,
	},
	/// Partner and instance identifiers must be set together.
	#[error("Partner and instance identifiers must be configured together.")]
	IncompleteInstance,
	/// A bounded retry loop needs at least one attempt.
	#[error("The max_attempts value must be positive.")]
	ZeroMaxAttempts,
	/// Safety buffer must not be negative.
	#[error("The safety buffer must not be negative.")]
	NegativeSafetyBuffer,
}

/// Immutable settings shared by the credential cache and the resilient client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerConfig {
	/// Base URL of the partner API; the token endpoint lives at `{api_url}/oauth/token`.
	pub api_url: Url,
	/// OAuth client identifier sent with the password grant.
	pub client_id: String,
	/// Resource-owner username.
	pub username: String,
	/// Resource-owner password; redacted in debug output.
	pub password: TokenSecret,
	/// Partner identifier used by instance-scoped resource paths.
	pub partner_id: Option<String>,
	/// Instance identifier used by instance-scoped resource paths.
	pub instance_id: Option<String>,
	/// Margin subtracted from a credential's expiry to force early refresh.
	pub safety_buffer: Duration,
	/// Upper bound for a single token fetch.
	pub token_timeout: Option<std::time::Duration>,
	/// Upper bound for a single signed resource request.
	pub request_timeout: Option<std::time::Duration>,
	/// Upper bound on attempts per call, on top of the backoff schedule.
	pub max_attempts: Option<u32>,
}
impl PartnerConfig {
	/// Default safety buffer applied to cached credentials.
	pub const DEFAULT_SAFETY_BUFFER: Duration = Duration::seconds(60);

	/// Creates a new builder for the provided API base URL.
	pub fn builder(api_url: Url) -> PartnerConfigBuilder {
		PartnerConfigBuilder::new(api_url)
	}

	/// Returns the password-grant token endpoint.
	pub fn token_endpoint(&self) -> String {
		format!("{}/oauth/token", self.base())
	}

	/// Resolves a request target (path plus optional query) against the API URL.
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		let target = target.trim();
		let joined = if target.starts_with('/') {
			format!("{}{target}", self.base())
		} else {
			format!("{}/{target}", self.base())
		};

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidTarget { target: target.to_owned(), source })
	}

	/// Builds `/partners/{partner_id}/instances/{instance_id}/{suffix}`.
	pub fn instance_path(&self, suffix: &str) -> Result<String, ConfigError> {
		let (Some(partner), Some(instance)) = (&self.partner_id, &self.instance_id) else {
			return Err(ConfigError::MissingInstance);
		};
		let suffix = suffix.trim_start_matches('/');

		if suffix.is_empty() {
			Ok(format!("/partners/{partner}/instances/{instance}"))
		} else {
			Ok(format!("/partners/{partner}/instances/{instance}/{suffix}"))
		}
	}

	fn base(&self) -> &str {
		self.api_url.as_str().trim_end_matches('/')
	}

	fn validate(&self) -> Result<(), PartnerConfigError> {
		if self.client_id.is_empty() {
			return Err(PartnerConfigError::MissingClientId);
		}
		if self.username.is_empty() {
			return Err(PartnerConfigError::MissingUsername);
		}
		if self.password.expose().is_empty() {
			return Err(PartnerConfigError::MissingPassword);
		}
		if !matches!(self.api_url.scheme(), "http" | "https") {
			return Err(PartnerConfigError::UnsupportedScheme { url: self.api_url.to_string() });
		}
		if self.api_url.cannot_be_a_base() {
			return Err(PartnerConfigError::CannotBeABase { url: self.api_url.to_string() });
		}
		if self.partner_id.is_some() != self.instance_id.is_some() {
			return Err(PartnerConfigError::IncompleteInstance);
		}
		if self.max_attempts == Some(0) {
			return Err(PartnerConfigError::ZeroMaxAttempts);
		}
		if self.safety_buffer.is_negative() {
			return Err(PartnerConfigError::NegativeSafetyBuffer);
		}

		Ok(())
	}
}

/// Builder for [`PartnerConfig`] values.
#[derive(Debug)]
pub struct PartnerConfigBuilder {
	api_url: Url,
	client_id: Option<String>,
	username: Option<String>,
	password: Option<TokenSecret>,
	partner_id: Option<String>,
	instance_id: Option<String>,
	safety_buffer: Duration,
	token_timeout: Option<std::time::Duration>,
	request_timeout: Option<std::time::Duration>,
	max_attempts: Option<u32>,
}
impl PartnerConfigBuilder {
	/// Creates a new builder seeded with the API base URL.
	pub fn new(api_url: Url) -> Self {
		Self {
			api_url,
			client_id: None,
			username: None,
			password: None,
			partner_id: None,
			instance_id: None,
			safety_buffer: PartnerConfig::DEFAULT_SAFETY_BUFFER,
			token_timeout: None,
			request_timeout: None,
			max_attempts: None,
		}
	}

	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the resource-owner username and password.
	pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self.password = Some(TokenSecret::new(password));

		self
	}

	/// Scopes resource paths to a partner instance.
	pub fn instance(mut self, partner_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
		self.partner_id = Some(partner_id.into());
		self.instance_id = Some(instance_id.into());

		self
	}

	/// Overrides the credential safety buffer (defaults to 60 seconds).
	pub fn safety_buffer(mut self, buffer: Duration) -> Self {
		self.safety_buffer = buffer;

		self
	}

	/// Bounds each token fetch.
	pub fn token_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.token_timeout = Some(timeout);

		self
	}

	/// Bounds each signed resource request.
	pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Caps the number of attempts per call.
	pub fn max_attempts(mut self, attempts: u32) -> Self {
		self.max_attempts = Some(attempts);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<PartnerConfig, PartnerConfigError> {
		let config = PartnerConfig {
			api_url: self.api_url,
			client_id: self.client_id.ok_or(PartnerConfigError::MissingClientId)?,
			username: self.username.ok_or(PartnerConfigError::MissingUsername)?,
			password: self.password.ok_or(PartnerConfigError::MissingPassword)?,
			partner_id: self.partner_id,
			instance_id: self.instance_id,
			safety_buffer: self.safety_buffer,
			token_timeout: self.token_timeout,
			request_timeout: self.request_timeout,
			max_attempts: self.max_attempts,
		};

		config.validate()?;

		Ok(config)
	}
}
