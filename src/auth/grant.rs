//! Resource-owner password grant against `{api_url}/oauth/token`.

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, EndpointNotSet, EndpointSet, HttpClientError,
	HttpRequest, HttpResponse, RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
	http::StatusCode,
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::PartnerConfig,
	error::{AuthenticationError, ConfigError},
	http::{PartnerHttpClient, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Pre-built password grant; the form carries `client_id`, `grant_type=password`,
/// `password`, and `username`.
pub(crate) struct PasswordGrant {
	oauth_client: ConfiguredBasicClient,
	username: ResourceOwnerUsername,
	password: ResourceOwnerPassword,
}
impl PasswordGrant {
	pub(crate) fn from_config(config: &PartnerConfig) -> Result<Self> {
		let token_url = TokenUrl::new(config.token_endpoint())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self {
			oauth_client,
			username: ResourceOwnerUsername::new(config.username.clone()),
			password: ResourceOwnerPassword::new(config.password.expose().to_owned()),
		})
	}

	/// Performs exactly one token-endpoint request; never retries.
	pub(crate) async fn exchange<C>(
		&self,
		http_client: &C,
	) -> Result<Credential, AuthenticationError>
	where
		C: ?Sized + PartnerHttpClient,
	{
		let meta = ResponseMetadataSlot::default();
		let instrumented = AcceptAnySuccess(http_client.with_metadata(meta.clone()));
		let response = self
			.oauth_client
			.exchange_password(&self.username, &self.password)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take().and_then(|m| m.status), err))?;
		let expires_in = response
			.expires_in()
			.ok_or_else(|| AuthenticationError::new("token response is missing expires_in"))?
			.as_millis();
		let expires_in = i64::try_from(expires_in)
			.map_err(|_| AuthenticationError::new("token response expires_in is out of range"))?;

		if expires_in <= 0 {
			return Err(AuthenticationError::new("token response expires_in must be positive"));
		}

		let issued_at = OffsetDateTime::now_utc();
		let token_type: &str = response.token_type().as_ref();

		Ok(Credential::expiring_in(
			response.access_token().secret().to_owned(),
			issued_at,
			Duration::milliseconds(expires_in),
		)
		.with_token_type(token_type))
	}
}

/// Reports every 2xx token response as `200 OK`, the only status `oauth2` parses as a
/// token; the metadata slot still records the original status.
struct AcceptAnySuccess<H>(H);
impl<'c, H> AsyncHttpClient<'c> for AcceptAnySuccess<H>
where
	H: for<'a> AsyncHttpClient<'a>,
	for<'a> <H as AsyncHttpClient<'a>>::Future: Send,
{
	type Error = <H as AsyncHttpClient<'c>>::Error;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let pending = self.0.call(request);

		Box::pin(async move {
			let mut response = pending.await?;

			if response.status().is_success() {
				*response.status_mut() = StatusCode::OK;
			}

			Ok(response)
		})
	}
}

fn map_request_error<E>(
	status: Option<u16>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> AuthenticationError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			AuthenticationError::new(reason).with_status(status)
		},
		RequestTokenError::Request(error) =>
			AuthenticationError::new("token endpoint is unreachable")
				.with_status(status)
				.with_source(error),
		RequestTokenError::Parse(error, _body) => match status {
			Some(code) if !(200..300).contains(&code) =>
				AuthenticationError::new(format!("token endpoint responded with HTTP {code}"))
					.with_status(status),
			_ => AuthenticationError::new("token endpoint returned malformed JSON")
				.with_status(status)
				.with_source(error),
		},
		RequestTokenError::Other(message) =>
			AuthenticationError::new(format!(
				"token endpoint returned an unexpected response: {message}"
			))
			.with_status(status),
	}
}
