//! Request and response values exchanged with the partner API.

// crates.io
use oauth2::{
	HttpResponse,
	http::{HeaderMap, Method, header::CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

const BODY_PREVIEW_CHARS: usize = 256;

/// A signed partner API call before credentials and signature are attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartnerRequest {
	/// HTTP method.
	pub method: Method,
	/// Path plus optional query, relative to the configured API URL.
	pub target: String,
	/// Raw body; signed and sent unmodified.
	pub body: Vec<u8>,
	/// Value of the `Content-Type` header, if any.
	pub content_type: Option<String>,
}
impl PartnerRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), body: Vec::new(), content_type: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(Method::GET, target)
	}

	/// Attaches a raw body with its content type.
	pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
		self.content_type = Some(content_type.into());
		self.body = body.into();

		self
	}

	/// Serializes `value` as the JSON body.
	pub fn with_json<T>(self, value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		Ok(self.with_body("application/json", serde_json::to_vec(value)?))
	}
}

/// Successful (2xx) partner API response.
#[derive(Clone, Debug)]
pub struct PartnerResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl PartnerResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the `Content-Type` header, if present and valid UTF-8.
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
	}

	/// Decodes the body as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the JSON body; failures report the path of the offending field.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(Error::Decode)
	}

	pub(crate) fn body_preview(&self) -> String {
		let text = String::from_utf8_lossy(&self.body);

		match text.char_indices().nth(BODY_PREVIEW_CHARS) {
			Some((cut, _)) => format!("{}…", &text[..cut]),
			None => text.into_owned(),
		}
	}
}
impl From<HttpResponse> for PartnerResponse {
	fn from(response: HttpResponse) -> Self {
		let status = response.status().as_u16();
		let (parts, body) = response.into_parts();

		Self { status, headers: parts.headers, body }
	}
}
