//! Per-request RSA signatures for the partner API.
//!
//! The signing string binds the lowercased method, the request target, the `Date` header
//! value, and the raw body bytes:
//!
//! ```text
//! (request-target): get /contracts
//! date: 2024-01-02T03:04:05.6780000Z
//! <body bytes>
//! ```
//!
//! The SHA-256 digest of that string is signed with RSA PKCS#1 v1.5 in raw mode (the
//! digest is padded directly, without a DigestInfo prefix or a second hash) and sent as
//! `realm="dax" algorithm="SHA256withRSA" headers="(request-target) date" signature="…"`.

mod date;
mod key;

pub use date::*;
pub use key::*;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::SigningError};

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "Signature";
/// Realm advertised in the signature header.
pub const SIGNATURE_REALM: &str = "dax";
/// Algorithm label advertised in the signature header.
pub const SIGNATURE_ALGORITHM: &str = "SHA256withRSA";
/// Pseudo-headers covered by the signature, in signing order.
pub const SIGNED_HEADERS: &str = "(request-target) date";

/// Request attributes covered by a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningContext<'a> {
	/// HTTP method; lowercased in the signing string.
	pub method: &'a str,
	/// Path plus optional query, exactly as sent.
	pub request_target: &'a str,
	/// Value of the `Date` header sent with the request.
	pub date: &'a str,
	/// Raw request body.
	pub body: &'a [u8],
}
impl<'a> SigningContext<'a> {
	/// Creates a context for a request without a body.
	pub fn new(method: &'a str, request_target: &'a str, date: &'a str) -> Self {
		Self { method, request_target, date, body: &[] }
	}

	/// Attaches the raw request body.
	pub fn with_body(mut self, body: &'a [u8]) -> Self {
		self.body = body;

		self
	}

	/// Builds the canonical byte string that gets hashed and signed.
	pub fn signing_string(&self) -> Vec<u8> {
		let head = format!(
			"(request-target): {} {}\ndate: {}\n",
			self.method.to_lowercase().trim(),
			self.request_target.trim(),
			self.date.trim(),
		);
		let mut buf = Vec::with_capacity(head.len() + self.body.len());

		buf.extend_from_slice(head.as_bytes());
		buf.extend_from_slice(self.body);

		buf
	}

	/// SHA-256 digest of [`signing_string`](Self::signing_string).
	pub fn digest(&self) -> [u8; 32] {
		Sha256::digest(self.signing_string()).into()
	}
}

/// Rendered signature plus the header value that carries it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureHeader {
	/// Base64-encoded RSA signature.
	pub signature: String,
}
impl SignatureHeader {
	/// Renders the exact header value expected by the partner API.
	pub fn header_value(&self) -> String {
		format!(
			"realm=\"{SIGNATURE_REALM}\" algorithm=\"{SIGNATURE_ALGORITHM}\" headers=\"{SIGNED_HEADERS}\" signature=\"{}\"",
			self.signature
		)
	}
}
impl Display for SignatureHeader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.header_value())
	}
}

/// Stateless request signer; safe to share across any number of concurrent callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestSigner;
impl RequestSigner {
	/// Signs `context` with `key`.
	pub fn sign(
		&self,
		context: &SigningContext<'_>,
		key: &SigningKey,
	) -> Result<SignatureHeader, SigningError> {
		let digest = context.digest();
		let signature = key
			.as_rsa()
			.sign(Pkcs1v15Sign::new_unprefixed(), &digest)
			.map_err(SigningError::Sign)?;

		Ok(SignatureHeader { signature: STANDARD.encode(signature) })
	}

	/// Verifies a base64 signature produced for `context` against `public_key`.
	pub fn verify(
		&self,
		context: &SigningContext<'_>,
		signature: &str,
		public_key: &RsaPublicKey,
	) -> Result<(), SigningError> {
		let raw = STANDARD.decode(signature.trim()).map_err(SigningError::verify)?;

		public_key
			.verify(Pkcs1v15Sign::new_unprefixed(), &context.digest(), &raw)
			.map_err(SigningError::verify)
	}
}
