//! Cached bearer credential and its validity rules.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Bearer credential issued by the partner token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Access token; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Token type reported by the endpoint (usually `bearer`).
	pub token_type: String,
	/// Instant the credential was received.
	pub issued_at: OffsetDateTime,
	/// Instant the endpoint declared the token expired.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Creates a bearer credential with an absolute expiry.
	pub fn new(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			token_type: "bearer".into(),
			issued_at,
			expires_at,
		}
	}

	/// Creates a credential expiring `expires_in` after `issued_at`.
	pub fn expiring_in(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self::new(access_token, issued_at, issued_at + expires_in)
	}

	/// Overrides the reported token type.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Returns `true` while `instant + safety_buffer < expires_at`.
	pub fn is_valid_at(&self, instant: OffsetDateTime, safety_buffer: Duration) -> bool {
		instant + safety_buffer < self.expires_at
	}

	/// Returns the lifetime left at `instant`, clamped to zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
