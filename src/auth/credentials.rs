//! The access/refresh credential pair held for a session.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access/refresh token pair; at most one pair is held per client at a time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived credential presented on each authorized request.
	pub access_token: TokenSecret,
	/// Longer-lived credential exchanged for a new access token.
	pub refresh_token: TokenSecret,
	/// Instant the current access token was stored.
	pub issued_at: OffsetDateTime,
}
impl CredentialPair {
	/// Creates a pair stamped with the provided instant.
	pub fn new(
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		issued_at: OffsetDateTime,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			issued_at,
		}
	}

	/// Returns a copy carrying a replacement access token and the same refresh token.
	pub fn with_access_token(&self, access_token: impl Into<String>, issued_at: OffsetDateTime) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: self.refresh_token.clone(),
			issued_at,
		}
	}

	/// Replaces the refresh token (only used when rotation is accepted).
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = TokenSecret::new(refresh_token);

		self
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.finish()
	}
}
