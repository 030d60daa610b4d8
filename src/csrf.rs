//! CSRF token discovery for backends that pair bearer auth with session cookies.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Supplies the CSRF token currently visible to the caller, if any.
///
/// Implementations are consulted once per outbound call (including replays) so a token
/// rotated between attempts is always picked up. Values are secrets and must never be
/// logged.
pub trait CsrfSource
where
	Self: Send + Sync,
{
	/// Returns the current token, or `None` to send the request without one.
	fn csrf_token(&self) -> Option<TokenSecret>;
}

/// Source that never yields a token.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCsrf;
impl CsrfSource for NoCsrf {
	fn csrf_token(&self) -> Option<TokenSecret> {
		None
	}
}

/// Swappable token captured from the surrounding application (cookie jar, meta tag, ...).
#[derive(Debug, Default)]
pub struct StaticCsrfToken(RwLock<Option<TokenSecret>>);
impl StaticCsrfToken {
	/// Creates a source seeded with `token`.
	pub fn new(token: impl Into<String>) -> Self {
		Self(RwLock::new(Some(TokenSecret::new(token))))
	}

	/// Replaces the held token.
	pub fn set(&self, token: impl Into<String>) {
		*self.0.write() = Some(TokenSecret::new(token));
	}

	/// Forgets the held token.
	pub fn clear(&self) {
		*self.0.write() = None;
	}
}
impl CsrfSource for StaticCsrfToken {
	fn csrf_token(&self) -> Option<TokenSecret> {
		self.0.read().clone().filter(|token| !token.is_empty())
	}
}
