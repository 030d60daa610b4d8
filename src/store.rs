//! Storage contracts and built-in backing stores for the session's credential pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Backing store for the single credential pair held by a client.
///
/// A store holds at most one pair. Saving replaces whatever was there, which is how a
/// new login invalidates the previous session on the client side.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the held pair, if any.
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>>;

	/// Stores `pair`, replacing any previous pair.
	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Removes the held pair, returning it.
	fn clear(&self) -> StoreFuture<'_, Option<CredentialPair>>;

	/// Atomically installs `replacement` if the held pair still carries `expected_refresh`.
	///
	/// Refreshes use this so a refresh that completes after a logout or a new login never
	/// resurrects or overwrites a different session.
	fn compare_and_swap_access<'a>(
		&'a self,
		expected_refresh: &'a str,
		replacement: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Result of a credential compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh secret matched and the pair was replaced.
	Updated,
	/// A pair is held but it carries a different refresh secret.
	RefreshMismatch,
	/// No pair is held.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

pub(crate) fn compare_and_swap(
	slot: &mut Option<CredentialPair>,
	expected_refresh: &str,
	replacement: CredentialPair,
) -> CompareAndSwapOutcome {
	let outcome = match slot.as_ref() {
		Some(existing) if refresh_matches(&existing.refresh_token, expected_refresh) =>
			CompareAndSwapOutcome::Updated,
		Some(_) => CompareAndSwapOutcome::RefreshMismatch,
		None => CompareAndSwapOutcome::Missing,
	};

	if matches!(outcome, CompareAndSwapOutcome::Updated) {
		*slot = Some(replacement);
	}

	outcome
}

fn refresh_matches(current: &TokenSecret, expected: &str) -> bool {
	current.expose() == expected
}
