//! The authenticated API client and its request pipeline.
//!
//! [`ApiClient`] owns the configuration, transport, credential store, backoff window, CSRF
//! source, and clock so every call site goes through one surface. A call walks the
//! [`RequestPhase`] machine: it short-circuits while a backoff window is active, attaches
//! the held bearer token, and on a 401 performs at most one refresh followed by at most
//! one replay. Everything else is normalized into [`ClientError`] and returned untouched.

pub mod refresh;
pub mod request;

mod session;

pub use refresh::*;
pub use request::*;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	clock::{Clock, SystemClock},
	config::ClientConfig,
	csrf::{CsrfSource, NoCsrf},
	http::{HttpTransport, TransportErrorMapper},
	rate_limit::RateLimitWindow,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestTransport, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestApiClient = ApiClient<ReqwestTransport, ReqwestTransportErrorMapper>;

/// Single call surface for authorized requests against the job-board backend.
///
/// The credential pair and the backoff deadline are shared by all clones of a client and
/// are guarded by locks, so concurrent tasks observe last-writer-wins credentials and a
/// deadline that only ever grows.
pub struct ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Backend location, endpoints, and policy toggles.
	pub config: ClientConfig,
	/// Transport used for every outbound call.
	pub transport: Arc<T>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Backing store holding the session's credential pair.
	pub store: Arc<dyn CredentialStore>,
	/// CSRF token source consulted on every call.
	pub csrf: Arc<dyn CsrfSource>,
	/// Time source for backoff windows and credential timestamps.
	pub clock: Arc<dyn Clock>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	rate_limit: Arc<RateLimitWindow>,
	refresh_guard: Arc<AsyncMutex<()>>,
	// Refresh token of a pair the store failed to discard; never served again.
	expired_refresh: Arc<Mutex<Option<TokenSecret>>>,
}
impl<T, M> ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			config,
			transport: transport.into(),
			transport_mapper: mapper.into(),
			store,
			csrf: Arc::new(NoCsrf),
			clock: Arc::new(SystemClock),
			refresh_metrics: Default::default(),
			rate_limit: Default::default(),
			refresh_guard: Default::default(),
			expired_refresh: Default::default(),
		}
	}

	/// Replaces the CSRF token source.
	pub fn with_csrf_source(mut self, csrf: Arc<dyn CsrfSource>) -> Self {
		self.csrf = csrf;

		self
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport, ReqwestTransportErrorMapper> {
	/// Creates a new client backed by a reqwest transport built from `config`.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, store, transport, Arc::new(ReqwestTransportErrorMapper)))
	}
}
impl<T, M> Clone for ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			transport_mapper: self.transport_mapper.clone(),
			store: self.store.clone(),
			csrf: self.csrf.clone(),
			clock: self.clock.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			rate_limit: self.rate_limit.clone(),
			refresh_guard: self.refresh_guard.clone(),
			expired_refresh: self.expired_refresh.clone(),
		}
	}
}
impl<T, M> Debug for ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("api_prefix", &self.config.api_prefix)
			.field("profile", &self.config.profile)
			.field("rate_limit", &self.rate_limit)
			.finish()
	}
}

/// Decodes a JSON body with path-aware errors; an empty body decodes as `null`.
pub(crate) fn decode_json<R>(body: &[u8]) -> Result<R, serde_path_to_error::Error<serde_json::Error>>
where
	R: DeserializeOwned,
{
	let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"null" } else { body };
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
}
