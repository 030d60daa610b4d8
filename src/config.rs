//! Client configuration: backend location, auth endpoints, timeouts, and policy toggles.
//!
//! Values are assembled through [`ClientConfigBuilder`] (validated on `build`) or read from
//! `JOBBOARD_*` environment variables via [`ClientConfig::from_env`].

/// Builder API and environment loading for client configuration.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Build profile controlling how verbose `Unknown` error messages are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildProfile {
	/// Verbose messages that include status codes and body previews.
	Development,
	#[default]
	/// Generic, user-safe messages only.
	Production,
}
impl FromStr for BuildProfile {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(Self::Development),
			"production" | "prod" => Ok(Self::Production),
			_ => Err(()),
		}
	}
}

/// Whether a refresh token returned by the refresh endpoint replaces the held one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshRotation {
	#[default]
	/// Keep the original refresh token; ignore any rotated value.
	Ignore,
	/// Persist a rotated refresh token when the backend sends one.
	Accept,
}

/// How concurrent 401 responses share token refreshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCoalescing {
	#[default]
	/// Every request that sees a 401 refreshes on its own.
	Independent,
	/// Refreshes are serialized; a request whose failed token was already replaced skips
	/// the network call and replays with the current token.
	SingleFlight,
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Backend origin (optionally with a path), e.g. `https://api.example.com`.
	pub base_url: Url,
	/// Versioned path prefix inserted between the base URL and request paths.
	pub api_prefix: String,
	/// Default per-call timeout.
	pub timeout: StdDuration,
	/// Login endpoint path (relative to the prefix).
	pub login_path: String,
	/// Refresh endpoint path (relative to the prefix).
	pub refresh_path: String,
	/// Backoff applied when a 429 carries no usable `Retry-After` header.
	pub default_retry_after: Duration,
	/// Build profile.
	pub profile: BuildProfile,
	/// Header name carrying a discovered CSRF token.
	pub csrf_header: String,
	/// Refresh token rotation policy.
	pub refresh_rotation: RefreshRotation,
	/// Concurrent refresh policy.
	pub refresh_coalescing: RefreshCoalescing,
}
impl ClientConfig {
	/// Default versioned prefix.
	pub const DEFAULT_API_PREFIX: &'static str = "/api/v1";
	/// Default login endpoint.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/auth/login/";
	/// Default refresh endpoint.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh/";
	/// Default backoff for 429 responses without `Retry-After`.
	pub const DEFAULT_RETRY_AFTER: Duration = Duration::seconds(60);
	/// Default per-call timeout; generous enough for a cold-starting backend.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(120);
	/// Default CSRF header name.
	pub const DEFAULT_CSRF_HEADER: &'static str = "X-CSRFToken";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a request path into an absolute endpoint URL.
	///
	/// Relative paths are appended to `base_url + api_prefix` (a leading `/` is optional and
	/// query strings are kept). Absolute `http(s)` URLs, such as pagination `next` links, are
	/// accepted only when they share the configured origin so bearer tokens never leave the
	/// backend.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let path = path.trim();

		if path.starts_with("http://") || path.starts_with("https://") {
			let url = Url::parse(path)
				.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })?;

			if url.origin() != self.base_url.origin() {
				return Err(ConfigError::ForeignOrigin { url: url.to_string() });
			}

			return Ok(url);
		}

		let joined = format!(
			"{}{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			self.api_prefix.trim_end_matches('/'),
			path.trim_start_matches('/'),
		);

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })
	}

	/// Returns `true` when `path` targets the login or refresh endpoint.
	///
	/// Those calls are never subject to the refresh-and-replay flow.
	pub fn is_auth_endpoint(&self, path: &str) -> bool {
		let resolved = match self.endpoint(path) {
			Ok(url) => url,
			Err(_) => return false,
		};

		[&self.login_path, &self.refresh_path].into_iter().any(|auth_path| {
			self.endpoint(auth_path)
				.map(|auth| trim_slash(auth.path()) == trim_slash(resolved.path()))
				.unwrap_or(false)
		})
	}
}

fn trim_slash(path: &str) -> &str {
	path.trim_end_matches('/')
}
