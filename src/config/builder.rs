// self
use crate::{
	_prelude::*,
	config::{BuildProfile, ClientConfig, RefreshCoalescing, RefreshRotation},
};

/// Environment variable holding the backend base URL (required).
pub const ENV_API_URL: &str = "JOBBOARD_API_URL";
/// Environment variable overriding the versioned API prefix.
pub const ENV_API_PREFIX: &str = "JOBBOARD_API_PREFIX";
/// Environment variable overriding the default timeout, in whole seconds.
pub const ENV_API_TIMEOUT_SECS: &str = "JOBBOARD_API_TIMEOUT_SECS";
/// Environment variable selecting the build profile (`production` / `development`).
pub const ENV_PROFILE: &str = "JOBBOARD_ENV";

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Backend base URL.
	pub base_url: Url,
	/// Versioned path prefix.
	pub api_prefix: String,
	/// Default per-call timeout.
	pub timeout: StdDuration,
	/// Login endpoint path.
	pub login_path: String,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Fallback backoff for 429 responses.
	pub default_retry_after: Duration,
	/// Build profile.
	pub profile: BuildProfile,
	/// CSRF header name.
	pub csrf_header: String,
	/// Refresh token rotation policy.
	pub refresh_rotation: RefreshRotation,
	/// Concurrent refresh policy.
	pub refresh_coalescing: RefreshCoalescing,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			api_prefix: ClientConfig::DEFAULT_API_PREFIX.into(),
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			login_path: ClientConfig::DEFAULT_LOGIN_PATH.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			default_retry_after: ClientConfig::DEFAULT_RETRY_AFTER,
			profile: BuildProfile::default(),
			csrf_header: ClientConfig::DEFAULT_CSRF_HEADER.into(),
			refresh_rotation: RefreshRotation::default(),
			refresh_coalescing: RefreshCoalescing::default(),
		}
	}

	/// Sets the versioned path prefix; an empty string disables it.
	pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.api_prefix = prefix.into();

		self
	}

	/// Sets the default per-call timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Sets the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the fallback backoff applied to 429 responses without `Retry-After`.
	pub fn default_retry_after(mut self, backoff: Duration) -> Self {
		self.default_retry_after = if backoff.is_negative() { Duration::ZERO } else { backoff };

		self
	}

	/// Sets the build profile.
	pub fn profile(mut self, profile: BuildProfile) -> Self {
		self.profile = profile;

		self
	}

	/// Sets the CSRF header name.
	pub fn csrf_header(mut self, header: impl Into<String>) -> Self {
		self.csrf_header = header.into();

		self
	}

	/// Sets the refresh token rotation policy.
	pub fn refresh_rotation(mut self, rotation: RefreshRotation) -> Self {
		self.refresh_rotation = rotation;

		self
	}

	/// Sets the concurrent refresh policy.
	pub fn refresh_coalescing(mut self, coalescing: RefreshCoalescing) -> Self {
		self.refresh_coalescing = coalescing;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			api_prefix: self.api_prefix,
			timeout: self.timeout,
			login_path: self.login_path,
			refresh_path: self.refresh_path,
			default_retry_after: self.default_retry_after,
			profile: self.profile,
			csrf_header: self.csrf_header,
			refresh_rotation: self.refresh_rotation,
			refresh_coalescing: self.refresh_coalescing,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	/// Reads configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads configuration through `lookup`, which maps variable names to values.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let raw_url = lookup(ENV_API_URL)
			.filter(|value| !value.trim().is_empty())
			.ok_or(ConfigError::MissingEnv { name: ENV_API_URL })?;
		let base_url = Url::parse(raw_url.trim())
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder(base_url);

		if let Some(prefix) = lookup(ENV_API_PREFIX) {
			builder = builder.api_prefix(prefix.trim());
		}
		if let Some(raw) = lookup(ENV_API_TIMEOUT_SECS) {
			let secs = raw
				.trim()
				.parse::<u64>()
				.map_err(|_| ConfigError::InvalidEnv { name: ENV_API_TIMEOUT_SECS, value: raw })?;

			builder = builder.timeout(StdDuration::from_secs(secs));
		}
		if let Some(raw) = lookup(ENV_PROFILE) {
			let profile = raw
				.parse::<BuildProfile>()
				.map_err(|_| ConfigError::InvalidEnv { name: ENV_PROFILE, value: raw })?;

			builder = builder.profile(profile);
		}

		builder.build()
	}

	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.query().is_some() || self.base_url.fragment().is_some() {
			return Err(ConfigError::BaseUrlHasQuery { url: self.base_url.to_string() });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::NonPositiveTimeout);
		}
		if !self.api_prefix.is_empty() {
			validate_path(&self.api_prefix)?;
		}

		validate_path(&self.login_path)?;
		validate_path(&self.refresh_path)?;

		Ok(())
	}
}

fn validate_path(path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { path: path.to_owned() })
	}
}
