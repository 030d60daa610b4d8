//! Client-level error types shared by the request pipeline, configuration, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`ClientError`] by default.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Closed, user-safe error taxonomy returned by [`ApiClient::request`].
///
/// Messages never echo raw backend bodies, stack traces, or transport internals; only the
/// category and a sanitized message cross the boundary into the UI layer.
///
/// [`ApiClient::request`]: crate::client::ApiClient::request
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientError {
	/// A backoff window is active; wait before retrying.
	#[error("Too many requests. Try again in {} seconds.", whole_seconds_rounded_up(retry_after))]
	RateLimited {
		/// Remaining time until the backoff window closes.
		retry_after: Duration,
	},
	/// Credentials are invalid or expired and could not be recovered.
	#[error("Your session has expired. Please sign in again.")]
	AuthenticationExpired,
	/// Authenticated but not authorized (HTTP 403).
	#[error("{message}")]
	Forbidden {
		/// Sanitized message suitable for display.
		message: String,
	},
	/// No response reached the client (connection-level failure).
	#[error("The server could not be reached. Check your connection and try again.")]
	NetworkUnavailable,
	/// The request exceeded its time bound.
	#[error("The request timed out. Please try again.")]
	Timeout,
	/// Backend failure (HTTP 5xx); the message is always generic.
	#[error("{message}")]
	ServerError {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Generic message suitable for display.
		message: String,
	},
	/// HTTP 4xx (other than 403 and 429) carrying an error envelope.
	///
	/// Field-keyed envelopes fill `fields`. A detail-only envelope, such as a rejected login
	/// or `{"detail": "Not found."}` on a 404, lands here too with an empty `fields` map.
	#[error("{message}")]
	ValidationFailed {
		/// Flattened `field: message` list (or the envelope's detail text).
		message: String,
		/// Field-keyed messages; empty when the backend only returned a detail string.
		fields: BTreeMap<String, Vec<String>>,
	},
	/// Anything not classified above.
	#[error("{message}")]
	Unknown {
		/// Generic in production builds, verbose in development builds.
		message: String,
	},
}
impl ClientError {
	/// Returns the category label of this error.
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::RateLimited { .. } => ErrorKind::RateLimited,
			Self::AuthenticationExpired => ErrorKind::AuthenticationExpired,
			Self::Forbidden { .. } => ErrorKind::Forbidden,
			Self::NetworkUnavailable => ErrorKind::NetworkUnavailable,
			Self::Timeout => ErrorKind::Timeout,
			Self::ServerError { .. } => ErrorKind::ServerError,
			Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
			Self::Unknown { .. } => ErrorKind::Unknown,
		}
	}

	/// Returns `true` when the UI must force the user back to a login view.
	pub const fn requires_login(&self) -> bool {
		matches!(self, Self::AuthenticationExpired)
	}
}

/// Field-less mirror of [`ClientError`] used for matching and labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`ClientError::RateLimited`].
	RateLimited,
	/// See [`ClientError::AuthenticationExpired`].
	AuthenticationExpired,
	/// See [`ClientError::Forbidden`].
	Forbidden,
	/// See [`ClientError::NetworkUnavailable`].
	NetworkUnavailable,
	/// See [`ClientError::Timeout`].
	Timeout,
	/// See [`ClientError::ServerError`].
	ServerError,
	/// See [`ClientError::ValidationFailed`].
	ValidationFailed,
	/// See [`ClientError::Unknown`].
	Unknown,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RateLimited => "rate_limited",
			Self::AuthenticationExpired => "authentication_expired",
			Self::Forbidden => "forbidden",
			Self::NetworkUnavailable => "network_unavailable",
			Self::Timeout => "timeout",
			Self::ServerError => "server_error",
			Self::ValidationFailed => "validation_failed",
			Self::Unknown => "unknown",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

fn whole_seconds_rounded_up(duration: &Duration) -> i64 {
	let whole = duration.whole_seconds();

	if duration.subsec_nanoseconds() > 0 { whole + 1 } else { whole }
}

/// Configuration and validation failures raised while building or addressing the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required environment variable is not set.
	#[error("Environment variable `{name}` is required.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds a value that cannot be used.
	#[error("Environment variable `{name}` has an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Offending value.
		value: String,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http/https.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Base URL carries a query string or fragment.
	#[error("Base URL must not carry a query string or fragment: {url}.")]
	BaseUrlHasQuery {
		/// Offending URL.
		url: String,
	},
	/// Timeout must be greater than zero.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// Configured path does not start with `/`.
	#[error("Path `{path}` must start with `/`.")]
	InvalidPath {
		/// Offending path.
		path: String,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved.")]
	InvalidEndpoint {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Absolute URL points at a different origin than the configured backend.
	#[error("Refusing to send credentials to a foreign origin: {url}.")]
	ForeignOrigin {
		/// Offending URL.
		url: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kinds_expose_stable_labels() {
		let err = ClientError::RateLimited { retry_after: Duration::seconds(30) };

		assert_eq!(err.kind(), ErrorKind::RateLimited);
		assert_eq!(err.kind().as_str(), "rate_limited");
		assert_eq!(err.to_string(), "Too many requests. Try again in 30 seconds.");
		assert_eq!(
			ClientError::RateLimited { retry_after: Duration::milliseconds(600) }.to_string(),
			"Too many requests. Try again in 1 seconds.",
		);
		assert_eq!(
			ClientError::RateLimited { retry_after: Duration::milliseconds(29_001) }.to_string(),
			"Too many requests. Try again in 30 seconds.",
		);
		assert!(ClientError::AuthenticationExpired.requires_login());
		assert!(!ClientError::Timeout.requires_login());
	}

	#[test]
	fn config_error_wraps_builder_source() {
		let err = ConfigError::http_client_build(std::io::Error::other("tls backend missing"));
		let source = StdError::source(&err).expect("Builder failure should expose its source.");

		assert_eq!(source.to_string(), "tls backend missing");
	}
}
