//! Transport primitives for backend calls.
//!
//! The module exposes [`HttpTransport`] alongside the owned [`TransportRequest`] and
//! [`TransportResponse`] values so downstream crates can plug in a custom HTTP stack (or a
//! fake one in tests) without the client depending on reqwest types. Transport failures are
//! translated into the closed [`ClientError`] taxonomy by a [`TransportErrorMapper`]; HTTP
//! status handling stays in the client so every transport classifies responses identically.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	header::CONTENT_TYPE,
	multipart::{Form, Part},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::config::ClientConfig;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a single backend call.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a client, and the returned future must be `Send` so callers can drive requests
/// from multi-threaded executors. A transport performs exactly one network exchange per
/// `execute` call: no retries, no redirects to foreign origins, no status interpretation.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and resolves once the full response body has been read.
	fn execute(
		&self,
		request: TransportRequest,
	) -> TransportFuture<'_, TransportResponse, Self::TransportError>;
}

/// Maps transport-level failures into client [`ClientError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an error emitted by the transport into one of the closed client categories.
	///
	/// Implementations should produce [`ClientError::Timeout`] or
	/// [`ClientError::NetworkUnavailable`] and reserve [`ClientError::Unknown`] for failures
	/// that happen before anything reaches the wire.
	fn map_transport_error(&self, error: E) -> ClientError;
}

/// HTTP methods used against the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}

/// Outbound request body.
///
/// Every variant owns its data so a request can be replayed after a token refresh.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	#[default]
	/// No body.
	Empty,
	/// JSON document sent as `application/json`.
	Json(serde_json::Value),
	/// URL-encoded form fields.
	Form(Vec<(String, String)>),
	/// Raw bytes with an explicit content type.
	Bytes {
		/// Value of the `Content-Type` header.
		content_type: String,
		/// Payload.
		data: Vec<u8>,
	},
	/// `multipart/form-data` parts (resume uploads, logos, ...).
	Multipart(Vec<MultipartPart>),
}
impl RequestBody {
	/// Serializes `value` into a JSON body.
	pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_value(value).map(Self::Json)
	}

	/// Builds a URL-encoded form body.
	pub fn form<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	/// Returns `true` for [`RequestBody::Empty`].
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}
}

/// Single `multipart/form-data` part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Form field name.
	pub name: String,
	/// Field value.
	pub value: MultipartValue,
}
impl MultipartPart {
	/// Creates a plain text part.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: MultipartValue::Text(value.into()) }
	}

	/// Creates a file part.
	pub fn file(
		name: impl Into<String>,
		file_name: impl Into<String>,
		content_type: Option<String>,
		data: Vec<u8>,
	) -> Self {
		Self {
			name: name.into(),
			value: MultipartValue::File { file_name: file_name.into(), content_type, data },
		}
	}
}

/// Value carried by a [`MultipartPart`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartValue {
	/// Text field.
	Text(String),
	/// File upload.
	File {
		/// File name reported to the backend.
		file_name: String,
		/// Optional MIME type.
		content_type: Option<String>,
		/// File contents.
		data: Vec<u8>,
	},
}

/// Expected response representation; drives the `Accept` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
	#[default]
	/// JSON documents.
	Json,
	/// Plain text (CSV exports, health checks).
	Text,
	/// Arbitrary binary content (PDF exports, files).
	Bytes,
}
impl ResponseType {
	/// Returns the `Accept` header value for this representation.
	pub const fn accept(self) -> &'static str {
		match self {
			Self::Json => "application/json",
			Self::Text => "text/plain, text/csv, */*;q=0.5",
			Self::Bytes => "*/*",
		}
	}
}

/// Fully resolved request handed to a transport.
#[derive(Clone)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Header name/value pairs, in insertion order.
	pub headers: Vec<(String, String)>,
	/// Body.
	pub body: RequestBody,
	/// Time bound for the whole exchange.
	pub timeout: StdDuration,
}
impl TransportRequest {
	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for TransportRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let lowered = name.to_ascii_lowercase();

				if lowered == "authorization" || lowered.contains("csrf") {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("TransportRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lower-cased name.
	pub headers: BTreeMap<String, String>,
	/// Response body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Creates an empty response with the provided status.
	pub fn new(status: u16) -> Self {
		Self { status, ..Default::default() }
	}

	/// Adds a header (name is lower-cased).
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Extracts status and `Retry-After` metadata relative to `now`.
	pub fn metadata(&self, now: OffsetDateTime) -> ResponseMetadata {
		ResponseMetadata {
			status: Some(self.status),
			retry_after: self.header("retry-after").and_then(|raw| parse_retry_after(raw, now)),
		}
	}
}

/// Metadata captured from a response for error mapping and backoff decisions.
///
/// Additional metadata fields may be added in future releases, so downstream code
/// should construct values using field names instead of struct update syntax.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a reqwest client whose default timeout and user agent follow `config`.
	///
	/// Per-call timeouts still override the default on each request.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(config.timeout)
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type TransportError = ReqwestError;

	fn execute(
		&self,
		request: TransportRequest,
	) -> TransportFuture<'_, TransportResponse, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let TransportRequest { method, url, headers, body, timeout } = request;
			let mut builder = client.request(method.into(), url).timeout(timeout);

			for (name, value) in &headers {
				builder = builder.header(name.as_str(), value.as_str());
			}

			builder = match body {
				RequestBody::Empty => builder,
				RequestBody::Json(value) =>
					builder.header(CONTENT_TYPE, "application/json").body(value.to_string()),
				RequestBody::Form(pairs) => builder.form(&pairs),
				RequestBody::Bytes { content_type, data } =>
					builder.header(CONTENT_TYPE, content_type).body(data),
				RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
			};

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn multipart_form(parts: Vec<MultipartPart>) -> Result<Form, ReqwestError> {
	let mut form = Form::new();

	for MultipartPart { name, value } in parts {
		form = match value {
			MultipartValue::Text(text) => form.text(name, text),
			MultipartValue::File { file_name, content_type, data } => {
				let mut part = Part::bytes(data).file_name(file_name);

				if let Some(content_type) = content_type {
					part = part.mime_str(&content_type)?;
				}

				form.part(name, part)
			},
		};
	}

	Ok(form)
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: ReqwestError) -> ClientError {
		if err.is_timeout() {
			return ClientError::Timeout;
		}
		if err.is_builder() {
			return ClientError::Unknown { message: "The request could not be constructed.".into() };
		}

		ClientError::NetworkUnavailable
	}
}

/// Longest backoff a single `Retry-After` hint can install.
pub const MAX_RETRY_AFTER: Duration = Duration::days(1);

/// Parses a `Retry-After` value given as delta-seconds or an RFC 2822 date.
///
/// Dates in the past, negative numbers, and unparsable values yield `None`. Hints longer
/// than [`MAX_RETRY_AFTER`] are clamped to it.
pub fn parse_retry_after(raw: &str, now: OffsetDateTime) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		let secs = secs.min(MAX_RETRY_AFTER.whole_seconds().unsigned_abs());

		return i64::try_from(secs).ok().map(Duration::seconds);
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta.min(MAX_RETRY_AFTER));
		}
	}

	None
}
