//! Request descriptors, the per-call phase machine, and the main dispatch loop.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{ApiClient, decode_json},
	config::ClientConfig,
	http::{
		HttpTransport, Method, RequestBody, ResponseType, TransportErrorMapper, TransportRequest,
		TransportResponse,
	},
	normalize,
	obs::{self, CallKind, CallOutcome, CallSpan},
	page::Page,
	rate_limit::RateLimitDecision,
};

/// Per-call overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Overrides the configured timeout.
	pub timeout: Option<StdDuration>,
	/// Expected response representation.
	pub response_type: ResponseType,
	/// Disables the refresh-and-replay flow; a 401 is normalized like any other 4xx.
	pub skip_auth_refresh: bool,
	/// Never attaches the bearer token (implies `skip_auth_refresh`).
	pub anonymous: bool,
	/// Additional headers sent with the call.
	pub headers: Vec<(String, String)>,
}
impl RequestOptions {
	/// Overrides the timeout for this call.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the expected response representation.
	pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
		self.response_type = response_type;

		self
	}

	/// Opts out of the refresh-and-replay flow.
	pub fn skip_auth_refresh(mut self) -> Self {
		self.skip_auth_refresh = true;

		self
	}

	/// Sends the call without a bearer token.
	pub fn anonymous(mut self) -> Self {
		self.anonymous = true;

		self
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Lifecycle of a single logical call.
///
/// `Idle → Sending → (Done | Failed | AwaitingRefresh)`, then
/// `AwaitingRefresh → (Replaying | Failed)` and `Replaying → (Done | Failed)`. There is no
/// edge out of `Replaying` back to `AwaitingRefresh`, which is what bounds every call to a
/// single refresh and a single replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestPhase {
	/// Created, nothing sent yet.
	Idle,
	/// First attempt in flight.
	Sending,
	/// First attempt got a 401; refreshing the access token.
	AwaitingRefresh,
	/// Replay with the refreshed token in flight.
	Replaying,
	/// Completed with a 2xx response.
	Done,
	/// Completed with an error.
	Failed,
}
impl RequestPhase {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Sending => "sending",
			Self::AwaitingRefresh => "awaiting_refresh",
			Self::Replaying => "replaying",
			Self::Done => "done",
			Self::Failed => "failed",
		}
	}

	/// Returns `true` for `Done` and `Failed`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Done | Self::Failed)
	}

	/// Returns `true` when `next` is a legal successor of `self`.
	pub const fn can_transition(self, next: Self) -> bool {
		matches!(
			(self, next),
			(Self::Idle, Self::Sending)
				| (Self::Idle, Self::Failed)
				| (Self::Sending, Self::Done)
				| (Self::Sending, Self::Failed)
				| (Self::Sending, Self::AwaitingRefresh)
				| (Self::AwaitingRefresh, Self::Replaying)
				| (Self::AwaitingRefresh, Self::Failed)
				| (Self::Replaying, Self::Done)
				| (Self::Replaying, Self::Failed)
		)
	}
}
impl Display for RequestPhase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Deferred outbound call: method, path, body, options, and the single retry flag.
#[derive(Clone, Debug)]
pub struct PendingRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured prefix (or a same-origin absolute URL).
	pub path: String,
	/// Body, kept so the call can be replayed.
	pub body: RequestBody,
	/// Per-call overrides, including extra headers.
	pub options: RequestOptions,
	retried: bool,
	phase: RequestPhase,
}
impl PendingRequest {
	/// Creates an idle descriptor.
	pub fn new(
		method: Method,
		path: impl Into<String>,
		body: RequestBody,
		options: RequestOptions,
	) -> Self {
		Self { method, path: path.into(), body, options, retried: false, phase: RequestPhase::Idle }
	}

	/// Returns `true` once the single replay has been issued.
	pub fn retried(&self) -> bool {
		self.retried
	}

	/// Returns the current phase.
	pub fn phase(&self) -> RequestPhase {
		self.phase
	}

	/// Returns `true` when a 401 for this call may trigger a refresh.
	pub fn refreshable(&self, config: &ClientConfig) -> bool {
		!self.retried
			&& !self.options.skip_auth_refresh
			&& !self.options.anonymous
			&& !config.is_auth_endpoint(&self.path)
	}

	fn advance(&mut self, next: RequestPhase) {
		debug_assert!(
			self.phase.can_transition(next),
			"Illegal request phase transition {} -> {}.",
			self.phase,
			next
		);

		obs::trace_phase(self.phase.as_str(), next.as_str(), self.method.as_str(), &self.path);

		if next == RequestPhase::Replaying {
			self.retried = true;
		}

		self.phase = next;
	}
}

/// Successful (2xx) response handed back to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lower-cased name.
	pub headers: BTreeMap<String, String>,
	/// Raw body.
	pub body: Vec<u8>,
	/// Representation requested by the caller.
	pub response_type: ResponseType,
}
impl ApiResponse {
	fn from_transport(response: TransportResponse, response_type: ResponseType) -> Self {
		Self { status: response.status, headers: response.headers, body: response.body, response_type }
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Decodes the body as JSON; an empty body decodes as `null`.
	pub fn json<R>(&self) -> Result<R, serde_path_to_error::Error<serde_json::Error>>
	where
		R: DeserializeOwned,
	{
		decode_json(&self.body)
	}

	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns the raw body.
	pub fn bytes(&self) -> &[u8] {
		&self.body
	}
}

impl<T, M> ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Issues an authorized request against `path`.
	///
	/// Fails fast with [`ClientError::RateLimited`] while a backoff window is active, attaches
	/// the held bearer token (if any) plus a discovered CSRF token, and on a 401 refreshes the
	/// access token once and replays the call once. A 429 installs a backoff window and is
	/// never retried.
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		body: RequestBody,
		options: RequestOptions,
	) -> Result<ApiResponse> {
		self.execute(PendingRequest::new(method, path, body, options)).await
	}

	/// Drives a pre-built descriptor to completion.
	pub async fn execute(&self, mut pending: PendingRequest) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "request");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.drive(&mut pending)).await;

		pending.advance(if result.is_ok() { RequestPhase::Done } else { RequestPhase::Failed });
		self.record_result(KIND, &result);

		result
	}

	/// Issues a request and decodes the JSON response body into `R`.
	pub async fn request_json<R>(
		&self,
		method: Method,
		path: &str,
		body: RequestBody,
		options: RequestOptions,
	) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.request(method, path, body, options).await?;

		response.json().map_err(|err| {
			normalize::unknown(
				self.config.profile,
				format_args!("response body could not be decoded at `{}`: {}", err.path(), err.inner()),
			)
		})
	}

	/// Fetches one page of a paginated list endpoint.
	pub async fn get_page<R>(&self, path: &str) -> Result<Page<R>>
	where
		R: DeserializeOwned,
	{
		self.request_json(Method::Get, path, RequestBody::Empty, RequestOptions::default()).await
	}

	/// Follows the `next` link of `page`, returning `None` on the last page.
	pub async fn next_page<R>(&self, page: &Page<R>) -> Result<Option<Page<R>>>
	where
		R: DeserializeOwned,
	{
		match page.next.as_deref() {
			Some(next) => self.get_page(next).await.map(Some),
			None => Ok(None),
		}
	}

	async fn drive(&self, pending: &mut PendingRequest) -> Result<ApiResponse> {
		loop {
			self.ensure_window_open()?;

			let next = if pending.phase() == RequestPhase::AwaitingRefresh {
				RequestPhase::Replaying
			} else {
				RequestPhase::Sending
			};

			pending.advance(next);

			let access = if pending.options.anonymous {
				None
			} else {
				self.load_credentials().await?.map(|pair| pair.access_token)
			};
			let request = self.build_transport_request(
				pending.method,
				&pending.path,
				pending.body.clone(),
				&pending.options,
				access.as_ref(),
			)?;
			let response = self
				.transport
				.execute(request)
				.await
				.map_err(|err| self.transport_mapper.map_transport_error(err))?;

			if response.is_success() {
				return Ok(ApiResponse::from_transport(response, pending.options.response_type));
			}

			match response.status {
				429 => return Err(self.install_backoff(&response)),
				401 if pending.retried() && self.refresh_applies(pending) =>
					return Err(self.expire_session("replayed request rejected").await),
				401 if pending.refreshable(&self.config) => {
					pending.advance(RequestPhase::AwaitingRefresh);
					self.refresh_access_token(access).await?;
				},
				status =>
					return Err(normalize::normalize_response(
						status,
						&response.body,
						self.config.default_retry_after,
						self.config.profile,
					)),
			}
		}
	}

	fn refresh_applies(&self, pending: &PendingRequest) -> bool {
		!pending.options.skip_auth_refresh
			&& !pending.options.anonymous
			&& !self.config.is_auth_endpoint(&pending.path)
	}

	pub(crate) fn build_transport_request(
		&self,
		method: Method,
		path: &str,
		body: RequestBody,
		options: &RequestOptions,
		access: Option<&TokenSecret>,
	) -> Result<TransportRequest> {
		let url =
			self.config.endpoint(path).map_err(|err| normalize::unknown(self.config.profile, err))?;
		let mut headers = vec![("Accept".to_owned(), options.response_type.accept().to_owned())];

		if let Some(access) = access {
			headers.push(("Authorization".to_owned(), access.bearer()));
		}
		if let Some(csrf) = self.csrf.csrf_token() {
			headers.push((self.config.csrf_header.clone(), csrf.expose().to_owned()));
		}

		headers.extend(
			options.headers.iter().filter(|(name, _)| !name.eq_ignore_ascii_case("authorization")).cloned(),
		);

		Ok(TransportRequest {
			method,
			url,
			headers,
			body,
			timeout: options.timeout.unwrap_or(self.config.timeout),
		})
	}

	pub(crate) fn ensure_window_open(&self) -> Result<()> {
		match self.rate_limit.check(self.clock.now()) {
			RateLimitDecision::Allow => Ok(()),
			RateLimitDecision::Delay(directive) =>
				Err(ClientError::RateLimited { retry_after: directive.recommended_backoff }),
		}
	}

	pub(crate) fn install_backoff(&self, response: &TransportResponse) -> ClientError {
		let now = self.clock.now();
		let retry_after =
			response.metadata(now).retry_after.unwrap_or(self.config.default_retry_after);
		let requested =
			now.checked_add(retry_after).unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc());
		let deadline = self.rate_limit.extend(requested);

		obs::trace_backoff(retry_after, deadline);

		ClientError::RateLimited { retry_after: deadline - now }
	}

	pub(crate) fn record_result<R>(&self, kind: CallKind, result: &Result<R>) {
		match result {
			Ok(_) => obs::record_call_outcome(kind, CallOutcome::Success),
			Err(err) => {
				obs::record_call_outcome(kind, CallOutcome::Failure);
				obs::record_call_error(kind, err.kind());
			},
		}
	}
}
