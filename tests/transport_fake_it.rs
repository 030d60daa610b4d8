// self
use jobboard_client::{
	_preludet::*,
	auth::CredentialPair,
	client::{ApiClient, RequestOptions},
	config::{BuildProfile, ClientConfig, RefreshCoalescing, RefreshRotation},
	http::{
		HttpTransport, MAX_RETRY_AFTER, Method, RequestBody, TransportErrorMapper,
		TransportFuture, TransportRequest, TransportResponse,
	},
	store::{CompareAndSwapOutcome, StoreError, StoreFuture},
};

#[derive(Debug, ThisError)]
enum FakeError {
	#[error("Simulated timeout.")]
	Timeout,
	#[error("Simulated connection reset.")]
	Reset,
}

#[derive(Debug)]
struct FakeMapper;
impl TransportErrorMapper<FakeError> for FakeMapper {
	fn map_transport_error(&self, error: FakeError) -> ClientError {
		match error {
			FakeError::Timeout => ClientError::Timeout,
			FakeError::Reset => ClientError::NetworkUnavailable,
		}
	}
}

type Handler = dyn Fn(&TransportRequest) -> Result<TransportResponse, FakeError> + Send + Sync;

/// Scripted transport that yields once per call so concurrent requests interleave.
struct FakeTransport {
	handler: Box<Handler>,
	calls: Mutex<Vec<(Method, String, Option<String>)>>,
}
impl FakeTransport {
	fn new<F>(handler: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&TransportRequest) -> Result<TransportResponse, FakeError>,
	{
		Self { handler: Box::new(handler), calls: Mutex::new(Vec::new()) }
	}

	fn calls_to(&self, path: &str) -> usize {
		self.calls.lock().iter().filter(|(_, called, _)| called == path).count()
	}

	fn last_authorization(&self, path: &str) -> Option<String> {
		self.calls
			.lock()
			.iter()
			.rev()
			.find(|(_, called, _)| called == path)
			.and_then(|(_, _, authorization)| authorization.clone())
	}
}
impl HttpTransport for FakeTransport {
	type TransportError = FakeError;

	fn execute(
		&self,
		request: TransportRequest,
	) -> TransportFuture<'_, TransportResponse, Self::TransportError> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			self.calls.lock().push((
				request.method,
				request.url.path().to_owned(),
				request.header("authorization").map(str::to_owned),
			));

			(self.handler)(&request)
		})
	}
}

/// Memory store that can be told to fail reads or deletions.
#[derive(Default)]
struct FaultyStore {
	inner: MemoryStore,
	failing_load: bool,
	failing_clear: bool,
}
impl FaultyStore {
	fn backend_error() -> StoreError {
		StoreError::Backend { message: "storage is read-only".into() }
	}
}
impl CredentialStore for FaultyStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		if self.failing_load {
			return Box::pin(async { Err(Self::backend_error()) });
		}

		self.inner.load()
	}

	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		self.inner.save(pair)
	}

	fn clear(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		if self.failing_clear {
			return Box::pin(async { Err(Self::backend_error()) });
		}

		self.inner.clear()
	}

	fn compare_and_swap_access<'a>(
		&'a self,
		expected_refresh: &'a str,
		replacement: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		self.inner.compare_and_swap_access(expected_refresh, replacement)
	}
}

type FakeClient = ApiClient<FakeTransport, FakeMapper>;

fn fake_config() -> ClientConfig {
	ClientConfig::builder(Url::parse("https://jobs.example.com").expect("Fixture URL should parse."))
		.profile(BuildProfile::Development)
		.build()
		.expect("Fixture configuration should build.")
}

fn fake_client(
	config: ClientConfig,
	transport: FakeTransport,
) -> (FakeClient, Arc<FakeTransport>, Arc<MemoryStore>, ManualClock) {
	let store = Arc::new(MemoryStore::default());
	let (client, transport, clock) = fake_client_with_store(config, store.clone(), transport);

	(client, transport, store, clock)
}

fn fake_client_with_store(
	config: ClientConfig,
	store: Arc<dyn CredentialStore>,
	transport: FakeTransport,
) -> (FakeClient, Arc<FakeTransport>, ManualClock) {
	let clock = ManualClock::starting_now();
	let transport = Arc::new(transport);
	let client: FakeClient = ApiClient::with_transport(config, store, transport.clone(), FakeMapper)
		.with_clock(Arc::new(clock.clone()));

	(client, transport, clock)
}

fn json(status: u16, body: &str) -> TransportResponse {
	TransportResponse::new(status).with_header("content-type", "application/json").with_body(body)
}

/// Jobs accept only `Bearer A2`; refresh hands out `A2` (and optionally rotates to `R2`).
fn token_rotation_backend(rotated_refresh: Option<&'static str>) -> FakeTransport {
	FakeTransport::new(move |request| match request.url.path() {
		"/api/v1/auth/refresh/" => Ok(match rotated_refresh {
			Some(refresh) => json(200, &format!("{{\"access\":\"A2\",\"refresh\":\"{refresh}\"}}")),
			None => json(200, "{\"access\":\"A2\"}"),
		}),
		_ if request.header("authorization") == Some("Bearer A2") => Ok(json(200, "{\"ok\":true}")),
		_ => Ok(json(401, "{\"detail\":\"Token expired\"}")),
	})
}

async fn get(client: &FakeClient, path: &str) -> Result<serde_json::Value> {
	client.request_json(Method::Get, path, RequestBody::Empty, RequestOptions::default()).await
}

#[tokio::test]
async fn active_window_never_reaches_the_transport() {
	let (client, transport, _store, clock) = fake_client(
		fake_config(),
		FakeTransport::new(|_| Ok(TransportResponse::new(429).with_header("retry-after", "5"))),
	);
	let first = get(&client, "/jobs/").await.expect_err("Throttled call should fail.");

	assert_eq!(first, ClientError::RateLimited { retry_after: Duration::seconds(5) });

	for path in ["/jobs/", "/applications/", "/auth/login/"] {
		let err = get(&client, path).await.expect_err("Calls inside the window should fail.");

		assert!(matches!(err, ClientError::RateLimited { .. }));
	}

	assert_eq!(transport.calls.lock().len(), 1);

	clock.advance(Duration::seconds(5));

	let _ = get(&client, "/jobs/").await;

	assert_eq!(transport.calls.lock().len(), 2);
}

#[tokio::test]
async fn later_throttle_signals_only_extend_the_window() {
	let (client, _transport, _store, clock) = fake_client(
		fake_config(),
		FakeTransport::new(|request| {
			let retry_after = if request.url.path().ends_with("/long/") { "120" } else { "10" };

			Ok(TransportResponse::new(429).with_header("retry-after", retry_after))
		}),
	);
	let started = clock.now();
	let (long, short) = tokio::join!(get(&client, "/long/"), get(&client, "/short/"));

	assert_eq!(long, Err(ClientError::RateLimited { retry_after: Duration::seconds(120) }));
	assert_eq!(short, Err(ClientError::RateLimited { retry_after: Duration::seconds(120) }));
	assert_eq!(client.rate_limit_deadline(), Some(started + Duration::seconds(120)));
}

#[tokio::test]
async fn oversized_retry_after_is_clamped() {
	let (client, _transport, _store, clock) = fake_client(
		fake_config(),
		FakeTransport::new(|_| {
			Ok(TransportResponse::new(429).with_header("retry-after", "400000000000"))
		}),
	);
	let started = clock.now();

	assert_eq!(
		get(&client, "/jobs/").await,
		Err(ClientError::RateLimited { retry_after: MAX_RETRY_AFTER }),
	);
	assert_eq!(client.rate_limit_deadline(), Some(started + MAX_RETRY_AFTER));
}

#[tokio::test]
async fn transport_failures_are_mapped() {
	let (client, _transport, store, _clock) = fake_client(
		fake_config(),
		FakeTransport::new(|request| match request.url.path() {
			"/api/v1/slow/" => Err(FakeError::Timeout),
			_ => Err(FakeError::Reset),
		}),
	);

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	assert_eq!(get(&client, "/slow/").await, Err(ClientError::Timeout));
	assert_eq!(get(&client, "/jobs/").await, Err(ClientError::NetworkUnavailable));
	assert!(store.snapshot().is_some());
	assert_eq!(client.rate_limit_deadline(), None);
}

#[tokio::test]
async fn rotated_refresh_token_is_ignored_by_default() {
	let (client, _transport, store, _clock) =
		fake_client(fake_config(), token_rotation_backend(Some("R2")));

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");
	get(&client, "/jobs/").await.expect("Replay should succeed.");

	let held = store.snapshot().expect("Credentials should be held.");

	assert_eq!(held.access_token.expose(), "A2");
	assert_eq!(held.refresh_token.expose(), "R1");
}

#[tokio::test]
async fn rotated_refresh_token_is_stored_when_accepted() {
	let mut config = fake_config();

	config.refresh_rotation = RefreshRotation::Accept;

	let (client, _transport, store, _clock) =
		fake_client(config, token_rotation_backend(Some("R2")));

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");
	get(&client, "/jobs/").await.expect("Replay should succeed.");

	let held = store.snapshot().expect("Credentials should be held.");

	assert_eq!(held.access_token.expose(), "A2");
	assert_eq!(held.refresh_token.expose(), "R2");
}

#[tokio::test]
async fn throttled_refresh_keeps_credentials() {
	let (client, transport, store, _clock) = fake_client(
		fake_config(),
		FakeTransport::new(|request| match request.url.path() {
			"/api/v1/auth/refresh/" => Ok(TransportResponse::new(429).with_header("retry-after", "10")),
			_ => Ok(json(401, "{\"detail\":\"Token expired\"}")),
		}),
	);

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	let err = get(&client, "/jobs/").await.expect_err("Throttled refresh should fail.");

	assert_eq!(err, ClientError::RateLimited { retry_after: Duration::seconds(10) });
	assert!(store.snapshot().is_some());
	assert_eq!(transport.calls_to("/api/v1/auth/refresh/"), 1);
	assert!(client.rate_limit_deadline().is_some());
}

#[tokio::test]
async fn unauthorized_without_refresh_token_expires_session() {
	let (client, transport, _store, _clock) =
		fake_client(fake_config(), token_rotation_backend(None));
	let err = get(&client, "/jobs/").await.expect_err("Anonymous 401 should expire the session.");

	assert_eq!(err, ClientError::AuthenticationExpired);
	assert_eq!(transport.calls_to("/api/v1/auth/refresh/"), 0);
}

#[tokio::test]
async fn opted_out_calls_normalize_unauthorized() {
	let (client, transport, store, _clock) =
		fake_client(fake_config(), token_rotation_backend(None));

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	let err = client
		.request(
			Method::Get,
			"/jobs/",
			RequestBody::Empty,
			RequestOptions::default().skip_auth_refresh(),
		)
		.await
		.expect_err("Opted-out 401 should fail.");

	assert_eq!(
		err,
		ClientError::ValidationFailed { message: "Token expired".into(), fields: BTreeMap::new() },
	);
	assert_eq!(transport.calls_to("/api/v1/auth/refresh/"), 0);
	assert!(store.snapshot().is_some());
}

#[tokio::test]
async fn independent_refreshes_each_hit_the_backend() {
	let (client, transport, _store, _clock) =
		fake_client(fake_config(), token_rotation_backend(None));

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	let (first, second) = tokio::join!(get(&client, "/jobs/"), get(&client, "/jobs/"));

	first.expect("First concurrent request should succeed.");
	second.expect("Second concurrent request should succeed.");

	assert_eq!(transport.calls_to("/api/v1/auth/refresh/"), 2);
	assert_eq!(client.refresh_metrics.attempts(), 2);
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_refreshes() {
	let mut config = fake_config();

	config.refresh_coalescing = RefreshCoalescing::SingleFlight;

	let (client, transport, store, _clock) = fake_client(config, token_rotation_backend(None));

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	let (first, second) = tokio::join!(get(&client, "/jobs/"), get(&client, "/jobs/"));

	first.expect("First concurrent request should succeed.");
	second.expect("Second concurrent request should succeed.");

	assert_eq!(transport.calls_to("/api/v1/auth/refresh/"), 1);
	assert_eq!(client.refresh_metrics.attempts(), 2);
	assert_eq!(client.refresh_metrics.successes(), 2);
	assert_eq!(
		store.snapshot().map(|pair| pair.access_token.expose().to_owned()),
		Some("A2".into()),
	);

	let replays = transport
		.calls
		.lock()
		.iter()
		.filter(|(_, path, auth)| path == "/api/v1/jobs/" && auth.as_deref() == Some("Bearer A2"))
		.count();

	assert_eq!(replays, 2);
}

#[tokio::test]
async fn requests_carry_configured_headers() {
	let (client, transport, _store, _clock) =
		fake_client(fake_config(), FakeTransport::new(|_| Ok(json(200, "null"))));

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");
	client
		.request(
			Method::Get,
			"/jobs/",
			RequestBody::Empty,
			RequestOptions::default().with_header("Authorization", "Bearer forged"),
		)
		.await
		.expect("Call should succeed.");
	client
		.request(Method::Get, "/health/", RequestBody::Empty, RequestOptions::default().anonymous())
		.await
		.expect("Anonymous call should succeed.");

	let calls = transport.calls.lock();

	assert_eq!(calls[0].2.as_deref(), Some("Bearer A1"));
	assert_eq!(calls[1].2, None);
}

#[tokio::test]
async fn refresh_transport_failure_expires_session() {
	let (client, transport, store, _clock) = fake_client(
		fake_config(),
		FakeTransport::new(|request| match request.url.path() {
			"/api/v1/auth/refresh/" => Err(FakeError::Reset),
			_ => Ok(json(401, "{\"detail\":\"Token expired\"}")),
		}),
	);

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	assert_eq!(get(&client, "/jobs/").await, Err(ClientError::AuthenticationExpired));
	assert!(!client.is_authenticated().await);
	assert!(store.snapshot().is_none());

	let _ = get(&client, "/jobs/").await;

	assert_eq!(transport.last_authorization("/api/v1/jobs/"), None);
}

#[tokio::test]
async fn malformed_refresh_response_expires_session() {
	for body in ["{\"access\":\"\"}", "{}", "<html>oops</html>"] {
		let (client, transport, store, _clock) = fake_client(
			fake_config(),
			FakeTransport::new(move |request| match request.url.path() {
				"/api/v1/auth/refresh/" => Ok(json(200, body)),
				_ => Ok(json(401, "{\"detail\":\"Token expired\"}")),
			}),
		);

		client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

		assert_eq!(get(&client, "/jobs/").await, Err(ClientError::AuthenticationExpired), "{body}");
		assert!(!client.is_authenticated().await, "{body}");
		assert!(store.snapshot().is_none(), "{body}");

		let _ = get(&client, "/jobs/").await;

		assert_eq!(transport.last_authorization("/api/v1/jobs/"), None, "{body}");
	}
}

#[tokio::test]
async fn failed_clear_still_ends_the_session() {
	let store = Arc::new(FaultyStore { failing_clear: true, ..Default::default() });
	let (client, transport, _clock) = fake_client_with_store(
		fake_config(),
		store.clone(),
		FakeTransport::new(|request| match request.url.path() {
			"/api/v1/auth/refresh/" => Ok(json(401, "{\"detail\":\"Token is blacklisted\"}")),
			_ => Ok(json(401, "{\"detail\":\"Token expired\"}")),
		}),
	);

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	assert_eq!(get(&client, "/jobs/").await, Err(ClientError::AuthenticationExpired));
	assert!(!client.is_authenticated().await);
	assert_eq!(client.access_token().await, None);
	assert!(store.inner.snapshot().is_some());

	let _ = get(&client, "/jobs/").await;

	assert_eq!(transport.last_authorization("/api/v1/jobs/"), None);
	assert_eq!(transport.calls_to("/api/v1/auth/refresh/"), 1);

	client.set_credentials("A3", "R3").await.expect("A new login should be stored.");

	assert!(client.is_authenticated().await);
}

#[tokio::test]
async fn failed_logout_still_drops_the_bearer() {
	let store = Arc::new(FaultyStore { failing_clear: true, ..Default::default() });
	let (client, transport, _clock) = fake_client_with_store(
		fake_config(),
		store,
		FakeTransport::new(|_| Ok(json(200, "null"))),
	);

	client.set_credentials("A1", "R1").await.expect("Seeding credentials should succeed.");

	let err = client.clear_credentials().await.expect_err("Clearing should report the failure.");

	assert!(matches!(err, StoreError::Backend { .. }));
	assert!(!client.is_authenticated().await);

	get(&client, "/jobs/").await.expect("Anonymous call should succeed.");

	assert_eq!(transport.last_authorization("/api/v1/jobs/"), None);
}

#[tokio::test]
async fn unreadable_store_surfaces_unknown_error() {
	let store = Arc::new(FaultyStore { failing_load: true, ..Default::default() });
	let (client, transport, _clock) = fake_client_with_store(
		fake_config(),
		store,
		FakeTransport::new(|_| Ok(json(200, "null"))),
	);
	let err = get(&client, "/jobs/").await.expect_err("Unreadable store should fail the call.");

	assert!(matches!(err, ClientError::Unknown { .. }));
	assert!(!client.is_authenticated().await);
	assert_eq!(client.access_token().await, None);
	assert!(transport.calls.lock().is_empty());
}
