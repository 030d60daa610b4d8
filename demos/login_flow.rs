//! Logs in against a mocked backend, lists jobs, and survives an access-token expiry through
//! a single refresh-and-replay.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use url::Url;
// self
use jobboard_client::{
	client::{ApiClient, RequestOptions},
	config::{BuildProfile, ClientConfig},
	http::{Method, ReqwestTransport, ReqwestTransportErrorMapper, RequestBody},
	page::Page,
	reqwest::Client,
	store::{CredentialStore, MemoryStore},
};

#[derive(Debug, Deserialize)]
struct Job {
	id: u64,
	title: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login/");
			then.status(200).header("content-type", "application/json").body(
				"{\"access\":\"access-1\",\"refresh\":\"refresh-1\",\"user\":{\"email\":\"seeker@example.com\"}}",
			);
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/jobs/").header("authorization", "Bearer access-1");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Given token not valid for any token type\"}");
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-2\"}");
		})
		.await;
	let jobs_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/jobs/").header("authorization", "Bearer access-2");
			then.status(200).header("content-type", "application/json").body(
				"{\"count\":2,\"next\":null,\"previous\":null,\"results\":[{\"id\":1,\"title\":\"Rust Engineer\"},{\"id\":2,\"title\":\"SRE\"}]}",
			);
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.base_url())?)
		.profile(BuildProfile::Development)
		.build()?;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = <ApiClient<ReqwestTransport, ReqwestTransportErrorMapper>>::with_transport(
		config,
		store,
		transport,
		Arc::new(ReqwestTransportErrorMapper),
	);
	let login = client.login("seeker@example.com", "correct-horse").await?;

	println!("Signed in as {}.", login.user["email"]);

	let jobs: Page<Job> = client
		.request_json(Method::Get, "/jobs/", RequestBody::Empty, RequestOptions::default())
		.await?;

	for job in &jobs.results {
		println!("#{} {}", job.id, job.title);
	}

	println!("Refreshes performed: {}.", client.refresh_metrics.successes());

	login_mock.assert_async().await;
	expired_mock.assert_async().await;
	refresh_mock.assert_async().await;
	jobs_mock.assert_async().await;

	Ok(())
}
