//! Shows how a 429 installs a client-wide backoff window that fails later calls fast
//! without touching the network.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use jobboard_client::{
	client::{ReqwestApiClient, RequestOptions},
	config::ClientConfig,
	error::ClientError,
	http::{Method, RequestBody},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let throttled_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/applications/");
			then.status(429)
				.header("retry-after", "30")
				.header("content-type", "application/json")
				.body("{\"detail\":\"Request was throttled.\"}");
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let client = ReqwestApiClient::new(config, Arc::new(MemoryStore::default()))?;

	for attempt in 1..=3 {
		match client
			.request(Method::Get, "/applications/", RequestBody::Empty, RequestOptions::default())
			.await
		{
			Err(err @ ClientError::RateLimited { .. }) => println!("Attempt {attempt}: {err}"),
			Err(err) => return Err(err.into()),
			Ok(response) => println!("Attempt {attempt}: HTTP {}.", response.status),
		}
	}

	if let Some(deadline) = client.rate_limit_deadline() {
		println!("Backoff window closes at {deadline}.");
	}

	throttled_mock.assert_calls_async(1).await;

	Ok(())
}
