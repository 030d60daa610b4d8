//! Authenticated job-board API client: bearer credentials, one-shot refresh replay,
//! server-driven backoff windows, and a closed, user-safe error taxonomy.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod csrf;
pub mod error;
pub mod http;
pub mod normalize;
pub mod obs;
pub mod page;
pub mod rate_limit;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::{
		_prelude::*,
		clock::{Clock, ManualClock},
		store::{CredentialStore, MemoryStore},
	};

	// self
	use crate::{
		client::ApiClient,
		config::{BuildProfile, ClientConfig},
		http::{ReqwestTransport, ReqwestTransportErrorMapper},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ApiClient<ReqwestTransport, ReqwestTransportErrorMapper>;

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Development-profile configuration pointing at a mock backend.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder(Url::parse(base_url).expect("Mock base URL should parse."))
			.profile(BuildProfile::Development)
			.build()
			.expect("Test configuration should be valid.")
	}

	/// Constructs an [`ApiClient`] backed by an in-memory store, a manual clock, and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_client(
		config: ClientConfig,
	) -> (ReqwestTestClient, Arc<MemoryStore>, ManualClock) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let clock = ManualClock::starting_now();
		let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
		let client = ApiClient::with_transport(
			config,
			store,
			test_reqwest_transport(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_clock(shared_clock);

		(client, store_backend, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{ClientError, ConfigError, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
