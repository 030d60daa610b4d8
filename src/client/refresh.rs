//! Access-token refresh with optional singleflight coalescing and CAS installation.
//!
//! A refresh posts the held refresh token to the configured refresh endpoint without an
//! `Authorization` header. The replacement access token is installed through
//! [`CredentialStore::compare_and_swap_access`], keyed by the refresh token that was sent,
//! so a refresh that lands after a logout or a new login never touches the newer session.
//! Any failure other than a throttle clears the held credentials.
//!
//! [`CredentialStore::compare_and_swap_access`]: crate::store::CredentialStore::compare_and_swap_access

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{RefreshRequest, RefreshResponse, TokenSecret},
	client::{ApiClient, RequestOptions, decode_json},
	config::{RefreshCoalescing, RefreshRotation},
	http::{HttpTransport, Method, RequestBody, TransportErrorMapper},
	normalize,
	obs::{self, CallKind, CallOutcome, CallSpan},
	store::CompareAndSwapOutcome,
};

impl<T, M> ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Exchanges the held refresh token for a new access token.
	///
	/// `rejected_access` is the access token the backend just refused. Under
	/// [`RefreshCoalescing::SingleFlight`] a caller that finds a different access token
	/// already installed returns immediately so it can replay with that token.
	///
	/// Returns [`ClientError::RateLimited`] (credentials kept) while a backoff window is
	/// active or when the refresh endpoint itself throttles, and
	/// [`ClientError::AuthenticationExpired`] (credentials cleared) for any other failure.
	pub async fn refresh_access_token(&self, rejected_access: Option<TokenSecret>) -> Result<()> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "refresh_access_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span.instrument(self.refresh_once(rejected_access)).await;

		match &result {
			Ok(()) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		self.record_result(KIND, &result);

		result
	}

	async fn refresh_once(&self, rejected_access: Option<TokenSecret>) -> Result<()> {
		let singleflight = match self.config.refresh_coalescing {
			RefreshCoalescing::SingleFlight => Some(self.refresh_guard.lock().await),
			RefreshCoalescing::Independent => None,
		};
		let current = match self.load_credentials().await {
			Ok(Some(pair)) if !pair.refresh_token.is_empty() => pair,
			Ok(_) => return Err(self.expire_session("no refresh token held").await),
			Err(_) => return Err(self.expire_session("credential store unavailable").await),
		};

		if singleflight.is_some() && rejected_access.as_ref() != Some(&current.access_token) {
			return Ok(());
		}

		self.ensure_window_open()?;

		let body = RequestBody::json(&RefreshRequest { refresh: current.refresh_token.expose() })
			.map_err(|err| normalize::unknown(self.config.profile, err))?;
		let request = self.build_transport_request(
			Method::Post,
			&self.config.refresh_path,
			body,
			&RequestOptions::default().anonymous(),
			None,
		)?;
		let response = match self.transport.execute(request).await {
			Ok(response) => response,
			Err(_) => return Err(self.expire_session("refresh call failed").await),
		};

		if response.status == 429 {
			return Err(self.install_backoff(&response));
		}
		if !response.is_success() {
			return Err(self.expire_session("refresh token rejected").await);
		}

		let refreshed = match decode_json::<RefreshResponse>(&response.body) {
			Ok(refreshed) if !refreshed.access.is_empty() => refreshed,
			_ => return Err(self.expire_session("refresh response malformed").await),
		};
		let mut replacement =
			current.with_access_token(refreshed.access.expose(), self.clock.now());

		if self.config.refresh_rotation == RefreshRotation::Accept {
			match refreshed.refresh {
				Some(rotated) if !rotated.is_empty() =>
					replacement = replacement.with_refresh_token(rotated.expose()),
				_ => (),
			}
		}

		match self
			.store
			.compare_and_swap_access(current.refresh_token.expose(), replacement)
			.await
		{
			Ok(CompareAndSwapOutcome::Updated | CompareAndSwapOutcome::RefreshMismatch) => Ok(()),
			Ok(CompareAndSwapOutcome::Missing) => {
				obs::trace_session_expired("credentials cleared during refresh");

				Err(ClientError::AuthenticationExpired)
			},
			Err(_) => Err(self.expire_session("credential store unavailable").await),
		}
	}

	pub(crate) async fn expire_session(&self, reason: &'static str) -> ClientError {
		if let Err(err) = self.store.clear().await {
			self.retire_held_pair(&err).await;
		}

		obs::trace_session_expired(reason);

		ClientError::AuthenticationExpired
	}
}
