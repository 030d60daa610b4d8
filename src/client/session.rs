//! Session lifecycle: login, credential installation, and state queries.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, LoginRequest, LoginResponse, TokenSecret},
	client::{ApiClient, RequestOptions},
	http::{HttpTransport, Method, RequestBody, TransportErrorMapper},
	normalize,
	obs::{self, CallKind, CallOutcome, CallSpan},
	rate_limit::RateLimitDecision,
	store::StoreError,
};

impl<T, M> ApiClient<T, M>
where
	T: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Installs a credential pair, replacing any previous pair.
	pub async fn set_credentials(
		&self,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Result<(), StoreError> {
		self.store.save(CredentialPair::new(access_token, refresh_token, self.clock.now())).await?;
		self.expired_refresh.lock().take();

		Ok(())
	}

	/// Discards the held credential pair. Later requests carry no `Authorization` header.
	///
	/// When the store cannot discard the pair the error is returned, but this client still
	/// stops using the pair.
	pub async fn clear_credentials(&self) -> Result<(), StoreError> {
		match self.store.clear().await {
			Ok(_) => {
				self.expired_refresh.lock().take();

				Ok(())
			},
			Err(err) => {
				self.retire_held_pair(&err).await;

				Err(err)
			},
		}
	}

	/// Returns `true` when an access token is held. Store failures count as unauthenticated.
	pub async fn is_authenticated(&self) -> bool {
		matches!(self.load_credentials().await, Ok(Some(pair)) if !pair.access_token.is_empty())
	}

	/// Returns a snapshot of the held access token.
	pub async fn access_token(&self) -> Option<TokenSecret> {
		self.load_credentials().await.ok().flatten().map(|pair| pair.access_token)
	}

	/// Loads the held pair, hiding one this client has already expired.
	pub(crate) async fn load_credentials(&self) -> Result<Option<CredentialPair>> {
		let held =
			self.store.load().await.map_err(|err| normalize::unknown(self.config.profile, err))?;

		match held {
			Some(pair) if self.is_retired(&pair) => {
				if self.store.clear().await.is_ok() {
					self.expired_refresh.lock().take();
				}

				Ok(None)
			},
			held => Ok(held),
		}
	}

	/// Stops serving the held pair after the store failed to discard it.
	pub(crate) async fn retire_held_pair(&self, err: &StoreError) {
		obs::trace_store_failure("clear", err);

		if let Ok(Some(pair)) = self.store.load().await {
			*self.expired_refresh.lock() = Some(pair.refresh_token);
		}
	}

	fn is_retired(&self, pair: &CredentialPair) -> bool {
		self.expired_refresh.lock().as_ref() == Some(&pair.refresh_token)
	}

	/// Returns the active backoff deadline, if any.
	pub fn rate_limit_deadline(&self) -> Option<OffsetDateTime> {
		match self.rate_limit.check(self.clock.now()) {
			RateLimitDecision::Delay(directive) => Some(directive.earliest_retry_at),
			RateLimitDecision::Allow => None,
		}
	}

	/// Exchanges email + password for a credential pair and installs it.
	///
	/// The login call never triggers the refresh flow, so rejected credentials surface as the
	/// normalized backend message (`{"detail": ...}` becomes
	/// [`ClientError::ValidationFailed`]) every time they are submitted.
	pub async fn login(
		&self,
		email: impl Into<String>,
		password: impl Into<String>,
	) -> Result<LoginResponse> {
		const KIND: CallKind = CallKind::Login;

		let span = CallSpan::new(KIND, "login");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result: Result<LoginResponse> = span
			.instrument(async {
				let body =
					RequestBody::json(&LoginRequest { email: email.into(), password: password.into() })
						.map_err(|err| normalize::unknown(self.config.profile, err))?;
				let response = self
					.request_json::<LoginResponse>(
						Method::Post,
						&self.config.login_path,
						body,
						RequestOptions::default().skip_auth_refresh(),
					)
					.await?;

				self.set_credentials(response.access.expose(), response.refresh.expose())
					.await
					.map_err(|err| normalize::unknown(self.config.profile, err))?;

				Ok(response)
			})
			.await;

		self.record_result(KIND, &result);

		result
	}
}
