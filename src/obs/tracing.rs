// self
use crate::{_prelude::*, obs::CallKind, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("jobboard_client.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for a request phase transition.
pub fn trace_phase(from: &'static str, to: &'static str, method: &str, path: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(from, to, method, path, "request phase changed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to, method, path);
	}
}

/// Emits a warning when a server throttle signal installs or extends the backoff window.
pub fn trace_backoff(retry_after: Duration, deadline: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			retry_after_secs = retry_after.whole_seconds(),
			%deadline,
			"backend throttled the client; backoff window installed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (retry_after, deadline);
	}
}

/// Emits a warning when held credentials are discarded after an unrecoverable auth failure.
pub fn trace_session_expired(reason: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(reason, "credentials cleared; re-authentication required");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}

/// Emits an error when the credential store rejects an operation the client depends on.
pub fn trace_store_failure(operation: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(operation, %error, "credential store operation failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}
