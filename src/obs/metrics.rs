// self
use crate::{
	error::ErrorKind,
	obs::{CallKind, CallOutcome},
};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"jobboard_client_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the category of a failed call (when enabled).
pub fn record_call_error(kind: CallKind, error: ErrorKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"jobboard_client_error_total",
			"call" => kind.as_str(),
			"error" => error.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, error);
	}
}
