//! Client-held backoff window installed from server throttle signals.
//!
//! A single deadline is shared by every call issued through one client. While the
//! deadline lies in the future, calls fail fast without touching the network. New
//! signals only ever extend the window: the stored deadline is the maximum of the
//! current and the incoming one, so a short `Retry-After` cannot cut an active long
//! backoff short.

// self
use crate::_prelude::*;

/// Result of consulting a [`RateLimitWindow`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request must not be sent yet.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Remaining backoff relative to the observation instant.
	pub recommended_backoff: Duration,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff }
	}
}

/// Process-wide "no outbound calls before T" deadline.
#[derive(Debug, Default)]
pub struct RateLimitWindow(Mutex<Option<OffsetDateTime>>);
impl RateLimitWindow {
	/// Evaluates the window at `now`, dropping a deadline that has already passed.
	pub fn check(&self, now: OffsetDateTime) -> RateLimitDecision {
		let mut guard = self.0.lock();

		match *guard {
			Some(deadline) if deadline > now =>
				RateLimitDecision::Delay(RetryDirective::new(deadline, deadline - now)),
			Some(_) => {
				*guard = None;

				RateLimitDecision::Allow
			},
			None => RateLimitDecision::Allow,
		}
	}

	/// Installs `deadline`, keeping the later of the current and new deadlines.
	///
	/// Returns the effective deadline after the merge.
	pub fn extend(&self, deadline: OffsetDateTime) -> OffsetDateTime {
		let mut guard = self.0.lock();
		let effective = match *guard {
			Some(current) if current > deadline => current,
			_ => deadline,
		};

		*guard = Some(effective);

		effective
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn window_blocks_until_deadline() {
		let window = RateLimitWindow::default();
		let start = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(window.check(start), RateLimitDecision::Allow);

		window.extend(start + Duration::seconds(30));

		match window.check(start + Duration::seconds(10)) {
			RateLimitDecision::Delay(directive) => {
				assert_eq!(directive.earliest_retry_at, start + Duration::seconds(30));
				assert_eq!(directive.recommended_backoff, Duration::seconds(20));
			},
			other => panic!("Expected an active window, got {other:?}."),
		}

		assert_eq!(window.check(start + Duration::seconds(30)), RateLimitDecision::Allow);
		assert_eq!(window.0.lock().as_ref(), None);
	}

	#[test]
	fn shorter_signal_never_shortens_window() {
		let window = RateLimitWindow::default();
		let start = macros::datetime!(2025-01-01 00:00 UTC);
		let long = start + Duration::seconds(120);

		window.extend(long);

		let effective = window.extend(start + Duration::seconds(5));

		assert_eq!(effective, long);
		assert_eq!(
			window.check(start + Duration::seconds(60)),
			RateLimitDecision::Delay(RetryDirective::new(long, Duration::seconds(60))),
		);

		let longer = start + Duration::seconds(300);

		assert_eq!(window.extend(longer), longer);
		assert_eq!(window.check(longer), RateLimitDecision::Allow);
	}
}
