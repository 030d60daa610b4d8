//! Paginated list envelope returned by the backend's collection endpoints.

// self
use crate::_prelude::*;

/// One page of a paginated collection: `{count, next, previous, results}`.
///
/// `next` and `previous` are absolute URLs on the backend origin; pass a page to
/// [`ApiClient::next_page`](crate::client::ApiClient::next_page) to follow it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
	/// Total number of items across all pages.
	pub count: u64,
	/// Link to the following page.
	#[serde(default)]
	pub next: Option<String>,
	/// Link to the preceding page.
	#[serde(default)]
	pub previous: Option<String>,
	/// Items on this page.
	#[serde(default = "Vec::new")]
	pub results: Vec<T>,
}
impl<T> Page<T> {
	/// Returns `true` when another page follows.
	pub fn has_next(&self) -> bool {
		self.next.is_some()
	}

	/// Returns `true` when a page precedes this one.
	pub fn has_previous(&self) -> bool {
		self.previous.is_some()
	}

	/// Returns `true` when this page carries no items.
	pub fn is_empty(&self) -> bool {
		self.results.is_empty()
	}

	/// Number of items on this page.
	pub fn len(&self) -> usize {
		self.results.len()
	}

	/// Appends the items of the following page and adopts its `next` link.
	pub fn merge(mut self, following: Page<T>) -> Self {
		self.results.extend(following.results);
		self.count = following.count;
		self.next = following.next;

		self
	}

	/// Consumes the page, returning its items.
	pub fn into_results(self) -> Vec<T> {
		self.results
	}
}
