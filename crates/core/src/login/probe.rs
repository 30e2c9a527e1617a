//! Capability seam between the login flow and a live browser page.

use async_trait::async_trait;
use chatgpt_protocol::{Cookie, HeaderMap};
use chatgpt_runtime::Result;

/// What the login flow needs from the page it drives.
#[async_trait]
pub trait BrowserProbe: Send + Sync {
	/// `window.location.href` of the login tab.
	async fn current_url(&self) -> Result<String>;

	/// Evaluates a boolean page expression. Non-boolean results are `false`.
	async fn evaluate_bool(&self, expression: &str) -> Result<bool>;

	/// Evaluates a page expression, returning non-empty string results.
	async fn evaluate_string(&self, expression: &str) -> Result<Option<String>>;

	/// Entire browser cookie jar, HTTP-only cookies included.
	async fn all_cookies(&self) -> Result<Vec<Cookie>>;

	/// Cookies that would be sent to `urls`.
	async fn cookies_for(&self, urls: &[String]) -> Result<Vec<Cookie>>;

	/// Navigates the tab and waits for the load event.
	async fn navigate(&self, url: &str) -> Result<()>;

	/// Request headers observed on backend calls so far.
	fn captured_headers(&self) -> HeaderMap;
}
