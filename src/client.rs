//! Session factory.

use std::sync::Arc;

use crate::options::HttpDefaults;
use crate::session::HttpSession;

/// Factory holding shared [`HttpDefaults`] and producing one
/// [`HttpSession`] per request.
///
/// ```rust,no_run
/// use fluent_http::{HttpClient, HttpDefaults};
///
/// # async fn run() -> fluent_http::Result<()> {
/// let client = HttpClient::new(
///     HttpDefaults::new().with_base_url("https://api.example.com"),
/// );
/// let response = client
///     .create("/v1/items")
///     .add_query("page", 2)
///     .retry(3)
///     .get()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpClient {
    defaults: Arc<HttpDefaults>,
}

impl HttpClient {
    pub fn new(defaults: HttpDefaults) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }

    pub fn defaults(&self) -> &HttpDefaults {
        &self.defaults
    }

    /// Create a new session for `url`, which may be absolute or a path
    /// relative to the configured base URL.
    pub fn create(&self, url: impl Into<String>) -> HttpSession {
        HttpSession::new(url, Arc::clone(&self.defaults))
    }
}

impl Default for HttpClient {
    /// A client with logging enabled and stock timeouts, the equivalent of
    /// the ready-made process-wide instance most callers want.
    fn default() -> Self {
        Self::new(HttpDefaults::new().with_verbose(true))
    }
}
