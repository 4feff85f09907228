//! Request configuration records.
//!
//! [`HttpDefaults`] holds factory-wide settings shared by every session;
//! [`HttpOptions`] accumulates the configuration of a single request as the
//! fluent builder methods on [`HttpSession`](crate::HttpSession) run. One
//! `HttpOptions` belongs to exactly one session and is never shared.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

/// Shared client defaults, immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpDefaults {
    /// Base URL that relative request paths are resolved against.
    pub base_url: Option<String>,
    /// Master switch for request/response logging. Individual sessions can
    /// opt out via [`verbose(false)`](crate::HttpSession::verbose) but can
    /// never force logging on when this is off.
    pub verbose: bool,
    /// Timeout applied when a session does not set its own.
    pub timeout: Duration,
    /// Sleep between retry attempts when [`retry`](crate::HttpSession::retry)
    /// is used without an explicit interval.
    pub retry_interval: Duration,
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            base_url: None,
            verbose: false,
            timeout: Duration::from_secs(30),
            retry_interval: Duration::from_secs(5),
        }
    }
}

impl HttpDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// One named multipart file part.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub file_name: String,
    pub content: Bytes,
    pub mime: Option<String>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Accumulated configuration for a single request.
///
/// Later `add_*` calls with the same key overwrite. `content`, `form`/`files`
/// and `json` are not mutually exclusive here; everything present is layered
/// into one transport call and the transport decides precedence (see
/// [`add_content`](crate::HttpSession::add_content)).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpOptions {
    pub url: String,
    pub verbose: Option<bool>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    /// `None` here means "retry immediately with no delay".
    pub retry_interval: Option<Duration>,
    pub query: Option<BTreeMap<String, String>>,
    pub content: Option<Bytes>,
    pub form: Option<BTreeMap<String, String>>,
    pub json: Option<serde_json::Map<String, Value>>,
    pub files: Option<BTreeMap<String, FilePart>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub cookies: Option<BTreeMap<String, String>>,
    pub redirects: bool,
    pub verify: bool,
}

impl HttpOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            redirects: true,
            verify: true,
            ..Default::default()
        }
    }
}

/// Render a JSON value as a flat scalar string for query/form storage.
///
/// The transport only accepts flat scalar values, so arrays and objects are
/// serialized to their JSON text; scalars are rendered without quoting.
pub(crate) fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Upsert one flattened entry into a lazily created map.
pub(crate) fn upsert_flat(
    map: &mut Option<BTreeMap<String, String>>,
    name: &str,
    value: &Value,
) {
    if name.is_empty() || value.is_null() {
        return;
    }
    map.get_or_insert_with(BTreeMap::new)
        .insert(name.to_string(), flatten_value(value));
}
