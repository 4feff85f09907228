//! Request assembly: URL resolution, the flat transport parameter set, and
//! the sanitized snapshot used for logging.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::options::FilePart;

use super::HttpSession;

/// One assembled transport call: everything the transport needs, flattened
/// out of [`HttpOptions`](crate::HttpOptions) and the defaults. Rebuilding
/// the actual transport request from this on every attempt keeps the retry
/// loop free of builder state.
pub(crate) struct RequestParts {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub verify: bool,
    pub form: Option<BTreeMap<String, String>>,
    pub content: Option<Bytes>,
    pub json: Option<serde_json::Map<String, Value>>,
    pub files: Option<BTreeMap<String, FilePart>>,
}

impl RequestParts {
    /// The `Cookie` header value for the configured cookie map, if any.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// The resolved URL with its query string, for logging.
    pub fn render_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        match Url::parse_with_params(&self.url, self.query.iter()) {
            Ok(url) => url.to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

/// Serializable copy of the call parameters with secrets redacted and
/// empty entries omitted. This is what gets logged, never the live parts.
#[derive(Debug, Serialize)]
pub(crate) struct ParamsSnapshot {
    pub method: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "is_false")]
    pub follow_redirects: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_len: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Build the loggable snapshot: drop the `Authorization` header value, keep
/// everything else, summarize payloads instead of dumping them.
pub(crate) fn sanitized(parts: &RequestParts) -> ParamsSnapshot {
    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    ParamsSnapshot {
        method: parts.method.to_string(),
        headers,
        cookies: parts.cookies.clone(),
        timeout_ms: parts.timeout.as_millis() as u64,
        follow_redirects: parts.follow_redirects,
        form: parts.form.clone().filter(|form| !form.is_empty()),
        json: parts.json.clone().filter(|json| !json.is_empty()),
        content_len: parts.content.as_ref().map(Bytes::len),
        files: parts
            .files
            .iter()
            .flat_map(|files| files.keys().cloned())
            .collect(),
    }
}

impl HttpSession {
    /// Resolve the effective URL: absolute URLs pass through verbatim,
    /// relative paths join the defaults' base URL with exactly one slash.
    pub(crate) fn build_url(&self) -> String {
        let url = &self.options.url;
        if url.starts_with("http") {
            return url.clone();
        }
        match &self.defaults.base_url {
            Some(base_url) => {
                let base = base_url.trim_matches(['/', '\\']);
                let path = url.trim_start_matches(['/', '\\']);
                format!("{base}/{path}")
            }
            None => url.clone(),
        }
    }

    /// Assemble the flat parameter set for one transport call.
    ///
    /// Form data and files are semantically invalid on GET/DELETE; they are
    /// dropped with a warning instead of aborting the request. A JSON body
    /// is attached regardless of method.
    pub(crate) fn assemble(&self, method: Method) -> RequestParts {
        let options = &self.options;
        let body_method =
            method == Method::POST || method == Method::PUT || method == Method::PATCH;

        if method == Method::GET || method == Method::DELETE {
            if options.form.is_some() {
                warn!(
                    method = %method,
                    url = %options.url,
                    "form data is not valid for this method, ignored"
                );
            }
            if options.files.is_some() {
                warn!(
                    method = %method,
                    url = %options.url,
                    "file parts are not valid for this method, ignored"
                );
            }
        }

        RequestParts {
            method,
            url: self.build_url(),
            headers: options.headers.clone().unwrap_or_default(),
            cookies: options.cookies.clone().unwrap_or_default(),
            query: options.query.clone().unwrap_or_default(),
            timeout: options.timeout.unwrap_or(self.defaults.timeout),
            follow_redirects: options.redirects,
            verify: options.verify,
            form: if body_method { options.form.clone() } else { None },
            content: if body_method { options.content.clone() } else { None },
            json: options.json.clone(),
            files: if body_method { options.files.clone() } else { None },
        }
    }

    /// Log the outgoing call. All formatting is guarded by the verbosity
    /// check so a silent session allocates nothing here.
    pub(crate) fn log_dispatch(&self, parts: &RequestParts) {
        if !self.verbose_enabled() {
            return;
        }
        info!(method = %parts.method, url = %parts.render_url(), "dispatching request");
        if let Ok(snapshot) = serde_json::to_string(&sanitized(parts)) {
            info!(params = %snapshot, "request parameters");
        }
    }
}
