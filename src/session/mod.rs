//! One configured, not-yet-executed request plus its execution logic.
//!
//! [`HttpSession`] is the fluent builder and executor at the center of the
//! crate. Configuration methods consume and return the session so calls
//! chain; execution happens through [`request`](HttpSession::request) (async)
//! or [`blocking_request`](HttpSession::blocking_request) (sync), both
//! sharing the same assembly and retry semantics.
//!
//! A session belongs to exactly one logical request. The transport client is
//! either injected by the caller (shared, caller-managed lifetime) or built
//! ad hoc inside the execute call and dropped on every exit path, normal
//! return, retry exhaustion, and cancellation included.

pub(crate) mod assembly;
mod blocking;
mod execute;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::options::{upsert_flat, FilePart, HttpDefaults, HttpOptions};
use crate::{Error, Result};

#[derive(Debug)]
pub struct HttpSession {
    options: HttpOptions,
    defaults: Arc<HttpDefaults>,
    client: Option<reqwest::Client>,
    blocking_client: Option<reqwest::blocking::Client>,
    started: Instant,
}

impl HttpSession {
    pub(crate) fn new(url: impl Into<String>, defaults: Arc<HttpDefaults>) -> Self {
        Self {
            options: HttpOptions::new(url),
            defaults,
            client: None,
            blocking_client: None,
            started: Instant::now(),
        }
    }

    /// The accumulated request configuration.
    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    /// Override the per-request verbosity. `false` suppresses logging even
    /// when the defaults enable it; logging can never be forced on when the
    /// defaults disable it.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = Some(verbose);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Retry connectivity failures and 5xx responses up to `max_retries`
    /// extra attempts, sleeping the defaults' retry interval in between.
    pub fn retry(mut self, max_retries: u32) -> Self {
        self.options.max_retries = Some(max_retries);
        self.options.retry_interval = Some(self.defaults.retry_interval);
        self
    }

    /// Like [`retry`](Self::retry) with an explicit interval. `None` retries
    /// immediately with no delay.
    pub fn retry_with_interval(mut self, max_retries: u32, interval: Option<Duration>) -> Self {
        self.options.max_retries = Some(max_retries);
        self.options.retry_interval = interval;
        self
    }

    /// Whether the transport should follow redirects. Applies to the ad hoc
    /// transport client; an injected client keeps its own policy.
    pub fn redirects(mut self, allow: bool) -> Self {
        self.options.redirects = allow;
        self
    }

    /// Whether the transport should verify TLS certificates. Applies to the
    /// ad hoc transport client; an injected client keeps its own settings.
    pub fn verify(mut self, verify: bool) -> Self {
        self.options.verify = verify;
        self
    }

    /// Upsert one header. No-op when `name` is empty or `value` is `None`.
    pub fn add_header(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        let Some(value) = value else { return self };
        if name.is_empty() {
            return self;
        }
        self.options
            .headers
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), value.into());
        self
    }

    /// Upsert every entry of a header map. Empty names are skipped.
    pub fn add_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            let name = name.into();
            if name.is_empty() {
                continue;
            }
            self.options
                .headers
                .get_or_insert_with(Default::default)
                .insert(name, value.into());
        }
        self
    }

    /// Upsert one cookie. No-op when `name` is empty or `value` is `None`.
    pub fn add_cookie(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        let Some(value) = value else { return self };
        if name.is_empty() {
            return self;
        }
        self.options
            .cookies
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), value.into());
        self
    }

    /// Upsert one query parameter. `Null` values and empty names are no-ops;
    /// arrays and objects are serialized to JSON strings because the
    /// transport only accepts flat scalar query values.
    pub fn add_query(mut self, name: &str, value: impl Into<Value>) -> Self {
        upsert_flat(&mut self.options.query, name, &value.into());
        self
    }

    /// Merge every entry of a map into the query parameters, with the same
    /// flattening rules as [`add_query`](Self::add_query).
    pub fn add_query_map<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in entries {
            upsert_flat(&mut self.options.query, &name.into(), &value.into());
        }
        self
    }

    /// Upsert one form field, with the same contract as
    /// [`add_query`](Self::add_query).
    pub fn add_form(mut self, name: &str, value: impl Into<Value>) -> Self {
        upsert_flat(&mut self.options.form, name, &value.into());
        self
    }

    /// Merge every entry of a map into the form fields.
    pub fn add_form_map<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in entries {
            upsert_flat(&mut self.options.form, &name.into(), &value.into());
        }
        self
    }

    /// Replace the raw request body. Empty input is a no-op.
    ///
    /// Raw content and form data are not mutually exclusive: when both are
    /// set on a POST/PUT/PATCH both are handed to the transport and the
    /// transport's last-applied-wins body semantics decide. This mirrors the
    /// documented ambiguity of the configuration model rather than silently
    /// picking one.
    pub fn add_content(mut self, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        if content.is_empty() {
            return self;
        }
        self.options.content = Some(content);
        self
    }

    /// Upsert one multipart file part. No-op when `file` is `None`.
    pub fn add_file(mut self, name: &str, file: Option<FilePart>) -> Self {
        let Some(file) = file else { return self };
        if name.is_empty() {
            return self;
        }
        self.options
            .files
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), file);
        self
    }

    /// Shallow-merge an object into the JSON body; repeated calls accumulate
    /// keys rather than replace the body. `null` and empty objects are
    /// no-ops. Anything that does not serialize to a JSON object fails here,
    /// at the call site, never at dispatch time.
    pub fn add_json(mut self, body: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        match value {
            Value::Null => Ok(self),
            Value::Object(entries) => {
                if entries.is_empty() {
                    return Ok(self);
                }
                let json = self.options.json.get_or_insert_with(Default::default);
                for (key, value) in entries {
                    json.insert(key, value);
                }
                Ok(self)
            }
            other => Err(Error::configuration(format!(
                "json body must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Execute through a caller-supplied async transport client instead of
    /// an ad hoc one. The caller owns the client's lifetime.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Execute through a caller-supplied blocking transport client.
    pub fn with_blocking_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.blocking_client = Some(client);
        self
    }

    pub(crate) fn verbose_enabled(&self) -> bool {
        self.options.verbose != Some(false) && self.defaults.verbose
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub(crate) fn effective_attempts(&self) -> u32 {
        self.options.max_retries.unwrap_or(0) + 1
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn session(url: &str) -> HttpSession {
        HttpSession::new(url, Arc::new(HttpDefaults::default()))
    }

    #[test]
    fn chained_configuration_accumulates() {
        let session = session("https://localhost:8000/")
            .timeout(Duration::from_secs(30))
            .retry_with_interval(10, Some(Duration::from_secs(3)))
            .add_query("q1", 1)
            .add_query("q1", 2)
            .add_form("foo", 2)
            .add_file("foo", Some(FilePart::new("a.txt", &b"a"[..])))
            .add_header("x-a", Some("aa"))
            .add_header("x-b", Some("aa"))
            .add_cookie("foo", Some("bar"))
            .add_json(json!({"name": "1"}))
            .expect("object body");

        let options = session.options();
        assert_eq!(options.url, "https://localhost:8000/");
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.max_retries, Some(10));
        assert_eq!(options.retry_interval, Some(Duration::from_secs(3)));
        assert_eq!(
            options.query.as_ref().and_then(|q| q.get("q1")).map(String::as_str),
            Some("2")
        );
        assert_eq!(
            options.form.as_ref().and_then(|f| f.get("foo")).map(String::as_str),
            Some("2")
        );
        assert!(options.files.as_ref().is_some_and(|f| f.contains_key("foo")));
        assert_eq!(
            options.headers,
            Some(BTreeMap::from([
                ("x-a".to_string(), "aa".to_string()),
                ("x-b".to_string(), "aa".to_string()),
            ]))
        );
        assert_eq!(
            options.cookies.as_ref().and_then(|c| c.get("foo")).map(String::as_str),
            Some("bar")
        );
        assert_eq!(options.json, Some(json!({"name": "1"}).as_object().cloned().unwrap()));
    }

    #[test]
    fn header_overwrite_is_last_write_wins() {
        let session = session("https://example.com")
            .add_header("x", Some("a"))
            .add_header("x", Some("b"));
        assert_eq!(
            session.options().headers.as_ref().and_then(|h| h.get("x")).map(String::as_str),
            Some("b")
        );
    }

    #[test]
    fn json_merges_instead_of_replacing() {
        let session = session("https://example.com")
            .add_json(json!({"a": 1}))
            .and_then(|s| s.add_json(json!({"b": 2})))
            .expect("object bodies");
        assert_eq!(
            session.options().json.as_ref().map(|j| Value::Object(j.clone())),
            Some(json!({"a": 1, "b": 2}))
        );
    }

    #[test]
    fn json_rejects_non_objects_at_call_site() {
        let err = session("https://example.com")
            .add_json(json!([1, 2]))
            .expect_err("arrays are not valid json bodies");
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn json_null_and_empty_objects_are_noops() {
        let session = session("https://example.com")
            .add_json(Value::Null)
            .and_then(|s| s.add_json(json!({})))
            .expect("noop bodies");
        assert!(session.options().json.is_none());
    }

    #[test]
    fn absent_file_leaves_files_unset() {
        let session = session("https://example.com").add_file("f", None);
        assert!(session.options().files.is_none());
    }

    #[test]
    fn absent_header_and_cookie_are_noops() {
        let session = session("https://example.com")
            .add_header("x", None::<String>)
            .add_header("", Some("v"))
            .add_cookie("c", None::<String>);
        assert!(session.options().headers.is_none());
        assert!(session.options().cookies.is_none());
    }

    #[test]
    fn query_dual_shapes_are_equivalent() {
        let by_entry = session("https://example.com").add_query("q", 1);
        let by_map = session("https://example.com").add_query_map([("q", 1)]);
        assert_eq!(by_entry.options().query, by_map.options().query);
    }

    #[test]
    fn nested_query_values_flatten_to_json_strings() {
        let session = session("https://example.com")
            .add_query("ids", json!([1, 2, 3]))
            .add_query("filter", json!({"k": "v"}));
        let query = session.options().query.clone().unwrap_or_default();
        assert_eq!(query.get("ids").map(String::as_str), Some("[1,2,3]"));
        assert_eq!(query.get("filter").map(String::as_str), Some(r#"{"k":"v"}"#));
    }

    #[test]
    fn empty_content_is_a_noop() {
        let empty = session("https://example.com").add_content("");
        assert!(empty.options().content.is_none());

        let session = session("https://example.com").add_content("payload");
        assert_eq!(session.options().content.as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn retry_adopts_default_interval() {
        let defaults = Arc::new(HttpDefaults::new().with_retry_interval(Duration::from_secs(7)));
        let session = HttpSession::new("https://example.com", defaults).retry(4);
        assert_eq!(session.options().max_retries, Some(4));
        assert_eq!(session.options().retry_interval, Some(Duration::from_secs(7)));
        assert_eq!(session.effective_attempts(), 5);
    }

    #[test]
    fn verbose_gating_requires_default_and_no_optout() {
        let on = Arc::new(HttpDefaults::new().with_verbose(true));
        let off = Arc::new(HttpDefaults::default());

        assert!(HttpSession::new("u", Arc::clone(&on)).verbose_enabled());
        assert!(!HttpSession::new("u", Arc::clone(&on)).verbose(false).verbose_enabled());
        assert!(!HttpSession::new("u", Arc::clone(&off)).verbose_enabled());
        // A session cannot force logging on when the defaults disable it.
        assert!(!HttpSession::new("u", off).verbose(true).verbose_enabled());
    }
}
