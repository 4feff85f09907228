//! Read-only response facades.
//!
//! [`HttpResponse`] adapts a completed transport response into a stable
//! surface: status, headers, cookies, URL, encoding, body accessors, a JSON
//! decoder that parses once and caches, and streaming byte access. The
//! blocking executor returns the mirror type in [`blocking`].
//!
//! Body accessors are lazy: the underlying transport response is consumed on
//! the first body read and the bytes are cached, so repeated `text()` /
//! `json()` calls are cheap and streaming remains possible when nothing has
//! been read yet.

pub mod blocking;

use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::{BoxStream, Error, Result};

/// Facade over a completed asynchronous transport response.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    inner: Option<reqwest::Response>,
    body: Option<Bytes>,
    json: Option<Value>,
}

impl HttpResponse {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
            inner: Some(response),
            body: None,
            json: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Cookies set by the server, parsed from `set-cookie` headers.
    pub fn cookies(&self) -> BTreeMap<String, String> {
        parse_set_cookies(&self.headers)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Charset advertised in the content-type header, defaulting to utf-8.
    pub fn encoding(&self) -> String {
        charset_of(&self.headers)
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// Convert a 4xx/5xx status into [`Error::Status`]. Never called by the
    /// pipeline itself; error statuses are returned as normal responses and
    /// this conversion is an explicit caller decision.
    pub fn error_for_status(&self) -> Result<()> {
        if self.is_error() {
            return Err(Error::Status {
                status: self.status.as_u16(),
                url: self.url.to_string(),
            });
        }
        Ok(())
    }

    /// Eagerly read and cache the full body.
    pub async fn read(&mut self) -> Result<&Bytes> {
        if self.body.is_none() {
            let bytes = match self.inner.take() {
                Some(response) => response.bytes().await.map_err(Error::from)?,
                None => Bytes::new(),
            };
            self.body = Some(bytes);
        }
        Ok(self.body.get_or_insert_with(Bytes::new))
    }

    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.read().await?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Decode the body as JSON, parsing once and caching the result.
    ///
    /// A JSON `null` body decodes to an empty object rather than an absent
    /// value, so callers can always treat the result as a mapping.
    pub async fn json(&mut self) -> Result<&Value> {
        if self.json.is_none() {
            let bytes = self.read().await?;
            let mut parsed: Value = serde_json::from_slice(bytes)?;
            if parsed.is_null() {
                parsed = Value::Object(serde_json::Map::new());
            }
            self.json = Some(parsed);
        }
        Ok(self
            .json
            .get_or_insert_with(|| Value::Object(serde_json::Map::new())))
    }

    /// Incremental byte access. Yields the cached body as a single chunk if
    /// it was already read, otherwise streams straight from the transport.
    pub fn bytes_stream(mut self) -> BoxStream<'static, Bytes> {
        if let Some(body) = self.body.take() {
            return Box::pin(futures::stream::once(async move { Ok::<_, Error>(body) }));
        }
        match self.inner.take() {
            Some(response) => Box::pin(response.bytes_stream().map_err(Error::from)),
            None => Box::pin(futures::stream::empty::<Result<Bytes>>()),
        }
    }
}

/// `name=value` pairs from every `set-cookie` header, attributes dropped.
pub(crate) fn parse_set_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    cookies
}

pub(crate) fn charset_of(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| {
            ct.split(';')
                .filter_map(|part| part.trim().strip_prefix("charset="))
                .next()
                .map(|cs| cs.trim_matches('"').to_ascii_lowercase())
        })
        .unwrap_or_else(|| "utf-8".to_string())
}
