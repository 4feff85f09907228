//! Blocking mirror of the response facade.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use url::Url;

use crate::{Error, Result};

use super::{charset_of, parse_set_cookies};

/// Facade over a completed blocking transport response. Same surface as the
/// asynchronous [`HttpResponse`](super::HttpResponse), adapted to sync mode.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    inner: Option<reqwest::blocking::Response>,
    body: Option<Bytes>,
    json: Option<Value>,
}

impl HttpResponse {
    pub(crate) fn new(response: reqwest::blocking::Response) -> Self {
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

    pub fn cookies(&self) -> BTreeMap<String, String> {
        parse_set_cookies(&self.headers)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn encoding(&self) -> String {
        charset_of(&self.headers)
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

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
    pub fn read(&mut self) -> Result<&Bytes> {
        if self.body.is_none() {
            let bytes = match self.inner.take() {
                Some(response) => response.bytes().map_err(Error::from)?,
                None => Bytes::new(),
            };
            self.body = Some(bytes);
        }
        Ok(self.body.get_or_insert_with(Bytes::new))
    }

    pub fn text(&mut self) -> Result<String> {
        let bytes = self.read()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Decode the body as JSON, parsing once and caching the result. A JSON
    /// `null` body decodes to an empty object.
    pub fn json(&mut self) -> Result<&Value> {
        if self.json.is_none() {
            let bytes = self.read()?;
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

    /// Incremental byte access via [`std::io::Read`]. Reads the cached body
    /// if it was already consumed, otherwise straight from the transport.
    pub fn into_reader(mut self) -> Box<dyn Read + Send> {
        if let Some(body) = self.body.take() {
            return Box::new(Cursor::new(body.to_vec()));
        }
        match self.inner.take() {
            Some(response) => Box::new(response),
            None => Box::new(Cursor::new(Vec::new())),
        }
    }
}
