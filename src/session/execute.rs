//! Asynchronous retry-and-dispatch.
//!
//! One attempt per loop iteration: connectivity failures are retried up to
//! `max_retries` and propagated unmodified on exhaustion; 5xx responses are
//! retried the same way but returned as normal responses when attempts run
//! out; everything else returns immediately. Retry sleeps and the network
//! call are suspension points; cancelling the returned future drops any ad
//! hoc transport client before the cancellation propagates.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{redirect, Client, Method};
use tracing::{debug, info};

use crate::response::HttpResponse;
use crate::{Error, Result};

use super::assembly::RequestParts;
use super::HttpSession;

impl HttpSession {
    pub async fn get(self) -> Result<HttpResponse> {
        self.request(Method::GET).await
    }

    pub async fn post(self) -> Result<HttpResponse> {
        self.request(Method::POST).await
    }

    pub async fn put(self) -> Result<HttpResponse> {
        self.request(Method::PUT).await
    }

    pub async fn patch(self) -> Result<HttpResponse> {
        self.request(Method::PATCH).await
    }

    pub async fn delete(self) -> Result<HttpResponse> {
        self.request(Method::DELETE).await
    }

    /// Execute the configured request with retry.
    pub async fn request(mut self, method: Method) -> Result<HttpResponse> {
        let parts = self.assemble(method);
        self.log_dispatch(&parts);

        // Ad hoc client unless one was injected; owned by this call and
        // dropped on every exit path.
        let client = match self.client.take() {
            Some(client) => client,
            None => build_client(&parts)?,
        };

        let attempts = self.effective_attempts();
        let interval = self.options.retry_interval;
        let mut attempt = 0u32;
        loop {
            let last = attempt + 1 >= attempts;
            match send_once(&client, &parts).await {
                Ok(response) if response.status().as_u16() >= 500 && !last => {
                    debug!(
                        method = %parts.method,
                        url = %self.options.url,
                        http_status = response.status().as_u16(),
                        next_attempt = attempt + 1,
                        "server error, retrying"
                    );
                    if let Some(delay) = interval {
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(response) => {
                    if response.status().as_u16() >= 500 {
                        debug!(
                            method = %parts.method,
                            url = %self.options.url,
                            http_status = response.status().as_u16(),
                            "server error returned on final attempt"
                        );
                    }
                    let mut wrapped = HttpResponse::new(response);
                    self.log_response(&mut wrapped).await;
                    return Ok(wrapped);
                }
                Err(error) if is_retryable(&error) && !last => {
                    debug!(
                        method = %parts.method,
                        url = %self.options.url,
                        error = %error,
                        next_attempt = attempt + 1,
                        "transport failure, retrying"
                    );
                    if let Some(delay) = interval {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => {
                    if is_retryable(&error) {
                        debug!(
                            method = %parts.method,
                            url = %self.options.url,
                            error = %error,
                            "maximum number of retries reached"
                        );
                    }
                    return Err(error);
                }
            }
            attempt += 1;
        }
    }

    async fn log_response(&self, response: &mut HttpResponse) {
        if !self.verbose_enabled() {
            return;
        }
        let status = response.status().as_u16();
        let elapsed_ms = self.elapsed_ms();
        let content_type = header_str(response.headers(), CONTENT_TYPE);
        if content_type.contains("application/json") {
            if let Ok(body) = response.text().await {
                info!(http_status = status, duration_ms = elapsed_ms, body = %body, "response");
                return;
            }
        }
        let content_disposition = header_str(response.headers(), CONTENT_DISPOSITION);
        info!(
            http_status = status,
            duration_ms = elapsed_ms,
            content_type = %content_type,
            content_disposition = %content_disposition,
            "response"
        );
    }
}

fn header_str(headers: &reqwest::header::HeaderMap, name: reqwest::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Connectivity failures the loop retries: connection refused, connect
/// timeout, read timeout, generic timeout, and remote protocol errors
/// (request failures that never produced a status).
fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Transport(e) => {
            e.is_timeout()
                || e.is_connect()
                || (e.is_request() && !e.is_builder() && e.status().is_none())
        }
        _ => false,
    }
}

fn build_client(parts: &RequestParts) -> Result<Client> {
    let mut builder = Client::builder();
    if !parts.follow_redirects {
        builder = builder.redirect(redirect::Policy::none());
    }
    if !parts.verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().map_err(Error::from)
}

async fn send_once(client: &Client, parts: &RequestParts) -> Result<reqwest::Response> {
    let mut request = client
        .request(parts.method.clone(), &parts.url)
        .timeout(parts.timeout);
    if !parts.query.is_empty() {
        request = request.query(&parts.query);
    }
    for (name, value) in &parts.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(cookie) = parts.cookie_header() {
        request = request.header(reqwest::header::COOKIE, cookie);
    }
    if let Some(form) = &parts.form {
        request = request.form(form);
    }
    if let Some(content) = &parts.content {
        request = request.body(content.clone());
    }
    if let Some(files) = &parts.files {
        request = request.multipart(multipart_form(files)?);
    }
    if let Some(json) = &parts.json {
        request = request.json(json);
    }
    request.send().await.map_err(Error::from)
}

fn multipart_form(
    files: &std::collections::BTreeMap<String, crate::FilePart>,
) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for (name, file) in files {
        let mut part = reqwest::multipart::Part::bytes(file.content.to_vec())
            .file_name(file.file_name.clone());
        if let Some(mime) = &file.mime {
            part = part.mime_str(mime)?;
        }
        form = form.part(name.clone(), part);
    }
    Ok(form)
}
