//! Synchronous retry-and-dispatch, mirroring the async pipeline with the
//! blocking transport. Retry sleeps block the calling thread.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{redirect, Method};
use tracing::{debug, info};

use crate::response::blocking::HttpResponse;
use crate::{Error, Result};

use super::assembly::RequestParts;
use super::HttpSession;

impl HttpSession {
    pub fn blocking_get(self) -> Result<HttpResponse> {
        self.blocking_request(Method::GET)
    }

    pub fn blocking_post(self) -> Result<HttpResponse> {
        self.blocking_request(Method::POST)
    }

    pub fn blocking_put(self) -> Result<HttpResponse> {
        self.blocking_request(Method::PUT)
    }

    pub fn blocking_patch(self) -> Result<HttpResponse> {
        self.blocking_request(Method::PATCH)
    }

    pub fn blocking_delete(self) -> Result<HttpResponse> {
        self.blocking_request(Method::DELETE)
    }

    /// Execute the configured request with retry on the calling thread.
    pub fn blocking_request(mut self, method: Method) -> Result<HttpResponse> {
        let parts = self.assemble(method);
        self.log_dispatch(&parts);

        let client = match self.blocking_client.take() {
            Some(client) => client,
            None => build_client(&parts)?,
        };

        let attempts = self.effective_attempts();
        let interval = self.options.retry_interval;
        let mut attempt = 0u32;
        loop {
            let last = attempt + 1 >= attempts;
            match send_once(&client, &parts) {
                Ok(response) if response.status().as_u16() >= 500 && !last => {
                    debug!(
                        method = %parts.method,
                        url = %self.options.url,
                        http_status = response.status().as_u16(),
                        next_attempt = attempt + 1,
                        "server error, retrying"
                    );
                    if let Some(delay) = interval {
                        std::thread::sleep(delay);
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
                    self.log_blocking_response(&mut wrapped);
                    return Ok(wrapped);
                }
                Err(error) if error.is_connectivity() && !last => {
                    debug!(
                        method = %parts.method,
                        url = %self.options.url,
                        error = %error,
                        next_attempt = attempt + 1,
                        "transport failure, retrying"
                    );
                    if let Some(delay) = interval {
                        std::thread::sleep(delay);
                    }
                }
                Err(error) => {
                    if error.is_connectivity() {
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

    fn log_blocking_response(&self, response: &mut HttpResponse) {
        if !self.verbose_enabled() {
            return;
        }
        let status = response.status().as_u16();
        let elapsed_ms = self.elapsed_ms();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type.contains("application/json") {
            if let Ok(body) = response.text() {
                info!(http_status = status, duration_ms = elapsed_ms, body = %body, "response");
                return;
            }
        }
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        info!(
            http_status = status,
            duration_ms = elapsed_ms,
            content_type = %content_type,
            content_disposition = %content_disposition,
            "response"
        );
    }
}

fn build_client(parts: &RequestParts) -> Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::Client::builder();
    if !parts.follow_redirects {
        builder = builder.redirect(redirect::Policy::none());
    }
    if !parts.verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().map_err(Error::from)
}

fn send_once(
    client: &reqwest::blocking::Client,
    parts: &RequestParts,
) -> Result<reqwest::blocking::Response> {
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
        request = request.body(content.to_vec());
    }
    if let Some(files) = &parts.files {
        request = request.multipart(multipart_form(files)?);
    }
    if let Some(json) = &parts.json {
        request = request.json(json);
    }
    request.send().map_err(Error::from)
}

fn multipart_form(
    files: &std::collections::BTreeMap<String, crate::FilePart>,
) -> Result<reqwest::blocking::multipart::Form> {
    let mut form = reqwest::blocking::multipart::Form::new();
    for (name, file) in files {
        let mut part = reqwest::blocking::multipart::Part::bytes(file.content.to_vec())
            .file_name(file.file_name.clone());
        if let Some(mime) = &file.mime {
            part = part.mime_str(mime)?;
        }
        form = form.part(name.clone(), part);
    }
    Ok(form)
}
