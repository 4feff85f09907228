//! # fluent-http
//!
//! Fluent request configuration and a retrying sync/async execution pipeline
//! over an opaque HTTP transport (reqwest).
//!
//! ## Overview
//!
//! A session accumulates one request's configuration through chained calls,
//! then executes it with retry and logging policy in either synchronous or
//! asynchronous mode, returning a stable read-only response facade. The
//! transport itself (connections, TLS, pooling, redirect-following) stays an
//! external collaborator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fluent_http::{HttpClient, HttpDefaults};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> fluent_http::Result<()> {
//!     let client = HttpClient::new(
//!         HttpDefaults::new()
//!             .with_base_url("https://api.example.com")
//!             .with_verbose(true),
//!     );
//!
//!     let mut response = client
//!         .create("/v1/items")
//!         .add_header("x-trace", Some("abc"))
//!         .add_json(json!({"name": "demo"}))?
//!         .retry(3)
//!         .post()
//!         .await?;
//!
//!     println!("{} {}", response.status(), response.text().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Session factory holding shared defaults |
//! | [`options`] | Per-request and factory-wide configuration records |
//! | [`session`] | Fluent builder and the retry-and-dispatch pipeline |
//! | [`response`] | Read-only facades over completed responses |
//! | [`error`] | Unified error type |

pub mod client;
pub mod error;
pub mod options;
pub mod response;
pub mod session;

pub use client::HttpClient;
pub use error::Error;
pub use options::{FilePart, HttpDefaults, HttpOptions};
pub use response::HttpResponse;
pub use session::HttpSession;

// The transport's method and status types are part of the public surface.
pub use reqwest::{Method, StatusCode};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed byte stream used for incremental response body access.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;
