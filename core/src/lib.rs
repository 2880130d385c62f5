//! Blocking client for a web service that wraps every response in a
//! `{statusCode, responseData}` envelope.
//!
//! # Overview
//! `WsClient` builds JSON requests against a base URL, replays the cookies
//! the service has set, and decodes each response into either the caller's
//! payload type or a typed `ClientError::Business`. Download endpoints are
//! handled by `post_and_download_file`, which tells a streamed file apart
//! from a JSON error reply by its `Content-Type`.
//!
//! # Design
//! - `Session` is an immutable value replaced after every call.
//! - Requests are plain `HttpRequest` data; a `Transport` executes them
//!   (`UreqTransport` by default), so the decoding logic is testable
//!   against canned responses.
//! - Clients are ordinary values. Construct them once at startup and pass
//!   them to whatever needs them.
//! - `RestClient` covers endpoints that reply with bare JSON.

pub mod client;
pub mod codec;
pub mod config;
pub mod download;
pub mod envelope;
pub mod error;
pub mod http;
pub mod request;
pub mod rest;
pub mod session;

pub use client::WsClient;
pub use config::{ClientConfig, ConfigError};
pub use download::{DownloadResult, NotSavedReason, SavedFile};
pub use envelope::{decode_envelope, Envelope, ServiceError};
pub use error::ClientError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use request::{build_url, RequestBuilder};
pub use rest::RestClient;
pub use session::{Cookie, Session};
