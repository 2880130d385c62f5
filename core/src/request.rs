//! Request construction: URL composition, JSON headers, session cookies.

use serde::Serialize;
use url::Url;

use crate::codec;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest};
use crate::session::Session;

pub const APPLICATION_JSON: &str = "application/json";

/// Join `base` and `path` with exactly one `/` and append `query`.
///
/// Query pairs are sorted by key, then value, so equal sets always produce
/// the same URL regardless of the order the caller listed them in.
pub fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<String, ClientError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&joined)
        .map_err(|e| ClientError::encode(format!("invalid url {joined:?}: {e}")))?;

    if !query.is_empty() {
        let mut pairs = query.to_vec();
        pairs.sort_unstable();
        let mut serializer = url.query_pairs_mut();
        for (key, value) in pairs {
            serializer.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Builds one `HttpRequest`. Content type and accept default to JSON.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: HttpMethod,
    url: String,
    accept: Vec<String>,
    body: Option<String>,
    cookie: Option<String>,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            accept: vec![APPLICATION_JSON.to_string()],
            body: None,
            cookie: None,
        }
    }

    /// Serialize `body` as the JSON request body.
    pub fn json_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(codec::to_json(body)?);
        Ok(self)
    }

    /// Replace the accepted media types. An empty list keeps the JSON default.
    pub fn accept<S: AsRef<str>>(mut self, types: &[S]) -> Self {
        if !types.is_empty() {
            self.accept = types.iter().map(|t| t.as_ref().to_string()).collect();
        }
        self
    }

    /// Snapshot the session's cookies into the request.
    pub fn session(mut self, session: &Session) -> Self {
        self.cookie = session.cookie_header();
        self
    }

    pub fn build(self) -> HttpRequest {
        let mut headers = vec![
            ("content-type".to_string(), APPLICATION_JSON.to_string()),
            ("accept".to_string(), self.accept.join(", ")),
        ];
        if let Some(cookie) = self.cookie {
            headers.push(("cookie".to_string(), cookie));
        }
        HttpRequest {
            method: self.method,
            url: self.url,
            headers,
            body: self.body,
        }
    }
}
