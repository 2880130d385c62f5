//! Client for endpoints that answer with bare JSON rather than an envelope.
//!
//! Shares request building and session handling with `WsClient`; only the
//! decoding differs. A body that does not decode into the requested type is
//! always a `ClientError::Decode`, never an empty result.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Endpoint;
use crate::codec;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, Transport, UreqTransport};
use crate::session::Session;

#[derive(Debug)]
pub struct RestClient<T = UreqTransport> {
    endpoint: Endpoint<T>,
}

impl RestClient<UreqTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&ClientConfig::new(base_url))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(&config.base_url, UreqTransport::new(config))
    }
}

impl<T: Transport> RestClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            endpoint: Endpoint::new(base_url, transport),
        }
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }

    pub fn session(&self) -> &Session {
        self.endpoint.session()
    }

    pub fn replace_session(&mut self, session: Session) -> Session {
        self.endpoint.replace_session(session)
    }

    pub fn get<R: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        let request = self.endpoint.request(HttpMethod::Get, path, query)?.build();
        self.call(&request)
    }

    pub fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        let request = self.endpoint.request_with_body(HttpMethod::Post, path, body)?.build();
        self.call(&request)
    }

    pub fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        let request = self.endpoint.request_with_body(HttpMethod::Put, path, body)?.build();
        self.call(&request)
    }

    pub fn delete<R: DeserializeOwned>(&mut self, path: &str) -> Result<R, ClientError> {
        let request = self.endpoint.request(HttpMethod::Delete, path, &[])?.build();
        self.call(&request)
    }

    /// An empty body decodes as `null`, so `()` and `Option<_>` fit
    /// endpoints that reply with nothing.
    fn call<R: DeserializeOwned>(&mut self, request: &HttpRequest) -> Result<R, ClientError> {
        let body = self.endpoint.exchange_text(request)?;
        if body.trim().is_empty() {
            return codec::from_value(serde_json::Value::Null);
        }
        codec::from_json(&body)
    }
}
