//! Envelope-speaking client for the web service.
//!
//! # Design
//! Every call runs the same fixed sequence: build the request with the
//! current session cookies, send it, absorb any `Set-Cookie` headers into a
//! new session, then decode the envelope (or save the file, for downloads).
//! Cookies are absorbed before the body is read, so the session reflects
//! what the server sent even when decoding later fails.
//!
//! `build_*` methods produce an `HttpRequest` and `parse_envelope` consumes
//! an `HttpResponse`; hosts that run their own I/O can drive those
//! directly. The verb methods (`get`, `post`, ...) do the round-trip through
//! the client's `Transport`.
//!
//! Calls take `&mut self` because they replace the session. A client shared
//! between threads must sit behind a lock; one client per user session is
//! the usual arrangement.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::download::{self, DownloadResult};
use crate::envelope::{decode_envelope, Envelope};
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::request::{build_url, RequestBuilder};
use crate::session::Session;

/// Base URL, transport and session shared by the envelope and plain clients.
#[derive(Debug)]
pub(crate) struct Endpoint<T> {
    base_url: String,
    transport: T,
    session: Session,
}

impl<T: Transport> Endpoint<T> {
    pub(crate) fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session: Session::new(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn replace_session(&mut self, session: Session) -> Session {
        std::mem::replace(&mut self.session, session)
    }

    pub(crate) fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<RequestBuilder, ClientError> {
        let url = build_url(&self.base_url, path, query)?;
        Ok(RequestBuilder::new(method, url).session(&self.session))
    }

    pub(crate) fn request_with_body<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<RequestBuilder, ClientError> {
        self.request(method, path, &[])?.json_body(body)
    }

    /// Replace the session with one that includes the response's cookies.
    pub(crate) fn absorb(&mut self, response: &HttpResponse) {
        let next = self.session.merged_set_cookie_headers(response.header_values("set-cookie"));
        if next != self.session {
            debug!(cookies = next.len(), "session: cookies updated");
        }
        self.session = next;
    }

    /// Send `request` and absorb the response cookies.
    pub(crate) fn exchange(&mut self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let response = self.transport.send(request)?;
        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            "client: response"
        );
        self.absorb(&response);
        Ok(response)
    }

    /// Send `request`, absorb cookies and return the body text.
    pub(crate) fn exchange_text(&mut self, request: &HttpRequest) -> Result<String, ClientError> {
        let body = self.exchange(request)?.into_string()?;
        debug!(%body, "client: response body");
        Ok(body)
    }
}

/// Client for endpoints that answer with `{statusCode, responseData}`.
#[derive(Debug)]
pub struct WsClient<T = UreqTransport> {
    endpoint: Endpoint<T>,
}

impl WsClient<UreqTransport> {
    /// Client with default timeouts over the blocking `ureq` transport.
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&ClientConfig::new(base_url))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(&config.base_url, UreqTransport::new(config))
    }
}

impl<T: Transport> WsClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            endpoint: Endpoint::new(base_url, transport),
        }
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }

    /// Cookies accumulated so far.
    pub fn session(&self) -> &Session {
        self.endpoint.session()
    }

    /// Swap in another session, returning the previous one.
    pub fn replace_session(&mut self, session: Session) -> Session {
        self.endpoint.replace_session(session)
    }

    pub fn build_get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpRequest, ClientError> {
        Ok(self.endpoint.request(HttpMethod::Get, path, query)?.build())
    }

    pub fn build_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ClientError> {
        Ok(self.endpoint.request_with_body(HttpMethod::Post, path, body)?.build())
    }

    pub fn build_put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ClientError> {
        Ok(self.endpoint.request_with_body(HttpMethod::Put, path, body)?.build())
    }

    pub fn build_delete(&self, path: &str) -> Result<HttpRequest, ClientError> {
        Ok(self.endpoint.request(HttpMethod::Delete, path, &[])?.build())
    }

    /// A POST that asks for `accept_types` instead of JSON.
    pub fn build_download<B: Serialize + ?Sized, S: AsRef<str>>(
        &self,
        path: &str,
        body: &B,
        accept_types: &[S],
    ) -> Result<HttpRequest, ClientError> {
        Ok(self
            .endpoint
            .request_with_body(HttpMethod::Post, path, body)?
            .accept(accept_types)
            .build())
    }

    /// Absorb the response cookies, then decode its envelope.
    pub fn parse_envelope<R: DeserializeOwned>(
        &mut self,
        response: HttpResponse,
    ) -> Result<Envelope<R>, ClientError> {
        self.endpoint.absorb(&response);
        let body = response.into_string()?;
        debug!(%body, "client: response body");
        decode_envelope(&body)
    }

    pub fn get<R: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        self.get_envelope(path, query)?.into_result()
    }

    pub fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        self.post_envelope(path, body)?.into_result()
    }

    pub fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        self.put_envelope(path, body)?.into_result()
    }

    pub fn delete<R: DeserializeOwned>(&mut self, path: &str) -> Result<R, ClientError> {
        self.delete_envelope(path)?.into_result()
    }

    /// Like [`WsClient::get`], but a business failure comes back as
    /// `Envelope::Failure` instead of an error.
    pub fn get_envelope<R: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Envelope<R>, ClientError> {
        let request = self.build_get(path, query)?;
        self.call(&request)
    }

    pub fn post_envelope<B: Serialize + ?Sized, R: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<R>, ClientError> {
        let request = self.build_post(path, body)?;
        self.call(&request)
    }

    pub fn put_envelope<B: Serialize + ?Sized, R: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<R>, ClientError> {
        let request = self.build_put(path, body)?;
        self.call(&request)
    }

    pub fn delete_envelope<R: DeserializeOwned>(
        &mut self,
        path: &str,
    ) -> Result<Envelope<R>, ClientError> {
        let request = self.build_delete(path)?;
        self.call(&request)
    }

    /// POST `body` and save the returned file under `target_dir`.
    ///
    /// A JSON reply, a reply without `Content-Type`, and a failure to write
    /// the file all come back as `Ok(DownloadResult::NotSaved(..))`. Only
    /// failing to build or send the request is an `Err`.
    pub fn post_and_download_file<B, S>(
        &mut self,
        path: &str,
        body: &B,
        target_dir: impl AsRef<Path>,
        accept_types: &[S],
    ) -> Result<DownloadResult, ClientError>
    where
        B: Serialize + ?Sized,
        S: AsRef<str>,
    {
        let request = self.build_download(path, body, accept_types)?;
        let response = self.endpoint.exchange(&request)?;
        Ok(download::save_response(response, target_dir.as_ref()))
    }

    fn call<R: DeserializeOwned>(
        &mut self,
        request: &HttpRequest,
    ) -> Result<Envelope<R>, ClientError> {
        let body = self.endpoint.exchange_text(request)?;
        decode_envelope(&body)
    }
}
