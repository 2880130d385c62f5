//! Cookie-based session state.
//!
//! # Design
//! A `Session` is an immutable value. Absorbing a response produces a new
//! session instead of mutating the old one, so the client swaps its session
//! wholesale after each call and any concurrent use has to go through
//! `&mut` (or an explicit lock) to do so.
//!
//! Cookies are keyed by name only. Attributes are kept for inspection but
//! not enforced: expired cookies are still sent, the server decides what to
//! do with them.

use std::collections::BTreeMap;

use crate::http::HttpRequest;

/// One cookie as received in a `Set-Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Parse a `Set-Cookie` header value.
    ///
    /// Returns `None` when the leading `name=value` pair is missing or the
    /// name is empty. Unknown attributes are ignored.
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Cookie::new(name, value.trim());

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attr.trim(), None),
            };
            match (key.to_ascii_lowercase().as_str(), val) {
                ("domain", Some(v)) => cookie.domain = Some(v.trim_start_matches('.').to_string()),
                ("path", Some(v)) => cookie.path = Some(v.to_string()),
                ("expires", Some(v)) => cookie.expires = Some(v.to_string()),
                ("max-age", Some(v)) => cookie.max_age = v.parse().ok(),
                ("secure", _) => cookie.secure = true,
                ("httponly", _) => cookie.http_only = true,
                _ => {}
            }
        }
        Some(cookie)
    }
}

/// The cookies a client has accumulated so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: BTreeMap<String, Cookie>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of this session and `cookies`; same-named cookies take the
    /// incoming value.
    #[must_use]
    pub fn merged<I>(&self, cookies: I) -> Session
    where
        I: IntoIterator<Item = Cookie>,
    {
        let mut next = self.cookies.clone();
        for cookie in cookies {
            next.insert(cookie.name.clone(), cookie);
        }
        Session { cookies: next }
    }

    /// Merge every parseable `Set-Cookie` value. Malformed headers are skipped.
    #[must_use]
    pub fn merged_set_cookie_headers<'a, I>(&self, headers: I) -> Session
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.merged(headers.into_iter().filter_map(Cookie::parse_set_cookie))
    }

    /// Value for a `Cookie` request header, or `None` for an empty session.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .values()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    /// Copy every cookie onto `request` as a single `cookie` header,
    /// replacing any cookie header already present.
    pub fn attach_to(&self, request: &mut HttpRequest) {
        request.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("cookie"));
        if let Some(value) = self.cookie_header() {
            request.headers.push(("cookie".to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }
}
