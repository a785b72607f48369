//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::router::{Param, Params};

/// An incoming request together with the placeholders its route captured.
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes, params: Params) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header value, if present and valid UTF-8. Lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of one `key=value` pair in the query string, undecoded.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Raw text captured by a route placeholder.
    ///
    /// For a route `users/{id:\d+}`, `req.param("id")` on `/users/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Captured value coerced by its placeholder type.
    pub fn typed_param(&self, key: &str) -> Option<Param<'_>> {
        self.params.typed(key)
    }

    pub fn params(&self) -> &Params { &self.params }
}
