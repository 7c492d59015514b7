//! Incoming HTTP request type.

use std::collections::HashMap;

use http::{HeaderMap, Method, Uri};

/// An incoming request as a handler sees it: the request line, the headers
/// and the path parameters the router captured. Bodies are not read; the
/// relay only serves `GET`.
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, params: HashMap<String, String>) -> Self {
        Self {
            uri: parts.uri,
            method: parts.method,
            headers: parts.headers,
            params,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }

    /// Header lookup. Names are case-insensitive; values that are not
    /// visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/img/{imdb_id}`, `req.param("imdb_id")` on `/img/tt0111161`
    /// returns `Some("tt0111161")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
