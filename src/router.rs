//! Radix-tree request router.
//!
//! One matchit tree per HTTP method. Register a path, get a handler back at
//! request time along with the captured `{name}` parameters, percent-decoded.
//!
//! A path that matches under some other method is a `405` carrying an
//! `Allow` list; a `HEAD` with no route of its own falls back to `GET`.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::{Params, Router as MatchitRouter};
use percent_encoding::percent_decode_str;

use crate::handler::{BoxedHandler, Handler};

/// What the router made of one request line.
pub(crate) enum Route {
    Matched(BoxedHandler, HashMap<String, String>),
    /// The path exists, but not for this method.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// The application router. Build it once at startup and hand it to
/// [`Server::serve`](crate::Server::serve).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// # use poster_relay::{Request, Response, Router, health};
    /// # use http::Method;
    /// # async fn poster(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET, "/img/{imdb_id}", poster)
    ///     .on(Method::GET, "/healthz",       health::liveness);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn route(&self, method: &Method, path: &str) -> Route {
        if let Some(route) = self.matched(method, path) {
            return route;
        }
        if method == Method::HEAD {
            if let Some(route) = self.matched(&Method::GET, path) {
                return route;
            }
        }

        let mut allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();
        if allowed.is_empty() {
            return Route::NotFound;
        }
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Route::MethodNotAllowed(allowed)
    }

    /// `None` when `method` has no route for `path`. A match whose
    /// parameters do not decode to UTF-8 is `NotFound`.
    fn matched(&self, method: &Method, path: &str) -> Option<Route> {
        let matched = self.routes.get(method)?.at(path).ok()?;
        Some(match decode_params(&matched.params) {
            Some(params) => Route::Matched(Arc::clone(matched.value), params),
            None => Route::NotFound,
        })
    }
}

fn decode_params(params: &Params<'_, '_>) -> Option<HashMap<String, String>> {
    params
        .iter()
        .map(|(k, v)| {
            let value = percent_decode_str(v).decode_utf8().ok()?;
            Some((k.to_owned(), value.into_owned()))
        })
        .collect()
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, Response};

    async fn noop(_req: Request) -> Response {
        Response::text("")
    }

    fn matched_params(route: Route) -> HashMap<String, String> {
        match route {
            Route::Matched(_, params) => params,
            Route::MethodNotAllowed(allowed) => panic!("expected a match, got 405 {allowed:?}"),
            Route::NotFound => panic!("expected a match, got 404"),
        }
    }

    #[test]
    fn captures_identifier_parameter() {
        let router = Router::new().on(Method::GET, "/img/{imdb_id}", noop);
        let params = matched_params(router.route(&Method::GET, "/img/tt0111161"));
        assert_eq!(params.get("imdb_id").map(String::as_str), Some("tt0111161"));
    }

    #[test]
    fn parameters_are_percent_decoded() {
        let router = Router::new().on(Method::GET, "/img/{imdb_id}", noop);
        let params = matched_params(router.route(&Method::GET, "/img/tt%300111161"));
        assert_eq!(params["imdb_id"], "tt0111161");

        let params = matched_params(router.route(&Method::GET, "/img/a%20b"));
        assert_eq!(params["imdb_id"], "a b");
    }

    #[test]
    fn undecodable_parameter_is_not_found() {
        let router = Router::new().on(Method::GET, "/img/{imdb_id}", noop);
        assert!(matches!(router.route(&Method::GET, "/img/%ff%fe"), Route::NotFound));
    }

    #[test]
    fn head_falls_back_to_get() {
        let router = Router::new().on(Method::GET, "/img/{imdb_id}", noop);
        let params = matched_params(router.route(&Method::HEAD, "/img/tt0111161"));
        assert_eq!(params["imdb_id"], "tt0111161");
    }

    #[test]
    fn wrong_method_lists_allowed_ones() {
        let router = Router::new().on(Method::GET, "/img/{imdb_id}", noop);
        match router.route(&Method::POST, "/img/tt0111161") {
            Route::MethodNotAllowed(allowed) => assert_eq!(allowed, [Method::GET, Method::HEAD]),
            _ => panic!("expected 405"),
        }
    }

    #[test]
    fn unknown_path_misses() {
        let router = Router::new().on(Method::GET, "/img/{imdb_id}", noop);
        assert!(matches!(router.route(&Method::GET, "/img"), Route::NotFound));
        assert!(matches!(router.route(&Method::POST, "/img/tt0111161/extra"), Route::NotFound));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_route_panics() {
        let _ = Router::new()
            .on(Method::GET, "/img/{imdb_id}", noop)
            .on(Method::GET, "/img/{id}", noop);
    }
}
