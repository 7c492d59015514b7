//! The poster relay: identifier in, image bytes out.
//!
//! One inbound request makes exactly one metadata lookup and, if that yields
//! a poster URL, exactly one image fetch. Nothing is cached or retried, and
//! the image is buffered in full before anything is sent back, so a failed
//! download is a `500` rather than a truncated `200`.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, header};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, RelayError, Stage};
use crate::health;
use crate::metadata::MetadataClient;
use crate::request::Request;
use crate::response::{ContentType, IntoResponse, Response};
use crate::router::Router;

/// Route path parameter holding the identifier.
pub const ID_PARAM: &str = "imdb_id";

/// A fetched image.
#[derive(Debug)]
pub struct Poster {
    pub bytes: Bytes,
    /// The image host's `Content-Type`, when it sent one.
    pub content_type: Option<String>,
}

impl IntoResponse for Poster {
    fn into_response(self) -> Response {
        match self.content_type {
            Some(ct) => Response::builder().body(&ct, self.bytes),
            None => Response::bytes(ContentType::OctetStream, self.bytes),
        }
    }
}

pub struct Relay {
    metadata: MetadataClient,
    http: reqwest::Client,
}

impl Relay {
    /// Builds the shared HTTP client. The transport's own defaults apply:
    /// no request timeout, redirects followed.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &Config) -> Self {
        Self { metadata: MetadataClient::new(http.clone(), config), http }
    }

    /// LOOKUP → FETCH. The first failure ends the pass.
    pub async fn fetch_poster(&self, id: &str) -> Result<Poster, RelayError> {
        let record = self.metadata.lookup(id).await?;
        debug!(
            imdb_id = id,
            title = record.title.as_deref(),
            response = record.response.as_deref(),
            "metadata record received"
        );

        let url = record.poster_url().ok_or_else(|| RelayError::MissingField {
            id: id.to_owned(),
            field: "Poster",
            upstream: record.error.clone(),
        })?;

        debug!(imdb_id = id, url, "fetching poster");
        self.fetch(url).await
    }

    async fn fetch(&self, url: &str) -> Result<Poster, RelayError> {
        let transport = |source| RelayError::Transport { stage: Stage::Fetch, source };

        let res = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?;

        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = res.bytes().await.map_err(transport)?;

        debug!(len = bytes.len(), content_type = content_type.as_deref(), "poster fetched");
        Ok(Poster { bytes, content_type })
    }
}

/// `GET /img/{imdb_id}`. The identifier arrives percent-decoded.
pub async fn poster(relay: Arc<Relay>, req: Request) -> Result<Poster, RelayError> {
    let id = req.param(ID_PARAM).unwrap_or_default();
    debug!(imdb_id = id, user_agent = req.header("user-agent"), "poster requested");
    relay.fetch_poster(id).await
}

/// The full route table: the relay plus the liveness check. `HEAD` on either
/// path is answered by the `GET` handler; other methods get a `405`.
pub fn app(relay: Arc<Relay>) -> Router {
    Router::new()
        .on(Method::GET, "/img/{imdb_id}", move |req: Request| poster(Arc::clone(&relay), req))
        .on(Method::GET, "/healthz", health::liveness)
}
