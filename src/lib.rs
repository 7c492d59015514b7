//! # poster-relay
//!
//! Resolves a movie identifier to its poster and relays the image.
//!
//! ```text
//! GET /img/tt0111161
//!   → POST <metadata-url>?i=tt0111161&r=json     (OMDb lookup)
//!   → GET  <record.Poster>                       (image fetch)
//!   ← 200, image bytes, upstream content-type
//! ```
//!
//! Any failure along the way (unknown identifier, record without a poster,
//! unreachable host, non-2xx status) is a plain `500`. No caching, no
//! retries: one lookup and at most one fetch per request.
//!
//! The crate carries its own small serving layer: a matchit router, type
//! erased async handlers, and a hyper server with graceful shutdown and
//! optional rustls termination.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use poster_relay::{Config, Relay, Server, relay};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), poster_relay::Error> {
//!     let config = Config::new("http://omdbapi.com/".parse().unwrap());
//!     let relay = Arc::new(Relay::new(&config)?);
//!
//!     Server::bind(config.listen).await?.serve(relay::app(relay)).await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod health;
pub mod metadata;
pub mod relay;
pub mod tls;

pub use config::Config;
pub use error::{Error, RelayError, Stage};
pub use handler::Handler;
pub use relay::{Poster, Relay};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
