//! Error types.
//!
//! Two families live here. [`Error`] covers startup and the serving
//! infrastructure: binding a port, loading TLS material, building the
//! outbound client.
//! [`RelayError`] covers one failed lookup-and-fetch pass. Relay failures
//! never reach hyper; they become a `500` through [`IntoResponse`].

use http::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::response::{IntoResponse, Response};
use crate::tls::TlsError;

/// Failure of the server itself, as opposed to a single request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls: {0}")]
    Tls(#[from] TlsError),

    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Why a poster could not be relayed.
///
/// Callers see the same `500` for every variant. The variants exist so the
/// log line says which step broke.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The metadata record has no usable poster URL. An unknown identifier
    /// ends up here too: the service answers `"Response": "False"` with an
    /// `Error` message and no `Poster`.
    #[error("metadata record for `{id}` has no `{field}` field{}", upstream_message(.upstream))]
    MissingField {
        id: String,
        field: &'static str,
        upstream: Option<String>,
    },

    /// An outbound call did not complete or answered with a non-success status.
    #[error("{stage} request failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    /// The metadata body was not a record.
    #[error("metadata response for `{id}` is not a valid record: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which outbound call a transport failure belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Lookup,
    Fetch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lookup => "metadata lookup",
            Self::Fetch => "image fetch",
        })
    }
}

fn upstream_message(upstream: &Option<String>) -> String {
    match upstream {
        Some(msg) => format!(" (upstream: {msg})"),
        None => String::new(),
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error!(error = %self, "poster relay failed");
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .text("Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_mentions_upstream_message() {
        let err = RelayError::MissingField {
            id: "bogus".to_owned(),
            field: "Poster",
            upstream: Some("Incorrect IMDb ID.".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "metadata record for `bogus` has no `Poster` field (upstream: Incorrect IMDb ID.)"
        );
    }

    #[test]
    fn missing_field_without_upstream_message() {
        let err = RelayError::MissingField {
            id: "tt0000001".to_owned(),
            field: "Poster",
            upstream: None,
        };
        assert_eq!(err.to_string(), "metadata record for `tt0000001` has no `Poster` field");
    }

    #[test]
    fn every_relay_error_is_a_server_fault() {
        let source = serde_json::from_slice::<serde_json::Value>(b"<html>").unwrap_err();
        let err = RelayError::Decode { id: "tt0111161".to_owned(), source };
        let res = err.into_response();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"Internal Server Error".as_slice());
    }
}
