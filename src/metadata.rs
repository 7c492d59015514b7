//! Metadata lookup against an OMDb-compatible service.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{RelayError, Stage};

/// The service's placeholder when it knows the title but has no poster.
const NO_POSTER: &str = "N/A";

/// The part of an OMDb record the relay reads. Everything else in the
/// payload is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,

    #[serde(rename = "Poster")]
    pub poster: Option<String>,

    /// `"True"` or `"False"`, as a string.
    #[serde(rename = "Response")]
    pub response: Option<String>,

    /// Set alongside `"Response": "False"`, e.g. `"Incorrect IMDb ID."`.
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl MetadataRecord {
    /// The poster URL, unless absent, blank or the `N/A` placeholder.
    pub fn poster_url(&self) -> Option<&str> {
        self.poster
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != NO_POSTER)
    }
}

/// Client for the lookup half of the relay.
#[derive(Clone, Debug)]
pub struct MetadataClient {
    http: reqwest::Client,
    base: Url,
    api_key: Option<String>,
}

impl MetadataClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            base: config.metadata_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// `<base>?i=<id>&r=json[&apikey=<key>]`. Query parameters already on
    /// the base URL are kept.
    pub fn lookup_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("i", id).append_pair("r", "json");
            if let Some(key) = &self.api_key {
                query.append_pair("apikey", key);
            }
        }
        url
    }

    /// One lookup request. The identifier goes in the query string of a
    /// `POST`, which is what the service has always been sent.
    pub async fn lookup(&self, id: &str) -> Result<MetadataRecord, RelayError> {
        let transport = |source| RelayError::Transport { stage: Stage::Lookup, source };

        debug!(imdb_id = id, "looking up metadata");
        let body = self
            .http
            .post(self.lookup_url(id))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;

        serde_json::from_slice(&body).map_err(|source| RelayError::Decode {
            id: id.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, api_key: Option<&str>) -> MetadataClient {
        let mut config = Config::new(Url::parse(base).unwrap());
        config.api_key = api_key.map(str::to_owned);
        MetadataClient::new(reqwest::Client::new(), &config)
    }

    #[test]
    fn lookup_url_requests_json() {
        let url = client("http://omdbapi.com/", None).lookup_url("tt0111161");
        assert_eq!(url.as_str(), "http://omdbapi.com/?i=tt0111161&r=json");
    }

    #[test]
    fn lookup_url_appends_api_key_and_keeps_base_query() {
        let url = client("http://omdbapi.com/?plot=short", Some("k3y")).lookup_url("tt0111161");
        assert_eq!(url.as_str(), "http://omdbapi.com/?plot=short&i=tt0111161&r=json&apikey=k3y");
    }

    #[test]
    fn lookup_url_encodes_identifier() {
        let url = client("http://omdbapi.com/", None).lookup_url("a b&c");
        assert_eq!(url.query(), Some("i=a+b%26c&r=json"));
    }

    #[test]
    fn decodes_found_record() {
        let record: MetadataRecord = serde_json::from_str(
            r#"{"Title":"The Shawshank Redemption","Year":"1994",
                "Poster":"http://example.com/poster.jpg","Response":"True"}"#,
        )
        .unwrap();
        assert_eq!(record.title.as_deref(), Some("The Shawshank Redemption"));
        assert_eq!(record.poster_url(), Some("http://example.com/poster.jpg"));
        assert_eq!(record.response.as_deref(), Some("True"));
    }

    #[test]
    fn not_found_record_has_no_poster() {
        let record: MetadataRecord =
            serde_json::from_str(r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#).unwrap();
        assert_eq!(record.poster_url(), None);
        assert_eq!(record.error.as_deref(), Some("Incorrect IMDb ID."));
    }

    #[test]
    fn placeholder_poster_is_not_a_url() {
        let record = MetadataRecord { poster: Some("N/A".to_owned()), ..Default::default() };
        assert_eq!(record.poster_url(), None);

        let record = MetadataRecord { poster: Some("  ".to_owned()), ..Default::default() };
        assert_eq!(record.poster_url(), None);
    }
}
