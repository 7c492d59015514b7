//! Startup configuration.
//!
//! Every setting is a command-line flag with an environment-variable
//! fallback. [`Args`] is what clap parses; [`Config`] is what the rest of the
//! crate consumes.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

use crate::tls::TlsPaths;

pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 5000));
pub const DEFAULT_METADATA_URL: &str = "http://omdbapi.com/";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "POSTER_RELAY_LISTEN", default_value_t = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Base URL of the OMDb-compatible metadata service
    #[arg(long, env = "POSTER_RELAY_METADATA_URL", default_value = DEFAULT_METADATA_URL)]
    pub metadata_url: Url,

    /// OMDb API key, sent as the `apikey` query parameter
    #[arg(long, env = "OMDB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory holding fullchain.pem and privkey.pem; serves HTTPS when set
    #[arg(long, env = "POSTER_RELAY_TLS_DIR")]
    pub tls_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "POSTER_RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Immutable settings shared by every request.
#[derive(Clone, Debug)]
pub struct Config {
    pub listen: SocketAddr,
    pub metadata_url: Url,
    pub api_key: Option<String>,
    pub tls: Option<TlsPaths>,
}

impl Config {
    /// Plain-HTTP config pointing at `metadata_url`, listening on the default
    /// address.
    pub fn new(metadata_url: Url) -> Self {
        Self {
            listen: DEFAULT_LISTEN,
            metadata_url,
            api_key: None,
            tls: None,
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            listen: args.listen,
            metadata_url: args.metadata_url.clone(),
            api_key: args.api_key.clone().filter(|k| !k.is_empty()),
            tls: args.tls_dir.as_ref().map(TlsPaths::from_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_public_service() {
        let args = Args::try_parse_from(["poster-relay"]).unwrap();
        let config = Config::from(&args);
        assert_eq!(config.listen, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.metadata_url.as_str(), "http://omdbapi.com/");
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(config.tls.is_none());
    }

    #[test]
    fn tls_dir_expands_to_cert_and_key() {
        let args = Args::try_parse_from([
            "poster-relay",
            "--tls-dir",
            "/etc/letsencrypt/live/posters.example.com",
            "--log-format",
            "json",
        ])
        .unwrap();
        let config = Config::from(&args);
        assert_eq!(config.tls, Some(TlsPaths::from_dir("/etc/letsencrypt/live/posters.example.com")));
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let args = Args::try_parse_from(["poster-relay", "--api-key", ""]).unwrap();
        assert!(Config::from(&args).api_key.is_none());
    }

    #[test]
    fn rejects_bad_metadata_url() {
        assert!(Args::try_parse_from(["poster-relay", "--metadata-url", "not a url"]).is_err());
    }

    #[test]
    fn new_uses_default_listen_address() {
        let config = Config::new(Url::parse("http://127.0.0.1:9000/").unwrap());
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.listen.port(), 5000);
        assert!(config.api_key.is_none());
    }
}
