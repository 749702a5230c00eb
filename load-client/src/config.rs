use hyper::http::uri::{InvalidUri, Scheme};
use hyper::{Uri, Version};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Bound on the connectivity check made before any load is generated.
pub const CONNECT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown protocol {0}")]
    UnsupportedProtocol(ProtocolVersion),
    #[error("Invalid server URI {uri}")]
    InvalidUri {
        uri: String,
        #[source]
        source: InvalidUri,
    },
    #[error("Server URI {0} must use http or https")]
    UnsupportedScheme(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum ProtocolVersion {
    #[value(name = "1.0", alias = "http10")]
    Http10,
    #[value(name = "1.1", alias = "http11")]
    Http11,
    #[value(name = "2.0", alias = "http20")]
    Http20,
    #[value(name = "3.0", alias = "http30")]
    Http30,
}

impl ProtocolVersion {
    /// HTTP/3 has no transport in this client.
    pub fn http_version(self) -> Result<Version, ConfigError> {
        match self {
            ProtocolVersion::Http10 => Ok(Version::HTTP_10),
            ProtocolVersion::Http11 => Ok(Version::HTTP_11),
            ProtocolVersion::Http20 => Ok(Version::HTTP_2),
            ProtocolVersion::Http30 => Err(ConfigError::UnsupportedProtocol(self)),
        }
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProtocolVersion::Http10 => "Http10",
            ProtocolVersion::Http11 => "Http11",
            ProtocolVersion::Http20 => "Http20",
            ProtocolVersion::Http30 => "Http30",
        };
        f.write_str(name)
    }
}

/// Sends a stream of GET requests to a server for a fixed duration and
/// reports throughput.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "load-client", version)]
pub struct Args {
    /// Target URI, http or https.
    #[arg(value_name = "SERVER_URI")]
    pub server_uri: String,

    /// HTTP version used for every request.
    #[arg(long, value_enum, default_value_t = ProtocolVersion::Http11)]
    pub protocol: ProtocolVersion,

    /// Length of the discarded warmup phase.
    #[arg(long, value_name = "SECONDS", default_value_t = 15)]
    pub warmup: u64,

    /// Length of the measured phase.
    #[arg(long, value_name = "SECONDS", default_value_t = 15)]
    pub duration: u64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub uri: Uri,
    pub protocol: ProtocolVersion,
    pub version: Version,
    pub warmup: Duration,
    pub duration: Duration,
    pub check_timeout: Duration,
}

impl RunConfig {
    pub fn new(
        server_uri: &str,
        protocol: ProtocolVersion,
        warmup: Duration,
        duration: Duration,
    ) -> Result<Self, ConfigError> {
        let version = protocol.http_version()?;
        let uri: Uri = server_uri.parse().map_err(|source| ConfigError::InvalidUri {
            uri: server_uri.to_string(),
            source,
        })?;
        match uri.scheme() {
            Some(scheme) if *scheme == Scheme::HTTP || *scheme == Scheme::HTTPS => {}
            _ => return Err(ConfigError::UnsupportedScheme(server_uri.to_string())),
        }
        Ok(Self {
            uri,
            protocol,
            version,
            warmup,
            duration,
            check_timeout: CONNECT_CHECK_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.uri.scheme() == Some(&Scheme::HTTPS)
    }

    /// HTTP/2 is spoken without upgrade negotiation, over cleartext as well
    /// as over TLS where ALPN only offers `h2`.
    #[inline]
    #[must_use]
    pub fn http2_prior_knowledge(&self) -> bool {
        self.version == Version::HTTP_2
    }
}

impl TryFrom<Args> for RunConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        RunConfig::new(
            &args.server_uri,
            args.protocol,
            Duration::from_secs(args.warmup),
            Duration::from_secs(args.duration),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_cli_contract() {
        let args = Args::try_parse_from(["load-client", "http://127.0.0.1:5010/"]).unwrap();
        assert_eq!(ProtocolVersion::Http11, args.protocol);
        assert_eq!(15, args.warmup);
        assert_eq!(15, args.duration);
        let config = RunConfig::try_from(args).unwrap();
        assert_eq!(ProtocolVersion::Http11, config.protocol);
        assert_eq!(Version::HTTP_11, config.version);
        assert_eq!(CONNECT_CHECK_TIMEOUT, config.check_timeout);
        assert!(!config.is_tls());
        assert!(!config.http2_prior_knowledge());
    }

    #[test]
    fn parses_protocol_names_and_aliases() {
        let args = Args::try_parse_from([
            "load-client",
            "https://localhost:5010/",
            "--protocol",
            "2.0",
            "--warmup",
            "0",
            "--duration",
            "3",
        ])
        .unwrap();
        assert_eq!(ProtocolVersion::Http20, args.protocol);
        let config = RunConfig::try_from(args).unwrap();
        assert!(config.is_tls());
        assert!(config.http2_prior_knowledge());
        assert_eq!(Duration::ZERO, config.warmup);
        assert_eq!(Duration::from_secs(3), config.duration);

        let args = Args::try_parse_from(["load-client", "http://h/", "--protocol", "http10"])
            .unwrap();
        assert_eq!(ProtocolVersion::Http10, args.protocol);
    }

    #[test]
    fn rejects_unknown_protocol_values() {
        assert!(Args::try_parse_from(["load-client", "http://h/", "--protocol", "1.2"]).is_err());
    }

    #[test]
    fn http3_is_a_configuration_error() {
        let err = RunConfig::new(
            "http://127.0.0.1:5010/",
            ProtocolVersion::Http30,
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedProtocol(ProtocolVersion::Http30)
        ));
        assert_eq!("Unknown protocol Http30", err.to_string());
    }

    #[test]
    fn rejects_uris_without_http_scheme() {
        let err = RunConfig::new(
            "ftp://127.0.0.1/",
            ProtocolVersion::Http11,
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(_)));
        let err = RunConfig::new(
            "/relative",
            ProtocolVersion::Http11,
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(_)));
        let err = RunConfig::new(
            "http://bad host/",
            ProtocolVersion::Http11,
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUri { .. }));
    }
}
