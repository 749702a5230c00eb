use std::fmt::{Display, Formatter};
use tracing::level_filters::LevelFilter;

pub const DEFAULT_PORT: u16 = 5010;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Protocol {0} is not supported")]
    UnsupportedProtocol(HttpProtocols),
}

/// Protocols accepted on the listening socket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum HttpProtocols {
    Http1,
    Http2,
    Http1AndHttp2,
    Http3,
    Http1AndHttp2AndHttp3,
}

impl Display for HttpProtocols {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpProtocols::Http1 => "Http1",
            HttpProtocols::Http2 => "Http2",
            HttpProtocols::Http1AndHttp2 => "Http1AndHttp2",
            HttpProtocols::Http3 => "Http3",
            HttpProtocols::Http1AndHttp2AndHttp3 => "Http1AndHttp2AndHttp3",
        };
        f.write_str(name)
    }
}

/// How accepted connections are served.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transport {
    Http1,
    /// HTTP/2 only, prior knowledge on cleartext connections.
    Http2,
    /// Detects HTTP/2 from the connection preface, HTTP/1 otherwise.
    Auto,
}

impl Transport {
    #[must_use]
    pub fn alpn_protocols(self) -> Vec<Vec<u8>> {
        match self {
            Transport::Http1 => vec![b"http/1.1".to_vec(), b"http/1.0".to_vec()],
            Transport::Http2 => vec![b"h2".to_vec()],
            Transport::Auto => vec![b"h2".to_vec(), b"http/1.1".to_vec(), b"http/1.0".to_vec()],
        }
    }
}

impl TryFrom<HttpProtocols> for Transport {
    type Error = ConfigError;

    fn try_from(protocols: HttpProtocols) -> Result<Self, Self::Error> {
        match protocols {
            HttpProtocols::Http1 => Ok(Transport::Http1),
            HttpProtocols::Http2 => Ok(Transport::Http2),
            HttpProtocols::Http1AndHttp2 => Ok(Transport::Auto),
            HttpProtocols::Http3 | HttpProtocols::Http1AndHttp2AndHttp3 => {
                Err(ConfigError::UnsupportedProtocol(protocols))
            }
        }
    }
}

/// Answers `GET /` with `ok`.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "echo-server", version)]
pub struct Args {
    /// Enables console logging at this level (off, error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,

    /// Serve over TLS with an ephemeral self-signed certificate.
    #[arg(long)]
    pub tls: bool,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, value_enum, default_value_t = HttpProtocols::Http1)]
    pub protocol: HttpProtocols,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `0` binds an ephemeral port.
    pub port: u16,
    pub tls: bool,
    pub protocols: HttpProtocols,
    pub transport: Transport,
    pub log_level: Option<LevelFilter>,
}

impl ServerConfig {
    pub fn new(port: u16, tls: bool, protocols: HttpProtocols) -> Result<Self, ConfigError> {
        Ok(Self {
            port,
            tls,
            protocols,
            transport: Transport::try_from(protocols)?,
            log_level: None,
        })
    }
}

impl TryFrom<Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut config = ServerConfig::new(args.port, args.tls, args.protocol)?;
        config.log_level = args.log_level;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["echo-server"]).unwrap();
        assert_eq!(None, args.log_level);
        assert!(!args.tls);
        assert_eq!(5010, args.port);
        assert_eq!(HttpProtocols::Http1, args.protocol);
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(Transport::Http1, config.transport);
    }

    #[test]
    fn parses_all_options() {
        let args = Args::try_parse_from([
            "echo-server",
            "--log-level",
            "debug",
            "--tls",
            "--port",
            "8443",
            "--protocol",
            "http1-and-http2",
        ])
        .unwrap();
        assert_eq!(Some(LevelFilter::DEBUG), args.log_level);
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(Some(LevelFilter::DEBUG), config.log_level);
        assert!(config.tls);
        assert_eq!(8443, config.port);
        assert_eq!(Transport::Auto, config.transport);
        assert_eq!("Http1AndHttp2", config.protocols.to_string());
    }

    #[test]
    fn http3_is_rejected_at_startup() {
        for protocols in [HttpProtocols::Http3, HttpProtocols::Http1AndHttp2AndHttp3] {
            let err = ServerConfig::new(0, false, protocols).unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedProtocol(p) if p == protocols));
        }
    }

    #[test]
    fn alpn_follows_transport() {
        assert_eq!(vec![b"h2".to_vec()], Transport::Http2.alpn_protocols());
        assert!(!Transport::Http1
            .alpn_protocols()
            .contains(&b"h2".to_vec()));
        assert_eq!(b"h2".to_vec(), Transport::Auto.alpn_protocols()[0]);
    }
}
