use crate::config::{ServerConfig, Transport};
use crate::service::echo;
use anyhow::{Context, Result};
use bench_util::tls::{self_signed_certificate, server_config};
use hyper::body::Incoming;
use hyper::server::conn::{http1, http2};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct EchoServer {
    listener: TcpListener,
    transport: Transport,
    tls: Option<TlsAcceptor>,
}

impl EchoServer {
    /// Binds every interface on the configured port. The IPv6 wildcard
    /// also takes IPv4 connections on dual-stack hosts, IPv4 alone is the
    /// fallback when IPv6 is unavailable.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let any_v6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.port));
        let listener = match TcpListener::bind(any_v6).await {
            Ok(listener) => listener,
            Err(e) => {
                debug!("Failed to bind {any_v6}, falling back to IPv4: {e}");
                let any_v4 = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
                TcpListener::bind(any_v4)
                    .await
                    .with_context(|| format!("Failed to bind {any_v4}"))?
            }
        };
        let tls = if config.tls {
            let certificate = self_signed_certificate()?;
            let tls_config = server_config(certificate, config.transport.alpn_protocols())?;
            Some(TlsAcceptor::from(Arc::new(tls_config)))
        } else {
            None
        };
        Ok(Self {
            listener,
            transport: config.transport,
            tls,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to get listener address")
    }

    /// Accepts until the task is dropped, one task per connection.
    pub async fn serve(self) -> Result<()> {
        loop {
            let (tcp, peer) = accept_retrying(|| self.listener.accept()).await;
            if let Err(e) = tcp.set_nodelay(true) {
                debug!(%peer, "Failed to set nodelay: {e}");
            }
            let transport = self.transport;
            let tls = self.tls.clone();
            tokio::task::spawn(async move {
                match tls {
                    Some(acceptor) => match acceptor.accept(tcp).await {
                        Ok(stream) => serve_connection(stream, transport, peer).await,
                        Err(e) => debug!(%peer, "TLS handshake failed: {e}"),
                    },
                    None => serve_connection(tcp, transport, peer).await,
                }
            });
        }
    }
}

async fn accept_retrying<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

async fn serve_connection<S>(stream: S, transport: Transport, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service = service_fn(echo::<Incoming>);
    let res: Result<(), BoxError> = match transport {
        Transport::Http1 => http1::Builder::new()
            .serve_connection(io, service)
            .await
            .map_err(Into::into),
        Transport::Http2 => http2::Builder::new(TokioExecutor::new())
            .serve_connection(io, service)
            .await
            .map_err(Into::into),
        Transport::Auto => {
            auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
        }
    };
    if let Err(e) = res {
        debug!(%peer, "Connection closed with error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Instant;

    #[tokio::test]
    async fn accept_errors_back_off_before_retrying() {
        let mut attempts = 0;
        let start = Instant::now();
        let conn = accept_retrying(|| {
            attempts += 1;
            let res = if attempts < 3 {
                Err(io::Error::new(io::ErrorKind::Other, "too many open files"))
            } else {
                Ok(attempts)
            };
            async move { res }
        })
        .await;
        assert_eq!(3, conn);
        assert!(start.elapsed() >= ACCEPT_ERROR_BACKOFF * 2);
    }

    #[tokio::test]
    async fn binds_every_interface() {
        let config = ServerConfig::new(0, false, crate::config::HttpProtocols::Http1).unwrap();
        let server = EchoServer::bind(&config).await.unwrap();
        assert!(server.local_addr().unwrap().ip().is_unspecified());
    }
}
