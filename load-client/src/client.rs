use crate::config::RunConfig;
use anyhow::{bail, Context, Result};
use bench_util::drain::DrainBodyFuture;
use bench_util::tls::insecure_client_config;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_LENGTH;
use hyper::{Request, StatusCode};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Connection-pooling client, cheap to clone. Clones share the pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpClient {
    pub fn new(config: &RunConfig) -> Result<Self> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);

        if config.is_tls() {
            println!("Disable TLS validation.");
        }
        let tls = insecure_client_config()?;
        let builder = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http();
        let connector = if config.http2_prior_knowledge() {
            builder.enable_http2().wrap_connector(http)
        } else {
            builder.enable_http1().wrap_connector(http)
        };
        let client = Client::builder(TokioExecutor::new())
            .http2_only(config.http2_prior_knowledge())
            .build(connector);
        Ok(Self { client })
    }

    /// Sends the request and reads the whole response body.
    pub async fn send_recv(&self, request: Request<Full<Bytes>>) -> Result<(StatusCode, Vec<u8>)> {
        let resp = self
            .client
            .request(request)
            .await
            .context("Failed to send request")?;
        let status = resp.status();
        let content_length: usize = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|hv| hv.to_str().ok())
            .and_then(|hv| hv.parse().ok())
            .unwrap_or(1024);
        let bytes: Vec<u8> =
            DrainBodyFuture::new_trusted_length(resp.into_body(), content_length)
                .await
                .context("Failed to read response body")?;
        Ok((status, bytes))
    }

    /// Like [`HttpClient::send_recv`] but fails on a non-2xx status.
    pub async fn get_string(&self, request: Request<Full<Bytes>>) -> Result<String> {
        let (status, body) = self.send_recv(request).await?;
        if !status.is_success() {
            bail!("Response status code does not indicate success: {status}");
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
