use crate::config::RunConfig;
use anyhow::{Context, Result};
use bench_util::empty_body;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Uri, Version};

/// Produces the request sent at a given position of a phase.
pub trait RequestProvider {
    fn build_request(&self, index: usize) -> Result<Request<Full<Bytes>>>;
}

impl<F> RequestProvider for F
where
    F: Fn(usize) -> Result<Request<Full<Bytes>>>,
{
    #[inline]
    fn build_request(&self, index: usize) -> Result<Request<Full<Bytes>>> {
        self(index)
    }
}

/// The same GET against the configured URI, every time.
#[derive(Debug, Clone)]
pub struct SimpleRequestProvider {
    uri: Uri,
    version: Version,
}

impl SimpleRequestProvider {
    #[must_use]
    pub fn new(config: &RunConfig) -> Self {
        Self {
            uri: config.uri.clone(),
            version: config.version,
        }
    }
}

impl RequestProvider for SimpleRequestProvider {
    fn build_request(&self, _index: usize) -> Result<Request<Full<Bytes>>> {
        Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .version(self.version)
            .body(empty_body())
            .context("Failed to build get")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolVersion;
    use hyper::body::Body;
    use std::time::Duration;

    fn config(protocol: ProtocolVersion) -> RunConfig {
        RunConfig::new(
            "http://127.0.0.1:5010/",
            protocol,
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn builds_identical_get_requests() {
        let provider = SimpleRequestProvider::new(&config(ProtocolVersion::Http20));
        let first = provider.build_request(0).unwrap();
        let later = provider.build_request(41).unwrap();
        for req in [&first, &later] {
            assert_eq!(Method::GET, req.method());
            assert_eq!("http://127.0.0.1:5010/", req.uri().to_string());
            assert_eq!(Version::HTTP_2, req.version());
            assert!(req.body().is_end_stream());
        }
    }

    #[test]
    fn closures_are_providers() {
        let provider = |index: usize| {
            Request::get(format!("http://127.0.0.1:5010/{index}"))
                .body(empty_body())
                .context("Failed to build get")
        };
        let req = provider.build_request(7).unwrap();
        assert_eq!("/7", req.uri().path());
    }
}
