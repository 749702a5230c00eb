use crate::client::HttpClient;
use crate::config::RunConfig;
use crate::provider::{RequestProvider, SimpleRequestProvider};
use crate::statistics::{record_run, JobStatistics, RunCounts, RunResult};
use anyhow::{Context, Result};
use hyper::Uri;
use std::time::Duration;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Connection to {0} timeouts.")]
    Timeout(Uri),
    #[error("Connection to {uri} failed")]
    Failed {
        uri: Uri,
        #[source]
        source: anyhow::Error,
    },
}

/// Cancellation context of one phase. Firing it ends the phase normally.
#[derive(Debug, Copy, Clone)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Completes when the deadline passes.
    #[must_use]
    pub fn elapsed(&self) -> Sleep {
        tokio::time::sleep_until(self.at)
    }
}

/// Single GET with a fresh client, failing fast when the target is
/// unreachable, slow, or answers with a non-2xx status.
pub async fn test_endpoint(config: &RunConfig) -> Result<(), EndpointError> {
    let failed = |source: anyhow::Error| {
        let inner = source
            .chain()
            .nth(1)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("Connection to {} failed: {source}: {inner}", config.uri);
        EndpointError::Failed {
            uri: config.uri.clone(),
            source,
        }
    };
    let client = HttpClient::new(config).map_err(failed)?;
    let request = SimpleRequestProvider::new(config)
        .build_request(0)
        .map_err(failed)?;
    match tokio::time::timeout(config.check_timeout, client.get_string(request)).await {
        Ok(Ok(_body)) => Ok(()),
        Ok(Err(e)) => Err(failed(e)),
        Err(_elapsed) => {
            let err = EndpointError::Timeout(config.uri.clone());
            println!("{err}");
            Err(err)
        }
    }
}

/// Sends requests one after another until `duration` has passed.
///
/// A request still in flight when the deadline fires is dropped, which
/// aborts it in the transport, and is not counted. Any other failure is
/// returned as an error.
pub async fn send_requests<P>(
    client: &HttpClient,
    duration: Duration,
    provider: &P,
) -> Result<RunCounts>
where
    P: RequestProvider + ?Sized,
{
    let deadline = Deadline::after(duration);
    let expired = deadline.elapsed();
    tokio::pin!(expired);

    let mut counts = RunCounts::default();
    let mut index = 0;
    while !deadline.is_elapsed() {
        let request = provider.build_request(index)?;
        tokio::select! {
            biased;
            () = &mut expired => break,
            res = client.send_recv(request) => {
                let (status, _body) = res.with_context(|| format!("Request {index} failed"))?;
                counts.record(status);
            }
        }
        index += 1;
    }
    debug!(success = counts.success, total = counts.total, "Phase finished");
    Ok(counts)
}

/// Connectivity check, warmup, then the measured phase, whose result is recorded into
/// `stats`.
pub async fn run(
    config: &RunConfig,
    client: &HttpClient,
    stats: &mut JobStatistics,
) -> Result<RunResult> {
    test_endpoint(config).await?;

    let provider = SimpleRequestProvider::new(config);
    info!(warmup = ?config.warmup, "Warmup started");
    send_requests(client, config.warmup, &provider)
        .await
        .context("Warmup failed")?;

    info!(duration = ?config.duration, "Measurement started");
    let watch = std::time::Instant::now();
    let counts = send_requests(client, config.duration, &provider)
        .await
        .context("Measurement failed")?;
    let result = RunResult {
        counts,
        elapsed: watch.elapsed(),
    };
    record_run(stats, &result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_fires_after_duration() {
        let deadline = Deadline::after(Duration::from_millis(20));
        assert!(!deadline.is_elapsed());
        deadline.elapsed().await;
        assert!(deadline.is_elapsed());
    }

    #[tokio::test]
    async fn zero_deadline_is_already_elapsed() {
        assert!(Deadline::after(Duration::ZERO).is_elapsed());
    }
}
