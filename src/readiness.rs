use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ReadinessOptions;

#[derive(Error, Debug)]
pub enum ReadinessError {
    #[error("service at {url} not reachable after {attempts} attempts")]
    Timeout { url: String, attempts: u32 },
}

/// Polls the target until it answers, with doubling backoff between probes.
///
/// Any HTTP response counts as ready, including error statuses: the goal is
/// "the server is up", not "the server is healthy". Only transport failures
/// keep the loop going.
pub async fn wait_until_ready(
    client: &Client,
    base_url: &str,
    opts: &ReadinessOptions,
) -> Result<(), ReadinessError> {
    let mut delay = Duration::from_millis(opts.initial_delay_ms);
    let max_delay = Duration::from_millis(opts.max_delay_ms);

    for attempt in 1..=opts.attempts {
        match client.get(base_url).send().await {
            Ok(response) => {
                debug!(
                    "service ready after {} attempt(s) (status {})",
                    attempt,
                    response.status()
                );
                return Ok(());
            }
            Err(e) => {
                debug!("readiness probe {}/{} failed: {}", attempt, opts.attempts, e);
            }
        }
        if attempt < opts.attempts {
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, max_delay);
        }
    }

    Err(ReadinessError::Timeout {
        url: base_url.to_string(),
        attempts: opts.attempts,
    })
}
