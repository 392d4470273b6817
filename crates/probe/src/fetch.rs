//! HTTP validation round over the configured subscription sources.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use subguard_core::AppConfig;
use subguard_lifecycle::{Outcome, RoundResult};
use subguard_scheduler::ValidationRound;

/// Each source gets one retry before it counts as a round failure.
const FETCH_ATTEMPTS: u32 = 2;

const USER_AGENT: &str = concat!("subguard/", env!("CARGO_PKG_VERSION"));

/// Probes every configured source URL over HTTP.
///
/// The configuration file is re-read at the start of each round, so sources
/// added, removed, or evicted between rounds take effect without a restart.
/// A source passes when it answers 2xx with a non-empty body.
pub struct HttpFetchRound {
    config_path: PathBuf,
}

impl HttpFetchRound {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }
}

#[async_trait]
impl ValidationRound for HttpFetchRound {
    async fn run(&self) -> anyhow::Result<RoundResult> {
        let config = match AppConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                // The file may be mid-edit; skip the round rather than
                // penalize every source.
                warn!(error = %e, "could not reload configuration, skipping round");
                return Ok(RoundResult::new());
            }
        };
        if config.sub_urls.is_empty() {
            warn!("no subscription sources configured");
            return Ok(RoundResult::new());
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        let concurrent = config.concurrent.max(1);
        let outcomes: Vec<(String, Outcome)> = stream::iter(config.sub_urls)
            .map(|url| {
                let client = client.clone();
                async move {
                    let outcome = probe_source(&client, &url).await;
                    (url, outcome)
                }
            })
            .buffered(concurrent)
            .collect()
            .await;

        let mut result = RoundResult::new();
        for (url, outcome) in outcomes {
            result.record(url, outcome);
        }
        Ok(result)
    }
}

/// Fetch one source, retrying transient faults up to [`FETCH_ATTEMPTS`] times.
async fn probe_source(client: &reqwest::Client, url: &str) -> Outcome {
    for attempt in 1..=FETCH_ATTEMPTS {
        match try_fetch(client, url).await {
            Ok(bytes) => {
                debug!(url = %url, bytes, "source fetch succeeded");
                return Outcome::Success;
            }
            Err(e) => {
                warn!(url = %url, attempt, error = %e, "source fetch failed");
            }
        }
    }
    Outcome::Failure
}

async fn try_fetch(client: &reqwest::Client, url: &str) -> anyhow::Result<usize> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        bail!("unexpected status {status}");
    }
    let body = response.bytes().await?;
    if body.is_empty() {
        bail!("empty response body");
    }
    Ok(body.len())
}
