//! C13 — Data seeding. One-shot initial import at startup plus an
//! on-demand async reload, both sourced from the external upstream
//! card-catalog API. Retry/backoff constants mirror the teacher's
//! `rpc/stellar.rs` HTTP client.

use crate::catalog::{CardInput, CatalogService};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const BACKOFF_MULTIPLIER: u64 = 2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct UpstreamCard {
    name: String,
    #[serde(rename = "type")]
    card_type: String,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    race: Option<String>,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(default)]
    archetype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    data: Vec<UpstreamCard>,
}

pub struct Seeder {
    http: reqwest::Client,
    catalog: Arc<CatalogService>,
    upstream_url: Option<String>,
}

impl Seeder {
    pub fn new(catalog: Arc<CatalogService>, upstream_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, catalog, upstream_url }
    }

    async fn fetch_with_retry(&self, url: &str) -> anyhow::Result<UpstreamResponse> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let mut last_err = None;

        for attempt in 0..=MAX_RETRIES {
            match self.http.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<UpstreamResponse>().await?);
                }
                Ok(response) => {
                    last_err = Some(anyhow::anyhow!("upstream responded with {}", response.status()));
                }
                Err(e) => last_err = Some(e.into()),
            }

            if attempt < MAX_RETRIES {
                tracing::warn!("seeding fetch attempt {} failed, retrying in {}ms", attempt + 1, backoff_ms);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= BACKOFF_MULTIPLIER;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("seeding failed with no recorded error")))
    }

    /// Runs once, synchronously. Intended to be awaited at startup on a
    /// single worker before the server starts accepting traffic.
    pub async fn seed_once(&self) -> anyhow::Result<usize> {
        let Some(url) = &self.upstream_url else {
            tracing::info!("no upstream catalog URL configured, skipping seed");
            return Ok(0);
        };

        let response = self.fetch_with_retry(url).await?;
        let mut imported = 0;

        for card in response.data {
            let input = CardInput {
                name: card.name,
                human_readable_card_type: card.card_type,
                description: card.desc,
                race: card.race,
                attribute: card.attribute,
                archetype_name: card.archetype,
            };
            if let Err(e) = self.catalog.save(input).await {
                tracing::warn!("failed to import seeded card: {e:?}");
                continue;
            }
            imported += 1;
        }

        tracing::info!("imported {imported} cards from upstream catalog");
        Ok(imported)
    }

    /// Spawns exactly one background task per call; used by the
    /// `/cards/async-reload` admin endpoint, which returns `202`
    /// immediately without waiting on completion.
    pub fn spawn_async_reload(self: Arc<Self>) {
        tokio::spawn(async move {
            if let Err(e) = self.seed_once().await {
                tracing::error!("async catalog reload failed: {e:?}");
            }
        });
    }
}
