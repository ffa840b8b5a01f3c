//! Reference pipeline: scrape idealista search results, stamp them with run context and
//! load them into a local data lake partition.

use crate::config::RunConfig;
use crate::credentials::ServiceAccountKey;
use crate::idealista_scraper::{self, SearchQuery};
use crate::lake::{LakePartition, LocalLake, WrittenBatch};
use crate::models::{Listing, ListingCard, RunManifest};
use crate::pipeline::Pipeline;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct IdealistaOptions {
    pub lake_root: PathBuf,
    pub max_pages: usize,
    pub base_url: String,
    pub polite_delay: Duration,
}

impl Default for IdealistaOptions {
    fn default() -> Self {
        Self {
            lake_root: PathBuf::from("data_lake"),
            max_pages: 3,
            base_url: idealista_scraper::BASE_URL.to_string(),
            polite_delay: Duration::from_millis(1500),
        }
    }
}

pub struct IdealistaPipeline {
    client: Client,
    options: IdealistaOptions,
}

impl IdealistaPipeline {
    pub fn new(options: IdealistaOptions) -> Result<Self> {
        Ok(Self {
            client: idealista_scraper::build_client()?,
            options,
        })
    }

    /// Pages to fetch for this run. A testing run looks at the first page only.
    fn page_budget(&self, config: &RunConfig) -> usize {
        if config.testing() {
            1
        } else {
            self.options.max_pages.max(1)
        }
    }
}

#[async_trait]
impl Pipeline for IdealistaPipeline {
    fn name(&self) -> &str {
        "idealista"
    }

    async fn run(&self, config: RunConfig) -> Result<()> {
        let started_at = Utc::now();

        let key = ServiceAccountKey::load(config.credentials_path())?;
        debug!(project = %key.project_id, "loaded service account key");

        let query = SearchQuery {
            search_type: config.search_type(),
            province: config.province().to_string(),
            zone: config.zone().to_string(),
            time_period: config.time_period(),
        };
        let polite_delay = (!config.testing()).then_some(self.options.polite_delay);
        let outcome = idealista_scraper::scrape_all_listing_pages(
            &self.client,
            &self.options.base_url,
            &query,
            self.page_budget(&config),
            polite_delay,
        )
        .await?;
        info!(
            pages = outcome.pages_scraped,
            cards = outcome.cards.len(),
            "scraped search results"
        );

        let listings = transform(outcome.cards, &config, started_at);

        let partition = LakePartition::new(
            config.bucket_name(),
            config.dataset_id(),
            config.search_type(),
            config.province(),
            config.zone(),
            started_at,
        );
        let manifest = RunManifest {
            pipeline: self.name().to_string(),
            bucket: config.bucket_name().to_string(),
            dataset: config.dataset_id().to_string(),
            project_id: key.project_id,
            client_email: key.client_email,
            search_type: config.search_type(),
            province: config.province().to_string(),
            zone: config.zone().to_string(),
            time_period: config.time_period().get(),
            testing: config.testing(),
            pages_scraped: outcome.pages_scraped,
            listing_count: listings.len(),
            started_at,
            finished_at: Utc::now(),
            data_file: String::new(),
        };

        let lake = LocalLake::new(&self.options.lake_root);
        let WrittenBatch { data_file, .. } = lake.write_batch(&partition, &listings, manifest)?;
        info!(
            lake = %lake.root().display(),
            file = %data_file.display(),
            listings = listings.len(),
            "load complete"
        );

        Ok(())
    }
}

/// Drops cards without an id, keeps the first card per id and stamps run context.
pub fn transform(
    cards: Vec<ListingCard>,
    config: &RunConfig,
    scraped_at: DateTime<Utc>,
) -> Vec<Listing> {
    let mut seen = HashSet::new();
    let mut listings = Vec::with_capacity(cards.len());

    for card in cards {
        let Some(id) = card.id else {
            debug!(url = %card.url, "skipping card without listing id");
            continue;
        };
        if !seen.insert(id.clone()) {
            debug!(id = %id, "skipping duplicate listing");
            continue;
        }

        listings.push(Listing {
            id,
            url: card.url,
            title: card.title,
            price: card.price,
            rooms: card.rooms,
            size_m2: card.size_m2,
            floor: card.floor,
            description: card.description,
            province: config.province().to_string(),
            zone: config.zone().to_string(),
            search_type: config.search_type(),
            scraped_at,
        });
    }

    listings
}
