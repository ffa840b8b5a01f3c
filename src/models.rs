use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SearchType;

/// One advert card as found on a search results page, before it is stamped with run context.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
    pub id: Option<String>,
    pub url: String,
    pub title: String,
    pub price: Option<u64>,
    pub rooms: Option<u32>,
    pub size_m2: Option<f64>,
    pub floor: Option<String>,
    pub description: Option<String>,
}

/// A listing row as written to the lake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub url: String,
    pub title: String,
    pub price: Option<u64>,
    pub rooms: Option<u32>,
    pub size_m2: Option<f64>,
    pub floor: Option<String>,
    pub description: Option<String>,
    pub province: String,
    pub zone: String,
    pub search_type: SearchType,
    pub scraped_at: DateTime<Utc>,
}

/// Sidecar describing one run's output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub pipeline: String,
    pub bucket: String,
    pub dataset: String,
    pub project_id: String,
    pub client_email: String,
    pub search_type: SearchType,
    pub province: String,
    pub zone: String,
    pub time_period: u32,
    pub testing: bool,
    pub pages_scraped: usize,
    pub listing_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub data_file: String,
}
