use crate::config::{SearchType, TimePeriod};
use crate::models::ListingCard;
use crate::parser;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

pub const BASE_URL: &str = "https://www.idealista.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Where and what to search for.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub search_type: SearchType,
    pub province: String,
    pub zone: String,
    pub time_period: TimePeriod,
}

/// Cards gathered from one or more result pages.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub cards: Vec<ListingCard>,
    pub pages_scraped: usize,
}

pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

fn slug(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace(' ', "-");
    urlencoding::encode(&lowered).into_owned()
}

/// Maps the numeric window code (hours) onto idealista's publication filter.
pub fn publication_filter(time_period: TimePeriod) -> &'static str {
    match time_period.get() {
        0..=24 => "publicado_ultimas-24-horas",
        25..=48 => "publicado_ultimas-48-horas",
        49..=168 => "publicado_ultima-semana",
        _ => "publicado_ultimo-mes",
    }
}

pub fn search_url(base_url: &str, query: &SearchQuery, page: usize) -> String {
    let operation = match query.search_type {
        SearchType::Sale => "venta-viviendas",
        SearchType::Rent => "alquiler-viviendas",
    };
    let location = format!("{}-{}", slug(&query.zone), slug(&query.province));
    let mut url = format!(
        "{}/{}/{}/con-{}/",
        base_url.trim_end_matches('/'),
        operation,
        location,
        publication_filter(query.time_period)
    );
    if page > 1 {
        url.push_str(&format!("pagina-{}.htm", page));
    }
    url
}

/// Fetches result pages until `max_pages` or the first page without cards.
///
/// `polite_delay` is the upper bound of the random pause between two page fetches.
pub async fn scrape_all_listing_pages(
    client: &Client,
    base_url: &str,
    query: &SearchQuery,
    max_pages: usize,
    polite_delay: Option<Duration>,
) -> Result<ScrapeOutcome> {
    let mut outcome = ScrapeOutcome::default();

    let progress = ProgressBar::new(max_pages as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] page {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for page in 1..=max_pages {
        if page > 1 {
            if let Some(max_delay) = polite_delay {
                let millis = rand::thread_rng().gen_range(0..=max_delay.as_millis() as u64);
                debug!(millis, "sleeping between pages");
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
        }

        let page_url = search_url(base_url, query, page);
        let cards = scrape_listing_page(client, base_url, &page_url).await?;
        outcome.pages_scraped = page;
        progress.inc(1);

        if cards.is_empty() {
            debug!(page, "no listings on page, stopping");
            break;
        }
        outcome.cards.extend(cards);
        progress.set_message(format!("{} listings", outcome.cards.len()));
    }

    progress.finish_and_clear();
    Ok(outcome)
}

pub async fn scrape_listing_page(
    client: &Client,
    base_url: &str,
    url: &str,
) -> Result<Vec<ListingCard>> {
    debug!(url, "fetching listing page");

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch listing page {}", url))?
        .error_for_status()
        .with_context(|| format!("Listing page {} returned an error status", url))?;

    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    parse_listing_page(&body, base_url)
}

/// Parses result cards. Relative links are resolved against `base_url`.
pub fn parse_listing_page(body: &str, base_url: &str) -> Result<Vec<ListingCard>> {
    let document = Html::parse_document(body);
    let card_selector = selector("article.item")?;

    let mut cards = Vec::new();
    for element in document.select(&card_selector) {
        match parse_card(element, base_url) {
            Ok(card) => cards.push(card),
            Err(e) => debug!(error = %e, "skipping unparseable listing card"),
        }
    }

    debug!(count = cards.len(), "parsed listing cards");
    Ok(cards)
}

fn parse_card(card: ElementRef<'_>, base_url: &str) -> Result<ListingCard> {
    let link_selector = selector("a.item-link")?;
    let price_selector = selector(".item-price")?;
    let detail_selector = selector(".item-detail")?;
    let description_selector = selector(".item-description")?;

    let link = card
        .select(&link_selector)
        .next()
        .context("Listing card has no link")?;
    let href = link.value().attr("href").context("Listing link has no href")?;
    let url = if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    };

    let title = link
        .value()
        .attr("title")
        .map(str::to_string)
        .unwrap_or_else(|| collapse_whitespace(&link.text().collect::<String>()));

    // Cards carry the id as an attribute; the link is the fallback
    let id = card
        .value()
        .attr("data-element-id")
        .map(str::to_string)
        .or_else(|| parser::extract_listing_id(href).ok());

    let price = card
        .select(&price_selector)
        .next()
        .and_then(|el| parser::extract_price(&el.text().collect::<String>()).ok());

    let mut rooms = None;
    let mut size_m2 = None;
    let mut floor = None;
    for detail in card.select(&detail_selector) {
        let text = collapse_whitespace(&detail.text().collect::<String>());
        if let Ok(r) = parser::extract_rooms(&text) {
            rooms = Some(r);
        } else if let Ok(s) = parser::extract_size(&text) {
            size_m2 = Some(s);
        } else if parser::is_floor_detail(&text) {
            floor = Some(text);
        }
    }

    let description = card
        .select(&description_selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty());

    Ok(ListingCard {
        id,
        url,
        title,
        price,
        rooms,
        size_m2,
        floor,
        description,
    })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Failed to parse selector {}: {:?}", css, e))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
