//! Integration tests for the idealista pipeline against a local mock server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use idealista_runner::idealista::{IdealistaOptions, IdealistaPipeline};
use idealista_runner::idealista_scraper::{self, SearchQuery};
use idealista_runner::lake::load_listings_csv;
use idealista_runner::models::RunManifest;
use idealista_runner::{invoke, PartialRunConfig, RunConfig, SearchType};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const SEARCH_PATH: &str = "/venta-viviendas/madrid-madrid/con-publicado_ultimas-24-horas/";

const KEY: &str = r#"{
    "type": "service_account",
    "project_id": "idealista-scraper-384619",
    "client_email": "terraform@idealista-scraper-384619.iam.gserviceaccount.com"
}"#;

fn card(id: &str, price: &str) -> String {
    format!(
        r#"<article class="item" data-element-id="{id}">
             <a href="/inmueble/{id}/" class="item-link" title="Piso {id}">Piso {id}</a>
             <span class="item-price">{price}€</span>
             <span class="item-detail">2 hab.</span>
           </article>"#
    )
}

fn page(cards: &[String]) -> String {
    format!("<html><body><section>{}</section></body></html>", cards.concat())
}

fn page_path(n: usize) -> String {
    if n == 1 {
        SEARCH_PATH.to_string()
    } else {
        format!("{}pagina-{}.htm", SEARCH_PATH, n)
    }
}

async fn mount_page(server: &MockServer, n: usize, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(page_path(n)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// Page 1: ids 1, 2. Page 2: ids 2 (again), 3. Page 3: empty.
async fn three_page_server() -> MockServer {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card("1", "300.000"), card("2", "410.000")]), 1).await;
    mount_page(&server, 2, page(&[card("2", "410.000"), card("3", "199.000")]), 1).await;
    mount_page(&server, 3, page(&[]), 1).await;
    server
}

fn query() -> SearchQuery {
    SearchQuery {
        search_type: SearchType::Sale,
        province: "madrid".to_string(),
        zone: "madrid".to_string(),
        time_period: "24".parse().unwrap(),
    }
}

fn run_config(credentials: &Path, testing: bool) -> RunConfig {
    PartialRunConfig {
        credentials_path: Some(credentials.to_path_buf()),
        testing: Some(testing),
        ..Default::default()
    }
    .build()
    .unwrap()
}

fn pipeline(server: &MockServer, lake_root: &Path) -> IdealistaPipeline {
    IdealistaPipeline::new(IdealistaOptions {
        lake_root: lake_root.to_path_buf(),
        max_pages: 5,
        base_url: server.uri(),
        polite_delay: Duration::ZERO,
    })
    .unwrap()
}

fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let p = entry.unwrap().path();
        if p.is_dir() {
            found.extend(files_with_suffix(&p, suffix));
        } else if p.to_string_lossy().ends_with(suffix) {
            found.push(p);
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Page loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn page_loop_stops_at_first_empty_page() {
    let server = three_page_server().await;
    mount_page(&server, 4, page(&[card("4", "1")]), 0).await;
    let client = idealista_scraper::build_client().unwrap();

    let outcome =
        idealista_scraper::scrape_all_listing_pages(&client, &server.uri(), &query(), 5, None)
            .await
            .unwrap();

    assert_eq!(outcome.pages_scraped, 3);
    let ids: Vec<_> = outcome.cards.iter().filter_map(|c| c.id.clone()).collect();
    assert_eq!(ids, ["1", "2", "2", "3"]);
}

#[tokio::test]
async fn page_loop_respects_page_budget() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card("1", "300.000")]), 1).await;
    mount_page(&server, 2, page(&[card("2", "410.000")]), 1).await;
    mount_page(&server, 3, page(&[card("3", "199.000")]), 0).await;
    let client = idealista_scraper::build_client().unwrap();

    let outcome = idealista_scraper::scrape_all_listing_pages(
        &client,
        &server.uri(),
        &query(),
        2,
        Some(Duration::from_millis(5)),
    )
    .await
    .unwrap();

    assert_eq!(outcome.pages_scraped, 2);
    assert_eq!(outcome.cards.len(), 2);
}

#[tokio::test]
async fn server_error_aborts_the_page_loop() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card("1", "300.000")]), 1).await;
    Mock::given(method("GET"))
        .and(path(page_path(2)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 3, page(&[]), 0).await;
    let client = idealista_scraper::build_client().unwrap();

    let err = idealista_scraper::scrape_all_listing_pages(&client, &server.uri(), &query(), 5, None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("error status"), "{err:#}");
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_scrapes_transforms_and_loads() {
    let server = three_page_server().await;
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("terraform.json");
    std::fs::write(&credentials, KEY).unwrap();
    let lake_root = dir.path().join("lake");

    invoke(&pipeline(&server, &lake_root), run_config(&credentials, false))
        .await
        .unwrap();

    let data_files = files_with_suffix(&lake_root, ".csv");
    assert_eq!(data_files.len(), 1);
    let data_file = &data_files[0];
    let partition = data_file.parent().unwrap();
    assert!(partition.starts_with(lake_root.join(
        "idealista_data_lake_idealista-scraper-384619/idealista_listings/search_type=sale/province=madrid/zone=madrid"
    )));

    let listings = load_listings_csv(data_file).unwrap();
    let ids: Vec<_> = listings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3"]);
    assert_eq!(listings[0].price, Some(300_000));
    assert_eq!(listings[0].rooms, Some(2));
    assert_eq!(listings[0].url, format!("{}/inmueble/1/", server.uri()));
    assert!(listings.iter().all(|l| l.search_type == SearchType::Sale && l.zone == "madrid"));

    let manifests = files_with_suffix(&lake_root, ".manifest.json");
    assert_eq!(manifests.len(), 1);
    let manifest: RunManifest =
        serde_json::from_str(&std::fs::read_to_string(&manifests[0]).unwrap()).unwrap();
    assert_eq!(manifest.pipeline, "idealista");
    assert_eq!(manifest.project_id, "idealista-scraper-384619");
    assert_eq!(manifest.pages_scraped, 3);
    assert_eq!(manifest.listing_count, 3);
    assert!(!manifest.testing);
    assert_eq!(
        manifest.data_file,
        data_file.file_name().unwrap().to_string_lossy()
    );
}

#[tokio::test]
async fn testing_run_fetches_only_the_first_page() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card("1", "300.000"), card("2", "410.000")]), 1).await;
    mount_page(&server, 2, page(&[card("3", "199.000")]), 0).await;
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("terraform.json");
    std::fs::write(&credentials, KEY).unwrap();
    let lake_root = dir.path().join("lake");

    invoke(&pipeline(&server, &lake_root), run_config(&credentials, true))
        .await
        .unwrap();

    let manifests = files_with_suffix(&lake_root, ".manifest.json");
    let manifest: RunManifest =
        serde_json::from_str(&std::fs::read_to_string(&manifests[0]).unwrap()).unwrap();
    assert!(manifest.testing);
    assert_eq!(manifest.pages_scraped, 1);
    assert_eq!(manifest.listing_count, 2);
}

#[tokio::test]
async fn back_to_back_runs_keep_separate_files() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card("1", "300.000")]), 2).await;
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("terraform.json");
    std::fs::write(&credentials, KEY).unwrap();
    let lake_root = dir.path().join("lake");
    let pipeline = pipeline(&server, &lake_root);

    invoke(&pipeline, run_config(&credentials, true)).await.unwrap();
    invoke(&pipeline, run_config(&credentials, true)).await.unwrap();

    assert_eq!(files_with_suffix(&lake_root, ".csv").len(), 2);
    assert_eq!(files_with_suffix(&lake_root, ".manifest.json").len(), 2);
}

#[tokio::test]
async fn failed_scrape_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(page_path(1)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("terraform.json");
    std::fs::write(&credentials, KEY).unwrap();
    let lake_root = dir.path().join("lake");

    let result = invoke(&pipeline(&server, &lake_root), run_config(&credentials, true)).await;

    assert!(result.is_err());
    assert!(!lake_root.exists());
}
