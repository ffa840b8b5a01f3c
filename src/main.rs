use anyhow::Result;
use clap::Parser;
use idealista_runner::config::{self, PartialRunConfig, RawTimePeriod, SearchType};
use idealista_runner::idealista::{IdealistaOptions, IdealistaPipeline};
use idealista_runner::{invoke, logging};
use std::path::PathBuf;

/// With no arguments this performs the fixed Madrid sale run.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Idealista Runner - one-shot idealista to data lake pipeline run")]
struct Args {
    /// TOML file with run parameters (flags override it)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Zone (municipality) to search in
    #[clap(long)]
    zone: Option<String>,

    /// Province the zone belongs to
    #[clap(long)]
    province: Option<String>,

    /// Listing type to search for
    #[clap(long, value_enum)]
    search_type: Option<SearchType>,

    /// Publication window code in hours, e.g. 24
    #[clap(long)]
    time_period: Option<String>,

    /// Data lake bucket name
    #[clap(long)]
    bucket_name: Option<String>,

    /// Dataset id inside the bucket
    #[clap(long)]
    dataset_id: Option<String>,

    /// Path to the service account key (may start with ~)
    #[clap(long, value_name = "PATH")]
    credentials_path: Option<PathBuf>,

    /// Testing run flag, handed to the pipeline as is
    #[clap(long, value_name = "BOOL")]
    testing: Option<bool>,

    /// Local directory the data lake lives in
    #[clap(long, default_value = "data_lake")]
    lake_root: PathBuf,

    /// Maximum number of result pages to scrape in a non-testing run
    #[clap(short, long, default_value = "3")]
    max_pages: usize,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn overrides(&self) -> PartialRunConfig {
        PartialRunConfig {
            zone: self.zone.clone(),
            province: self.province.clone(),
            search_type: self.search_type.map(|t| t.to_string()),
            time_period: self.time_period.clone().map(RawTimePeriod::Text),
            bucket_name: self.bucket_name.clone(),
            dataset_id: self.dataset_id.clone(),
            credentials_path: self.credentials_path.clone(),
            testing: self.testing,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let run_config = config::load_config(args.config.as_deref(), args.overrides())?;

    let pipeline = IdealistaPipeline::new(IdealistaOptions {
        lake_root: args.lake_root,
        max_pages: args.max_pages,
        ..Default::default()
    })?;

    invoke(&pipeline, run_config).await?;

    Ok(())
}
