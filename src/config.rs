use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

pub const DEFAULT_ZONE: &str = "madrid";
pub const DEFAULT_PROVINCE: &str = "madrid";
pub const DEFAULT_SEARCH_TYPE: SearchType = SearchType::Sale;
pub const DEFAULT_TIME_PERIOD: &str = "24";
pub const DEFAULT_BUCKET_NAME: &str = "idealista_data_lake_idealista-scraper-384619";
pub const DEFAULT_DATASET_ID: &str = "idealista_listings";
pub const DEFAULT_CREDENTIALS_PATH: &str = "~/.gcp/terraform.json";
pub const DEFAULT_TESTING: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Sale,
    Rent,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Sale => "sale",
            SearchType::Rent => "rent",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(SearchType::Sale),
            "rent" => Ok(SearchType::Rent),
            _ => Err(ConfigError::InvalidSearchType(s.to_string())),
        }
    }
}

/// Numeric publication-window code, e.g. `24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimePeriod(NonZeroU32);

impl TimePeriod {
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimePeriod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<NonZeroU32>()
            .map(TimePeriod)
            .map_err(|_| ConfigError::InvalidTimePeriod(s.to_string()))
    }
}

/// Parameters of one pipeline execution.
///
/// Built once by [`PartialRunConfig::build`] (or [`RunConfig::default`] for the fixed run)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    zone: String,
    province: String,
    search_type: SearchType,
    time_period: TimePeriod,
    bucket_name: String,
    dataset_id: String,
    credentials_path: PathBuf,
    testing: bool,
}

impl RunConfig {
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn province(&self) -> &str {
        &self.province
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    pub fn time_period(&self) -> TimePeriod {
        self.time_period
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn testing(&self) -> bool {
        self.testing
    }

    /// Returns a copy whose credentials path is absolute with `~` expanded.
    pub fn with_resolved_credentials(&self) -> std::io::Result<RunConfig> {
        let credentials_path = paths::resolve_path(&self.credentials_path)?;
        Ok(RunConfig {
            credentials_path,
            ..self.clone()
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            zone: DEFAULT_ZONE.to_string(),
            province: DEFAULT_PROVINCE.to_string(),
            search_type: DEFAULT_SEARCH_TYPE,
            time_period: DEFAULT_TIME_PERIOD
                .parse()
                .unwrap_or(TimePeriod(NonZeroU32::MIN)),
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            testing: DEFAULT_TESTING,
        }
    }
}

/// Time period as written in a config file: `24` and `"24"` are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawTimePeriod {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawTimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTimePeriod::Number(n) => write!(f, "{}", n),
            RawTimePeriod::Text(s) => f.write_str(s),
        }
    }
}

/// One configuration layer. Unset fields fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    pub zone: Option<String>,
    pub province: Option<String>,
    pub search_type: Option<String>,
    pub time_period: Option<RawTimePeriod>,
    pub bucket_name: Option<String>,
    pub dataset_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub testing: Option<bool>,
}

impl PartialRunConfig {
    /// The fixed run, as a fully populated layer.
    pub fn defaults() -> Self {
        Self {
            zone: Some(DEFAULT_ZONE.to_string()),
            province: Some(DEFAULT_PROVINCE.to_string()),
            search_type: Some(DEFAULT_SEARCH_TYPE.to_string()),
            time_period: Some(RawTimePeriod::Text(DEFAULT_TIME_PERIOD.to_string())),
            bucket_name: Some(DEFAULT_BUCKET_NAME.to_string()),
            dataset_id: Some(DEFAULT_DATASET_ID.to_string()),
            credentials_path: Some(PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            testing: Some(DEFAULT_TESTING),
        }
    }

    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Lays `over` on top of `self`; fields set in `over` win.
    pub fn merge(self, over: PartialRunConfig) -> PartialRunConfig {
        PartialRunConfig {
            zone: over.zone.or(self.zone),
            province: over.province.or(self.province),
            search_type: over.search_type.or(self.search_type),
            time_period: over.time_period.or(self.time_period),
            bucket_name: over.bucket_name.or(self.bucket_name),
            dataset_id: over.dataset_id.or(self.dataset_id),
            credentials_path: over.credentials_path.or(self.credentials_path),
            testing: over.testing.or(self.testing),
        }
    }

    /// Validates the layer. Missing fields take the fixed-run defaults.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let merged = PartialRunConfig::defaults().merge(self);

        let zone = path_segment("zone", merged.zone)?;
        let province = path_segment("province", merged.province)?;
        let search_type = required("search_type", merged.search_type)?.parse::<SearchType>()?;
        let time_period = match merged.time_period {
            Some(raw) => raw.to_string().parse::<TimePeriod>()?,
            None => return Err(ConfigError::Empty { field: "time_period" }),
        };
        let bucket_name = path_segment("bucket_name", merged.bucket_name)?;
        let dataset_id = path_segment("dataset_id", merged.dataset_id)?;
        let credentials_path = required(
            "credentials_path",
            merged
                .credentials_path
                .map(|p| p.to_string_lossy().into_owned()),
        )?;

        Ok(RunConfig {
            zone,
            province,
            search_type,
            time_period,
            bucket_name,
            dataset_id,
            credentials_path: PathBuf::from(credentials_path),
            testing: merged.testing.unwrap_or(DEFAULT_TESTING),
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Empty { field }),
    }
}

/// Fields that name a storage location must stay a single directory level.
fn path_segment(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = required(field, value)?;
    if !paths::is_single_segment(&value) {
        return Err(ConfigError::InvalidSegment { field, value });
    }
    Ok(value)
}

/// Builds the run config from the optional file layer and the command-line layer.
pub fn load_config(
    config_file: Option<&Path>,
    overrides: PartialRunConfig,
) -> Result<RunConfig, ConfigError> {
    let file_layer = match config_file {
        Some(path) => PartialRunConfig::from_file(path)?,
        None => PartialRunConfig::default(),
    };
    file_layer.merge(overrides).build()
}
