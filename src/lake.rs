use crate::config::SearchType;
use crate::models::{Listing, RunManifest};
use crate::paths;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Hive-style partition one run writes into.
#[derive(Debug, Clone)]
pub struct LakePartition {
    pub bucket: String,
    pub dataset: String,
    pub search_type: SearchType,
    pub province: String,
    pub zone: String,
    pub date: DateTime<Utc>,
    /// Distinguishes runs that land in the same partition within the same instant.
    pub run_id: String,
}

impl LakePartition {
    /// Partition for a new run, with a fresh random run id.
    pub fn new(
        bucket: impl Into<String>,
        dataset: impl Into<String>,
        search_type: SearchType,
        province: impl Into<String>,
        zone: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            dataset: dataset.into(),
            search_type,
            province: province.into(),
            zone: zone.into(),
            date,
            run_id: format!("{:08x}", rand::thread_rng().gen::<u32>()),
        }
    }

    /// Directory of the partition below the lake root.
    ///
    /// Fails when a component would leave its own directory level (separators, `.` or `..`).
    pub fn relative_dir(&self) -> Result<PathBuf> {
        for (field, value) in [
            ("bucket", &self.bucket),
            ("dataset", &self.dataset),
            ("province", &self.province),
            ("zone", &self.zone),
        ] {
            if !paths::is_single_segment(value) {
                bail!("Unsafe {} for a lake path: '{}'", field, value);
            }
        }

        Ok(PathBuf::from(&self.bucket)
            .join(&self.dataset)
            .join(format!("search_type={}", self.search_type))
            .join(format!("province={}", self.province))
            .join(format!("zone={}", self.zone))
            .join(format!("date={}", self.date.format("%Y-%m-%d"))))
    }

    pub fn file_stem(&self) -> String {
        format!("listings-{}-{}", self.date.format("%H%M%S%6f"), self.run_id)
    }
}

/// Paths of the files a batch produced.
#[derive(Debug, Clone)]
pub struct WrittenBatch {
    pub data_file: PathBuf,
    pub manifest_file: PathBuf,
}

/// Local data lake rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalLake {
    root: PathBuf,
}

impl LocalLake {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_file_path(&self, partition: &LakePartition) -> Result<PathBuf> {
        Ok(self
            .root
            .join(partition.relative_dir()?)
            .join(format!("{}.csv", partition.file_stem())))
    }

    /// Writes the listings CSV and its manifest. `manifest.data_file` is filled in here.
    ///
    /// Existing files are never overwritten: a name clash is an error.
    pub fn write_batch(
        &self,
        partition: &LakePartition,
        listings: &[Listing],
        mut manifest: RunManifest,
    ) -> Result<WrittenBatch> {
        let dir = self.root.join(partition.relative_dir()?);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create partition directory: {}", dir.display()))?;

        let data_file = self.data_file_path(partition)?;
        write_listings_csv(listings, &data_file)?;

        manifest.data_file = format!("{}.csv", partition.file_stem());
        let manifest_file = dir.join(format!("{}.manifest.json", partition.file_stem()));
        let file = create_new(&manifest_file)?;
        serde_json::to_writer_pretty(file, &manifest).context("Failed to write manifest")?;

        info!(
            listings = listings.len(),
            file = %data_file.display(),
            "wrote listings to lake"
        );

        Ok(WrittenBatch {
            data_file,
            manifest_file,
        })
    }
}

fn create_new(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))
}

pub fn write_listings_csv(listings: &[Listing], output_path: &Path) -> Result<()> {
    let file = create_new(output_path)?;

    let mut writer = csv::Writer::from_writer(file);
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.flush()?;

    Ok(())
}

pub fn load_listings_csv(input_path: &Path) -> Result<Vec<Listing>> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open input file: {}", input_path.display()))?;

    let mut reader = csv::Reader::from_reader(file);
    let mut listings = Vec::new();
    for result in reader.deserialize() {
        let listing: Listing = result?;
        listings.push(listing);
    }

    Ok(listings)
}
