use anyhow::Result;
use async_trait::async_trait;

use crate::config::RunConfig;

/// The scrape/transform/load capability a run hands its config to.
///
/// Implementations own everything past the call boundary, including the meaning of
/// [`RunConfig::testing`].
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, config: RunConfig) -> Result<()>;
}
