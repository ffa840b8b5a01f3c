//! One-shot run invoker.
//!
//! Resolves the credentials path, hands the config to the pipeline exactly once and waits
//! for it. There is no retry, no timeout and no state kept between runs.

use std::fmt;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::PipelineInvocationError;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::NotStarted => "not_started",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub async fn invoke<P>(pipeline: &P, config: RunConfig) -> Result<(), PipelineInvocationError>
where
    P: Pipeline + ?Sized,
{
    let mut state = RunState::NotStarted;
    debug!(pipeline = pipeline.name(), %state, "preparing run");

    let config = config
        .with_resolved_credentials()
        .with_context(|| {
            format!(
                "failed to resolve credentials path {}",
                config.credentials_path().display()
            )
        })
        .map_err(PipelineInvocationError::Pipeline)?;

    state = RunState::Running;
    info!(
        pipeline = pipeline.name(),
        %state,
        zone = config.zone(),
        province = config.province(),
        search_type = %config.search_type(),
        time_period = %config.time_period(),
        bucket = config.bucket_name(),
        dataset = config.dataset_id(),
        testing = config.testing(),
        "starting pipeline run"
    );

    match pipeline.run(config).await {
        Ok(()) => {
            state = RunState::Completed;
            info!(pipeline = pipeline.name(), %state, "pipeline run finished");
            Ok(())
        }
        Err(err) => {
            state = RunState::Failed;
            warn!(pipeline = pipeline.name(), %state, error = %err, "pipeline run failed");
            Err(PipelineInvocationError::Pipeline(err))
        }
    }
}
