use std::path::PathBuf;

use thiserror::Error;

/// Failure signalled by the pipeline call.
///
/// The invoker never inspects or rewrites the underlying error: the message is the
/// pipeline's own and the original value can be recovered with [`PipelineInvocationError::downcast_ref`].
#[derive(Debug, Error)]
pub enum PipelineInvocationError {
    #[error(transparent)]
    Pipeline(anyhow::Error),
}

impl PipelineInvocationError {
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            PipelineInvocationError::Pipeline(err) => err.downcast_ref::<E>(),
        }
    }

    pub fn into_inner(self) -> anyhow::Error {
        match self {
            PipelineInvocationError::Pipeline(err) => err,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid search type '{0}' (expected 'sale' or 'rent')")]
    InvalidSearchType(String),

    #[error("invalid time period '{0}' (expected a positive integer)")]
    InvalidTimePeriod(String),

    #[error("config field '{field}' must be a single path segment, got '{value}'")]
    InvalidSegment { field: &'static str, value: String },

    #[error("config field '{field}' must not be empty")]
    Empty { field: &'static str },
}
