pub mod config;
pub mod credentials;
pub mod error;
pub mod idealista;
pub mod idealista_scraper;
pub mod invoker;
pub mod lake;
pub mod logging;
pub mod models;
pub mod parser;
pub mod paths;
pub mod pipeline;

pub use config::{PartialRunConfig, RunConfig, SearchType, TimePeriod};
pub use error::{ConfigError, PipelineInvocationError};
pub use invoker::{invoke, RunState};
pub use pipeline::Pipeline;
