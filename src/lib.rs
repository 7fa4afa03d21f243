pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::{Credentials, ScoutConfig};

pub use adapters::{openai::OpenAiModel, storage::LocalStorage};
pub use core::{engine::ScoutEngine, pipeline::ScoutPipeline, portal::PortalClient, scorer::Scorer};
pub use utils::error::{Result, ScoutError};
