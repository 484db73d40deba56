pub mod config;
pub mod core;
pub mod domain;
pub mod dssat;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::toml_config::TomlConfig;
pub use core::{etl::ExportEngine, pipeline::OutputPipeline};
pub use dssat::ReportKind;
pub use utils::error::{DssatError, Result};
