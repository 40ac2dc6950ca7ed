pub mod config;

pub use config::{AnalysisConfig, ConfigError, load_analysis_config};
