use super::CliError;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vnflow_core::common::{AnalysisConfig, load_analysis_config};
use vnflow_core::domain::{CentralityBin, FlowError};
use vnflow_core::modules::serialization::write_json_artifact;
use vnflow_core::modules::{HistogramStore, load_store};

/// Installs the stderr subscriber once; later calls keep the first one.
pub(super) fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn load_config(path: &Path) -> Result<AnalysisConfig, CliError> {
    load_analysis_config(path).map_err(|error| CliError::Compute(FlowError::from(error)))
}

pub(super) fn config_window(config: &AnalysisConfig) -> Result<CentralityBin, CliError> {
    config
        .centrality_class()
        .map(|class| class.bin())
        .map_err(CliError::Compute)
}

pub(super) fn load_record_store(path: &Path) -> Result<HistogramStore, CliError> {
    load_store(path).map_err(CliError::Compute)
}

pub(super) fn write_output<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    write_json_artifact(path, value).map_err(CliError::Compute)?;
    println!("JSON report: {}", path.display());
    Ok(())
}
