//! Analysis configuration document shared by the CLI commands.

use crate::domain::{
    CANONICAL_DETECTORS, CentralityClass, DetectorLabel, FlowError, ResolutionMethod,
};
use crate::modules::records::{DEFAULT_TASK_NAME, ResolutionSource};
use crate::modules::triplet::TripletResolver;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default = "default_task_name")]
    pub task_name: String,
    #[serde(default)]
    pub wagon_id: Option<String>,
    #[serde(default)]
    pub method: ResolutionMethod,
    pub centrality: String,
    #[serde(default = "default_detectors")]
    pub detectors: Vec<DetectorLabel>,
    #[serde(default)]
    pub reference_detector: Option<DetectorLabel>,
    #[serde(default = "default_harmonic")]
    pub harmonic: u32,
}

fn default_task_name() -> String {
    DEFAULT_TASK_NAME.to_string()
}

fn default_detectors() -> Vec<DetectorLabel> {
    CANONICAL_DETECTORS.to_vec()
}

pub const DEFAULT_HARMONIC: u32 = 2;

const fn default_harmonic() -> u32 {
    DEFAULT_HARMONIC
}

impl AnalysisConfig {
    pub fn new(centrality: impl Into<String>) -> Self {
        Self {
            task_name: default_task_name(),
            wagon_id: None,
            method: ResolutionMethod::default(),
            centrality: centrality.into(),
            detectors: default_detectors(),
            reference_detector: None,
            harmonic: default_harmonic(),
        }
    }

    pub fn centrality_class(&self) -> Result<CentralityClass, FlowError> {
        CentralityClass::from_tag(&self.centrality)
    }

    pub fn resolution_source(&self) -> ResolutionSource {
        ResolutionSource {
            task_name: self.task_name.clone(),
            wagon_id: self.wagon_id.clone(),
            method: self.method,
        }
    }

    pub fn triplet_resolver(&self) -> TripletResolver {
        let resolver = TripletResolver::new(self.detectors.clone());
        match self.reference_detector {
            Some(reference) => resolver.with_reference(reference),
            None => resolver,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.task_name.trim().is_empty() {
            return Err("taskName must not be empty".to_string());
        }
        if let Err(error) = self.centrality_class() {
            return Err(error.message().to_string());
        }
        if self.detectors.is_empty() {
            return Err("detectors must list at least one label".to_string());
        }
        for (index, label) in self.detectors.iter().enumerate() {
            if self.detectors[..index].contains(label) {
                return Err(format!("detector '{label}' is listed twice"));
            }
        }
        if self.harmonic == 0 {
            return Err("harmonic must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read analysis config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse analysis config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid analysis config '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl From<ConfigError> for FlowError {
    fn from(error: ConfigError) -> Self {
        let message = error.to_string();
        match error {
            ConfigError::Read { .. } => FlowError::io_system("IO.CONFIG_READ", message),
            ConfigError::Parse { .. } => FlowError::input_validation("INPUT.CONFIG_PARSE", message),
            ConfigError::Invalid { .. } => {
                FlowError::input_validation("INPUT.CONFIG_INVALID", message)
            }
        }
    }
}

pub fn load_analysis_config(config_path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    let config: AnalysisConfig =
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
    config.validate().map_err(|message| ConfigError::Invalid {
        path: config_path.to_path_buf(),
        message,
    })?;
    Ok(config)
}
