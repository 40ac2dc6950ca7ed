use super::profile::MassProfile;
use super::resolution::ResolutionResult;
use crate::domain::{FlowError, FlowResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

/// Pretty JSON with a trailing newline.
pub fn write_json_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> FlowResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|source| {
        FlowError::internal(
            "SYS.JSON_SERIALIZE",
            format!("failed to serialize '{}': {}", path.display(), source),
        )
    })?;
    write_text_artifact(path, &rendered).map_err(|source| {
        FlowError::io_system(
            "IO.ARTIFACT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

pub fn mass_profile_table(profile: &MassProfile) -> String {
    let mut table = String::from("#     mass_low    mass_high         mean   mean_error\n");
    for bin in profile.bins() {
        table.push_str(&format!(
            "{} {} {} {}\n",
            format_fixed_f64(bin.low, 13, 5),
            format_fixed_f64(bin.high, 12, 5),
            format_fixed_f64(bin.mean, 12, 6),
            format_fixed_f64(bin.mean_error, 12, 6),
        ));
    }
    table
}

pub fn resolution_table(result: &ResolutionResult) -> String {
    let mut table = format!(
        "# subevents {}  centrality {}  integrated {}\n#  cent   resolution\n",
        result.subevents(),
        result.window(),
        format_fixed_f64(result.integrated_resolution(), 0, 6),
    );
    for point in result.resolution_profile() {
        table.push_str(&format!(
            "{:>7} {}\n",
            point.percentile,
            format_fixed_f64(point.resolution, 12, 6)
        ));
    }
    table
}
