//! Monte Carlo signal and reflection templates for D0 mass fits.

use super::records::{RecordLookup, check_file_exists, load_store};
use crate::binned::Histogram;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::domain::FlowResult;
use std::path::Path;

const REFLECTION_FEATURE: &str = "reflections";

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionTemplates {
    pub signal: Vec<Histogram>,
    pub reflection: Vec<Histogram>,
}

/// Record-name suffix for a pT interval: shortest float rendering plus a
/// trailing `0`, so `2.0` to `3.5` gives `2.00_3.50` and `2.25` gives `2.250`.
pub fn pt_suffix(low: f64, high: f64) -> String {
    format!("{low:?}0_{high:?}0")
}

/// Per pT interval: prompt + feed-down signal template and the reflection
/// template. Any missing record disables reflections (`Ok(None)`).
pub fn load_reflection_templates(
    lookup: &impl RecordLookup,
    pt_bins: &[(f64, f64)],
    sink: &dyn DiagnosticSink,
) -> FlowResult<Option<ReflectionTemplates>> {
    let missing = |name: String| -> FlowResult<Option<ReflectionTemplates>> {
        sink.report(DiagnosticEvent::MissingResource {
            name,
            feature: REFLECTION_FEATURE.to_string(),
        });
        Ok(None)
    };

    let mut templates = ReflectionTemplates {
        signal: Vec::with_capacity(pt_bins.len()),
        reflection: Vec::with_capacity(pt_bins.len()),
    };
    for (index, (low, high)) in pt_bins.iter().enumerate() {
        let suffix = pt_suffix(*low, *high);

        let feed_down_name = format!("hFDMass_{suffix}");
        let prompt_name = format!("hPromptMass_{suffix}");
        let (Some(feed_down), Some(prompt)) =
            (lookup.get(&feed_down_name), lookup.get(&prompt_name))
        else {
            let absent = if lookup.contains(&feed_down_name) {
                prompt_name
            } else {
                feed_down_name
            };
            return missing(absent);
        };
        let mut signal = feed_down.clone();
        signal.add(prompt)?;
        signal.set_name(format!("histSgn_{index}"));

        let reflection_name = format!("hVarReflMass_{suffix}");
        let Some(reflection) = lookup.get(&reflection_name) else {
            return missing(reflection_name);
        };
        let mut reflection = reflection.clone();
        reflection.set_name(format!("histRfl_{index}"));

        templates.signal.push(signal);
        templates.reflection.push(reflection);
    }
    Ok(Some(templates))
}

/// File-level variant: a missing store disables reflections as well.
pub fn load_reflection_templates_from(
    path: impl AsRef<Path>,
    pt_bins: &[(f64, f64)],
    sink: &dyn DiagnosticSink,
) -> FlowResult<Option<ReflectionTemplates>> {
    let path = path.as_ref();
    if !check_file_exists(path) {
        sink.report(DiagnosticEvent::MissingResource {
            name: path.display().to_string(),
            feature: REFLECTION_FEATURE.to_string(),
        });
        return Ok(None);
    }
    let store = load_store(path)?;
    load_reflection_templates(&store, pt_bins, sink)
}
