use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use vnflow_core::binned::{Axis, Histogram};
use vnflow_core::domain::{DetectorLabel, DetectorPair};
use vnflow_core::modules::{HistogramStore, ResolutionSource};

const CONFIG: &str = r#"
{
  "centrality": "k3050",
  "detectors": ["FT0c", "FT0a", "TPCpos"]
}
"#;

fn run_vnflow(args: &[&str]) -> Output {
    let binary_path = env!("CARGO_BIN_EXE_vnflow");
    Command::new(binary_path)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("vnflow binary should run")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn correlation(value: Option<f64>) -> Histogram {
    let mut histogram = Histogram::new(
        "correlation",
        vec![
            Axis::uniform(100, 0.0, 100.0).expect("centrality axis"),
            Axis::uniform(200, -1.0, 1.0).expect("correlation axis"),
        ],
    )
    .expect("histogram");
    if let Some(value) = value {
        for percentile in 0..100 {
            histogram.fill(&[f64::from(percentile) + 0.5, value], 1.0);
        }
    }
    histogram
}

fn write_resolution_store(path: &Path, bc: Option<f64>) {
    let source = ResolutionSource::default();
    let mut store = HistogramStore::new();
    for (first, second, value) in [
        (DetectorLabel::Ft0c, DetectorLabel::Ft0a, Some(0.305)),
        (DetectorLabel::Ft0c, DetectorLabel::TpcPos, Some(0.205)),
        (DetectorLabel::Ft0a, DetectorLabel::TpcPos, bc),
    ] {
        let pair = DetectorPair::new(first, second).expect("pair");
        store.insert(source.record_name(pair), correlation(value));
    }
    write_file(
        path,
        &serde_json::to_string(&store).expect("store should serialize"),
    );
}

fn write_candidate_store(path: &Path) {
    let mut dataset = Histogram::new(
        "hSparseFlowCharm",
        vec![
            Axis::uniform(30, 1.7, 2.0).expect("mass axis"),
            Axis::uniform(40, -1.0, 1.0).expect("vn axis"),
            Axis::uniform(20, -1.0, 1.0).expect("deltaphi axis"),
        ],
    )
    .expect("dataset");
    for step in 0..30 {
        let mass = 1.705 + 0.01 * f64::from(step);
        dataset.fill(&[mass, 0.225, 0.55], 3.0);
        dataset.fill(&[mass, 0.225, -0.45], 1.0);
    }
    let mut store = HistogramStore::new();
    store.insert("hSparseFlowCharm", dataset);
    write_file(
        path,
        &serde_json::to_string(&store).expect("store should serialize"),
    );
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn resolution_command_reports_triplet_and_writes_json() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store_path = temp.path().join("AnalysisResults.json");
    let config_path = temp.path().join("config.json");
    let report_path = temp.path().join("out/resolution.json");
    write_resolution_store(&store_path, Some(0.155));
    write_file(&config_path, CONFIG);

    let output = run_vnflow(&[
        "resolution",
        "--store",
        store_path.to_str().expect("utf-8 path"),
        "--config",
        config_path.to_str().expect("utf-8 path"),
        "--output",
        report_path.to_str().expect("utf-8 path"),
    ]);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        stderr_of(&output)
    );
    let stdout = stdout_of(&output);
    assert!(stdout.contains("# subevents FT0cFT0aTPCpos"), "stdout: {stdout}");
    assert!(stdout.contains("JSON report:"), "stdout: {stdout}");

    let parsed: Value = serde_json::from_str(
        &fs::read_to_string(&report_path).expect("report should be readable"),
    )
    .expect("report should be valid JSON");
    assert_eq!(parsed["centrality"], "30_50");
    assert_eq!(parsed["method"], "sp");
    let results = parsed["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    let integrated = results[0]["integratedResolution"]
        .as_f64()
        .expect("integrated resolution");
    let expected = (0.305_f64 * 0.205 / 0.155).sqrt();
    assert!(
        (integrated - expected).abs() < 1.0e-9,
        "integrated={integrated} expected={expected}"
    );
    assert_eq!(
        results[0]["resolutionProfile"]
            .as_array()
            .expect("profile array")
            .len(),
        20
    );
}

#[test]
fn single_subevent_resolution_uses_named_pair() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store_path = temp.path().join("AnalysisResults.json");
    let config_path = temp.path().join("config.json");
    write_resolution_store(&store_path, Some(0.155));
    write_file(&config_path, CONFIG);

    let output = run_vnflow(&[
        "resolution",
        "--store",
        store_path.to_str().expect("utf-8 path"),
        "--config",
        config_path.to_str().expect("utf-8 path"),
        "--single",
        "FT0aFT0c",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("# subevents FT0cFT0a"), "stdout: {stdout}");
    assert!(stdout.contains("centrality [30, 50)"), "stdout: {stdout}");
}

#[test]
fn r2_command_prints_sentinel_for_zero_reference_correlation() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store_path = temp.path().join("AnalysisResults.json");
    let config_path = temp.path().join("config.json");
    write_resolution_store(&store_path, None);
    write_file(&config_path, CONFIG);

    let output = run_vnflow(&[
        "r2",
        "--store",
        store_path.to_str().expect("utf-8 path"),
        "--config",
        config_path.to_str().expect("utf-8 path"),
        "--det-a",
        "FT0c",
        "--det-b",
        "FT0a",
        "--det-c",
        "TPCpos",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(
        stdout_of(&output).contains("R2 FT0cFT0aTPCpos centrality 30_50: -999.000000"),
        "stdout: {}",
        stdout_of(&output)
    );
}

#[test]
fn ep_vn_command_prints_value_and_uncertainty() {
    let output = run_vnflow(&[
        "ep-vn",
        "--n-in",
        "10",
        "--n-in-unc",
        "1",
        "--n-out",
        "10",
        "--n-out-unc",
        "1",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let expected = std::f64::consts::PI * 0.005_f64.sqrt() / 4.0;
    assert_eq!(
        stdout_of(&output).trim(),
        format!("v2 = 0.000000 +/- {expected:.6}")
    );
}

#[test]
fn ep_vn_command_takes_harmonic_from_config() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("config.json");
    write_file(&config_path, r#"{"centrality": "k3050", "harmonic": 3}"#);
    let yields = ["--n-in", "10", "--n-in-unc", "1", "--n-out", "10", "--n-out-unc", "1"];

    let mut args = vec!["ep-vn", "--config", config_path.to_str().expect("utf-8 path")];
    args.extend(yields);
    let output = run_vnflow(&args);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let expected = std::f64::consts::PI * 0.005_f64.sqrt() / 9.0;
    assert_eq!(
        stdout_of(&output).trim(),
        format!("v3 = 0.000000 +/- {expected:.6}")
    );

    args.extend(["--harmonic", "2"]);
    let output = run_vnflow(&args);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(stdout_of(&output).starts_with("v2 = "));
}

#[test]
fn ep_vn_command_rejects_zero_harmonic() {
    let output = run_vnflow(&[
        "ep-vn",
        "--harmonic",
        "0",
        "--n-in",
        "10",
        "--n-in-unc",
        "1",
        "--n-out",
        "5",
        "--n-out-unc",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("ERROR: [INPUT.HARMONIC]"));
    assert!(stderr_of(&output).contains("FATAL EXIT CODE: 2"));
}

#[test]
fn vn_vs_mass_command_prints_table_and_writes_profile() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store_path = temp.path().join("candidates.json");
    let profile_path = temp.path().join("profile.json");
    write_candidate_store(&store_path);

    let output = run_vnflow(&[
        "vn-vs-mass",
        "--store",
        store_path.to_str().expect("utf-8 path"),
        "--histogram",
        "hSparseFlowCharm",
        "--mass-axis",
        "0",
        "--vn-axis",
        "1",
        "--mass-bins",
        "1.7,1.8,1.9,2.0",
        "--output",
        profile_path.to_str().expect("utf-8 path"),
    ]);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let table_rows = stdout_of(&output)
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with("JSON report"))
        .count();
    assert_eq!(table_rows, 3);

    let parsed: Value = serde_json::from_str(
        &fs::read_to_string(&profile_path).expect("profile should be readable"),
    )
    .expect("profile should be valid JSON");
    let bins = parsed["bins"].as_array().expect("bins array");
    assert_eq!(bins.len(), 3);
    assert_eq!(bins[0]["low"], 1.7);
    assert!(bins[0]["meanError"].is_number());
}

#[test]
fn inout_mass_command_splits_yields() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store_path = temp.path().join("candidates.json");
    let report_path = temp.path().join("inout.json");
    write_candidate_store(&store_path);

    let output = run_vnflow(&[
        "inout-mass",
        "--store",
        store_path.to_str().expect("utf-8 path"),
        "--histogram",
        "hSparseFlowCharm",
        "--deltaphi-axis",
        "2",
        "--mass-axis",
        "0",
        "--output",
        report_path.to_str().expect("utf-8 path"),
    ]);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(
        stdout_of(&output).contains("in-plane 90.000  out-of-plane 30.000"),
        "stdout: {}",
        stdout_of(&output)
    );

    let parsed: Value = serde_json::from_str(
        &fs::read_to_string(&report_path).expect("report should be readable"),
    )
    .expect("report should be valid JSON");
    assert_eq!(parsed["inPlaneYield"], 90.0);
    assert_eq!(parsed["outOfPlaneYield"], 30.0);
    assert_eq!(parsed["inPlane"]["name"], "hist_invmass_in");
}

#[test]
fn missing_store_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("config.json");
    write_file(&config_path, CONFIG);

    let output = run_vnflow(&[
        "resolution",
        "--store",
        temp.path().join("absent.json").to_str().expect("utf-8 path"),
        "--config",
        config_path.to_str().expect("utf-8 path"),
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("ERROR: [IO.STORE_READ]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 3"), "stderr: {stderr}");
}

#[test]
fn unknown_detector_label_is_a_usage_error() {
    let output = run_vnflow(&[
        "r2",
        "--store",
        "store.json",
        "--config",
        "config.json",
        "--det-a",
        "ZDC",
        "--det-b",
        "FT0a",
        "--det-c",
        "TPCpos",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("ERROR: [INPUT.CLI_USAGE]"));
}

#[test]
fn help_exits_successfully() {
    let output = run_vnflow(&["--help"]);

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    for command in ["resolution", "r2", "ep-vn", "vn-vs-mass", "inout-mass"] {
        assert!(stdout.contains(command), "help should list {command}");
    }
}
