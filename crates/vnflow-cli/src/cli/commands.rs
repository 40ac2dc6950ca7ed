use super::CliError;
use super::helpers::{config_window, load_config, load_record_store, write_output};
use serde::Serialize;
use std::path::PathBuf;
use vnflow_core::binned::BinnedDataset;
use vnflow_core::common::config::DEFAULT_HARMONIC;
use vnflow_core::diagnostics::TracingSink;
use vnflow_core::domain::{DetectorLabel, DetectorPair, FlowError, Measurement, ResolutionMethod};
use vnflow_core::modules::serialization::{format_fixed_f64, mass_profile_table, resolution_table};
use vnflow_core::modules::{
    EpVnInput, EventPlaneYields, PlaneSplit, RecordLookup, ResolutionResult, Subevents,
    compute_r2, correlation_record_for_pair, correlation_records, get_ep_vn, get_resolution,
    invariant_mass_vs_deltaphi, vn_versus_mass,
};

#[derive(clap::Args)]
pub(super) struct ResolutionArgs {
    /// Record store (JSON) holding the pairwise correlation histograms
    #[arg(long)]
    store: PathBuf,

    /// Analysis configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// JSON report output path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Use one detector-pair record as a single subevent (e.g. FT0cFT0a)
    #[arg(long, value_name = "PAIR")]
    single: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct R2Args {
    /// Record store (JSON) holding the pairwise correlation histograms
    #[arg(long)]
    store: PathBuf,

    /// Analysis configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Reference detector A
    #[arg(long)]
    det_a: DetectorLabel,

    /// Detector B
    #[arg(long)]
    det_b: DetectorLabel,

    /// Detector C
    #[arg(long)]
    det_c: DetectorLabel,
}

#[derive(clap::Args)]
pub(super) struct EpVnArgs {
    /// Harmonic order n (defaults to the config's harmonic, else 2)
    #[arg(long)]
    harmonic: Option<u32>,

    /// Analysis configuration (JSON) supplying the default harmonic
    #[arg(long)]
    config: Option<PathBuf>,

    /// In-plane yield
    #[arg(long, allow_negative_numbers = true)]
    n_in: f64,

    /// In-plane yield uncertainty
    #[arg(long)]
    n_in_unc: f64,

    /// Out-of-plane yield
    #[arg(long, allow_negative_numbers = true)]
    n_out: f64,

    /// Out-of-plane yield uncertainty
    #[arg(long)]
    n_out_unc: f64,

    /// Event-plane resolution
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    resolution: f64,

    /// Correlation between the in-plane and out-of-plane uncertainties
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    correlation: f64,
}

#[derive(clap::Args)]
pub(super) struct VnVsMassArgs {
    /// Record store (JSON) holding the dataset
    #[arg(long)]
    store: PathBuf,

    /// Name of the dataset inside the store
    #[arg(long)]
    histogram: String,

    /// Axis index of the invariant mass
    #[arg(long)]
    mass_axis: usize,

    /// Axis index of the vn observable
    #[arg(long)]
    vn_axis: usize,

    /// Comma-separated mass bin edges
    #[arg(long, value_delimiter = ',', required = true)]
    mass_bins: Vec<f64>,

    /// JSON output path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct InoutMassArgs {
    /// Record store (JSON) holding the dataset
    #[arg(long)]
    store: PathBuf,

    /// Name of the dataset inside the store
    #[arg(long)]
    histogram: String,

    /// Axis index of cos(n deltaphi)
    #[arg(long)]
    deltaphi_axis: usize,

    /// Axis index of the invariant mass
    #[arg(long)]
    mass_axis: usize,

    /// Split point between out-of-plane and in-plane
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    split: f64,

    /// JSON output path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionReport {
    centrality: String,
    method: ResolutionMethod,
    results: Vec<ResolutionResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InOutMassReport {
    in_plane_yield: f64,
    out_of_plane_yield: f64,
    #[serde(flatten)]
    distributions: vnflow_core::modules::InOutMass,
}

pub(super) fn run_resolution_command(args: ResolutionArgs) -> Result<i32, CliError> {
    let config = load_config(&args.config)?;
    let window = config_window(&config)?;
    let store = load_record_store(&args.store)?;
    let source = config.resolution_source();
    let sink = TracingSink;

    let subevents: Vec<Subevents> = match args.single.as_deref() {
        Some(tag) => {
            let pair = DetectorPair::from_tag(tag).ok_or_else(|| {
                CliError::Usage(format!(
                    "invalid detector pair '{tag}'; expected two labels such as FT0cFT0a"
                ))
            })?;
            let record = correlation_record_for_pair(&store, &source, pair, &sink)
                .map_err(CliError::Compute)?;
            vec![Subevents::Single(record)]
        }
        None => {
            let records = correlation_records(&store, &source, &sink).map_err(CliError::Compute)?;
            let triplets = config.triplet_resolver().resolve(&records, &sink);
            if triplets.is_empty() {
                return Err(CliError::Compute(FlowError::computation(
                    "RUN.NO_TRIPLETS",
                    format!(
                        "no valid subevent triplets among {} records in '{}'",
                        records.len(),
                        source.directory()
                    ),
                )));
            }
            triplets.into_iter().map(Subevents::Triplet).collect()
        }
    };

    let mut results = Vec::with_capacity(subevents.len());
    for entry in &subevents {
        let result = get_resolution(entry, window, &sink).map_err(CliError::Compute)?;
        print!("{}", resolution_table(&result));
        results.push(result);
    }

    if let Some(output) = args.output.as_deref() {
        let report = ResolutionReport {
            centrality: window.label(),
            method: config.method,
            results,
        };
        write_output(output, &report)?;
    }
    Ok(0)
}

pub(super) fn run_r2_command(args: R2Args) -> Result<i32, CliError> {
    let config = load_config(&args.config)?;
    let window = config_window(&config)?;
    let store = load_record_store(&args.store)?;
    let detectors = [args.det_a, args.det_b, args.det_c];

    let r2 = compute_r2(
        &store,
        &config.resolution_source(),
        window,
        detectors,
        &TracingSink,
    )
    .map_err(CliError::Compute)?;
    println!(
        "R2 {}{}{} centrality {}: {}",
        args.det_a,
        args.det_b,
        args.det_c,
        window.label(),
        format_fixed_f64(r2, 0, 6)
    );
    Ok(0)
}

pub(super) fn run_ep_vn_command(args: EpVnArgs) -> Result<i32, CliError> {
    let yields = EventPlaneYields::new(
        Measurement::new(args.n_in, args.n_in_unc),
        Measurement::new(args.n_out, args.n_out_unc),
    )
    .with_correlation(args.correlation);
    let harmonic = match (args.harmonic, args.config.as_deref()) {
        (Some(harmonic), _) => harmonic,
        (None, Some(config)) => load_config(config)?.harmonic,
        (None, None) => DEFAULT_HARMONIC,
    };
    let input = EpVnInput::new(harmonic, yields).with_resolution(args.resolution);

    let estimate = get_ep_vn(&input, &TracingSink).map_err(CliError::Compute)?;
    println!(
        "v{} = {} +/- {}",
        harmonic,
        format_fixed_f64(estimate.value, 0, 6),
        format_fixed_f64(estimate.uncertainty, 0, 6)
    );
    Ok(0)
}

pub(super) fn run_vn_vs_mass_command(args: VnVsMassArgs) -> Result<i32, CliError> {
    let store = load_record_store(&args.store)?;
    let dataset = store
        .require(&args.histogram, &TracingSink)
        .map_err(CliError::Compute)?;

    let profile = vn_versus_mass(dataset, &args.mass_bins, args.mass_axis, args.vn_axis)
        .map_err(CliError::Compute)?;
    print!("{}", mass_profile_table(&profile));

    if let Some(output) = args.output.as_deref() {
        write_output(output, &profile)?;
    }
    Ok(0)
}

pub(super) fn run_inout_mass_command(args: InoutMassArgs) -> Result<i32, CliError> {
    let store = load_record_store(&args.store)?;
    let dataset = store
        .require(&args.histogram, &TracingSink)
        .map_err(CliError::Compute)?;
    let split = PlaneSplit::new(-1.0, args.split, 1.0).map_err(CliError::Compute)?;

    let distributions = invariant_mass_vs_deltaphi(dataset, args.deltaphi_axis, args.mass_axis, split)
        .map_err(CliError::Compute)?;
    let in_plane_yield = distributions.in_plane.integral();
    let out_of_plane_yield = distributions.out_of_plane.integral();
    println!(
        "in-plane {}  out-of-plane {}  entries {}",
        format_fixed_f64(in_plane_yield, 0, 3),
        format_fixed_f64(out_of_plane_yield, 0, 3),
        format_fixed_f64(dataset.entries(), 0, 0)
    );

    if let Some(output) = args.output.as_deref() {
        let report = InOutMassReport {
            in_plane_yield,
            out_of_plane_yield,
            distributions,
        };
        write_output(output, &report)?;
    }
    Ok(0)
}
