pub mod ep_vn;
pub mod fit;
pub mod profile;
pub mod records;
pub mod reflections;
pub mod resolution;
pub mod serialization;
pub mod triplet;

pub use ep_vn::{EpVnInput, EventPlaneYields, get_ep_vn};
pub use fit::{
    FitExtractionOptions, FitFunction, FitParameter, ParametricFunction, PeakFitAccessor,
    SecondaryPeakNames, SecondaryPeakParameters, VnFitResult, extract_vn_fit_results,
};
pub use profile::{
    InOutMass, MassProfile, MassProfileBin, PlaneSplit, invariant_mass_vs_deltaphi,
    vn_versus_mass,
};
pub use records::{
    CorrelationRecord, HistogramStore, RecordLookup, ResolutionSource, check_file_exists,
    check_record_exists, correlation_record_for_pair, correlation_records, load_store,
};
pub use reflections::{ReflectionTemplates, load_reflection_templates, load_reflection_templates_from};
pub use resolution::{
    R2_UNDEFINED, RESOLUTION_UNDEFINED, ResolutionResult, Subevents, compute_r2,
    compute_resolution, get_resolution,
};
pub use triplet::{SubeventTriplet, TripletResolver};
