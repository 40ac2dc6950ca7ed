//! Anisotropic-flow extraction from centrality-binned correlation data.
//!
//! Resolution from subevent correlations, vn from in-plane / out-of-plane
//! yields and mass profiles of binned datasets.

pub mod binned;
pub mod common;
pub mod diagnostics;
pub mod domain;
pub mod modules;
