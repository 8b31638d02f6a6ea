//! This crate implements soft demodulation of received complex baseband symbols: it converts
//! symbols that have already been equalized to the scale of a known constellation into per-bit
//! log-likelihood ratios (LLRs), for consumption by a soft-input channel decoder. For each symbol,
//! squared distances to all constellation points are reduced to evidence for each bit being `0`
//! or `1` using a bit-partition table, and the evidence is combined into an LLR normalized by the
//! noise variance. Both the Max-Log approximation and the exact LLR are available.
//!
//! All LLRs follow one sign convention: negative values indicate that `Zero` is more likely.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

pub mod lte;
pub mod utils;

mod common;
mod constellation;
mod demapper;
mod distance;

pub use common::{Bit, Error};
pub use constellation::{Constellation, PartitionTable};
pub use demapper::{
    llr_approx, llr_approx_with_workspace, llr_exact, llr_exact_with_workspace, DemapAlgo,
    Demapper, DemapperConfig, DemapperWorkspace, MAX_CONSTELLATION_SIZE,
};
pub use distance::{square_dist, DistanceMatrix};
