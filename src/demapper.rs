//! Soft demapper producing bit log-likelihood ratios (LLRs) from received symbols
//!
//! For every received symbol and every bit position, the demapper compares the evidence that the
//! bit is `0` with the evidence that it is `1`, given the constellation, its bit-partition table
//! and the noise variance `σ²`. Two algorithms are available:
//!
//! - [`DemapAlgo::MaxLog`]: the evidence for each bit value is the minimum squared distance from
//!   the received symbol to the points carrying that value, and the LLR is
//!   `(min_dist_for_zero - min_dist_for_one) / σ²`.
//!
//! - [`DemapAlgo::Exact`]: the evidence for each bit value is the sum of the likelihoods
//!   `exp(-dist / σ²)` of the points carrying that value, and the LLR is
//!   `-ln(sum_for_zero / sum_for_one)`.
//!
//! Both algorithms use the same sign convention: a negative LLR indicates that `Zero` is more
//! likely, and a positive LLR that `One` is more likely. LLRs are written in symbol-major order,
//! so that `out[s * B + b]` is the LLR for bit `b` of symbol `s`.
//!
//! Non-finite LLRs (from extremely small noise variances, say) are clamped to a configurable
//! saturation magnitude instead of being propagated.
//!
//! # Examples
//!
//! ```
//! use num_complex::Complex32;
//! use softdemod::{llr_approx, llr_exact, Constellation, PartitionTable};
//!
//! let bpsk = Constellation::new(&[Complex32::new(1.0, 0.0), Complex32::new(-1.0, 0.0)])?;
//! let partition = PartitionTable::for_index_labels(1)?;
//! let received = [Complex32::new(0.5, 0.0)];
//! let mut llr = [0.0; 1];
//! llr_approx(&received, &bpsk, &partition, 1.0, &mut llr)?;
//! assert_eq!(llr, [-2.0]);
//! llr_exact(&received, &bpsk, &partition, 1.0, &mut llr)?;
//! assert!(llr[0] < 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use num_complex::Complex32;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distance::{self, DistanceMatrix};
use crate::{Constellation, Error, PartitionTable};

/// Default upper bound on the constellation size for Max-Log demapping
pub const MAX_CONSTELLATION_SIZE: usize = 64;

/// Enumeration of soft demapping algorithms
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum DemapAlgo {
    /// Max-Log approximation (minimum distance per bit value)
    MaxLog,
    /// Exact log-likelihood ratio (sum of likelihoods per bit value)
    Exact,
}

impl DemapAlgo {
    /// Returns the name of the variant.
    fn name(self) -> &'static str {
        match self {
            DemapAlgo::MaxLog => "Max-Log",
            DemapAlgo::Exact => "Exact",
        }
    }
}

impl std::fmt::Display for DemapAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} demapping", self.name())
    }
}

/// Configuration of a soft demapper
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct DemapperConfig {
    /// Demapping algorithm
    pub algo: DemapAlgo,
    /// Largest constellation size accepted by Max-Log demapping
    pub max_constellation_size: usize,
    /// Magnitude to which LLRs are clamped
    pub llr_saturation: f32,
    /// Number of symbols per chunk when splitting a batch across worker threads (`None` for
    /// sequential processing)
    pub num_symbols_per_chunk: Option<usize>,
}

impl Default for DemapperConfig {
    fn default() -> Self {
        Self {
            algo: DemapAlgo::MaxLog,
            max_constellation_size: MAX_CONSTELLATION_SIZE,
            llr_saturation: f32::MAX,
            num_symbols_per_chunk: None,
        }
    }
}

impl DemapperConfig {
    /// Returns default configuration for given algorithm.
    #[must_use]
    pub fn with_algo(algo: DemapAlgo) -> Self {
        Self {
            algo,
            ..Self::default()
        }
    }

    /// Returns configuration read from a JSON file. Fields missing from the file take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the configuration is invalid.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.check()?;
        Ok(config)
    }

    /// Checks validity of configuration.
    fn check(&self) -> Result<(), Error> {
        if self.max_constellation_size < 2 {
            return Err(Error::InvalidInput(format!(
                "Maximum constellation size must be at least 2 (found {})",
                self.max_constellation_size
            )));
        }
        if !self.llr_saturation.is_finite() || self.llr_saturation <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "LLR saturation magnitude must be positive and finite (found {})",
                self.llr_saturation
            )));
        }
        if self.num_symbols_per_chunk == Some(0) {
            return Err(Error::InvalidInput(
                "Number of symbols per chunk cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scratch storage for one demapping call (or one worker of a parallel call)
#[derive(Clone, Debug, Default)]
pub struct DemapperWorkspace {
    /// Distances from all received symbols to all points (Max-Log)
    dist: DistanceMatrix,
    /// Minimum distance to points with bit `Zero`, for all symbols and bit positions (Max-Log)
    min_dist_for_zero: Vec<f32>,
    /// Minimum distance to points with bit `One`, for all symbols and bit positions (Max-Log)
    min_dist_for_one: Vec<f32>,
    /// Likelihoods of all points for the current received symbol (Exact)
    weights: Vec<f32>,
}

impl DemapperWorkspace {
    /// Returns empty workspace. Buffers grow to fit the batches they are used with.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Soft demapper with a given configuration
#[derive(Clone, PartialEq, Debug, Copy, Default)]
pub struct Demapper {
    /// Configuration
    config: DemapperConfig,
}

impl Demapper {
    /// Returns demapper with given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the maximum constellation size is less than `2`, if the saturation
    /// magnitude is not positive and finite, or if the number of symbols per chunk is `Some(0)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use softdemod::{DemapAlgo, Demapper, DemapperConfig};
    ///
    /// let config = DemapperConfig {
    ///     algo: DemapAlgo::Exact,
    ///     num_symbols_per_chunk: Some(1024),
    ///     ..DemapperConfig::default()
    /// };
    /// let demapper = Demapper::new(config)?;
    /// assert_eq!(demapper.config().algo, DemapAlgo::Exact);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(config: DemapperConfig) -> Result<Self, Error> {
        config.check()?;
        Ok(Self { config })
    }

    /// Returns configuration.
    #[must_use]
    pub fn config(&self) -> &DemapperConfig {
        &self.config
    }

    /// Computes LLRs for received symbols.
    ///
    /// # Parameters
    ///
    /// - `received`: Received symbols, equalized to the scale of the constellation.
    ///
    /// - `constellation`: Constellation from which the transmitted symbols were drawn.
    ///
    /// - `partition`: Bit-partition table for the constellation.
    ///
    /// - `noise_var`: Noise variance `σ²` (total over real and imaginary parts).
    ///
    /// - `out`: Buffer for the LLRs, of length `received.len() * B`, where `B` is the number of
    ///   bits per symbol. Negative values indicate that `Zero` is more likely.
    ///
    /// # Returns
    ///
    /// - `num_saturated`: Number of LLRs that were clamped to the saturation magnitude.
    ///
    /// # Errors
    ///
    /// Returns an error, without writing to `out`, if `noise_var` is not positive and finite, if
    /// any received symbol is not finite, if `partition` does not match `constellation`, if the
    /// length of `out` is wrong, or if Max-Log demapping is requested for a constellation larger
    /// than the configured maximum.
    pub fn demap(
        &self,
        received: &[Complex32],
        constellation: &Constellation,
        partition: &PartitionTable,
        noise_var: f32,
        out: &mut [f32],
    ) -> Result<usize, Error> {
        self.check_inputs(received, constellation, partition, noise_var, out)?;
        let num_bits_per_symbol = partition.num_bits_per_symbol();
        let num_saturated = match self.config.num_symbols_per_chunk {
            Some(chunk_len) if received.len() > chunk_len => received
                .par_chunks(chunk_len)
                .zip(out.par_chunks_mut(chunk_len * num_bits_per_symbol))
                .map(|(received_chunk, out_chunk)| {
                    let mut workspace = DemapperWorkspace::new();
                    self.demap_unchecked(
                        received_chunk,
                        constellation,
                        partition,
                        noise_var,
                        out_chunk,
                        &mut workspace,
                    )
                })
                .sum::<usize>(),
            _ => self.demap_unchecked(
                received,
                constellation,
                partition,
                noise_var,
                out,
                &mut DemapperWorkspace::new(),
            ),
        };
        self.log_batch(received.len(), constellation.num_points(), num_saturated);
        Ok(num_saturated)
    }

    /// Computes LLRs for received symbols on the calling thread, using caller-supplied scratch
    /// storage. Parameters, return value and errors are as for [`Demapper::demap`].
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Demapper::demap`].
    pub fn demap_with_workspace(
        &self,
        received: &[Complex32],
        constellation: &Constellation,
        partition: &PartitionTable,
        noise_var: f32,
        out: &mut [f32],
        workspace: &mut DemapperWorkspace,
    ) -> Result<usize, Error> {
        self.check_inputs(received, constellation, partition, noise_var, out)?;
        let num_saturated =
            self.demap_unchecked(received, constellation, partition, noise_var, out, workspace);
        self.log_batch(received.len(), constellation.num_points(), num_saturated);
        Ok(num_saturated)
    }

    /// Checks validity of demapper inputs.
    fn check_inputs(
        &self,
        received: &[Complex32],
        constellation: &Constellation,
        partition: &PartitionTable,
        noise_var: f32,
        out: &[f32],
    ) -> Result<(), Error> {
        if noise_var.is_nan() || noise_var <= 0.0 || noise_var.is_infinite() {
            return Err(Error::InvalidNoiseVariance(noise_var));
        }
        if self.config.algo == DemapAlgo::MaxLog
            && constellation.num_points() > self.config.max_constellation_size
        {
            return Err(Error::InvalidConstellationSize(format!(
                "Max-Log demapping supports at most {} constellation points (found {})",
                self.config.max_constellation_size,
                constellation.num_points()
            )));
        }
        partition.check_matches(constellation)?;
        let expected_out_len = received.len() * partition.num_bits_per_symbol();
        if out.len() != expected_out_len {
            return Err(Error::InvalidInput(format!(
                "For {} received symbols, expected {} LLR values (found {})",
                received.len(),
                expected_out_len,
                out.len()
            )));
        }
        if let Some(index) = received
            .iter()
            .position(|sym| !(sym.re.is_finite() && sym.im.is_finite()))
        {
            return Err(Error::InvalidInput(format!(
                "Received symbol {index} is not finite ({})",
                received[index]
            )));
        }
        Ok(())
    }

    /// Computes LLRs for inputs that have already been checked, and returns the number of LLRs
    /// that were saturated.
    fn demap_unchecked(
        &self,
        received: &[Complex32],
        constellation: &Constellation,
        partition: &PartitionTable,
        noise_var: f32,
        out: &mut [f32],
        workspace: &mut DemapperWorkspace,
    ) -> usize {
        let limit = self.config.llr_saturation;
        match self.config.algo {
            DemapAlgo::MaxLog => {
                workspace.dist.compute(received, constellation);
                compute_min_dist(
                    &workspace.dist,
                    partition,
                    &mut workspace.min_dist_for_zero,
                    &mut workspace.min_dist_for_one,
                );
                compute_llr(
                    &workspace.min_dist_for_zero,
                    &workspace.min_dist_for_one,
                    noise_var,
                    limit,
                    out,
                )
            }
            DemapAlgo::Exact => compute_exact_llr(
                received,
                constellation,
                partition,
                noise_var,
                limit,
                &mut workspace.weights,
                out,
            ),
        }
    }

    /// Logs summary of a demapped batch.
    fn log_batch(&self, num_symbols: usize, num_points: usize, num_saturated: usize) {
        debug!(
            "{}: {} symbols, {} constellation points",
            self.config.algo, num_symbols, num_points
        );
        if num_saturated > 0 {
            debug!("{num_saturated} LLR values saturated");
        }
    }
}

/// Computes Max-Log LLRs for received symbols.
///
/// Equivalent to [`Demapper::demap`] with the default configuration, which limits the
/// constellation size to [`MAX_CONSTELLATION_SIZE`] points.
///
/// # Errors
///
/// Returns an error, without writing to `out`, if the constellation has more than
/// [`MAX_CONSTELLATION_SIZE`] points or if any other input is invalid (see [`Demapper::demap`]).
pub fn llr_approx(
    received: &[Complex32],
    constellation: &Constellation,
    partition: &PartitionTable,
    noise_var: f32,
    out: &mut [f32],
) -> Result<(), Error> {
    llr_approx_with_workspace(
        received,
        constellation,
        partition,
        noise_var,
        out,
        &mut DemapperWorkspace::new(),
    )
}

/// Computes exact LLRs for received symbols.
///
/// # Errors
///
/// Returns an error, without writing to `out`, if any input is invalid (see [`Demapper::demap`]).
pub fn llr_exact(
    received: &[Complex32],
    constellation: &Constellation,
    partition: &PartitionTable,
    noise_var: f32,
    out: &mut [f32],
) -> Result<(), Error> {
    llr_exact_with_workspace(
        received,
        constellation,
        partition,
        noise_var,
        out,
        &mut DemapperWorkspace::new(),
    )
}

/// Computes Max-Log LLRs for received symbols using caller-supplied scratch storage.
///
/// # Errors
///
/// Returns an error under the same conditions as [`llr_approx`].
pub fn llr_approx_with_workspace(
    received: &[Complex32],
    constellation: &Constellation,
    partition: &PartitionTable,
    noise_var: f32,
    out: &mut [f32],
    workspace: &mut DemapperWorkspace,
) -> Result<(), Error> {
    Demapper::new(DemapperConfig::with_algo(DemapAlgo::MaxLog))?.demap_with_workspace(
        received,
        constellation,
        partition,
        noise_var,
        out,
        workspace,
    )?;
    Ok(())
}

/// Computes exact LLRs for received symbols using caller-supplied scratch storage.
///
/// # Errors
///
/// Returns an error under the same conditions as [`llr_exact`].
pub fn llr_exact_with_workspace(
    received: &[Complex32],
    constellation: &Constellation,
    partition: &PartitionTable,
    noise_var: f32,
    out: &mut [f32],
    workspace: &mut DemapperWorkspace,
) -> Result<(), Error> {
    Demapper::new(DemapperConfig::with_algo(DemapAlgo::Exact))?.demap_with_workspace(
        received,
        constellation,
        partition,
        noise_var,
        out,
        workspace,
    )?;
    Ok(())
}

/// Computes, for every symbol and bit position, the minimum distance to the points with that
/// bit equal to `Zero` and to the points with that bit equal to `One`.
fn compute_min_dist(
    dist: &DistanceMatrix,
    partition: &PartitionTable,
    min_dist_for_zero: &mut Vec<f32>,
    min_dist_for_one: &mut Vec<f32>,
) {
    let num_values = dist.num_symbols() * partition.num_bits_per_symbol();
    min_dist_for_zero.clear();
    min_dist_for_zero.reserve(num_values);
    min_dist_for_one.clear();
    min_dist_for_one.reserve(num_values);
    for row in dist.rows() {
        for bit_pos in 0 .. partition.num_bits_per_symbol() {
            min_dist_for_zero.push(min_over(row, partition.zero_set(bit_pos)));
            min_dist_for_one.push(min_over(row, partition.one_set(bit_pos)));
        }
    }
}

/// Returns minimum of the distances at the given indices.
fn min_over(row: &[f32], indices: &[usize]) -> f32 {
    indices
        .iter()
        .map(|&index| row[index])
        .fold(f32::INFINITY, f32::min)
}

/// Computes Max-Log LLRs from minimum distances, and returns the number of saturated LLRs.
fn compute_llr(
    min_dist_for_zero: &[f32],
    min_dist_for_one: &[f32],
    noise_var: f32,
    limit: f32,
    out: &mut [f32],
) -> usize {
    let mut num_saturated = 0;
    for ((llr, &dist_zero), &dist_one) in out
        .iter_mut()
        .zip(min_dist_for_zero)
        .zip(min_dist_for_one)
    {
        let (value, saturated) = saturate((dist_zero - dist_one) / noise_var, limit);
        *llr = value;
        num_saturated += usize::from(saturated);
    }
    num_saturated
}

/// Computes exact LLRs symbol by symbol, and returns the number of saturated LLRs.
///
/// Distances are offset by their minimum over the constellation before exponentiation. This
/// leaves every likelihood ratio unchanged and keeps the larger of the two sums at least `1`, so
/// an underflowing sum yields a signed infinity that saturates.
fn compute_exact_llr(
    received: &[Complex32],
    constellation: &Constellation,
    partition: &PartitionTable,
    noise_var: f32,
    limit: f32,
    weights: &mut Vec<f32>,
    out: &mut [f32],
) -> usize {
    let num_bits_per_symbol = partition.num_bits_per_symbol();
    let mut num_saturated = 0;
    for (&sym, sym_out) in received.iter().zip(out.chunks_exact_mut(num_bits_per_symbol)) {
        distance::square_dist_to_all(sym, constellation.points(), weights);
        let min_dist = weights.iter().copied().fold(f32::INFINITY, f32::min);
        for weight in weights.iter_mut() {
            *weight = (-(*weight - min_dist) / noise_var).exp();
        }
        for (bit_pos, llr) in sym_out.iter_mut().enumerate() {
            let sum_for_zero: f32 = partition.zero_set(bit_pos).iter().map(|&i| weights[i]).sum();
            let sum_for_one: f32 = partition.one_set(bit_pos).iter().map(|&i| weights[i]).sum();
            let (value, saturated) = saturate(sum_for_one.ln() - sum_for_zero.ln(), limit);
            *llr = value;
            num_saturated += usize::from(saturated);
        }
    }
    num_saturated
}

/// Returns LLR clamped to `[-limit, limit]`, and whether clamping was needed. An undefined LLR
/// (`NaN`) carries no information and is replaced by `0`.
fn saturate(llr: f32, limit: f32) -> (f32, bool) {
    if llr.is_nan() {
        (0.0, true)
    } else if llr.abs() > limit {
        (limit.copysign(llr), true)
    } else {
        (llr, false)
    }
}
