//! LTE modulation schemes and a simulator for the demapper over an AWGN channel
//!
//! The constellations are those of Section 7.1 of 3GPP TS 36.211, scaled to unit average energy.
//! Point `i` of each constellation carries the bits `b(0), b(1), ..., b(B-1)` given by the binary
//! representation of `i` (with `b(0)` the MSB), so that the matching partition table is
//! [`PartitionTable::for_index_labels`].

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::info;
use num_complex::Complex32;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{utils, Constellation, DemapAlgo, Demapper, DemapperConfig, Error, PartitionTable};

/// Enumeration of LTE modulation schemes
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum Modulation {
    /// BPSK (1 bit per symbol)
    Bpsk,
    /// QPSK (2 bits per symbol)
    Qpsk,
    /// 16QAM (4 bits per symbol)
    Qam16,
    /// 64QAM (6 bits per symbol)
    Qam64,
}

impl Modulation {
    /// Returns the name of the variant.
    fn name(self) -> &'static str {
        match self {
            Modulation::Bpsk => "BPSK",
            Modulation::Qpsk => "QPSK",
            Modulation::Qam16 => "16QAM",
            Modulation::Qam64 => "64QAM",
        }
    }

    /// Returns number of bits per symbol.
    #[must_use]
    pub fn num_bits_per_symbol(self) -> usize {
        match self {
            Modulation::Bpsk => 1,
            Modulation::Qpsk => 2,
            Modulation::Qam16 => 4,
            Modulation::Qam64 => 6,
        }
    }

    /// Returns unit-energy constellation for the modulation scheme.
    ///
    /// # Errors
    ///
    /// Never returns an error in practice; the constellation sizes are all valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use softdemod::lte::Modulation;
    ///
    /// let qam16 = Modulation::Qam16.constellation()?;
    /// assert_eq!(qam16.num_points(), 16);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn constellation(self) -> Result<Constellation, Error> {
        let num_bits_per_symbol = self.num_bits_per_symbol();
        let points: Vec<Complex32> = (0 .. 1usize << num_bits_per_symbol)
            .map(|index| self.point(index))
            .collect();
        Constellation::new(&points)
    }

    /// Returns partition table matching [`Modulation::constellation`].
    ///
    /// # Errors
    ///
    /// Never returns an error in practice; the numbers of bits per symbol are all valid.
    pub fn partition_table(self) -> Result<PartitionTable, Error> {
        PartitionTable::for_index_labels(self.num_bits_per_symbol())
    }

    /// Returns constellation point carrying the bits in the binary representation of `index`.
    fn point(self, index: usize) -> Complex32 {
        let bit = |pos: usize| (index >> (self.num_bits_per_symbol() - 1 - pos)) & 1;
        let sign = |b: usize| if b == 0 { 1.0 } else { -1.0 };
        match self {
            Modulation::Bpsk => {
                let x = sign(bit(0)) * std::f32::consts::FRAC_1_SQRT_2;
                Complex32::new(x, x)
            }
            Modulation::Qpsk => {
                Complex32::new(sign(bit(0)), sign(bit(1))) * std::f32::consts::FRAC_1_SQRT_2
            }
            Modulation::Qam16 => {
                let level = |b: usize| if b == 0 { 1.0 } else { 3.0 };
                Complex32::new(sign(bit(0)) * level(bit(2)), sign(bit(1)) * level(bit(3)))
                    / 10f32.sqrt()
            }
            Modulation::Qam64 => {
                let level = |hi: usize, lo: usize| match (hi, lo) {
                    (0, 0) => 3.0,
                    (0, _) => 1.0,
                    (_, 0) => 5.0,
                    _ => 7.0,
                };
                Complex32::new(
                    sign(bit(0)) * level(bit(2), bit(4)),
                    sign(bit(1)) * level(bit(3), bit(5)),
                ) / 42f32.sqrt()
            }
        }
    }
}

impl std::fmt::Display for Modulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parameters for demapper simulation over AWGN channel
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimParams {
    /// Modulation scheme
    pub modulation: Modulation,
    /// Demapping algorithm to be used
    pub demap_algo: DemapAlgo,
    /// Ratio (dB) of symbol energy to noise power spectral density at AWGN channel output
    pub es_over_n0_db: f64,
    /// Desired minimum number of bit errors
    pub num_bit_errors_min: u32,
    /// Number of symbols to be transmitted per run
    pub num_symbols_per_run: u32,
    /// Minimum number of runs of symbols to be simulated
    pub num_runs_min: u32,
    /// Maximum number of runs of symbols to be simulated
    pub num_runs_max: u32,
}

impl SimParams {
    /// Checks validity of simulation parameters.
    fn check(&self) -> Result<(), Error> {
        if self.num_symbols_per_run == 0 {
            return Err(Error::InvalidInput(
                "Number of symbols per run cannot be zero".to_string(),
            ));
        }
        let noise_var = utils::noise_var_from_es_over_n0_db(self.es_over_n0_db);
        if !noise_var.is_normal() {
            return Err(Error::InvalidInput(format!(
                "Es/N0 of {} dB does not give a usable noise variance",
                self.es_over_n0_db
            )));
        }
        if self.num_runs_min > self.num_runs_max {
            return Err(Error::InvalidInput(format!(
                "Minimum number of runs ({}) exceeds maximum number of runs ({})",
                self.num_runs_min, self.num_runs_max
            )));
        }
        Ok(())
    }
}

/// Results from demapper simulation over AWGN channel
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimResults {
    /// Simulation parameters
    pub params: SimParams,
    /// Number of symbols transmitted
    pub num_symbols: u64,
    /// Number of bit errors after slicing the LLRs
    pub num_bit_errors: u64,
    /// Number of LLRs that were saturated
    pub num_llr_saturated: u64,
}

impl SimResults {
    /// Returns initialized simulation results.
    fn new(params: &SimParams) -> Self {
        Self {
            params: *params,
            num_symbols: 0,
            num_bit_errors: 0,
            num_llr_saturated: 0,
        }
    }

    /// Returns number of bits transmitted.
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_symbols * self.params.modulation.num_bits_per_symbol() as u64
    }

    /// Returns bit error rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ber(&self) -> f64 {
        if self.num_symbols == 0 {
            0.0
        } else {
            self.num_bit_errors as f64 / self.num_bits() as f64
        }
    }

    /// Returns `true` iff the stopping criteria for the simulation are met.
    fn run_complete(&self, num_runs: u32) -> bool {
        num_runs >= self.params.num_runs_max
            || (num_runs >= self.params.num_runs_min
                && self.num_bit_errors >= u64::from(self.params.num_bit_errors_min))
    }
}

/// Runs demapper simulations over AWGN channel for all given parameters, in parallel, and saves
/// the results to a JSON file.
///
/// # Parameters
///
/// - `all_params`: Parameters for each simulation.
///
/// - `demapper_config`: Demapper configuration (its algorithm is overridden by that of each
///   simulation).
///
/// - `json_filename`: Name of JSON file to which results must be saved.
///
/// # Returns
///
/// - `all_results`: Results of all simulations, in the order of `all_params`.
///
/// # Errors
///
/// Returns an error if any simulation parameters are invalid or if the results cannot be saved.
pub fn run_awgn_sims<P: AsRef<Path>>(
    all_params: &[SimParams],
    demapper_config: &DemapperConfig,
    json_filename: P,
) -> Result<Vec<SimResults>, Error> {
    let all_results = all_params
        .par_iter()
        .map(|params| run_awgn_sim(params, demapper_config))
        .collect::<Result<Vec<SimResults>, Error>>()?;
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, &all_results)?;
    Ok(all_results)
}

/// Runs demapper simulation over AWGN channel.
///
/// # Errors
///
/// Returns an error if the simulation parameters or the demapper configuration are invalid.
pub fn run_awgn_sim(
    params: &SimParams,
    demapper_config: &DemapperConfig,
) -> Result<SimResults, Error> {
    params.check()?;
    let demapper = Demapper::new(DemapperConfig {
        algo: params.demap_algo,
        ..*demapper_config
    })?;
    let constellation = params.modulation.constellation()?;
    let partition = params.modulation.partition_table()?;
    let num_bits_per_symbol = constellation.num_bits_per_symbol();
    let noise_var = utils::noise_var_from_es_over_n0_db(params.es_over_n0_db)
        * constellation.average_energy();
    let num_bits_per_run = params.num_symbols_per_run as usize * num_bits_per_symbol;
    let mut bits_llr = vec![0.0; num_bits_per_run];
    let mut results = SimResults::new(params);
    let mut num_runs = 0;
    while !results.run_complete(num_runs) {
        let bits = utils::random_bits(num_bits_per_run);
        let syms = utils::modulate(&bits, &constellation)?;
        let received = utils::awgn_channel(&syms, noise_var);
        let num_saturated =
            demapper.demap(&received, &constellation, &partition, noise_var, &mut bits_llr)?;
        let bits_hat = utils::llr_slicer(&bits_llr);
        results.num_symbols += u64::from(params.num_symbols_per_run);
        results.num_bit_errors += utils::error_count(&bits_hat, &bits) as u64;
        results.num_llr_saturated += num_saturated as u64;
        num_runs += 1;
    }
    info!(
        "{}, {}, Es/N0 = {:.2} dB: {} bit errors in {} bits (BER = {:.3e})",
        params.modulation,
        params.demap_algo,
        params.es_over_n0_db,
        results.num_bit_errors,
        results.num_bits(),
        results.ber()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::distance::square_dist;

    fn params_for_test() -> SimParams {
        SimParams {
            modulation: Modulation::Qam16,
            demap_algo: DemapAlgo::MaxLog,
            es_over_n0_db: 12.0,
            num_bit_errors_min: 10,
            num_symbols_per_run: 500,
            num_runs_min: 1,
            num_runs_max: 2,
        }
    }

    #[test]
    fn test_constellation() {
        for modulation in [
            Modulation::Bpsk,
            Modulation::Qpsk,
            Modulation::Qam16,
            Modulation::Qam64,
        ] {
            let constellation = modulation.constellation().unwrap();
            assert_eq!(
                constellation.num_points(),
                1 << modulation.num_bits_per_symbol()
            );
            assert_float_eq!(constellation.average_energy(), 1.0, abs <= 1e-5);
            let partition = modulation.partition_table().unwrap();
            assert_eq!(partition.num_points(), constellation.num_points());
        }
    }

    #[test]
    fn test_point() {
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let cases = [
            (Modulation::Bpsk, 0b1, Complex32::new(-s, -s)),
            (Modulation::Qpsk, 0b01, Complex32::new(s, -s)),
            (Modulation::Qpsk, 0b10, Complex32::new(-s, s)),
            (Modulation::Qam16, 0b0010, Complex32::new(3.0, 1.0) / 10f32.sqrt()),
            (Modulation::Qam16, 0b1101, Complex32::new(-1.0, -3.0) / 10f32.sqrt()),
            (Modulation::Qam64, 0b00_0001, Complex32::new(3.0, 1.0) / 42f32.sqrt()),
            (Modulation::Qam64, 0b00_1010, Complex32::new(7.0, 3.0) / 42f32.sqrt()),
            (Modulation::Qam64, 0b11_1111, Complex32::new(-7.0, -7.0) / 42f32.sqrt()),
        ];
        for (modulation, index, expected) in cases {
            assert_float_eq!(square_dist(modulation.point(index), expected), 0.0, abs <= 1e-10);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Modulation::Qam64.to_string(), "64QAM");
    }

    #[test]
    fn test_check_sim_params() {
        // Invalid input
        let params = SimParams {
            num_symbols_per_run: 0,
            ..params_for_test()
        };
        assert!(params.check().is_err());
        let params = SimParams {
            num_runs_min: 3,
            num_runs_max: 2,
            ..params_for_test()
        };
        assert!(params.check().is_err());
        for es_over_n0_db in [f64::NAN, f64::INFINITY, 500.0, -400.0] {
            let params = SimParams {
                es_over_n0_db,
                ..params_for_test()
            };
            assert!(params.check().is_err());
        }
        // Valid input
        assert!(params_for_test().check().is_ok());
        let params = SimParams {
            es_over_n0_db: -20.0,
            ..params_for_test()
        };
        assert!(params.check().is_ok());
    }

    #[test]
    fn test_run_complete() {
        let mut results = SimResults::new(&params_for_test());
        assert!(!results.run_complete(0));
        assert!(!results.run_complete(1));
        assert!(results.run_complete(2));
        results.num_bit_errors = 10;
        assert!(!results.run_complete(0));
        assert!(results.run_complete(1));
    }

    #[test]
    fn test_run_awgn_sim() {
        for demap_algo in [DemapAlgo::MaxLog, DemapAlgo::Exact] {
            let params = SimParams {
                demap_algo,
                ..params_for_test()
            };
            let results = run_awgn_sim(&params, &DemapperConfig::default()).unwrap();
            assert!(results.num_symbols == 500 || results.num_symbols == 1000);
            assert_eq!(results.num_bits(), 4 * results.num_symbols);
            // Uncoded 16QAM BER at Es/N0 = 12 dB is about 0.02
            assert!(results.ber() > 0.005 && results.ber() < 0.05);
        }
        let params = SimParams {
            num_runs_min: 5,
            ..params_for_test()
        };
        assert!(run_awgn_sim(&params, &DemapperConfig::default()).is_err());
    }

    #[test]
    fn test_run_awgn_sims() {
        let path = std::env::temp_dir().join("softdemod_test_run_awgn_sims.json");
        let all_params = [
            params_for_test(),
            SimParams {
                modulation: Modulation::Qpsk,
                es_over_n0_db: 30.0,
                ..params_for_test()
            },
        ];
        let all_results = run_awgn_sims(&all_params, &DemapperConfig::default(), &path).unwrap();
        assert_eq!(all_results.len(), 2);
        assert_eq!(all_results[0].params, all_params[0]);
        assert_eq!(all_results[1].num_bit_errors, 0);
        let saved: Vec<SimResults> =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(saved, all_results);
        std::fs::remove_file(&path).unwrap();
    }
}
