//! # Some useful functions for simulating demapper performance
//!
//! The [`random_bits`] function returns a given number of random bits; the [`modulate`] function
//! maps bits to constellation symbols; the [`awgn_channel`] function adds complex white Gaussian
//! noise to symbols; the [`llr_slicer`] function slices LLR values to bits; and the
//! [`error_count`] function returns the number of errors in a sequence with respect to a reference
//! sequence.
//!
//! # Examples
//!
//! The code below illustrates the usage of the functions in this module.
//! ```
//! use num_complex::Complex32;
//! use softdemod::{llr_approx, utils, Constellation, PartitionTable};
//!
//! let qpsk = Constellation::new(&[
//!     Complex32::new(0.5f32.sqrt(), 0.5f32.sqrt()),
//!     Complex32::new(0.5f32.sqrt(), -(0.5f32.sqrt())),
//!     Complex32::new(-(0.5f32.sqrt()), 0.5f32.sqrt()),
//!     Complex32::new(-(0.5f32.sqrt()), -(0.5f32.sqrt())),
//! ])?;
//! let partition = PartitionTable::for_index_labels(2)?;
//! let noise_var = utils::noise_var_from_es_over_n0_db(10.0);
//! let bits = utils::random_bits(40);
//! let syms = utils::modulate(&bits, &qpsk)?;
//! let received = utils::awgn_channel(&syms, noise_var);
//! let mut bits_llr = vec![0.0; bits.len()];
//! llr_approx(&received, &qpsk, &partition, noise_var, &mut bits_llr)?;
//! let bits_hat = utils::llr_slicer(&bits_llr);
//! let err_count = utils::error_count(&bits_hat, &bits);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use num_complex::Complex32;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Bit, Constellation, Error};

/// Returns given number of random bits.
///
/// # Parameters
///
/// - `num_bits`: Number of random bits to be generated.
///
/// # Returns
///
/// - `bits`: Random bits.
#[must_use]
pub fn random_bits(num_bits: usize) -> Vec<Bit> {
    let mut rng = rand::rng();
    (0 .. num_bits)
        .map(|_| {
            if rng.random_bool(0.5) {
                Bit::One
            } else {
                Bit::Zero
            }
        })
        .collect()
}

/// Returns constellation symbols carrying given bits.
///
/// # Parameters
///
/// - `bits`: Bits to be mapped. Each group of `B` consecutive bits, with `B` the number of bits
///   per symbol, selects the constellation point whose index has that `B`-bit binary
///   representation (first bit of the group is the MSB).
///
/// - `constellation`: Constellation to which the bits are mapped.
///
/// # Returns
///
/// - `syms`: Constellation symbols, one per group of `B` bits.
///
/// # Errors
///
/// Returns an error if the number of bits is not a multiple of `B`.
pub fn modulate(bits: &[Bit], constellation: &Constellation) -> Result<Vec<Complex32>, Error> {
    let num_bits_per_symbol = constellation.num_bits_per_symbol();
    if bits.len() % num_bits_per_symbol != 0 {
        return Err(Error::InvalidInput(format!(
            "Number of bits ({}) is not a multiple of the number of bits per symbol ({})",
            bits.len(),
            num_bits_per_symbol
        )));
    }
    Ok(bits
        .chunks_exact(num_bits_per_symbol)
        .map(|chunk| {
            let index = chunk
                .iter()
                .fold(0, |acc, &bit| (acc << 1) | bit as usize);
            constellation.points()[index]
        })
        .collect())
}

/// Returns symbols at the output of a complex AWGN channel.
///
/// # Parameters
///
/// - `syms`: Symbols to be transmitted over the channel.
///
/// - `noise_var`: Total noise variance; the real and imaginary parts of the noise each have
///   variance `noise_var / 2`.
///
/// # Returns
///
/// - `received`: Transmitted symbols plus independent complex Gaussian noise.
#[must_use]
pub fn awgn_channel(syms: &[Complex32], noise_var: f32) -> Vec<Complex32> {
    let mut rng = rand::rng();
    let noise_std = (0.5 * noise_var).sqrt();
    syms.iter()
        .map(|&x| {
            let noise = Complex32::new(
                rng.sample::<f32, _>(StandardNormal),
                rng.sample::<f32, _>(StandardNormal),
            );
            x + noise * noise_std
        })
        .collect()
}

/// Returns noise variance for given Es/N0 (dB) and a constellation of unit average energy.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn noise_var_from_es_over_n0_db(es_over_n0_db: f64) -> f32 {
    10f64.powf(-0.1 * es_over_n0_db) as f32
}

/// Returns bit decisions for given LLR values.
///
/// # Parameters
///
/// - `bits_llr`: LLR values to be sliced. Nonpositive values are mapped to `Zero`, and positive
///   values to `One`.
///
/// # Returns
///
/// - `bits_hat`: Bits obtained by slicing the given LLR values.
#[must_use]
pub fn llr_slicer(bits_llr: &[f32]) -> Vec<Bit> {
    bits_llr
        .iter()
        .map(|&x| if x <= 0.0 { Bit::Zero } else { Bit::One })
        .collect()
}

/// Returns number of errors in a sequence with respect to a reference sequence.
///
/// # Parameters
///
/// - `seq`: Sequence in which errors must be counted.
///
/// - `ref_seq`: Reference sequence to which the given sequence is compared.
///
/// # Returns
///
/// - `err_count`: Number of positions in which the two sequences differ. If they are of different
///   lengths, then the longer sequence is effectively truncated to the length of the shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use Bit::{One, Zero};

    fn psk8() -> Constellation {
        let points: Vec<Complex32> = (0 .. 8u8)
            .map(|k| Complex32::from_polar(1.0, std::f32::consts::FRAC_PI_4 * f32::from(k)))
            .collect();
        Constellation::new(&points).unwrap()
    }

    #[test]
    fn test_random_bits() {
        let num_bits = 0;
        assert!(random_bits(num_bits).is_empty());
        let num_bits = 10000;
        let bits = random_bits(num_bits);
        let num_zeros = bits.iter().filter(|&b| *b == Zero).count();
        let num_ones = bits.iter().filter(|&b| *b == One).count();
        assert!(num_zeros > 9 * num_bits / 20 && num_ones > 9 * num_bits / 20);
    }

    #[test]
    fn test_modulate() {
        let constellation = psk8();
        // Invalid input
        assert!(modulate(&[One, Zero], &constellation).is_err());
        // Valid input
        assert!(modulate(&[], &constellation).unwrap().is_empty());
        let syms = modulate(&[Zero, Zero, One, One, One, Zero], &constellation).unwrap();
        assert_eq!(syms, [constellation.points()[1], constellation.points()[6]]);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_awgn_channel() {
        assert!(awgn_channel(&[], 1.0).is_empty());
        let noise_var = 0.2;
        let syms = modulate(&random_bits(30000), &psk8()).unwrap();
        let received = awgn_channel(&syms, noise_var);
        let (noise_energy_re, noise_energy_im) = received
            .iter()
            .zip(&syms)
            .map(|(y, x)| y - x)
            .fold((0.0, 0.0), |(re, im), noise| {
                (re + noise.re * noise.re, im + noise.im * noise.im)
            });
        let noise_var_est_re = noise_energy_re / syms.len() as f32;
        let noise_var_est_im = noise_energy_im / syms.len() as f32;
        assert!(noise_var_est_re > 0.09 && noise_var_est_re < 0.11);
        assert!(noise_var_est_im > 0.09 && noise_var_est_im < 0.11);
    }

    #[test]
    fn test_noise_var_from_es_over_n0_db() {
        assert_float_eq!(noise_var_from_es_over_n0_db(0.0), 1.0, abs <= 1e-7);
        assert_float_eq!(noise_var_from_es_over_n0_db(10.0), 0.1, abs <= 1e-7);
        assert_float_eq!(noise_var_from_es_over_n0_db(-3.0), 1.995_262_3, abs <= 1e-6);
    }

    #[test]
    fn test_llr_slicer() {
        assert!(llr_slicer(&[]).is_empty());
        assert_eq!(llr_slicer(&[0.0, 0.01, -0.01]), [Zero, One, Zero]);
    }

    #[test]
    fn test_error_count() {
        assert_eq!(error_count(&[], &[One, Zero]), 0);
        assert_eq!(error_count(&[One, Zero], &[]), 0);
        // Longer `seq`
        let ref_seq = [One, Zero, Zero, One, One, One, Zero, Zero];
        let seq = [One, One, Zero, Zero, One, One, Zero, Zero, Zero, One];
        assert_eq!(error_count(&seq, &ref_seq), 2);
        // Shorter `seq`
        let ref_seq = [One, Zero, Zero, One, One, One, Zero, Zero, Zero, One];
        let seq = [One, One, Zero, Zero, One, One, Zero, Zero];
        assert_eq!(error_count(&seq, &ref_seq), 2);
    }
}
