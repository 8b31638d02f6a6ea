//! Constellations and bit-partition tables
//!
//! A [`Constellation`] is an ordered set of `M` complex points, with `M` a power of two, so that
//! each point carries `B = log2(M)` coded bits. A [`PartitionTable`] lists, for each of the `B`
//! bit positions, the indices of the `M/2` points in which that bit is `0` and the indices of the
//! `M/2` points in which it is `1`.

use itertools::Itertools;
use num_complex::Complex32;

use crate::{Bit, Error};

/// Largest number of bits per symbol accepted when building tables from index labels
const MAX_INDEX_LABEL_BITS: usize = 16;

/// Ordered set of constellation points
#[derive(Clone, PartialEq, Debug)]
pub struct Constellation {
    /// Constellation points
    points: Vec<Complex32>,
    /// Number of bits per symbol
    num_bits_per_symbol: usize,
}

impl Constellation {
    /// Returns constellation with given points.
    ///
    /// # Parameters
    ///
    /// - `points`: Constellation points. The number of points must be a power of two that is at
    ///   least `2`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of points is less than `2` or is not a power of two.
    ///
    /// # Examples
    ///
    /// ```
    /// use num_complex::Complex32;
    /// use softdemod::Constellation;
    ///
    /// let bpsk = Constellation::new(&[Complex32::new(1.0, 0.0), Complex32::new(-1.0, 0.0)])?;
    /// assert_eq!(bpsk.num_points(), 2);
    /// assert_eq!(bpsk.num_bits_per_symbol(), 1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(points: &[Complex32]) -> Result<Self, Error> {
        let num_bits_per_symbol = num_bits_per_symbol(points.len())?;
        Ok(Self {
            points: points.to_vec(),
            num_bits_per_symbol,
        })
    }

    /// Returns constellation points.
    #[must_use]
    pub fn points(&self) -> &[Complex32] {
        &self.points
    }

    /// Returns number of constellation points.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Returns number of bits per symbol.
    #[must_use]
    pub fn num_bits_per_symbol(&self) -> usize {
        self.num_bits_per_symbol
    }

    /// Returns average energy of the constellation points.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_energy(&self) -> f32 {
        self.points.iter().map(Complex32::norm_sqr).sum::<f32>() / self.points.len() as f32
    }
}

/// Table of constellation point indices grouped by the value of each bit position
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PartitionTable {
    /// Number of constellation points
    num_points: usize,
    /// Number of bits per symbol
    num_bits_per_symbol: usize,
    /// Indices of points with bit `Zero`, `num_points / 2` per bit position
    zero_indices: Vec<usize>,
    /// Indices of points with bit `One`, `num_points / 2` per bit position
    one_indices: Vec<usize>,
}

impl PartitionTable {
    /// Returns partition table for a constellation of given size.
    ///
    /// # Parameters
    ///
    /// - `num_points`: Number of constellation points `M` (a power of two that is at least `2`).
    ///
    /// - `zero_sets`: For each of the `B = log2(M)` bit positions, the indices of the `M/2` points
    ///   in which that bit is `0`.
    ///
    /// - `one_sets`: For each of the `B` bit positions, the indices of the `M/2` points in which
    ///   that bit is `1`.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_points` is invalid, if either set list does not have `B` entries,
    /// or if the two sets for any bit position do not partition `[0, M)` into halves.
    ///
    /// # Examples
    ///
    /// ```
    /// use softdemod::PartitionTable;
    ///
    /// // QPSK with labels 00, 01, 10, 11 on points 0, 1, 2, 3
    /// let zero_sets = [vec![0, 1], vec![0, 2]];
    /// let one_sets = [vec![2, 3], vec![1, 3]];
    /// let table = PartitionTable::new(4, &zero_sets, &one_sets)?;
    /// assert_eq!(table.num_bits_per_symbol(), 2);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(
        num_points: usize,
        zero_sets: &[Vec<usize>],
        one_sets: &[Vec<usize>],
    ) -> Result<Self, Error> {
        let num_bits_per_symbol = num_bits_per_symbol(num_points)?;
        if zero_sets.len() != num_bits_per_symbol || one_sets.len() != num_bits_per_symbol {
            return Err(Error::InvalidPartitionTable(format!(
                "Expected {} zero-sets and one-sets for {} points (found {} and {})",
                num_bits_per_symbol,
                num_points,
                zero_sets.len(),
                one_sets.len()
            )));
        }
        let half = num_points / 2;
        let mut zero_indices = Vec::with_capacity(num_bits_per_symbol * half);
        let mut one_indices = Vec::with_capacity(num_bits_per_symbol * half);
        for (bit_pos, (zero_set, one_set)) in zero_sets.iter().zip(one_sets).enumerate() {
            if zero_set.len() != half || one_set.len() != half {
                return Err(Error::InvalidPartitionTable(format!(
                    "Bit {bit_pos}: expected {half} indices per set (found {} and {})",
                    zero_set.len(),
                    one_set.len()
                )));
            }
            if !zero_set.iter().chain(one_set).sorted_unstable().copied().eq(0 .. num_points) {
                return Err(Error::InvalidPartitionTable(format!(
                    "Bit {bit_pos}: sets {zero_set:?} and {one_set:?} do not partition [0, {num_points})"
                )));
            }
            zero_indices.extend_from_slice(zero_set);
            one_indices.extend_from_slice(one_set);
        }
        Ok(Self {
            num_points,
            num_bits_per_symbol,
            zero_indices,
            one_indices,
        })
    }

    /// Returns partition table for the labelling in which point `i` carries the binary
    /// representation of `i`, with bit position `0` being the MSB.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_bits_per_symbol` is `0` or greater than `16`.
    ///
    /// # Examples
    ///
    /// ```
    /// use softdemod::PartitionTable;
    ///
    /// let table = PartitionTable::for_index_labels(2)?;
    /// assert_eq!(table.zero_set(0), [0, 1]);
    /// assert_eq!(table.one_set(1), [1, 3]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn for_index_labels(num_bits_per_symbol: usize) -> Result<Self, Error> {
        if num_bits_per_symbol == 0 || num_bits_per_symbol > MAX_INDEX_LABEL_BITS {
            return Err(Error::InvalidConstellationSize(format!(
                "Number of bits per symbol must be in [1, {MAX_INDEX_LABEL_BITS}] (found {num_bits_per_symbol})"
            )));
        }
        let num_points = 1 << num_bits_per_symbol;
        let mut zero_sets = Vec::with_capacity(num_bits_per_symbol);
        let mut one_sets = Vec::with_capacity(num_bits_per_symbol);
        for bit_pos in 0 .. num_bits_per_symbol {
            let (zero_set, one_set): (Vec<usize>, Vec<usize>) = (0 .. num_points)
                .partition(|&index| index_label_bit(index, bit_pos, num_bits_per_symbol) == Bit::Zero);
            zero_sets.push(zero_set);
            one_sets.push(one_set);
        }
        Self::new(num_points, &zero_sets, &one_sets)
    }

    /// Returns number of constellation points the table is built for.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Returns number of bits per symbol.
    #[must_use]
    pub fn num_bits_per_symbol(&self) -> usize {
        self.num_bits_per_symbol
    }

    /// Returns indices of points in which the given bit position is `0`.
    ///
    /// # Panics
    ///
    /// Panics if `bit_pos` is not less than the number of bits per symbol.
    #[must_use]
    pub fn zero_set(&self, bit_pos: usize) -> &[usize] {
        let half = self.num_points / 2;
        &self.zero_indices[bit_pos * half .. (bit_pos + 1) * half]
    }

    /// Returns indices of points in which the given bit position is `1`.
    ///
    /// # Panics
    ///
    /// Panics if `bit_pos` is not less than the number of bits per symbol.
    #[must_use]
    pub fn one_set(&self, bit_pos: usize) -> &[usize] {
        let half = self.num_points / 2;
        &self.one_indices[bit_pos * half .. (bit_pos + 1) * half]
    }

    /// Returns table with the `0` and `1` sets of every bit position exchanged.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            num_points: self.num_points,
            num_bits_per_symbol: self.num_bits_per_symbol,
            zero_indices: self.one_indices.clone(),
            one_indices: self.zero_indices.clone(),
        }
    }

    /// Checks that the table was built for the given constellation.
    pub(crate) fn check_matches(&self, constellation: &Constellation) -> Result<(), Error> {
        if self.num_points == constellation.num_points() {
            Ok(())
        } else {
            Err(Error::InvalidPartitionTable(format!(
                "Partition table built for {} points used with constellation of {} points",
                self.num_points,
                constellation.num_points()
            )))
        }
    }
}

/// Returns value of given bit position in the index label of a constellation point.
pub(crate) fn index_label_bit(index: usize, bit_pos: usize, num_bits_per_symbol: usize) -> Bit {
    if (index >> (num_bits_per_symbol - 1 - bit_pos)) & 1 == 0 {
        Bit::Zero
    } else {
        Bit::One
    }
}

/// Returns number of bits per symbol for a constellation of given size.
fn num_bits_per_symbol(num_points: usize) -> Result<usize, Error> {
    if num_points < 2 || !num_points.is_power_of_two() {
        return Err(Error::InvalidConstellationSize(format!(
            "Number of constellation points must be a power of two that is at least 2 (found {num_points})"
        )));
    }
    Ok(num_points.trailing_zeros() as usize)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_constellation_new() {
        // Invalid input
        assert!(Constellation::new(&[]).is_err());
        assert!(Constellation::new(&[Complex32::new(1.0, 0.0)]).is_err());
        assert!(Constellation::new(&[Complex32::new(0.0, 0.0); 6]).is_err());
        // Valid input
        let constellation = Constellation::new(&[Complex32::new(0.0, 0.0); 16]).unwrap();
        assert_eq!(constellation.num_points(), 16);
        assert_eq!(constellation.num_bits_per_symbol(), 4);
    }

    #[test]
    fn test_average_energy() {
        let constellation = Constellation::new(&[
            Complex32::new(1.0, 1.0),
            Complex32::new(-1.0, 1.0),
            Complex32::new(1.0, -1.0),
            Complex32::new(-1.0, -1.0),
        ])
        .unwrap();
        assert_float_eq!(constellation.average_energy(), 2.0, abs <= 1e-6);
    }

    #[test]
    fn test_partition_table_new() {
        // Invalid input
        assert!(PartitionTable::new(3, &[vec![0]], &[vec![1]]).is_err());
        assert!(PartitionTable::new(4, &[vec![0, 1]], &[vec![2, 3]]).is_err());
        assert!(PartitionTable::new(4, &[vec![0, 1], vec![0]], &[vec![2, 3], vec![1, 3]]).is_err());
        assert!(
            PartitionTable::new(4, &[vec![0, 1], vec![0, 2]], &[vec![2, 3], vec![1, 2]]).is_err()
        );
        assert!(
            PartitionTable::new(4, &[vec![0, 1], vec![0, 4]], &[vec![2, 3], vec![1, 3]]).is_err()
        );
        // Valid input
        let table =
            PartitionTable::new(4, &[vec![3, 1], vec![0, 2]], &[vec![2, 0], vec![1, 3]]).unwrap();
        assert_eq!(table.num_points(), 4);
        assert_eq!(table.num_bits_per_symbol(), 2);
        assert_eq!(table.zero_set(0), [3, 1]);
        assert_eq!(table.one_set(0), [2, 0]);
        assert_eq!(table.zero_set(1), [0, 2]);
        assert_eq!(table.one_set(1), [1, 3]);
    }

    #[test]
    fn test_for_index_labels() {
        assert!(PartitionTable::for_index_labels(0).is_err());
        assert!(PartitionTable::for_index_labels(usize::MAX).is_err());
        let table = PartitionTable::for_index_labels(3).unwrap();
        assert_eq!(table.num_points(), 8);
        assert_eq!(table.zero_set(0), [0, 1, 2, 3]);
        assert_eq!(table.one_set(0), [4, 5, 6, 7]);
        assert_eq!(table.zero_set(1), [0, 1, 4, 5]);
        assert_eq!(table.one_set(1), [2, 3, 6, 7]);
        assert_eq!(table.zero_set(2), [0, 2, 4, 6]);
        assert_eq!(table.one_set(2), [1, 3, 5, 7]);
    }

    #[test]
    fn test_swapped() {
        let table = PartitionTable::for_index_labels(1).unwrap();
        let swapped = table.swapped();
        assert_eq!(swapped.zero_set(0), [1]);
        assert_eq!(swapped.one_set(0), [0]);
        assert_eq!(swapped.swapped(), table);
    }

    #[test]
    fn test_check_matches() {
        let table = PartitionTable::for_index_labels(2).unwrap();
        let qpsk = Constellation::new(&[Complex32::new(0.0, 0.0); 4]).unwrap();
        let psk8 = Constellation::new(&[Complex32::new(0.0, 0.0); 8]).unwrap();
        assert!(table.check_matches(&qpsk).is_ok());
        assert!(table.check_matches(&psk8).is_err());
    }

    #[test]
    fn test_index_label_bit() {
        assert_eq!(index_label_bit(0b101, 0, 3), Bit::One);
        assert_eq!(index_label_bit(0b101, 1, 3), Bit::Zero);
        assert_eq!(index_label_bit(0b101, 2, 3), Bit::One);
    }
}
