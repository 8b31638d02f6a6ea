//! Squared Euclidean distances between received symbols and constellation points

use num_complex::Complex32;

use crate::Constellation;

/// Matrix of squared distances, one row of `num_points` values per received symbol
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DistanceMatrix {
    /// Number of constellation points (row length)
    num_points: usize,
    /// Distances in row-major order
    values: Vec<f32>,
}

impl DistanceMatrix {
    /// Returns empty distance matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns empty distance matrix with room for given numbers of symbols and points.
    #[must_use]
    pub fn with_capacity(num_symbols: usize, num_points: usize) -> Self {
        Self {
            num_points,
            values: Vec::with_capacity(num_symbols * num_points),
        }
    }

    /// Fills the matrix with the squared distance from each received symbol to each point of the
    /// constellation, discarding previous contents.
    ///
    /// # Examples
    ///
    /// ```
    /// use num_complex::Complex32;
    /// use softdemod::{Constellation, DistanceMatrix};
    ///
    /// let bpsk = Constellation::new(&[Complex32::new(1.0, 0.0), Complex32::new(-1.0, 0.0)])?;
    /// let mut dist = DistanceMatrix::new();
    /// dist.compute(&[Complex32::new(0.5, 0.0)], &bpsk);
    /// assert_eq!(dist.row(0), [0.25, 2.25]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn compute(&mut self, received: &[Complex32], constellation: &Constellation) {
        let points = constellation.points();
        self.num_points = points.len();
        self.values.clear();
        self.values.reserve(received.len() * points.len());
        for &sym in received {
            self.values
                .extend(points.iter().map(|&point| square_dist(sym, point)));
        }
    }

    /// Returns number of rows (received symbols).
    #[must_use]
    pub fn num_symbols(&self) -> usize {
        if self.num_points == 0 {
            0
        } else {
            self.values.len() / self.num_points
        }
    }

    /// Returns number of columns (constellation points).
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Returns distances from given received symbol to all constellation points.
    ///
    /// # Panics
    ///
    /// Panics if `sym_index` is not less than the number of rows.
    #[must_use]
    pub fn row(&self, sym_index: usize) -> &[f32] {
        &self.values[sym_index * self.num_points .. (sym_index + 1) * self.num_points]
    }

    /// Returns iterator over all rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.num_points.max(1))
    }
}

/// Returns squared Euclidean distance between two complex numbers.
#[must_use]
pub fn square_dist(x: Complex32, y: Complex32) -> f32 {
    let re = x.re - y.re;
    let im = x.im - y.im;
    re * re + im * im
}

/// Writes squared distances from one received symbol to all points into `dist`.
pub(crate) fn square_dist_to_all(sym: Complex32, points: &[Complex32], dist: &mut Vec<f32>) {
    dist.clear();
    dist.extend(points.iter().map(|&point| square_dist(sym, point)));
}
