//! Types needed in multiple modules

/// Enumeration of binary symbol values
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub enum Bit {
    /// Binary symbol `0`
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

/// Custom error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// Constellation size that is not a power of two or exceeds the supported maximum
    #[error("{0}")]
    InvalidConstellationSize(String),
    /// Noise variance that is not a positive finite number
    #[error("Noise variance must be positive and finite (found {0})")]
    InvalidNoiseVariance(f32),
    /// Bit-partition table that does not partition the constellation
    #[error("{0}")]
    InvalidPartitionTable(String),
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}
