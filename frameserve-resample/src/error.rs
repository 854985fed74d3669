//! Resampler error types.

use thiserror::Error;

/// Errors from resampler construction and processing.
#[derive(Error, Debug)]
pub enum ResampleError {
    /// Sample rate of zero.
    #[error("Invalid sample rate: {rate}")]
    InvalidSampleRate { rate: u32 },

    /// Channel count of zero.
    #[error("Invalid channel count: {count}")]
    InvalidChannelCount { count: usize },

    /// Input length is not a multiple of the channel count.
    #[error("Input length {len} is not a multiple of {channels} channels")]
    MisalignedInput { len: usize, channels: usize },
}

/// Result type alias for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;
