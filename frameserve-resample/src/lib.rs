//! # frameserve-resample
//!
//! Audio resampling for the PCM timeline engine. One implementation seam,
//! one linear implementation whose sample accounting is integer-exact; a
//! higher-quality kernel can slot in behind the same trait.

pub mod error;
pub mod linear;

pub use error::{ResampleError, Result};
pub use linear::LinearResampler;

/// A streaming resampler over interleaved f32 frames.
pub trait ResamplerImpl: Send {
    /// Feed source frames; returns the output frames that are fully
    /// determined so far. Input length must be a multiple of the channel
    /// count.
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Emit any output held back waiting for future source frames. Call at
    /// end of stream or end of a constant-rate run.
    fn flush(&mut self) -> Result<Vec<f32>>;

    /// Discard all state and restart at the given phase numerator.
    fn reset(&mut self, phase: u64);
}
