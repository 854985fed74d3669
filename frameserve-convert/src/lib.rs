//! # frameserve-convert
//!
//! The output adapter: mechanical pixel/sample format conversion behind a
//! static compatibility table, plus the closed set of host output sinks
//! selected at track-open time.

pub mod audio;
pub mod sink;
pub mod video;

pub use audio::{from_f32_interleaved, to_f32_interleaved};
pub use sink::{OutputLayout, OutputSink};
pub use video::{conversion_supported, FrameConverter};
