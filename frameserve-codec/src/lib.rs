//! # frameserve-codec
//!
//! The codec-library boundary and the decoder configuration lifecycle:
//! boundary traits with an explicit "no output yet" signal, configuration
//! entries whose actual output parameters are discovered by single-threaded
//! trial decoding and cached write-once, the configuration manager that
//! swaps decoders on mid-stream parameter changes, and the pipeline delay
//! counter the access engines consult.

pub mod config;
pub mod delay;
pub mod manager;
pub mod synthetic;
pub mod traits;

pub use config::{ConfigEntry, ConfigTable, ExtendedParams};
pub use delay::PipelineDelay;
pub use manager::{
    AudioConfigManager, ConfigManager, DecoderState, ManagedDecoder, VideoConfigManager,
};
pub use traits::{
    total_latency, AudioDecode, AudioOutputParams, DecoderFactory, DecoderRequest,
    VideoDecode, VideoOutputParams,
};
