//! Codec-library boundary.
//!
//! The codec library is an external collaborator. It opens a decoder for a
//! codec identifier, parameter blob and thread count, decodes one
//! compressed unit into at most one raw unit, with an explicit
//! "no output yet" signal (`Ok(None)`) distinguishable from a decode error,
//! and reports its intrinsic pipeline latency. Decoding an empty packet
//! drains one pending unit from a filling pipeline.

use frameserve_core::error::Result;
use frameserve_core::frame::{Frame, PixelFormat};
use frameserve_core::packet::Packet;
use frameserve_core::sample::{ChannelLayout, Sample, SampleFormat};
use frameserve_demux::traits::CodecId;

/// Parameters for opening one decoder instance.
#[derive(Debug, Clone)]
pub struct DecoderRequest<'a> {
    /// Codec identifier.
    pub codec: CodecId,
    /// Codec-specific parameter blob (extradata).
    pub extradata: &'a [u8],
    /// Decode thread count. `1` disables internal threading; the
    /// configuration manager probes new configurations single-threaded
    /// because threaded decoders can delay parameter discovery.
    pub thread_count: u32,
}

/// Actual video output parameters, valid once the decoder has discovered
/// them (typically after decoding at least one unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOutputParams {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Resolved pixel format.
    pub pixel_format: PixelFormat,
}

impl VideoOutputParams {
    /// Whether the parameters are complete enough to commit to.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Actual audio output parameters, valid once discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioOutputParams {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Resolved channel layout.
    pub layout: ChannelLayout,
    /// Resolved sample format.
    pub format: SampleFormat,
    /// Samples per decoded frame, when constant.
    pub frame_length: u32,
}

impl AudioOutputParams {
    /// Whether the parameters are complete enough to commit to.
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.layout.channels() > 0
    }
}

/// One open video decoder instance.
pub trait VideoDecode: Send {
    /// Decode one compressed unit.
    ///
    /// `Ok(Some(frame))` - a frame was produced (not necessarily for this
    /// unit; reordering decoders emit in presentation order).
    /// `Ok(None)` - the unit was accepted but the pipeline is still
    /// filling; not an error.
    /// `Err(_)` - the unit failed to decode.
    ///
    /// An empty packet drains one pending frame, if any.
    fn decode(&mut self, packet: &Packet<'_>) -> Result<Option<Frame>>;

    /// Discard all pipeline state. Required after any discontinuous seek.
    fn flush(&mut self);

    /// Codec-intrinsic pipeline latency: the maximum reference-frame
    /// reordering depth.
    fn reorder_latency(&self) -> u32;

    /// Extra latency induced by internal threading.
    fn thread_latency(&self) -> u32;

    /// Discovered output parameters, once known.
    fn output_params(&self) -> Option<VideoOutputParams>;
}

/// One open audio decoder instance.
pub trait AudioDecode: Send {
    /// Decode one compressed unit into at most one sample buffer. Same
    /// output/drain semantics as [`VideoDecode::decode`].
    fn decode(&mut self, packet: &Packet<'_>) -> Result<Option<Sample>>;

    /// Discard all pipeline state.
    fn flush(&mut self);

    /// Units the decoder buffers before producing its first output.
    fn decode_delay(&self) -> u32;

    /// Discovered output parameters, once known.
    fn output_params(&self) -> Option<AudioOutputParams>;
}

/// Opens decoder instances. Implemented by integrations binding a real
/// codec library and by the synthetic codec.
pub trait DecoderFactory: Send + Sync {
    /// Open a video decoder.
    fn open_video(&self, request: &DecoderRequest<'_>) -> Result<Box<dyn VideoDecode>>;

    /// Open an audio decoder.
    fn open_audio(&self, request: &DecoderRequest<'_>) -> Result<Box<dyn AudioDecode>>;
}

/// Total pipeline delay for a decoder: the codec-reported reordering depth
/// plus the thread-induced latency when internal threading is enabled.
pub fn total_latency(reorder_latency: u32, thread_count: u32) -> u32 {
    reorder_latency + if thread_count > 1 { thread_count - 1 } else { 0 }
}
