//! Source options: the marshaling-friendly configuration surface.
//!
//! Host adapters hand configuration across their plugin boundaries as
//! plain serializable data; these types are that surface, converted into
//! engine options at open time.

use frameserve_core::sample::SampleFormat;
use frameserve_engine::{SeekSafety, SinkKind, TrackOptions};
use serde::{Deserialize, Serialize};

/// Retry escalation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekMode {
    /// RAP walk-back plus an error-tolerant escalation pass (default).
    #[default]
    Safe,
    /// Error-tolerant from the first attempt.
    Aggressive,
    /// No error tolerance; fail after the RAP retries.
    Unsafe,
}

/// Delivered audio sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 32-bit.
    S32,
    /// 32-bit float (default).
    #[default]
    F32,
}

/// Video output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOutput {
    /// The decoded frame untouched (default).
    #[default]
    Native,
    /// Packed BGRA rows, top-down.
    PackedBgra,
    /// Packed BGRA rows, bottom-up.
    PackedBgraFlipped,
    /// Planar YUV 4:2:0.
    PlanarYuv,
}

/// Options for opening a media source, builder style.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Decoder thread count for production decoding.
    pub threads: u32,
    /// Frames ahead of the last delivered frame still served by decoding
    /// forward without a seek.
    pub forward_seek_threshold: u32,
    /// Retry escalation policy.
    pub seek_mode: SeekMode,
    /// Apply the named `iTunSMPB` priming heuristic.
    pub apply_itunes_priming: bool,
    /// Requested audio output rate; source rate when unset.
    pub audio_sample_rate: Option<u32>,
    /// Delivered audio sample format.
    pub audio_format: AudioFormat,
    /// Video output shape.
    pub video_output: VideoOutput,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceOptions {
    /// Defaults: single-threaded decode, 16-frame forward window, safe
    /// seeking, priming heuristic on, native video, f32 audio at the
    /// source rate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: 1,
            forward_seek_threshold: 16,
            seek_mode: SeekMode::Safe,
            apply_itunes_priming: true,
            audio_sample_rate: None,
            audio_format: AudioFormat::F32,
            video_output: VideoOutput::Native,
        }
    }

    /// Set the decoder thread count.
    #[must_use]
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the forward-seek threshold.
    #[must_use]
    pub fn forward_seek_threshold(mut self, frames: u32) -> Self {
        self.forward_seek_threshold = frames;
        self
    }

    /// Set the retry escalation policy.
    #[must_use]
    pub fn seek_mode(mut self, mode: SeekMode) -> Self {
        self.seek_mode = mode;
        self
    }

    /// Enable or disable the priming heuristic.
    #[must_use]
    pub fn itunes_priming(mut self, apply: bool) -> Self {
        self.apply_itunes_priming = apply;
        self
    }

    /// Request an audio output rate.
    #[must_use]
    pub fn audio_sample_rate(mut self, rate: u32) -> Self {
        self.audio_sample_rate = Some(rate);
        self
    }

    /// Set the delivered audio format.
    #[must_use]
    pub fn audio_format(mut self, format: AudioFormat) -> Self {
        self.audio_format = format;
        self
    }

    /// Set the video output shape.
    #[must_use]
    pub fn video_output(mut self, output: VideoOutput) -> Self {
        self.video_output = output;
        self
    }

    /// Lower into engine options.
    pub(crate) fn track_options(&self) -> TrackOptions {
        TrackOptions {
            thread_count: self.threads.max(1),
            forward_seek_threshold: self.forward_seek_threshold,
            seek_safety: match self.seek_mode {
                SeekMode::Safe => SeekSafety::Safe,
                SeekMode::Aggressive => SeekSafety::Aggressive,
                SeekMode::Unsafe => SeekSafety::Unsafe,
            },
            itunes_priming_heuristic: self.apply_itunes_priming,
            output_sample_rate: self.audio_sample_rate,
            audio_format: match self.audio_format {
                AudioFormat::U8 => SampleFormat::U8,
                AudioFormat::S16 => SampleFormat::S16,
                AudioFormat::S32 => SampleFormat::S32,
                AudioFormat::F32 => SampleFormat::F32,
            },
            sink: match self.video_output {
                VideoOutput::Native => SinkKind::Native,
                VideoOutput::PackedBgra => SinkKind::PackedBgra { bottom_up: false },
                VideoOutput::PackedBgraFlipped => SinkKind::PackedBgra { bottom_up: true },
                VideoOutput::PlanarYuv => SinkKind::PlanarYuv,
            },
        }
    }
}
