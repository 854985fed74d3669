//! Synthetic codec.
//!
//! Decodes the payloads produced by the synthetic container into
//! deterministic frames and sample buffers, simulating the behaviors the
//! access engines must cope with: reordering pipeline latency, delayed
//! parameter discovery (output parameters are only known after the first
//! decode call), audio decode delay, and injectable per-sample failures.

use crate::traits::{
    total_latency, AudioDecode, AudioOutputParams, DecoderFactory, DecoderRequest,
    VideoDecode, VideoOutputParams,
};
use frameserve_core::error::{CodecError, Error, Result};
use frameserve_core::frame::{Frame, FrameFlags, PixelFormat};
use frameserve_core::packet::Packet;
use frameserve_core::sample::{ChannelLayout, Sample, SampleFormat};
use frameserve_demux::synthetic::{parse_payload, SyntheticPayload};
use frameserve_demux::traits::CodecId;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Deterministic luma value of a synthetic video frame.
pub fn video_luma(presentation_number: u32) -> u8 {
    ((presentation_number * 3 + 7) % 251) as u8
}

/// Deterministic PCM value at `offset` within a synthetic audio frame.
/// Always nonzero, so silence substitution is distinguishable from decoded
/// content.
pub fn audio_sample_value(presentation_number: u32, offset: u32) -> f32 {
    0.25 + ((presentation_number.wrapping_mul(7).wrapping_add(offset)) % 100) as f32 / 1000.0
}

/// Shared call counters, readable by tests.
#[derive(Debug, Default)]
pub struct DecodeCounters {
    /// Video decode calls (including drains).
    pub video_decode_calls: AtomicU64,
    /// Audio decode calls (including drains).
    pub audio_decode_calls: AtomicU64,
    /// Video decoder instances opened.
    pub video_opens: AtomicU64,
    /// Audio decoder instances opened.
    pub audio_opens: AtomicU64,
    /// Decoder flushes.
    pub flushes: AtomicU64,
}

impl DecodeCounters {
    /// Video decode calls so far.
    pub fn video_decodes(&self) -> u64 {
        self.video_decode_calls.load(Ordering::Relaxed)
    }

    /// Audio decode calls so far.
    pub fn audio_decodes(&self) -> u64 {
        self.audio_decode_calls.load(Ordering::Relaxed)
    }

    /// Decoder opens so far (video + audio).
    pub fn opens(&self) -> u64 {
        self.video_opens.load(Ordering::Relaxed) + self.audio_opens.load(Ordering::Relaxed)
    }

    /// Flush count so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

/// Which units fail to decode, and how.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    /// Every unit fails.
    pub fail_all: bool,
    /// These decode-order sample numbers fail.
    pub fail_samples: HashSet<u32>,
    /// Report failures as hard internal errors instead of recoverable
    /// corrupt units.
    pub hard_failure: bool,
}

impl FailurePlan {
    fn check(&self, sample_number: u32) -> Result<()> {
        if self.fail_all || self.fail_samples.contains(&sample_number) {
            if self.hard_failure {
                return Err(Error::Codec(CodecError::Internal(format!(
                    "injected hard failure at sample {}",
                    sample_number
                ))));
            }
            return Err(Error::Codec(CodecError::CorruptUnit { sample_number }));
        }
        Ok(())
    }
}

/// Factory for synthetic decoders.
pub struct SyntheticDecoderFactory {
    reorder_latency: u32,
    audio_delay: u32,
    failures: FailurePlan,
    counters: Arc<DecodeCounters>,
}

impl Default for SyntheticDecoderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDecoderFactory {
    /// A factory with no latency and no failures.
    pub fn new() -> Self {
        Self {
            reorder_latency: 0,
            audio_delay: 0,
            failures: FailurePlan::default(),
            counters: Arc::new(DecodeCounters::default()),
        }
    }

    /// Set the video reordering latency. Should match the container spec's
    /// reorder delay.
    #[must_use]
    pub fn with_reorder_latency(mut self, latency: u32) -> Self {
        self.reorder_latency = latency;
        self
    }

    /// Set the audio decode delay in units.
    #[must_use]
    pub fn with_audio_delay(mut self, delay: u32) -> Self {
        self.audio_delay = delay;
        self
    }

    /// Install a failure plan.
    #[must_use]
    pub fn with_failures(mut self, failures: FailurePlan) -> Self {
        self.failures = failures;
        self
    }

    /// Shared counters handle.
    pub fn counters(&self) -> Arc<DecodeCounters> {
        Arc::clone(&self.counters)
    }
}

impl DecoderFactory for SyntheticDecoderFactory {
    fn open_video(&self, request: &DecoderRequest<'_>) -> Result<Box<dyn VideoDecode>> {
        if request.codec != CodecId::Synthetic {
            return Err(Error::Codec(CodecError::OpenFailed(format!(
                "synthetic factory cannot open {:?}",
                request.codec
            ))));
        }
        if request.extradata.len() != 8 {
            return Err(Error::Codec(CodecError::OpenFailed(
                "malformed video extradata".into(),
            )));
        }
        let width = u32::from_le_bytes(request.extradata[0..4].try_into().unwrap());
        let height = u32::from_le_bytes(request.extradata[4..8].try_into().unwrap());
        self.counters.video_opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(SyntheticVideoDecoder {
            width,
            height,
            reorder_latency: self.reorder_latency,
            hold: total_latency(self.reorder_latency, request.thread_count),
            thread_count: request.thread_count,
            queue: Vec::new(),
            params_known: false,
            failures: self.failures.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }

    fn open_audio(&self, request: &DecoderRequest<'_>) -> Result<Box<dyn AudioDecode>> {
        if request.codec != CodecId::Synthetic {
            return Err(Error::Codec(CodecError::OpenFailed(format!(
                "synthetic factory cannot open {:?}",
                request.codec
            ))));
        }
        if request.extradata.len() != 12 {
            return Err(Error::Codec(CodecError::OpenFailed(
                "malformed audio extradata".into(),
            )));
        }
        let sample_rate = u32::from_le_bytes(request.extradata[0..4].try_into().unwrap());
        let channels = u32::from_le_bytes(request.extradata[4..8].try_into().unwrap());
        let frame_length = u32::from_le_bytes(request.extradata[8..12].try_into().unwrap());
        self.counters.audio_opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(SyntheticAudioDecoder {
            sample_rate,
            channels,
            frame_length,
            delay: self.audio_delay,
            queue: VecDeque::new(),
            params_known: false,
            failures: self.failures.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct SyntheticVideoDecoder {
    width: u32,
    height: u32,
    reorder_latency: u32,
    /// Units held back before output: reorder depth plus thread latency.
    hold: u32,
    thread_count: u32,
    /// Reorder buffer keyed by composition timestamp.
    queue: Vec<(i64, Frame)>,
    params_known: bool,
    failures: FailurePlan,
    counters: Arc<DecodeCounters>,
}

impl SyntheticVideoDecoder {
    fn pop_earliest(&mut self) -> Option<Frame> {
        if self.queue.is_empty() {
            return None;
        }
        let mut min_idx = 0;
        for (i, (cts, _)) in self.queue.iter().enumerate() {
            if *cts < self.queue[min_idx].0 {
                min_idx = i;
            }
        }
        Some(self.queue.swap_remove(min_idx).1)
    }

    fn make_frame(&self, payload: &SyntheticPayload, packet: &Packet<'_>) -> Frame {
        let mut frame = Frame::new(self.width, self.height, PixelFormat::Yuv420p);
        if let Some(y) = frame.plane_mut(0) {
            y.fill(video_luma(payload.presentation_number));
        }
        if let Some(u) = frame.plane_mut(1) {
            u.fill(payload.config_index as u8);
        }
        if let Some(v) = frame.plane_mut(2) {
            v.fill(128);
        }
        frame.pts = packet.cts;
        frame.duration = packet.duration;
        if packet.is_random_access() {
            frame.flags.insert(FrameFlags::KEYFRAME);
        }
        frame
    }
}

impl VideoDecode for SyntheticVideoDecoder {
    fn decode(&mut self, packet: &Packet<'_>) -> Result<Option<Frame>> {
        self.counters.video_decode_calls.fetch_add(1, Ordering::Relaxed);
        if packet.is_empty() {
            // Drain request.
            return Ok(self.pop_earliest());
        }
        let payload = parse_payload(packet.data()).ok_or_else(|| {
            Error::Codec(CodecError::Internal("not a synthetic payload".into()))
        })?;
        self.failures.check(payload.decode_number)?;
        self.params_known = true;

        let frame = self.make_frame(&payload, packet);
        let key = packet.cts.value;
        self.queue.push((key, frame));
        if self.queue.len() > self.hold as usize {
            Ok(self.pop_earliest())
        } else {
            Ok(None)
        }
    }

    fn flush(&mut self) {
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.queue.clear();
    }

    fn reorder_latency(&self) -> u32 {
        self.reorder_latency
    }

    fn thread_latency(&self) -> u32 {
        if self.thread_count > 1 {
            self.thread_count - 1
        } else {
            0
        }
    }

    fn output_params(&self) -> Option<VideoOutputParams> {
        if !self.params_known {
            return None;
        }
        Some(VideoOutputParams {
            width: self.width,
            height: self.height,
            pixel_format: PixelFormat::Yuv420p,
        })
    }
}

struct SyntheticAudioDecoder {
    sample_rate: u32,
    channels: u32,
    frame_length: u32,
    delay: u32,
    queue: VecDeque<Sample>,
    params_known: bool,
    failures: FailurePlan,
    counters: Arc<DecodeCounters>,
}

impl AudioDecode for SyntheticAudioDecoder {
    fn decode(&mut self, packet: &Packet<'_>) -> Result<Option<Sample>> {
        self.counters.audio_decode_calls.fetch_add(1, Ordering::Relaxed);
        if packet.is_empty() {
            return Ok(self.queue.pop_front());
        }
        let payload = parse_payload(packet.data()).ok_or_else(|| {
            Error::Codec(CodecError::Internal("not a synthetic payload".into()))
        })?;
        self.failures.check(payload.decode_number)?;
        self.params_known = true;

        let layout = ChannelLayout::from_channels(self.channels);
        let mut sample = Sample::new(
            self.frame_length as usize,
            SampleFormat::F32,
            layout,
            self.sample_rate,
        );
        sample.pts = packet.cts;
        {
            let channels = self.channels as usize;
            let data = sample.data_mut();
            for i in 0..self.frame_length {
                let value = audio_sample_value(payload.presentation_number, i);
                for ch in 0..channels {
                    let base = (i as usize * channels + ch) * 4;
                    data[base..base + 4].copy_from_slice(&value.to_le_bytes());
                }
            }
        }

        self.queue.push_back(sample);
        if self.queue.len() > self.delay as usize {
            Ok(self.queue.pop_front())
        } else {
            Ok(None)
        }
    }

    fn flush(&mut self) {
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.queue.clear();
    }

    fn decode_delay(&self) -> u32 {
        self.delay
    }

    fn output_params(&self) -> Option<AudioOutputParams> {
        if !self.params_known {
            return None;
        }
        Some(AudioOutputParams {
            sample_rate: self.sample_rate,
            layout: ChannelLayout::from_channels(self.channels),
            format: SampleFormat::F32,
            frame_length: self.frame_length,
        })
    }
}
