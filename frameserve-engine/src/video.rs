//! Video frame random-access engine.
//!
//! A state machine per track. A request either continues decoding forward
//! from live decoder state (the fast path for sequential and near-sequential
//! access) or seeks: walk the RAP bitmap backward from the target's
//! decode-order position (one extra RAP for a leading target), flush the
//! decoder, seek the container, and decode forward past the target by the
//! current pipeline delay. Failures retry from progressively earlier RAPs,
//! then escalate to an error-tolerant pass, all within a fixed attempt
//! budget.

use crate::options::SeekSafety;
use crate::stats::TrackStats;
use frameserve_codec::manager::VideoConfigManager;
use frameserve_core::error::{CodecError, DecodeError, Error, IndexError, Result};
use frameserve_core::frame::{Frame, PixelFormat};
use frameserve_core::packet::Packet;
use frameserve_demux::index::SampleIndex;
use frameserve_demux::traits::ContainerReader;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Retries from progressively earlier random access points before the
/// error-tolerant escalation.
const MAX_RAP_RETRIES: u32 = 3;

/// Upper bound on drain iterations after input is exhausted.
const DRAIN_LIMIT: u32 = 64;

/// Engine state, advanced by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No request served yet.
    Idle,
    /// Locating a random access point for the current request.
    Seeking,
    /// Feeding samples toward the target.
    DecodingForward,
    /// Last request delivered; decoder state is live for the fast path.
    Delivered,
    /// Last request exhausted its retries.
    Failed,
}

/// The per-track video engine.
pub struct VideoEngine {
    track_id: u32,
    index: Arc<SampleIndex>,
    manager: VideoConfigManager,
    state: EngineState,
    seek_safety: SeekSafety,
    forward_threshold: u32,
    /// Presentation number of the last delivered frame.
    last_delivered: Option<u32>,
    /// RAP used for the last successful seek, kept for reuse diagnostics.
    last_rap: u32,
    /// Whether a configuration has ever been activated; failures after
    /// that point are mid-stream reconfiguration failures.
    ever_configured: bool,
    stats: TrackStats,
}

impl VideoEngine {
    /// Create the engine. [`initialize`](Self::initialize) must run before
    /// the first request.
    pub fn new(
        track_id: u32,
        index: Arc<SampleIndex>,
        manager: VideoConfigManager,
        seek_safety: SeekSafety,
        forward_threshold: u32,
    ) -> Self {
        Self {
            track_id,
            index,
            manager,
            state: EngineState::Idle,
            seek_safety,
            forward_threshold: forward_threshold.max(1),
            last_delivered: None,
            last_rap: 1,
            ever_configured: false,
            stats: TrackStats::default(),
        }
    }

    /// Activate the first sample's configuration so open-time failures
    /// (unsupported codec, decoder open, probe) surface before any frame
    /// request.
    pub fn initialize(&mut self, reader: &mut dyn ContainerReader) -> Result<()> {
        let first_config = self
            .index
            .descriptor(1)
            .map(|d| d.config_index)
            .unwrap_or(1);
        self.activate_for(reader, first_config)
    }

    /// Engine state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Accumulated statistics.
    pub fn stats(&self) -> TrackStats {
        self.stats
    }

    /// Count a substituted blank fallback frame.
    pub fn record_blank(&mut self) {
        self.stats.blank_frames += 1;
    }

    /// Random access point the last successful seek decoded from.
    pub fn last_rap(&self) -> u32 {
        self.last_rap
    }

    /// Whether the track hit a failed reconfiguration.
    pub fn is_poisoned(&self) -> bool {
        self.manager.is_poisoned()
    }

    /// Sample index backing this engine.
    pub fn index(&self) -> &Arc<SampleIndex> {
        &self.index
    }

    /// Output dimensions and format for the currently bound configuration,
    /// preferring probed values over nominal ones. Used for the blank
    /// fallback frame.
    pub fn output_shape(&self) -> (u32, u32, PixelFormat) {
        let entry = self
            .manager
            .current_config()
            .and_then(|i| self.manager.table().entry(i))
            .or_else(|| self.manager.table().entry(1));
        if let Some(entry) = entry {
            if let Some(probed) = entry.extended_video() {
                return (probed.width, probed.height, probed.pixel_format);
            }
            if let Some(nominal) = entry.nominal_video {
                return (nominal.width, nominal.height, PixelFormat::Yuv420p);
            }
        }
        (640, 480, PixelFormat::Yuv420p)
    }

    /// Get one frame by presentation number (1-origin).
    pub fn get_frame(
        &mut self,
        reader: &mut dyn ContainerReader,
        presentation: u32,
    ) -> Result<Frame> {
        if self.manager.is_poisoned() {
            return Err(Error::TrackPoisoned);
        }
        if presentation < 1 || presentation > self.index.sample_count() {
            return Err(Error::invalid_param(format!(
                "frame {} out of range 1..={}",
                presentation,
                self.index.sample_count()
            )));
        }
        let target_decode = self
            .index
            .decode_number_for_presentation(presentation)
            .ok_or_else(|| Error::invalid_param("presentation order gap"))?;
        let target_cts = self
            .index
            .descriptor(target_decode)
            .map(|d| d.cts)
            .ok_or_else(|| Error::invalid_param("descriptor gap"))?;

        // Fast path: the target lies a short decode-forward away from live
        // decoder state; no seek, no flush.
        if self.state == EngineState::Delivered {
            if let Some(last) = self.last_delivered {
                if presentation > last && presentation - last <= self.forward_threshold {
                    self.state = EngineState::DecodingForward;
                    match self.decode_forward(reader, None, target_decode, target_cts, false)
                    {
                        Ok(frame) => {
                            self.stats.fast_path_hits += 1;
                            return Ok(self.deliver(presentation, frame));
                        }
                        Err(e) if e.poisons_track() => {
                            self.state = EngineState::Failed;
                            return Err(e);
                        }
                        Err(e) => {
                            trace!(
                                track_id = self.track_id,
                                presentation,
                                error = %e,
                                "fast path fell back to full seek"
                            );
                        }
                    }
                }
            }
        }

        self.state = EngineState::Seeking;
        let mut rap = self.choose_rap(target_decode);
        let mut attempts = 0u32;
        let mut rap_retries = 0u32;
        loop {
            attempts += 1;
            let tolerant = self.seek_safety == SeekSafety::Aggressive;
            match self.seek_and_decode(reader, rap, target_decode, target_cts, tolerant) {
                Ok(frame) => {
                    self.last_rap = rap;
                    return Ok(self.deliver(presentation, frame));
                }
                Err(e) if e.poisons_track() => {
                    self.state = EngineState::Failed;
                    return Err(e);
                }
                Err(e) => {
                    let hard = is_hard_failure(&e);
                    warn!(
                        track_id = self.track_id,
                        presentation,
                        rap,
                        attempt = attempts,
                        hard,
                        error = %e,
                        "decode attempt failed"
                    );
                    if !hard && rap_retries < MAX_RAP_RETRIES && rap > 1 {
                        rap_retries += 1;
                        self.stats.retries += 1;
                        rap = self.index.prev_rap_before(rap).unwrap_or(1);
                        continue;
                    }
                    // Escalation: re-decode from the same RAP treating unit
                    // errors as empty output, unless forbidden.
                    if !hard && self.seek_safety != SeekSafety::Unsafe {
                        self.stats.aggressive_passes += 1;
                        attempts += 1;
                        if let Ok(frame) =
                            self.seek_and_decode(reader, rap, target_decode, target_cts, true)
                        {
                            self.last_rap = rap;
                            return Ok(self.deliver(presentation, frame));
                        }
                    }
                    self.state = EngineState::Failed;
                    return Err(Error::Decode(DecodeError::VideoRetriesExhausted {
                        frame_number: presentation,
                        attempts,
                    }));
                }
            }
        }
    }

    fn deliver(&mut self, presentation: u32, frame: Frame) -> Frame {
        self.state = EngineState::Delivered;
        self.last_delivered = Some(presentation);
        self.stats.frames_delivered += 1;
        frame
    }

    /// RAP selection: nearest at or before the target in decode order; one
    /// additional RAP back when the target is a leading sample, whose
    /// references may predate the nearer RAP.
    fn choose_rap(&self, target_decode: u32) -> u32 {
        let mut rap = self.index.rap_at_or_before(target_decode).unwrap_or(1);
        let leading = self
            .index
            .descriptor(target_decode)
            .map(|d| d.is_leading())
            .unwrap_or(false);
        if leading {
            if let Some(prev) = self.index.prev_rap_before(rap) {
                rap = prev;
            }
        }
        rap
    }

    fn seek_and_decode(
        &mut self,
        reader: &mut dyn ContainerReader,
        rap: u32,
        target_decode: u32,
        target_cts: i64,
        tolerant: bool,
    ) -> Result<Frame> {
        // Discontinuity: the reorder buffers are garbage now.
        self.manager.flush();
        self.seek_to_sample(reader, rap)?;
        self.stats.seeks += 1;
        self.state = EngineState::DecodingForward;
        debug!(
            track_id = self.track_id,
            rap, target_decode, tolerant, "decoding forward from random access point"
        );
        self.decode_forward(reader, Some(rap), target_decode, target_cts, tolerant)
    }

    fn seek_to_sample(&mut self, reader: &mut dyn ContainerReader, sample: u32) -> Result<()> {
        let desc = self
            .index
            .descriptor(sample)
            .ok_or_else(|| Error::invalid_param("descriptor gap"))?;
        crate::seek::seek_to_descriptor(reader, self.track_id, desc)
    }

    /// Feed samples in decode order until the target frame emerges.
    ///
    /// `align_to` skips packets before the chosen RAP (imprecise seeks land
    /// early) and rejects overshoot. Feeding runs to the target's
    /// decode-order position plus the current pipeline delay, then the
    /// pipeline is drained.
    fn decode_forward(
        &mut self,
        reader: &mut dyn ContainerReader,
        align_to: Option<u32>,
        target_decode: u32,
        target_cts: i64,
        tolerant: bool,
    ) -> Result<Frame> {
        let mut aligned = align_to.is_none();
        let mut fed = 0u32;
        loop {
            if aligned && fed >= target_decode + self.manager.delay().outstanding() && fed > 0 {
                break;
            }
            let packet = match reader.read_next(self.track_id)? {
                Some(p) => p,
                None => break,
            };
            let number = self.index.identify_packet(&packet).unwrap_or(fed + 1);
            if !aligned {
                let start = align_to.unwrap_or(1);
                if number < start {
                    trace!(number, start, "skipping pre-RAP packet");
                    continue;
                }
                if number > start {
                    return Err(Error::Index(IndexError::SeekFailed(format!(
                        "seek landed at sample {} past random access point {}",
                        number, start
                    ))));
                }
                aligned = true;
            }
            fed = number;
            if let Some(frame) = self.feed_packet(reader, &packet, target_cts, tolerant)? {
                return Ok(frame);
            }
        }

        // The target may still sit in the reorder queue.
        for _ in 0..DRAIN_LIMIT {
            let decoder = self
                .manager
                .decoder_mut()
                .ok_or_else(|| Error::Codec(CodecError::Other("no active decoder".into())))?;
            match decoder.decode(&Packet::empty()) {
                Ok(Some(frame)) => {
                    self.manager.delay_mut().output_produced();
                    if frame.pts.value == target_cts {
                        return Ok(frame);
                    }
                    if frame.pts.value > target_cts {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) if tolerant && e.is_recoverable() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::Codec(CodecError::Other(
            "no picture produced for target frame".into(),
        )))
    }

    /// Feed one packet; returns the target frame if it emerged.
    fn feed_packet(
        &mut self,
        reader: &mut dyn ContainerReader,
        packet: &Packet<'_>,
        target_cts: i64,
        tolerant: bool,
    ) -> Result<Option<Frame>> {
        self.activate_for(reader, packet.config_index)?;
        let decoder = self
            .manager
            .decoder_mut()
            .ok_or_else(|| Error::Codec(CodecError::Other("no active decoder".into())))?;
        match decoder.decode(packet) {
            Ok(Some(frame)) => {
                self.manager.delay_mut().output_produced();
                if frame.pts.value == target_cts {
                    Ok(Some(frame))
                } else if frame.pts.value > target_cts {
                    Err(Error::Codec(CodecError::Other(
                        "decoder skipped past target frame".into(),
                    )))
                } else {
                    Ok(None)
                }
            }
            Ok(None) => {
                self.manager.delay_mut().fed_without_output();
                Ok(None)
            }
            Err(e) if tolerant && e.is_recoverable() => {
                // Aggressive mode: a corrupt unit counts as empty output.
                self.manager.delay_mut().fed_without_output();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Activate a configuration, classifying failures: before the first
    /// successful activation they are open failures; afterwards they are
    /// mid-stream reconfiguration failures and poison the track.
    fn activate_for(&mut self, reader: &mut dyn ContainerReader, config_index: u32) -> Result<()> {
        if self.manager.current_config() == Some(config_index) {
            return Ok(());
        }
        let switching = self.ever_configured;
        match self.manager.activate(config_index, reader) {
            Ok(()) => {
                if switching {
                    self.stats.reconfigurations += 1;
                }
                self.ever_configured = true;
                Ok(())
            }
            Err(e) if switching => {
                self.manager.poison();
                Err(Error::Codec(CodecError::ReconfigurationFailed(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }
}

/// A failure that must not be retried from another random access point.
fn is_hard_failure(e: &Error) -> bool {
    matches!(e, Error::Codec(CodecError::Internal(_)) | Error::Io(_))
}
