//! Audio PCM timeline engine.
//!
//! Serves linear PCM ranges against the container's variable-length frame
//! grid. Sequential requests continue from live decoder state and the
//! buffered resampler tail; random requests invert the PCM timeline back to
//! a frame number and intra-frame offset, step backward for pre-roll, seek
//! with the same RAP/flush discipline as video, verify the first demuxed
//! packet against the index (containers land early or late), and decode
//! forward discarding source samples until the requested position.
//!
//! Resampling restarts at every timeline run boundary so cumulative output
//! counts match the per-run ceiling accounting of
//! [`PcmTimeline::total_samples`] exactly.

use crate::options::SeekSafety;
use crate::stats::TrackStats;
use frameserve_codec::manager::AudioConfigManager;
use frameserve_convert::to_f32_interleaved;
use frameserve_core::error::{CodecError, DecodeError, Error, Result};
use frameserve_core::packet::{OwnedPacket, Packet};
use frameserve_demux::index::SampleIndex;
use frameserve_demux::timeline::PcmTimeline;
use frameserve_demux::traits::ContainerReader;
use frameserve_resample::{LinearResampler, ResamplerImpl};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Post-seek verification scans this many samples on either side of the
/// expected landing point before retrying from an earlier RAP.
const VERIFY_RANGE: u32 = 16;

/// Pre-roll distance assumed when pre-roll is required heuristically but
/// the container declares none.
const IMPLICIT_PREROLL_FRAMES: u32 = 2;

/// Bounded seek-and-verify retries.
const MAX_SEEK_RETRIES: u32 = 3;

/// Upper bound on decoder drain iterations at end of stream.
const DRAIN_LIMIT: u32 = 64;

/// The per-track audio engine.
pub struct AudioEngine {
    track_id: u32,
    index: Arc<SampleIndex>,
    timeline: PcmTimeline,
    manager: AudioConfigManager,
    seek_safety: SeekSafety,
    /// Output sample rate of every delivered buffer.
    output_rate: u32,
    /// Output channel count; decoded buffers are adapted to it.
    channels: usize,
    /// First configuration uses a lossy codec (pre-roll heuristic input).
    lossy_codec: bool,
    /// The named implicit-pre-roll heuristic fired at open time.
    implicit_preroll: bool,
    resampler: Option<LinearResampler>,
    /// Resampler phase for the first run entered after a reseek.
    initial_phase: u64,
    /// Resampled output produced but not yet delivered.
    pending: Vec<f32>,
    /// Decoded source samples still to discard before the requested
    /// position (intra-frame offset plus pre-roll plus early landing).
    discard_remaining: u64,
    /// Next decode frame number the read cursor will yield.
    current_frame: u32,
    /// Frame number the next decoder *output* corresponds to. Audio
    /// decoders emit in feed order, so this lags the cursor by the decode
    /// delay; timeline-run lookups key off it, not the cursor.
    next_output_frame: u32,
    /// Timeline run the resampler is currently configured for.
    current_run: Option<usize>,
    /// Input and decoder pipeline fully drained.
    exhausted: bool,
    /// PCM position a purely sequential next request would start at.
    next_position: Option<i64>,
    ever_configured: bool,
    stats: TrackStats,
}

impl AudioEngine {
    /// Create the engine. [`initialize`](Self::initialize) must run before
    /// the first request.
    pub fn new(
        track_id: u32,
        index: Arc<SampleIndex>,
        timeline: PcmTimeline,
        manager: AudioConfigManager,
        seek_safety: SeekSafety,
        output_rate: u32,
        implicit_preroll: bool,
    ) -> Self {
        let first_audio = index
            .config_records()
            .first()
            .and_then(|(record, _)| record.audio);
        let channels = first_audio.map(|a| a.channels).unwrap_or(2).max(1) as usize;
        let lossy_codec = index
            .config_records()
            .first()
            .map(|(record, _)| record.codec.is_lossy_audio())
            .unwrap_or(false);
        Self {
            track_id,
            index,
            timeline,
            manager,
            seek_safety,
            output_rate,
            channels,
            lossy_codec,
            implicit_preroll,
            resampler: None,
            initial_phase: 0,
            pending: Vec::new(),
            discard_remaining: 0,
            current_frame: 1,
            next_output_frame: 1,
            current_run: None,
            exhausted: false,
            next_position: None,
            ever_configured: false,
            stats: TrackStats::default(),
        }
    }

    /// Activate the first configuration so open-time failures surface
    /// before any sample request.
    pub fn initialize(&mut self, reader: &mut dyn ContainerReader) -> Result<()> {
        let first_config = self
            .index
            .descriptor(1)
            .map(|d| d.config_index)
            .unwrap_or(1);
        self.activate_for(reader, first_config)
    }

    /// Output sample rate of delivered buffers.
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Output channel count of delivered buffers.
    pub fn channels(&self) -> u32 {
        self.channels as u32
    }

    /// The PCM timeline.
    pub fn timeline(&self) -> &PcmTimeline {
        &self.timeline
    }

    /// Sample index backing this engine.
    pub fn index(&self) -> &Arc<SampleIndex> {
        &self.index
    }

    /// Total PCM samples at a given output rate. Pure index arithmetic.
    pub fn total_samples(&self, output_rate: u32) -> u64 {
        self.timeline.total_samples(output_rate)
    }

    /// Accumulated statistics.
    pub fn stats(&self) -> TrackStats {
        self.stats
    }

    /// Count substituted silence (per-channel samples).
    pub fn record_silence(&mut self, samples: u64) {
        self.stats.silence_samples += samples;
    }

    /// Whether the track hit a failed reconfiguration.
    pub fn is_poisoned(&self) -> bool {
        self.manager.is_poisoned()
    }

    /// Get `length` PCM frames starting at `start`, interleaved f32 at the
    /// engine's output rate.
    ///
    /// A negative `start` prepends `-start` frames of silence before PCM
    /// position 0. The result may be shorter than requested when the track
    /// ends inside the range; the caller pads.
    pub fn get_samples(
        &mut self,
        reader: &mut dyn ContainerReader,
        start: i64,
        length: usize,
    ) -> Result<Vec<f32>> {
        if self.manager.is_poisoned() {
            return Err(Error::TrackPoisoned);
        }
        let want = length * self.channels;
        let mut out: Vec<f32> = Vec::with_capacity(want);
        let mut pos = start;

        // Negative start: silence before PCM position 0.
        if pos < 0 {
            let silent = ((-pos) as u64).min(length as u64) as usize;
            out.resize(silent * self.channels, 0.0);
            self.stats.silence_samples += silent as u64;
            pos = 0;
        }

        // Leading-silence region of the timeline (edit-list A/V gap).
        let silence_out = self.timeline.leading_silence_output(self.output_rate) as i64;
        if out.len() < want && pos < silence_out {
            let remaining_frames = (want - out.len()) / self.channels;
            let n = ((silence_out - pos) as u64).min(remaining_frames as u64) as usize;
            out.resize(out.len() + n * self.channels, 0.0);
            self.stats.silence_samples += n as u64;
            pos += n as i64;
        }

        if out.len() < want {
            let body_pos = (pos - silence_out).max(0) as u64;
            let sequential = self.next_position == Some(start)
                && (self.resampler.is_some() || self.exhausted || !self.pending.is_empty());
            if sequential {
                self.stats.fast_path_hits += 1;
                trace!(track_id = self.track_id, start, "sequential PCM continuation");
            } else {
                self.reseek(reader, body_pos)?;
            }
            self.decode_into(reader, &mut out, want)?;
        }

        self.stats.samples_delivered += (out.len() / self.channels) as u64;
        self.next_position = Some(start + length as i64);
        Ok(out)
    }

    /// Flush everything and position the pipeline at `body_pos` (output
    /// samples past the silence region), with bounded seek-and-verify
    /// retries.
    fn reseek(&mut self, reader: &mut dyn ContainerReader, body_pos: u64) -> Result<()> {
        self.manager.flush();
        self.resampler = None;
        self.pending.clear();
        self.discard_remaining = 0;
        self.current_run = None;
        self.exhausted = false;

        let Some(location) = self.timeline.locate(body_pos, self.output_rate) else {
            // Past the end of the stream.
            self.exhausted = true;
            return Ok(());
        };

        let mut start_frame = location.frame_number;
        let mut discard = location.discard;

        // Pre-roll: container-declared distance wins; otherwise a fixed
        // heuristic distance when the codec or container hints that decoder
        // priming is needed.
        let track = self.index.track();
        let declared = track.preroll_distance;
        let heuristic_needed =
            self.lossy_codec || self.implicit_preroll || self.timeline.priming() > 0;
        let distance = if declared > 0 {
            declared
        } else if heuristic_needed {
            IMPLICIT_PREROLL_FRAMES
        } else {
            0
        };
        if distance > 0 {
            let (frame, added) = self.timeline.preroll_step(start_frame, distance);
            trace!(start_frame, frame, distance, "pre-roll step");
            start_frame = frame;
            discard += added;
        }

        // Same RAP discipline as video: decode from the RAP at or before
        // the starting frame, discarding the intervening output.
        let rap = self.index.rap_at_or_before(start_frame).unwrap_or(1);
        if rap < start_frame {
            let (frame, added) = self.timeline.preroll_step(start_frame, start_frame - rap);
            start_frame = frame;
            discard += added;
        }

        debug!(
            track_id = self.track_id,
            body_pos, start_frame, discard, "audio reseek"
        );

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let desc = self
                .index
                .descriptor(start_frame)
                .ok_or_else(|| Error::invalid_param("descriptor gap"))?;
            crate::seek::seek_to_descriptor(reader, self.track_id, desc)?;
            self.stats.seeks += 1;

            let Some(first) = reader.read_next(self.track_id)? else {
                self.exhausted = true;
                return Ok(());
            };

            // The container may have landed on the wrong packet; match it
            // against recorded metadata, scanning nearby samples.
            let verified = self.index.verify_or_adjust(start_frame, &first, VERIFY_RANGE);
            match verified {
                Some(actual) if actual <= start_frame => {
                    if actual < start_frame {
                        // Early landing: the extra frames decode first and
                        // their output joins the discard run.
                        let (_, added) =
                            self.timeline.preroll_step(start_frame, start_frame - actual);
                        discard += added;
                        trace!(actual, start_frame, added, "seek landed early");
                    }
                    self.discard_remaining = discard;
                    self.initial_phase = location.phase;
                    self.current_frame = actual;
                    self.next_output_frame = actual;
                    // The verification packet is already consumed; feed it.
                    self.feed_packet(reader, &first)?;
                    self.current_frame = actual + 1;
                    return Ok(());
                }
                other => {
                    // Overshot or unidentifiable: retry from an earlier RAP.
                    warn!(
                        track_id = self.track_id,
                        start_frame,
                        landed = ?other,
                        attempt = attempts,
                        "post-seek verification failed"
                    );
                    if attempts > MAX_SEEK_RETRIES {
                        return Err(Error::Decode(DecodeError::AudioRetriesExhausted {
                            position: body_pos as i64,
                            attempts,
                        }));
                    }
                    self.stats.retries += 1;
                    if let Some(earlier) = self.index.prev_rap_before(start_frame) {
                        let (frame, added) =
                            self.timeline.preroll_step(start_frame, start_frame - earlier);
                        discard += added;
                        start_frame = frame;
                    }
                }
            }
        }
    }

    /// Decode forward, filling `out` up to `want` interleaved values.
    fn decode_into(
        &mut self,
        reader: &mut dyn ContainerReader,
        out: &mut Vec<f32>,
        want: usize,
    ) -> Result<()> {
        self.drain_pending(out, want);
        while out.len() < want && !self.exhausted {
            match reader.read_next(self.track_id)? {
                Some(packet) => {
                    let number = self
                        .index
                        .identify_packet(&packet)
                        .unwrap_or(self.current_frame);
                    self.current_frame = number + 1;
                    self.feed_packet(reader, &packet)?;
                }
                None => {
                    self.finish_stream()?;
                }
            }
            self.drain_pending(out, want);
        }
        Ok(())
    }

    /// Feed one demuxed packet through decode, channel adaptation, source
    /// discard and resampling into the pending buffer.
    fn feed_packet(&mut self, reader: &mut dyn ContainerReader, packet: &OwnedPacket) -> Result<()> {
        self.activate_for(reader, packet.config_index)?;
        let decoder = self
            .manager
            .decoder_mut()
            .ok_or_else(|| Error::Codec(CodecError::Other("no active decoder".into())))?;
        match decoder.decode(packet) {
            Ok(Some(sample)) => {
                self.manager.delay_mut().output_produced();
                self.push_decoded(sample)?;
            }
            Ok(None) => self.manager.delay_mut().fed_without_output(),
            Err(e) if e.is_recoverable() && self.seek_safety != SeekSafety::Unsafe => {
                // Substitute silence for the unit's span rather than abort.
                let number = self.next_output_frame;
                warn!(track_id = self.track_id, number, error = %e, "corrupt audio unit, substituting silence");
                self.next_output_frame += 1;
                let frames = self.timeline.frame_length(number).unwrap_or(0) as usize;
                let rate = self
                    .timeline
                    .rate_of_frame(number)
                    .unwrap_or(self.output_rate);
                self.stats.silence_samples += frames as u64;
                self.push_source(number, rate, vec![0.0; frames * self.channels])?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Number a decoded buffer by output order and route it onward.
    fn push_decoded(&mut self, sample: frameserve_core::sample::Sample) -> Result<()> {
        let number = self.next_output_frame;
        self.next_output_frame += 1;
        let data = to_f32_interleaved(&sample)?;
        let adapted = adapt_channels(data, sample.channels() as usize, self.channels);
        self.push_source(number, sample.sample_rate(), adapted)
    }

    /// Route decoded source frames through discard and the current run's
    /// resampler.
    fn push_source(&mut self, frame_number: u32, source_rate: u32, mut data: Vec<f32>) -> Result<()> {
        // Run boundary: restart resampling so per-run ceiling accounting
        // holds.
        let run = self.timeline.run_index_of(frame_number);
        if run != self.current_run {
            if let Some(resampler) = self.resampler.as_mut() {
                let tail = resampler.flush().map_err(resample_error)?;
                self.pending.extend(tail);
            }
            self.resampler = None;
            self.current_run = run;
        }

        if self.discard_remaining > 0 {
            let frames = (data.len() / self.channels) as u64;
            let drop = self.discard_remaining.min(frames);
            data.drain(..(drop as usize) * self.channels);
            self.discard_remaining -= drop;
        }
        if data.is_empty() {
            return Ok(());
        }

        if self.resampler.is_none() {
            // The first resampler after a reseek starts at the located
            // phase; later runs start at phase zero.
            let phase = std::mem::take(&mut self.initial_phase);
            self.resampler = Some(
                LinearResampler::with_phase(source_rate, self.output_rate, self.channels, phase)
                    .map_err(resample_error)?,
            );
        }
        let resampler = self.resampler.as_mut().expect("resampler just installed");
        let produced = resampler.process(&data).map_err(resample_error)?;
        self.pending.extend(produced);
        Ok(())
    }

    /// End of input: drain the decoder queue, then flush the resampler.
    fn finish_stream(&mut self) -> Result<()> {
        for _ in 0..DRAIN_LIMIT {
            let decoder = self
                .manager
                .decoder_mut()
                .ok_or_else(|| Error::Codec(CodecError::Other("no active decoder".into())))?;
            match decoder.decode(&Packet::empty()) {
                Ok(Some(sample)) => {
                    self.manager.delay_mut().output_produced();
                    self.push_decoded(sample)?;
                }
                Ok(None) => break,
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e),
            }
        }
        if let Some(resampler) = self.resampler.as_mut() {
            let tail = resampler.flush().map_err(resample_error)?;
            self.pending.extend(tail);
        }
        self.exhausted = true;
        Ok(())
    }

    fn drain_pending(&mut self, out: &mut Vec<f32>, want: usize) {
        if self.pending.is_empty() || out.len() >= want {
            return;
        }
        let take = (want - out.len()).min(self.pending.len());
        out.extend(self.pending.drain(..take));
    }

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

/// Adapt interleaved frames between channel counts: extra channels are
/// dropped, missing ones repeat the last present channel.
fn adapt_channels(data: Vec<f32>, from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return data;
    }
    let frames = data.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in 0..frames {
        let base = frame * from;
        for ch in 0..to {
            out.push(data[base + ch.min(from - 1)]);
        }
    }
    out
}

fn resample_error(e: frameserve_resample::ResampleError) -> Error {
    Error::invalid_param(e.to_string())
}
