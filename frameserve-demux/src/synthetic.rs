//! Scriptable in-memory container.
//!
//! Implements the [`ContainerReader`] boundary over generated sample
//! tables: configurable random-access-point spacing, frame reordering
//! depth, mid-stream configuration changes, variable audio frame lengths
//! and sample rates, deliberate seek imprecision, and timeline-construction
//! failure. Payloads carry their own sample identity so the synthetic
//! decoder can reproduce deterministic content; tests and demos drive the
//! full pipeline against it without touching a real file.

use crate::traits::{
    CodecId, ConfigRecord, ContainerReader, HandlerType, NominalAudioParams,
    NominalVideoParams, SampleMetadata, SeekBasis, SeekOutcome, SeekRequest,
    TrackDescription,
};
use frameserve_core::error::{Error, IndexError, Result};
use frameserve_core::packet::{OwnedPacket, Packet, PacketFlags};
use frameserve_core::timestamp::{Duration, TimeBase, Timestamp};

/// Magic prefix of every synthetic payload.
const PAYLOAD_MAGIC: &[u8; 4] = b"FSYN";
/// Fixed payload size.
pub const PAYLOAD_SIZE: usize = 20;
/// Byte offset of the first sample in the virtual file.
const FIRST_SAMPLE_OFFSET: u64 = 4096;

/// Identity carried inside a synthetic payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticPayload {
    /// Track the sample belongs to.
    pub track_id: u32,
    /// Decode-order sample number, 1-origin.
    pub decode_number: u32,
    /// Presentation-order sample number, 1-origin.
    pub presentation_number: u32,
    /// Configuration index, 1-origin.
    pub config_index: u32,
}

/// Encode a synthetic payload.
pub fn encode_payload(p: &SyntheticPayload) -> Vec<u8> {
    let mut data = Vec::with_capacity(PAYLOAD_SIZE);
    data.extend_from_slice(PAYLOAD_MAGIC);
    data.extend_from_slice(&p.track_id.to_le_bytes());
    data.extend_from_slice(&p.decode_number.to_le_bytes());
    data.extend_from_slice(&p.presentation_number.to_le_bytes());
    data.extend_from_slice(&p.config_index.to_le_bytes());
    data
}

/// Decode a synthetic payload. `None` if the data is not one.
pub fn parse_payload(data: &[u8]) -> Option<SyntheticPayload> {
    if data.len() != PAYLOAD_SIZE || &data[0..4] != PAYLOAD_MAGIC {
        return None;
    }
    let word = |i: usize| -> Option<u32> { Some(u32::from_le_bytes(data[i..i + 4].try_into().ok()?)) };
    Some(SyntheticPayload {
        track_id: u32::from_le_bytes(data[4..8].try_into().ok()?),
        decode_number: word(8)?,
        presentation_number: word(12)?,
        config_index: word(16)?,
    })
}

/// Synthetic video extradata: width and height, little endian.
pub fn video_extradata(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(8);
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data
}

/// Synthetic audio extradata: sample rate, channels, frame length.
pub fn audio_extradata(sample_rate: u32, channels: u32, frame_length: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&sample_rate.to_le_bytes());
    data.extend_from_slice(&channels.to_le_bytes());
    data.extend_from_slice(&frame_length.to_le_bytes());
    data
}

/// One video configuration span.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticVideoConfig {
    /// First decode-order sample using this configuration.
    pub first_frame: u32,
    /// Coded width.
    pub width: u32,
    /// Coded height.
    pub height: u32,
}

/// Specification of a synthetic video track.
#[derive(Debug, Clone)]
pub struct SyntheticVideoTrackSpec {
    /// Track identifier.
    pub track_id: u32,
    /// Media timescale.
    pub timescale: u32,
    /// Constant per-frame duration in timescale units.
    pub frame_duration: u32,
    /// Total frame count.
    pub frames: u32,
    /// Random access point spacing in presentation numbers; `0` makes every
    /// frame a RAP. Frame 1 is always a RAP.
    pub rap_interval: u32,
    /// Frame reordering depth. `0` means presentation order equals decode
    /// order.
    pub reorder_delay: u32,
    /// Configuration spans; the first must start at frame 1.
    pub configs: Vec<SyntheticVideoConfig>,
}

impl SyntheticVideoTrackSpec {
    /// A plain constant-rate track with a single configuration.
    pub fn simple(track_id: u32, frames: u32, rap_interval: u32) -> Self {
        Self {
            track_id,
            timescale: 30,
            frame_duration: 1,
            frames,
            rap_interval,
            reorder_delay: 0,
            configs: vec![SyntheticVideoConfig {
                first_frame: 1,
                width: 320,
                height: 240,
            }],
        }
    }
}

/// One audio configuration span.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticAudioConfig {
    /// First frame using this configuration.
    pub first_frame: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u32,
    /// Samples per frame at the source rate.
    pub frame_length: u32,
}

/// Specification of a synthetic audio track.
#[derive(Debug, Clone)]
pub struct SyntheticAudioTrackSpec {
    /// Track identifier.
    pub track_id: u32,
    /// Media timescale. Frame durations are derived as
    /// `frame_length * timescale / sample_rate`; pick combinations that
    /// divide evenly.
    pub timescale: u32,
    /// Total frame count.
    pub frames: u32,
    /// RAP spacing; `0` makes every frame a RAP (the audio norm).
    pub rap_interval: u32,
    /// Priming samples reported by the container.
    pub priming_samples: u32,
    /// Leading silence reported by the container, in source samples.
    pub leading_silence: u64,
    /// Container-declared pre-roll distance in frames.
    pub preroll_distance: u32,
    /// Configuration spans; the first must start at frame 1.
    pub configs: Vec<SyntheticAudioConfig>,
}

impl SyntheticAudioTrackSpec {
    /// A single-configuration track.
    pub fn simple(track_id: u32, frames: u32, sample_rate: u32, frame_length: u32) -> Self {
        Self {
            track_id,
            timescale: sample_rate,
            frames,
            rap_interval: 0,
            priming_samples: 0,
            leading_silence: 0,
            preroll_distance: 0,
            configs: vec![SyntheticAudioConfig {
                first_frame: 1,
                sample_rate,
                channels: 2,
                frame_length,
            }],
        }
    }
}

struct SyntheticTrack {
    desc: TrackDescription,
    samples: Vec<SampleMetadata>,
    configs: Vec<ConfigRecord>,
    cursor: u32,
    timeline_built: bool,
    fail_timeline: bool,
}

/// Builder for [`SyntheticContainer`].
#[derive(Default)]
pub struct SyntheticContainerBuilder {
    video: Vec<SyntheticVideoTrackSpec>,
    audio: Vec<SyntheticAudioTrackSpec>,
    seek_slack: u32,
    dts_seek_supported: bool,
    failing_timelines: Vec<u32>,
    metadata: Vec<(String, String)>,
}

impl SyntheticContainerBuilder {
    /// Add a video track.
    #[must_use]
    pub fn video(mut self, spec: SyntheticVideoTrackSpec) -> Self {
        self.video.push(spec);
        self
    }

    /// Add an audio track.
    #[must_use]
    pub fn audio(mut self, spec: SyntheticAudioTrackSpec) -> Self {
        self.audio.push(spec);
        self
    }

    /// Make seeks land `slack` samples before the requested position, the
    /// way imprecise real-world seeks do.
    #[must_use]
    pub fn seek_slack(mut self, slack: u32) -> Self {
        self.seek_slack = slack;
        self
    }

    /// Refuse timestamp-based seeks so callers must fall back to byte
    /// offsets.
    #[must_use]
    pub fn without_dts_seek(mut self) -> Self {
        self.dts_seek_supported = false;
        self
    }

    /// Make timeline construction fail for the given track.
    #[must_use]
    pub fn failing_timeline(mut self, track_id: u32) -> Self {
        self.failing_timelines.push(track_id);
        self
    }

    /// Attach a container-level metadata tag.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Build the container.
    pub fn build(self) -> SyntheticContainer {
        let mut tracks = Vec::new();
        for spec in &self.video {
            let mut track = build_video_track(spec);
            track.fail_timeline = self.failing_timelines.contains(&spec.track_id);
            tracks.push(track);
        }
        for spec in &self.audio {
            let mut track = build_audio_track(spec);
            track.fail_timeline = self.failing_timelines.contains(&spec.track_id);
            tracks.push(track);
        }
        SyntheticContainer {
            tracks,
            seek_slack: self.seek_slack,
            dts_seek_supported: self.dts_seek_supported,
            metadata: self.metadata,
        }
    }
}

/// In-memory [`ContainerReader`] implementation.
pub struct SyntheticContainer {
    tracks: Vec<SyntheticTrack>,
    seek_slack: u32,
    dts_seek_supported: bool,
    metadata: Vec<(String, String)>,
}

impl SyntheticContainer {
    /// Start building a container.
    pub fn builder() -> SyntheticContainerBuilder {
        SyntheticContainerBuilder {
            dts_seek_supported: true,
            ..Default::default()
        }
    }

    fn track_mut(&mut self, track_id: u32) -> Result<&mut SyntheticTrack> {
        self.tracks
            .iter_mut()
            .find(|t| t.desc.track_id == track_id)
            .ok_or_else(|| Error::TrackNotFound(format!("track id {}", track_id)))
    }

    fn track_ref(&self, track_id: u32) -> Result<&SyntheticTrack> {
        self.tracks
            .iter()
            .find(|t| t.desc.track_id == track_id)
            .ok_or_else(|| Error::TrackNotFound(format!("track id {}", track_id)))
    }

    fn packet_for(&self, track: &SyntheticTrack, number: u32) -> OwnedPacket {
        let meta = &track.samples[(number - 1) as usize];
        let time_base = TimeBase::media(track.desc.timescale);
        // Presentation number rides in the payload so the synthetic decoder
        // can regenerate deterministic content.
        let presentation = presentation_of(track, number);
        let mut packet = Packet::new(encode_payload(&SyntheticPayload {
            track_id: track.desc.track_id,
            decode_number: number,
            presentation_number: presentation,
            config_index: meta.config_index,
        }));
        packet.track_id = track.desc.track_id;
        packet.sample_number = number;
        packet.dts = Timestamp::new(meta.dts, time_base);
        packet.cts = Timestamp::new(meta.cts, time_base);
        packet.duration = Duration::new(meta.duration as i64, time_base);
        packet.byte_offset = Some(meta.byte_offset);
        packet.config_index = meta.config_index;
        if meta.is_random_access {
            packet.flags.insert(PacketFlags::RANDOM_ACCESS);
        }
        if meta.is_leading {
            packet.flags.insert(PacketFlags::LEADING);
        }
        packet
    }
}

fn presentation_of(track: &SyntheticTrack, decode_number: u32) -> u32 {
    // Recover the presentation number from the stored cts grid.
    let meta = &track.samples[(decode_number - 1) as usize];
    if track.desc.handler == HandlerType::Audio {
        return decode_number;
    }
    let dur = meta.duration.max(1) as i64;
    let base: i64 = track.samples.iter().map(|s| s.cts).min().unwrap_or(0);
    ((meta.cts - base) / dur) as u32 + 1
}

impl ContainerReader for SyntheticContainer {
    fn track_count(&self) -> u32 {
        self.tracks.len() as u32
    }

    fn track_by_position(&self, position: u32) -> Option<&TrackDescription> {
        self.tracks.get(position as usize).map(|t| &t.desc)
    }

    fn track(&self, track_id: u32) -> Option<&TrackDescription> {
        self.tracks
            .iter()
            .find(|t| t.desc.track_id == track_id)
            .map(|t| &t.desc)
    }

    fn construct_timeline(&mut self, track_id: u32) -> Result<()> {
        let track = self.track_mut(track_id)?;
        if track.fail_timeline {
            return Err(Error::Index(IndexError::TimelineConstruction {
                track_id,
                message: "synthetic timeline failure".into(),
            }));
        }
        track.timeline_built = true;
        Ok(())
    }

    fn sample_metadata(&self, track_id: u32, sample_number: u32) -> Result<SampleMetadata> {
        let track = self.track_ref(track_id)?;
        track
            .samples
            .get((sample_number.max(1) - 1) as usize)
            .copied()
            .ok_or_else(|| {
                Error::Index(IndexError::MetadataRead {
                    sample_number,
                    message: "sample out of range".into(),
                })
            })
    }

    fn sample_payload(&mut self, track_id: u32, sample_number: u32) -> Result<OwnedPacket> {
        let track = self.track_ref(track_id)?;
        if sample_number < 1 || sample_number > track.samples.len() as u32 {
            return Err(Error::Index(IndexError::MetadataRead {
                sample_number,
                message: "sample out of range".into(),
            }));
        }
        Ok(self.packet_for(track, sample_number))
    }

    fn config_count(&self, track_id: u32) -> u32 {
        self.track_ref(track_id)
            .map(|t| t.configs.len() as u32)
            .unwrap_or(0)
    }

    fn config_record(&self, track_id: u32, config_index: u32) -> Result<ConfigRecord> {
        let track = self.track_ref(track_id)?;
        track
            .configs
            .get((config_index.max(1) - 1) as usize)
            .cloned()
            .ok_or_else(|| {
                Error::Index(IndexError::Other(format!(
                    "no configuration record {}",
                    config_index
                )))
            })
    }

    fn seek(&mut self, request: SeekRequest) -> Result<SeekOutcome> {
        let slack = self.seek_slack;
        let dts_supported = self.dts_seek_supported;
        let track = self.track_mut(request.track_id)?;

        let target = match request.basis {
            SeekBasis::DecodeTime(t) => {
                if !dts_supported {
                    return Err(Error::Index(IndexError::SeekBasisUnsupported));
                }
                last_at_or_before(&track.samples, |s| s.dts <= t)
            }
            SeekBasis::ByteOffset(o) => {
                last_at_or_before(&track.samples, |s| s.byte_offset <= o)
            }
            SeekBasis::CompositionTime(_) => {
                return Err(Error::Index(IndexError::SeekBasisUnsupported));
            }
        };
        let mut landed = target.ok_or_else(|| {
            Error::Index(IndexError::SeekFailed("no sample at or before target".into()))
        })?;

        if !request.any_sample {
            // Containers snap non-keyframe seeks to the preceding RAP.
            while landed > 1 && !track.samples[(landed - 1) as usize].is_random_access {
                landed -= 1;
            }
        }
        // Imprecision: land early by the configured slack.
        landed = landed.saturating_sub(slack).max(1);
        track.cursor = landed;
        Ok(SeekOutcome {
            landed_sample: Some(landed),
        })
    }

    fn read_next(&mut self, track_id: u32) -> Result<Option<OwnedPacket>> {
        let track = self.track_ref(track_id)?;
        let cursor = track.cursor;
        if cursor < 1 || cursor > track.samples.len() as u32 {
            return Ok(None);
        }
        let packet = self.packet_for(track, cursor);
        self.track_mut(track_id)?.cursor = cursor + 1;
        Ok(Some(packet))
    }

    fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }
}

fn last_at_or_before(
    samples: &[SampleMetadata],
    pred: impl Fn(&SampleMetadata) -> bool,
) -> Option<u32> {
    let mut found = None;
    for s in samples {
        if pred(s) {
            found = Some(s.sample_number);
        } else {
            break;
        }
    }
    found
}

/// Decode-order presentation permutation for a reordering track.
///
/// Frame 1 stands alone; afterwards each group of `delay + 1` presentation
/// frames is emitted future-frame first, the way a reference frame precedes
/// the frames that depend on it.
fn decode_order_presentation(frames: u32, delay: u32) -> Vec<u32> {
    if delay == 0 {
        return (1..=frames).collect();
    }
    let mut order = Vec::with_capacity(frames as usize);
    if frames >= 1 {
        order.push(1);
    }
    let group = delay + 1;
    let mut p = 2u32;
    while p <= frames {
        let m = group.min(frames - p + 1);
        order.push(p + m - 1);
        for b in 0..m - 1 {
            order.push(p + b);
        }
        p += m;
    }
    order
}

fn config_index_for(first_frames: &[u32], number: u32) -> u32 {
    let mut idx = 1u32;
    for (i, &first) in first_frames.iter().enumerate() {
        if number >= first {
            idx = i as u32 + 1;
        }
    }
    idx
}

fn build_video_track(spec: &SyntheticVideoTrackSpec) -> SyntheticTrack {
    assert!(!spec.configs.is_empty(), "at least one configuration required");
    assert_eq!(spec.configs[0].first_frame, 1, "first configuration starts at frame 1");

    let order = decode_order_presentation(spec.frames, spec.reorder_delay);
    let first_frames: Vec<u32> = spec.configs.iter().map(|c| c.first_frame).collect();
    let dur = spec.frame_duration.max(1);

    let mut samples = Vec::with_capacity(spec.frames as usize);
    let mut last_rap_presentation = 1u32;
    for (pos, &presentation) in order.iter().enumerate() {
        let decode_number = pos as u32 + 1;
        let is_rap = presentation == 1
            || (spec.rap_interval == 0)
            || (spec.rap_interval > 0 && (presentation - 1) % spec.rap_interval == 0);
        if is_rap {
            last_rap_presentation = presentation;
        }
        // Leading: presentation precedes the RAP this sample follows in
        // decode order.
        let is_leading = !is_rap && presentation < last_rap_presentation;

        samples.push(SampleMetadata {
            sample_number: decode_number,
            dts: (decode_number as i64 - 1) * dur as i64,
            cts: (presentation as i64 - 1 + spec.reorder_delay as i64) * dur as i64,
            byte_offset: FIRST_SAMPLE_OFFSET + (decode_number as u64 - 1) * PAYLOAD_SIZE as u64,
            duration: dur,
            is_random_access: is_rap,
            is_leading,
            config_index: config_index_for(&first_frames, decode_number),
        });
    }

    let configs = spec
        .configs
        .iter()
        .map(|c| ConfigRecord {
            codec: CodecId::Synthetic,
            extradata: video_extradata(c.width, c.height),
            video: Some(NominalVideoParams {
                width: c.width,
                height: c.height,
            }),
            audio: None,
        })
        .collect();

    SyntheticTrack {
        desc: TrackDescription {
            track_id: spec.track_id,
            handler: HandlerType::Video,
            timescale: spec.timescale,
            sample_count: spec.frames,
            priming_samples: 0,
            leading_silence: 0,
            preroll_distance: 0,
        },
        samples,
        configs,
        cursor: 1,
        timeline_built: false,
        fail_timeline: false,
    }
}

fn build_audio_track(spec: &SyntheticAudioTrackSpec) -> SyntheticTrack {
    assert!(!spec.configs.is_empty(), "at least one configuration required");
    assert_eq!(spec.configs[0].first_frame, 1, "first configuration starts at frame 1");

    let first_frames: Vec<u32> = spec.configs.iter().map(|c| c.first_frame).collect();
    let mut samples = Vec::with_capacity(spec.frames as usize);
    let mut ts = 0i64;
    for number in 1..=spec.frames {
        let config_index = config_index_for(&first_frames, number);
        let config = &spec.configs[(config_index - 1) as usize];
        let duration =
            (config.frame_length as u64 * spec.timescale as u64 / config.sample_rate as u64) as u32;
        let is_rap = spec.rap_interval == 0 || (number - 1) % spec.rap_interval == 0;

        samples.push(SampleMetadata {
            sample_number: number,
            dts: ts,
            cts: ts,
            byte_offset: FIRST_SAMPLE_OFFSET + (number as u64 - 1) * PAYLOAD_SIZE as u64,
            duration,
            is_random_access: is_rap,
            is_leading: false,
            config_index,
        });
        ts += duration as i64;
    }

    let configs = spec
        .configs
        .iter()
        .map(|c| ConfigRecord {
            codec: CodecId::Synthetic,
            extradata: audio_extradata(c.sample_rate, c.channels, c.frame_length),
            video: None,
            audio: Some(NominalAudioParams {
                sample_rate: c.sample_rate,
                channels: c.channels,
                bits_per_sample: 32,
            }),
        })
        .collect();

    SyntheticTrack {
        desc: TrackDescription {
            track_id: spec.track_id,
            handler: HandlerType::Audio,
            timescale: spec.timescale,
            sample_count: spec.frames,
            priming_samples: spec.priming_samples,
            leading_silence: spec.leading_silence,
            preroll_distance: spec.preroll_distance,
        },
        samples,
        configs,
        cursor: 1,
        timeline_built: false,
        fail_timeline: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let p = SyntheticPayload {
            track_id: 1,
            decode_number: 42,
            presentation_number: 44,
            config_index: 2,
        };
        assert_eq!(parse_payload(&encode_payload(&p)), Some(p));
        assert_eq!(parse_payload(b"not a payload"), None);
    }

    #[test]
    fn test_decode_order_without_reordering() {
        assert_eq!(decode_order_presentation(5, 0), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_order_with_reordering() {
        // delay 2: groups of three after the opening frame, future first.
        assert_eq!(
            decode_order_presentation(8, 2),
            vec![1, 4, 2, 3, 7, 5, 6, 8]
        );
    }

    #[test]
    fn test_video_track_rap_and_leading_flags() {
        let spec = SyntheticVideoTrackSpec {
            reorder_delay: 2,
            rap_interval: 3,
            frames: 8,
            ..SyntheticVideoTrackSpec::simple(1, 8, 3)
        };
        let track = build_video_track(&spec);
        // Decode order presentations: 1, 4, 2, 3, 7, 5, 6, 8
        // RAPs at presentations 1, 4, 7.
        let raps: Vec<bool> = track.samples.iter().map(|s| s.is_random_access).collect();
        assert_eq!(raps, vec![true, true, false, false, true, false, false, false]);
        // Presentations 2 and 3 decode after RAP 4; 5 and 6 after RAP 7:
        // all leading.
        let leading: Vec<bool> = track.samples.iter().map(|s| s.is_leading).collect();
        assert_eq!(
            leading,
            vec![false, false, true, true, false, true, true, false]
        );
    }

    #[test]
    fn test_seek_snaps_to_rap_and_applies_slack() {
        let mut container = SyntheticContainer::builder()
            .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
            .build();
        // Frame 45's dts is 44; RAPs at 1, 31, 61, 91.
        let outcome = container
            .seek(SeekRequest {
                track_id: 1,
                basis: SeekBasis::DecodeTime(44),
                any_sample: false,
            })
            .unwrap();
        assert_eq!(outcome.landed_sample, Some(31));

        let mut container = SyntheticContainer::builder()
            .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
            .seek_slack(2)
            .build();
        let outcome = container
            .seek(SeekRequest {
                track_id: 1,
                basis: SeekBasis::DecodeTime(44),
                any_sample: false,
            })
            .unwrap();
        assert_eq!(outcome.landed_sample, Some(29));
    }

    #[test]
    fn test_unsupported_bases_are_reported() {
        let mut container = SyntheticContainer::builder()
            .video(SyntheticVideoTrackSpec::simple(1, 10, 0))
            .without_dts_seek()
            .build();
        let err = container
            .seek(SeekRequest {
                track_id: 1,
                basis: SeekBasis::DecodeTime(5),
                any_sample: true,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Index(IndexError::SeekBasisUnsupported)
        ));
        // Byte-offset basis still works.
        let outcome = container
            .seek(SeekRequest {
                track_id: 1,
                basis: SeekBasis::ByteOffset(FIRST_SAMPLE_OFFSET),
                any_sample: true,
            })
            .unwrap();
        assert_eq!(outcome.landed_sample, Some(1));
    }

    #[test]
    fn test_read_next_walks_sequentially() {
        let mut container = SyntheticContainer::builder()
            .audio(SyntheticAudioTrackSpec::simple(2, 3, 48000, 1024))
            .build();
        let first = container.read_next(2).unwrap().unwrap();
        assert_eq!(first.sample_number, 1);
        let second = container.read_next(2).unwrap().unwrap();
        assert_eq!(second.sample_number, 2);
        container.read_next(2).unwrap().unwrap();
        assert!(container.read_next(2).unwrap().is_none());
    }

    #[test]
    fn test_audio_durations_follow_configuration() {
        let spec = SyntheticAudioTrackSpec {
            configs: vec![
                SyntheticAudioConfig { first_frame: 1, sample_rate: 48000, channels: 2, frame_length: 1024 },
                SyntheticAudioConfig { first_frame: 5, sample_rate: 24000, channels: 2, frame_length: 512 },
            ],
            ..SyntheticAudioTrackSpec::simple(2, 8, 48000, 1024)
        };
        let track = build_audio_track(&spec);
        assert_eq!(track.samples[0].duration, 1024);
        // 512 samples at 24 kHz span 1024 ticks of the 48 kHz timescale.
        assert_eq!(track.samples[5].duration, 1024);
        assert_eq!(track.samples[4].config_index, 2);
    }
}
