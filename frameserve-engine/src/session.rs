//! Track sessions and the host-facing API.
//!
//! A session owns one open track: the container reader, the sample index,
//! the decoder configuration manager, and the access engine for the track's
//! handler type. Recoverable decode failures never escape: video requests
//! fall back to the designated blank frame and audio requests to a
//! silence-padded buffer, and the track remains usable. A failed mid-stream
//! reconfiguration poisons the track; every later request fails until it is
//! closed and reopened.

use crate::audio::AudioEngine;
use crate::heuristics::itunes_priming;
use crate::options::{SinkKind, TrackOptions};
use crate::stats::TrackStats;
use crate::video::VideoEngine;
use frameserve_codec::manager::{AudioConfigManager, VideoConfigManager};
use frameserve_codec::traits::DecoderFactory;
use frameserve_codec::ConfigTable;
use frameserve_convert::{from_f32_interleaved, OutputLayout, OutputSink};
use frameserve_core::error::{Error, Result};
use frameserve_core::frame::Frame;
use frameserve_core::rational::Rational;
use frameserve_core::sample::{ChannelLayout, Sample, SampleFormat};
use frameserve_core::timestamp::{Duration, Timestamp};
use frameserve_demux::index::SampleIndex;
use frameserve_demux::timeline::PcmTimeline;
use frameserve_demux::traits::{ContainerReader, HandlerType, TrackDescription};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Which track of a container to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelector {
    /// By enumeration position (0-based).
    Position(u32),
    /// By container track ID.
    TrackId(u32),
    /// The first video track.
    FirstVideo,
    /// The first audio track.
    FirstAudio,
}

enum TrackKind {
    Video {
        engine: VideoEngine,
        sink: OutputSink,
    },
    Audio {
        engine: AudioEngine,
        format: SampleFormat,
    },
}

/// One open track.
pub struct TrackSession {
    reader: Box<dyn ContainerReader>,
    kind: TrackKind,
}

impl std::fmt::Debug for TrackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackSession").finish_non_exhaustive()
    }
}

impl TrackSession {
    /// Open a track: build the sample index, resolve the configuration
    /// table, activate the first configuration (probing it), and stand up
    /// the access engine.
    ///
    /// Fails with a track-not-found, index, unsupported-codec or
    /// decoder-open error; on success the track is ready for requests.
    pub fn open(
        mut reader: Box<dyn ContainerReader>,
        factory: Arc<dyn DecoderFactory>,
        selector: TrackSelector,
        options: TrackOptions,
    ) -> Result<Self> {
        let track = resolve_selector(reader.as_ref(), selector)?;
        let track_id = track.track_id;
        let handler = track.handler;

        let index = Arc::new(SampleIndex::build(reader.as_mut(), track_id)?);
        let table = ConfigTable::from_records(index.config_records())?;

        let kind = match handler {
            HandlerType::Video => {
                let manager = VideoConfigManager::new(
                    Arc::clone(&factory),
                    table,
                    track_id,
                    options.thread_count,
                );
                let mut engine = VideoEngine::new(
                    track_id,
                    Arc::clone(&index),
                    manager,
                    options.seek_safety,
                    options.forward_seek_threshold,
                );
                engine.initialize(reader.as_mut())?;
                let sink = match options.sink {
                    SinkKind::Native => OutputSink::native(),
                    SinkKind::PackedBgra { bottom_up } => OutputSink::packed_bgra(bottom_up),
                    SinkKind::PlanarYuv => OutputSink::planar_yuv(),
                };
                TrackKind::Video { engine, sink }
            }
            HandlerType::Audio => {
                let mut timeline = PcmTimeline::from_index(&index)?;
                let mut implicit_preroll = false;
                if options.itunes_priming_heuristic && timeline.priming() == 0 {
                    if let Some(priming) = itunes_priming(reader.metadata()) {
                        debug!(track_id, priming, "implicit priming from metadata tag");
                        timeline = timeline.with_priming(priming as u64);
                        implicit_preroll = true;
                    }
                }
                let output_rate = options.output_sample_rate.unwrap_or_else(|| {
                    timeline
                        .runs()
                        .first()
                        .map(|r| r.sample_rate)
                        .unwrap_or(48000)
                });
                let manager = AudioConfigManager::new(
                    Arc::clone(&factory),
                    table,
                    track_id,
                    options.thread_count,
                );
                let mut engine = AudioEngine::new(
                    track_id,
                    Arc::clone(&index),
                    timeline,
                    manager,
                    options.seek_safety,
                    output_rate,
                    implicit_preroll,
                );
                engine.initialize(reader.as_mut())?;
                TrackKind::Audio {
                    engine,
                    format: options.audio_format,
                }
            }
        };

        info!(track_id, ?handler, "track opened");
        Ok(Self { reader, kind })
    }

    /// Handler type of the open track.
    pub fn handler(&self) -> HandlerType {
        match &self.kind {
            TrackKind::Video { .. } => HandlerType::Video,
            TrackKind::Audio { .. } => HandlerType::Audio,
        }
    }

    /// The sample index.
    pub fn index(&self) -> &Arc<SampleIndex> {
        match &self.kind {
            TrackKind::Video { engine, .. } => engine.index(),
            TrackKind::Audio { engine, .. } => engine.index(),
        }
    }

    /// Number of frames/samples in the track.
    pub fn frame_count(&self) -> u32 {
        self.index().sample_count()
    }

    /// Track duration.
    pub fn duration(&self) -> Duration {
        self.index().duration()
    }

    /// Estimated nominal frame rate (video).
    pub fn nominal_frame_rate(&self) -> Option<Rational> {
        self.index().nominal_frame_rate()
    }

    /// Presentation frame at or before a timestamp. Pure index lookup.
    pub fn frame_at_time(&self, ts: Timestamp) -> Option<u32> {
        self.index().frame_at_time(ts)
    }

    /// Whether the track hit a failed reconfiguration and must be reopened.
    pub fn is_poisoned(&self) -> bool {
        match &self.kind {
            TrackKind::Video { engine, .. } => engine.is_poisoned(),
            TrackKind::Audio { engine, .. } => engine.is_poisoned(),
        }
    }

    /// Accumulated statistics.
    pub fn stats(&self) -> TrackStats {
        match &self.kind {
            TrackKind::Video { engine, .. } => engine.stats(),
            TrackKind::Audio { engine, .. } => engine.stats(),
        }
    }

    /// Output layout the video sink will deliver.
    pub fn video_output_layout(&self) -> Result<OutputLayout> {
        match &self.kind {
            TrackKind::Video { engine, sink } => {
                let (width, height, format) = engine.output_shape();
                Ok(sink.layout(width, height, format))
            }
            TrackKind::Audio { .. } => Err(Error::invalid_param("not a video track")),
        }
    }

    /// Get one video frame by presentation number (1-origin), rendered
    /// through the track's output sink.
    ///
    /// Recoverable decode failures return the designated blank frame
    /// instead of an error; the track stays usable.
    pub fn get_video_frame(&mut self, presentation: u32) -> Result<Frame> {
        match &mut self.kind {
            TrackKind::Video { engine, sink } => {
                match engine.get_frame(self.reader.as_mut(), presentation) {
                    Ok(frame) => sink.render(&frame),
                    Err(e) if e.is_recoverable() => {
                        let (width, height, format) = engine.output_shape();
                        engine.record_blank();
                        debug!(presentation, error = %e, "substituting blank frame");
                        sink.render(&Frame::blank(width, height, format))
                    }
                    Err(e) => Err(e),
                }
            }
            TrackKind::Audio { .. } => Err(Error::invalid_param("not a video track")),
        }
    }

    /// Get a PCM range. `start` may be negative: `-start` silence frames
    /// are prepended before PCM position 0.
    ///
    /// Always returns exactly `length` frames; whatever could not be
    /// decoded (past end of stream, exhausted retries) is silence.
    pub fn get_audio_samples(&mut self, start: i64, length: usize) -> Result<Sample> {
        match &mut self.kind {
            TrackKind::Audio { engine, format } => {
                let channels = engine.channels() as usize;
                let layout = ChannelLayout::from_channels(channels as u32);
                let rate = engine.output_rate();
                let want = length * channels;

                let mut data = match engine.get_samples(self.reader.as_mut(), start, length) {
                    Ok(data) => data,
                    Err(e) if e.is_recoverable() => {
                        debug!(start, length, error = %e, "substituting silence");
                        engine.record_silence(length as u64);
                        vec![0.0; want]
                    }
                    Err(e) => return Err(e),
                };
                if data.len() < want {
                    engine.record_silence(((want - data.len()) / channels) as u64);
                    data.resize(want, 0.0);
                }
                from_f32_interleaved(&data, *format, layout, rate)
            }
            TrackKind::Video { .. } => Err(Error::invalid_param("not an audio track")),
        }
    }

    /// Total PCM samples the track yields at `output_rate`. Pure function
    /// of the index; no decoding.
    pub fn count_overall_pcm_samples(&self, output_rate: u32) -> Result<u64> {
        match &self.kind {
            TrackKind::Audio { engine, .. } => Ok(engine.total_samples(output_rate)),
            TrackKind::Video { .. } => Err(Error::invalid_param("not an audio track")),
        }
    }

    /// Output sample rate of delivered audio buffers.
    pub fn audio_output_rate(&self) -> Result<u32> {
        match &self.kind {
            TrackKind::Audio { engine, .. } => Ok(engine.output_rate()),
            TrackKind::Video { .. } => Err(Error::invalid_param("not an audio track")),
        }
    }

    /// Close the track, releasing the reader and decoder.
    pub fn close(self) {
        let track_id = self.index().track().track_id;
        info!(track_id, "track closed");
        drop(self);
    }
}

/// A session wrapped for multi-threaded hosts. The engines themselves are
/// single-threaded; this is the documented serialization point.
#[derive(Clone)]
pub struct SharedTrack {
    inner: Arc<Mutex<TrackSession>>,
}

impl SharedTrack {
    /// Wrap a session.
    pub fn new(session: TrackSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// See [`TrackSession::get_video_frame`].
    pub fn get_video_frame(&self, presentation: u32) -> Result<Frame> {
        self.inner.lock().get_video_frame(presentation)
    }

    /// See [`TrackSession::get_audio_samples`].
    pub fn get_audio_samples(&self, start: i64, length: usize) -> Result<Sample> {
        self.inner.lock().get_audio_samples(start, length)
    }

    /// See [`TrackSession::count_overall_pcm_samples`].
    pub fn count_overall_pcm_samples(&self, output_rate: u32) -> Result<u64> {
        self.inner.lock().count_overall_pcm_samples(output_rate)
    }

    /// See [`TrackSession::stats`].
    pub fn stats(&self) -> TrackStats {
        self.inner.lock().stats()
    }
}

fn resolve_selector(
    reader: &dyn ContainerReader,
    selector: TrackSelector,
) -> Result<TrackDescription> {
    let found = match selector {
        TrackSelector::Position(position) => reader.track_by_position(position).cloned(),
        TrackSelector::TrackId(track_id) => reader.track(track_id).cloned(),
        TrackSelector::FirstVideo => first_of(reader, HandlerType::Video),
        TrackSelector::FirstAudio => first_of(reader, HandlerType::Audio),
    };
    found.ok_or_else(|| Error::TrackNotFound(format!("{:?}", selector)))
}

fn first_of(reader: &dyn ContainerReader, handler: HandlerType) -> Option<TrackDescription> {
    (0..reader.track_count())
        .filter_map(|position| reader.track_by_position(position))
        .find(|t| t.handler == handler)
        .cloned()
}
