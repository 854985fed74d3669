//! Decoder configuration manager.
//!
//! Owns the lifecycle of the single active decoder instance per track. A
//! configuration switch is an explicit state transition: close the active
//! decoder, probe the new configuration single-threaded if its actual
//! output parameters are not yet known, then reopen at the production
//! thread count with a clean pipeline.
//!
//! The probe exists because some decoders only report true stream
//! parameters after decoding at least one unit, and internal threading can
//! delay or destabilize that discovery; probing single-threaded and then
//! reopening is a correctness requirement, not an optimization.

use crate::config::{ConfigTable, ExtendedParams};
use crate::delay::PipelineDelay;
use crate::traits::{AudioDecode, DecoderFactory, DecoderRequest, VideoDecode};
use frameserve_core::error::{CodecError, Error, Result};
use frameserve_core::packet::Packet;
use frameserve_demux::traits::ContainerReader;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trial decoding feeds at most this many samples before giving up on a
/// configuration.
const PROBE_SAMPLE_LIMIT: u32 = 64;

/// Lifecycle state of the track's decoder slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No decoder open.
    Closed,
    /// A decoder is open and bound to one configuration entry.
    Active {
        /// The bound configuration index.
        config_index: u32,
    },
    /// A mid-stream reconfiguration failed; the decoder pipeline state is
    /// indeterminate and every subsequent request must fail until the
    /// track is reopened.
    Poisoned,
}

/// A decoder instance the manager can drive generically.
pub trait ManagedDecoder: Sized + Send {
    /// Open an instance via the factory.
    fn open(factory: &dyn DecoderFactory, request: &DecoderRequest<'_>) -> Result<Self>;

    /// Decode one unit, discarding any output. Used only by the probe.
    fn decode_discard(&mut self, packet: &Packet<'_>) -> Result<bool>;

    /// The decoder's discovered output parameters, once complete.
    fn discovered_params(&self) -> Option<ExtendedParams>;

    /// Discard pipeline state.
    fn flush(&mut self);
}

impl ManagedDecoder for Box<dyn VideoDecode> {
    fn open(factory: &dyn DecoderFactory, request: &DecoderRequest<'_>) -> Result<Self> {
        factory.open_video(request)
    }

    fn decode_discard(&mut self, packet: &Packet<'_>) -> Result<bool> {
        Ok(self.decode(packet)?.is_some())
    }

    fn discovered_params(&self) -> Option<ExtendedParams> {
        self.output_params()
            .filter(|p| p.is_valid())
            .map(ExtendedParams::Video)
    }

    fn flush(&mut self) {
        VideoDecode::flush(self.as_mut());
    }
}

impl ManagedDecoder for Box<dyn AudioDecode> {
    fn open(factory: &dyn DecoderFactory, request: &DecoderRequest<'_>) -> Result<Self> {
        factory.open_audio(request)
    }

    fn decode_discard(&mut self, packet: &Packet<'_>) -> Result<bool> {
        Ok(self.decode(packet)?.is_some())
    }

    fn discovered_params(&self) -> Option<ExtendedParams> {
        self.output_params()
            .filter(|p| p.is_valid())
            .map(ExtendedParams::Audio)
    }

    fn flush(&mut self) {
        AudioDecode::flush(self.as_mut());
    }
}

/// Manages the one active decoder of a track.
pub struct ConfigManager<D: ManagedDecoder> {
    factory: Arc<dyn DecoderFactory>,
    table: ConfigTable,
    track_id: u32,
    thread_count: u32,
    state: DecoderState,
    decoder: Option<D>,
    delay: PipelineDelay,
}

/// Manager over video decoders.
pub type VideoConfigManager = ConfigManager<Box<dyn VideoDecode>>;
/// Manager over audio decoders.
pub type AudioConfigManager = ConfigManager<Box<dyn AudioDecode>>;

impl<D: ManagedDecoder> ConfigManager<D> {
    /// Create a manager. No decoder is opened until the first
    /// [`activate`](Self::activate).
    pub fn new(
        factory: Arc<dyn DecoderFactory>,
        table: ConfigTable,
        track_id: u32,
        thread_count: u32,
    ) -> Self {
        Self {
            factory,
            table,
            track_id,
            thread_count: thread_count.max(1),
            state: DecoderState::Closed,
            decoder: None,
            delay: PipelineDelay::new(),
        }
    }

    /// The configuration table.
    pub fn table(&self) -> &ConfigTable {
        &self.table
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Currently bound configuration index, if a decoder is active.
    pub fn current_config(&self) -> Option<u32> {
        match self.state {
            DecoderState::Active { config_index } => Some(config_index),
            _ => None,
        }
    }

    /// Whether the track is in the persistent error state.
    pub fn is_poisoned(&self) -> bool {
        self.state == DecoderState::Poisoned
    }

    /// Mark the track unusable after a failed mid-stream reconfiguration.
    pub fn poison(&mut self) {
        warn!(track_id = self.track_id, "track poisoned");
        self.decoder = None;
        self.state = DecoderState::Poisoned;
    }

    /// The active decoder.
    pub fn decoder_mut(&mut self) -> Option<&mut D> {
        self.decoder.as_mut()
    }

    /// Pipeline delay counter.
    pub fn delay(&self) -> &PipelineDelay {
        &self.delay
    }

    /// Mutable pipeline delay counter.
    pub fn delay_mut(&mut self) -> &mut PipelineDelay {
        &mut self.delay
    }

    /// Flush the active decoder and reset the delay counter. Required
    /// whenever a discontinuous seek discards pipeline state.
    pub fn flush(&mut self) {
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.flush();
        }
        self.delay.reset();
    }

    /// Ensure the active decoder matches `config_index`, reconfiguring only
    /// on an actual change.
    ///
    /// Reconfiguration: close the old instance; if the entry has never been
    /// probed, open single-threaded and trial-decode from the entry's first
    /// sample until valid output parameters appear, recording them into the
    /// entry; then reopen at the production thread count and reset the
    /// pipeline delay.
    pub fn activate(
        &mut self,
        config_index: u32,
        reader: &mut dyn ContainerReader,
    ) -> Result<()> {
        if self.state == DecoderState::Poisoned {
            return Err(Error::TrackPoisoned);
        }
        if self.current_config() == Some(config_index) && self.decoder.is_some() {
            return Ok(());
        }

        let entry = self.table.entry(config_index).ok_or_else(|| {
            Error::Codec(CodecError::Other(format!(
                "no configuration entry {}",
                config_index
            )))
        })?;
        debug!(
            track_id = self.track_id,
            config_index,
            codec = ?entry.codec,
            probed = entry.extended().is_some(),
            "activating decoder configuration"
        );

        // Close the existing instance before its replacement opens.
        self.decoder = None;
        self.state = DecoderState::Closed;

        if entry.extended().is_none() {
            let probe_request = DecoderRequest {
                codec: entry.codec.clone(),
                extradata: &entry.extradata,
                thread_count: 1,
            };
            let mut probe = D::open(self.factory.as_ref(), &probe_request)
                .map_err(open_failure)?;

            let sample_count = reader
                .track(self.track_id)
                .map(|t| t.sample_count)
                .unwrap_or(0);
            let mut discovered = None;
            let mut number = entry.first_sample;
            let mut fed = 0u32;
            while fed < PROBE_SAMPLE_LIMIT && number <= sample_count {
                let packet = reader.sample_payload(self.track_id, number)?;
                // Per-unit decode errors don't abort the probe; discovery
                // only needs one unit to get through.
                let _ = probe.decode_discard(&packet);
                if let Some(params) = probe.discovered_params() {
                    discovered = Some(params);
                    break;
                }
                number += 1;
                fed += 1;
            }

            let params = discovered
                .ok_or(Error::Codec(CodecError::ProbeExhausted { config_index }))?;
            entry.record_extended(params);
        }

        let request = DecoderRequest {
            codec: entry.codec.clone(),
            extradata: &entry.extradata,
            thread_count: self.thread_count,
        };
        let decoder = D::open(self.factory.as_ref(), &request).map_err(open_failure)?;

        self.decoder = Some(decoder);
        self.delay.reset();
        self.state = DecoderState::Active { config_index };
        Ok(())
    }
}

/// Normalize factory failures to the open-failure class.
fn open_failure(err: Error) -> Error {
    match err {
        e @ Error::Codec(CodecError::OpenFailed(_))
        | e @ Error::Codec(CodecError::Unsupported(_)) => e,
        other => Error::Codec(CodecError::OpenFailed(other.to_string())),
    }
}
