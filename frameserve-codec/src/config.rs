//! Decoder configuration entries.
//!
//! A configuration entry is an immutable snapshot of codec parameters from
//! the container description. Its "extended" fields (the parameters the
//! decoder actually produces, discovered by trial decoding) are the one
//! write-once exception: populated the first time the configuration is
//! activated, cached for the life of the track, never re-probed.

use crate::traits::{AudioOutputParams, VideoOutputParams};
use frameserve_core::error::{CodecError, Error, Result};
use frameserve_demux::traits::{CodecId, ConfigRecord, NominalAudioParams, NominalVideoParams};
use once_cell::sync::OnceCell;

/// Parameters discovered by trial decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedParams {
    /// Video: actual output dimensions and pixel format.
    Video(VideoOutputParams),
    /// Audio: actual rate, layout, sample format and frame length.
    Audio(AudioOutputParams),
}

/// One decoder configuration entry.
#[derive(Debug)]
pub struct ConfigEntry {
    /// Configuration index, 1-origin (container convention).
    pub index: u32,
    /// Resolved codec identifier.
    pub codec: CodecId,
    /// Codec-specific parameter blob.
    pub extradata: Vec<u8>,
    /// Nominal video parameters from the container description.
    pub nominal_video: Option<NominalVideoParams>,
    /// Nominal audio parameters from the container description.
    pub nominal_audio: Option<NominalAudioParams>,
    /// First decode-order sample number that uses this entry; trial
    /// decoding feeds compressed samples starting here.
    pub first_sample: u32,
    /// Probed parameters; written at most once.
    extended: OnceCell<ExtendedParams>,
}

impl ConfigEntry {
    /// Probed parameters, if this configuration has been activated before.
    pub fn extended(&self) -> Option<&ExtendedParams> {
        self.extended.get()
    }

    /// Record probed parameters. Returns `false` if they were already
    /// recorded (the existing values win; entries are never re-probed).
    pub fn record_extended(&self, params: ExtendedParams) -> bool {
        self.extended.set(params).is_ok()
    }

    /// Probed video parameters.
    pub fn extended_video(&self) -> Option<VideoOutputParams> {
        match self.extended.get() {
            Some(ExtendedParams::Video(p)) => Some(*p),
            _ => None,
        }
    }

    /// Probed audio parameters.
    pub fn extended_audio(&self) -> Option<AudioOutputParams> {
        match self.extended.get() {
            Some(ExtendedParams::Audio(p)) => Some(*p),
            _ => None,
        }
    }
}

/// The per-track set of configuration entries, indexed 1..=N.
#[derive(Debug, Default)]
pub struct ConfigTable {
    entries: Vec<ConfigEntry>,
}

impl ConfigTable {
    /// Build the table from the index's configuration records.
    ///
    /// Fails with [`CodecError::Unsupported`] if any referenced record has
    /// no resolvable codec identifier; fatal for the track at open time.
    pub fn from_records(records: &[(ConfigRecord, u32)]) -> Result<Self> {
        let mut entries = Vec::with_capacity(records.len());
        for (position, (record, first_sample)) in records.iter().enumerate() {
            if let CodecId::Unknown(name) = &record.codec {
                return Err(Error::Codec(CodecError::Unsupported(name.clone())));
            }
            entries.push(ConfigEntry {
                index: position as u32 + 1,
                codec: record.codec.clone(),
                extradata: record.extradata.clone(),
                nominal_video: record.video,
                nominal_audio: record.audio,
                first_sample: *first_sample,
                extended: OnceCell::new(),
            });
        }
        Ok(Self { entries })
    }

    /// Entry by configuration index (1-origin).
    pub fn entry(&self, index: u32) -> Option<&ConfigEntry> {
        if index < 1 {
            return None;
        }
        self.entries.get((index - 1) as usize)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameserve_core::frame::PixelFormat;

    fn record(codec: CodecId) -> ConfigRecord {
        ConfigRecord {
            codec,
            extradata: vec![1, 2, 3],
            video: Some(NominalVideoParams { width: 320, height: 240 }),
            audio: None,
        }
    }

    #[test]
    fn test_table_build_and_lookup() {
        let table = ConfigTable::from_records(&[
            (record(CodecId::H264), 1),
            (record(CodecId::H264), 61),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entry(1).unwrap().first_sample, 1);
        assert_eq!(table.entry(2).unwrap().first_sample, 61);
        assert!(table.entry(0).is_none());
        assert!(table.entry(3).is_none());
    }

    #[test]
    fn test_unresolvable_codec_is_fatal() {
        let err =
            ConfigTable::from_records(&[(record(CodecId::Unknown("zzzz".into())), 1)])
                .unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::Unsupported(_))));
    }

    #[test]
    fn test_extended_params_write_once() {
        let table = ConfigTable::from_records(&[(record(CodecId::H264), 1)]).unwrap();
        let entry = table.entry(1).unwrap();
        assert!(entry.extended().is_none());

        let first = ExtendedParams::Video(VideoOutputParams {
            width: 1280,
            height: 720,
            pixel_format: PixelFormat::Yuv420p,
        });
        assert!(entry.record_extended(first));

        // A second write is refused and the original values survive.
        let second = ExtendedParams::Video(VideoOutputParams {
            width: 640,
            height: 360,
            pixel_format: PixelFormat::Yuv420p,
        });
        assert!(!entry.record_extended(second));
        assert_eq!(entry.extended_video().unwrap().width, 1280);
    }
}
