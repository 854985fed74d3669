//! Sample index construction.
//!
//! Builds, once per opened track, the complete in-memory table the access
//! engines run against: per-sample descriptors in decode order, converters
//! between decode and presentation order (video frame reordering), a
//! random-access-point bitmap walked backward during seeks, and the set of
//! decoder configuration records with their first-use sample numbers.
//!
//! Construction reads metadata only; no sample is decoded. Any metadata
//! read failure aborts the build; there is no partial index.

use crate::traits::{ConfigRecord, ContainerReader, HandlerType, TrackDescription};
use frameserve_core::error::{Error, IndexError, Result};
use frameserve_core::packet::{Packet, PacketFlags};
use frameserve_core::rational::Rational;
use frameserve_core::timestamp::{Duration, TimeBase, Timestamp};
use tracing::debug;

/// One container sample's indexed metadata.
#[derive(Debug, Clone, Copy)]
pub struct SampleDescriptor {
    /// Decode-order sample number, 1-origin.
    pub decode_number: u32,
    /// Presentation-order sample number, 1-origin. Equals `decode_number`
    /// unless the track reorders frames.
    pub presentation_number: u32,
    /// Decode timestamp in media timescale units.
    pub dts: i64,
    /// Composition timestamp in media timescale units.
    pub cts: i64,
    /// Byte offset of the payload in the source file.
    pub byte_offset: u64,
    /// Sample duration in media timescale units.
    pub duration: u32,
    /// Decoder configuration entry required by this sample, 1-origin.
    pub config_index: u32,
    /// RANDOM_ACCESS / LEADING flags.
    pub flags: PacketFlags,
}

impl SampleDescriptor {
    /// Random access point flag.
    pub fn is_random_access(&self) -> bool {
        self.flags.contains(PacketFlags::RANDOM_ACCESS)
    }

    /// Leading sample flag.
    pub fn is_leading(&self) -> bool {
        self.flags.contains(PacketFlags::LEADING)
    }
}

/// Bit-packed random-access-point map in decode order, 1-origin.
#[derive(Debug, Clone)]
pub struct RapBitmap {
    words: Vec<u64>,
    len: u32,
}

impl RapBitmap {
    /// Create an all-clear bitmap covering `len` samples.
    pub fn with_len(len: u32) -> Self {
        Self {
            words: vec![0u64; (len as usize).div_ceil(64)],
            len,
        }
    }

    /// Mark sample `number` (1-origin) as a random access point.
    pub fn set(&mut self, number: u32) {
        debug_assert!(number >= 1 && number <= self.len);
        let bit = (number - 1) as usize;
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    /// Whether sample `number` is a random access point.
    pub fn get(&self, number: u32) -> bool {
        if number < 1 || number > self.len {
            return false;
        }
        let bit = (number - 1) as usize;
        self.words[bit / 64] & (1u64 << (bit % 64)) != 0
    }

    /// Walk backward from `number` (inclusive) to the nearest set bit.
    pub fn rap_at_or_before(&self, number: u32) -> Option<u32> {
        if self.len == 0 {
            return None;
        }
        let start = number.min(self.len);
        if start == 0 {
            return None;
        }
        let mut bit = (start - 1) as usize;
        loop {
            let word_idx = bit / 64;
            // Mask off bits above the current position, then scan the word.
            let mask = if bit % 64 == 63 {
                u64::MAX
            } else {
                (1u64 << (bit % 64 + 1)) - 1
            };
            let word = self.words[word_idx] & mask;
            if word != 0 {
                let top = 63 - word.leading_zeros() as usize;
                return Some((word_idx * 64 + top) as u32 + 1);
            }
            if word_idx == 0 {
                return None;
            }
            bit = word_idx * 64 - 1;
        }
    }

    /// Number of samples covered.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the bitmap covers no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The per-track sample index.
#[derive(Debug)]
pub struct SampleIndex {
    track: TrackDescription,
    time_base: TimeBase,
    /// Descriptors in decode order; `samples[0]` is sample number 1.
    samples: Vec<SampleDescriptor>,
    /// Presentation position (0-based) -> decode number. `None` when the
    /// two orders coincide.
    presentation_to_decode: Option<Vec<u32>>,
    raps: RapBitmap,
    /// Configuration records with the first decode-order sample number that
    /// uses each, ordered by configuration index (1-origin).
    configs: Vec<(ConfigRecord, u32)>,
}

impl SampleIndex {
    /// Build the index for one track.
    ///
    /// Fails with an [`IndexError`] if the timeline cannot be constructed or
    /// any sample's metadata cannot be read. Does not decode any sample.
    pub fn build(reader: &mut dyn ContainerReader, track_id: u32) -> Result<Self> {
        let track = reader
            .track(track_id)
            .ok_or_else(|| Error::TrackNotFound(format!("track id {}", track_id)))?
            .clone();

        if track.sample_count == 0 {
            return Err(IndexError::EmptyTrack { track_id }.into());
        }

        reader.construct_timeline(track_id).map_err(|e| {
            Error::Index(IndexError::TimelineConstruction {
                track_id,
                message: e.to_string(),
            })
        })?;

        let count = track.sample_count;
        let mut samples = Vec::with_capacity(count as usize);
        let mut raps = RapBitmap::with_len(count);
        let mut max_config = 0u32;
        let mut reordered = false;
        let mut prev_cts = i64::MIN;

        for number in 1..=count {
            let meta = reader.sample_metadata(track_id, number).map_err(|e| {
                Error::Index(IndexError::MetadataRead {
                    sample_number: number,
                    message: e.to_string(),
                })
            })?;

            let mut flags = PacketFlags::empty();
            if meta.is_random_access {
                flags.insert(PacketFlags::RANDOM_ACCESS);
                raps.set(number);
            }
            if meta.is_leading {
                flags.insert(PacketFlags::LEADING);
            }
            if meta.cts < prev_cts {
                reordered = true;
            }
            prev_cts = meta.cts;
            max_config = max_config.max(meta.config_index);

            samples.push(SampleDescriptor {
                decode_number: number,
                presentation_number: number,
                dts: meta.dts,
                cts: meta.cts,
                byte_offset: meta.byte_offset,
                duration: meta.duration,
                config_index: meta.config_index,
                flags,
            });
        }

        // Presentation <-> decode converters, only when the container's
        // decode order is not already presentation order.
        let presentation_to_decode = if reordered && track.handler == HandlerType::Video {
            let mut order: Vec<u32> = (1..=count).collect();
            order.sort_by_key(|&n| {
                let s = &samples[(n - 1) as usize];
                (s.cts, s.decode_number)
            });
            for (pos, &decode_number) in order.iter().enumerate() {
                samples[(decode_number - 1) as usize].presentation_number = pos as u32 + 1;
            }
            Some(order)
        } else {
            None
        };

        let mut configs = Vec::with_capacity(max_config as usize);
        for config_index in 1..=max_config.max(1) {
            let record = reader.config_record(track_id, config_index).map_err(|e| {
                Error::Index(IndexError::Other(format!(
                    "configuration record {} unreadable: {}",
                    config_index, e
                )))
            })?;
            let first_use = samples
                .iter()
                .find(|s| s.config_index == config_index)
                .map(|s| s.decode_number)
                .unwrap_or(1);
            configs.push((record, first_use));
        }

        debug!(
            track_id,
            samples = count,
            configs = configs.len(),
            reordered,
            "sample index built"
        );

        Ok(Self {
            time_base: TimeBase::media(track.timescale),
            track,
            samples,
            presentation_to_decode,
            raps,
            configs,
        })
    }

    /// Track parameters.
    pub fn track(&self) -> &TrackDescription {
        &self.track
    }

    /// The track's media time base.
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Total sample count.
    pub fn sample_count(&self) -> u32 {
        self.samples.len() as u32
    }

    /// Descriptor by decode-order number (1-origin).
    pub fn descriptor(&self, decode_number: u32) -> Option<&SampleDescriptor> {
        if decode_number < 1 {
            return None;
        }
        self.samples.get((decode_number - 1) as usize)
    }

    /// Decode-order number of the sample at a presentation position
    /// (1-origin).
    pub fn decode_number_for_presentation(&self, presentation_number: u32) -> Option<u32> {
        if presentation_number < 1 || presentation_number > self.sample_count() {
            return None;
        }
        match &self.presentation_to_decode {
            Some(order) => order.get((presentation_number - 1) as usize).copied(),
            None => Some(presentation_number),
        }
    }

    /// Presentation position of a decode-order sample (1-origin).
    pub fn presentation_number_for_decode(&self, decode_number: u32) -> Option<u32> {
        self.descriptor(decode_number).map(|s| s.presentation_number)
    }

    /// Composition timestamp of a presentation-order frame.
    pub fn cts_of_presentation(&self, presentation_number: u32) -> Option<i64> {
        let decode = self.decode_number_for_presentation(presentation_number)?;
        self.descriptor(decode).map(|s| s.cts)
    }

    /// Nearest random access point at or before a decode-order position.
    pub fn rap_at_or_before(&self, decode_number: u32) -> Option<u32> {
        self.raps.rap_at_or_before(decode_number)
    }

    /// Previous random access point strictly before the given one.
    pub fn prev_rap_before(&self, rap: u32) -> Option<u32> {
        if rap <= 1 {
            return None;
        }
        self.raps.rap_at_or_before(rap - 1)
    }

    /// The RAP bitmap.
    pub fn raps(&self) -> &RapBitmap {
        &self.raps
    }

    /// Configuration records paired with their first-use decode numbers,
    /// ordered by configuration index (1-origin).
    pub fn config_records(&self) -> &[(ConfigRecord, u32)] {
        &self.configs
    }

    /// Total track duration (sum of sample durations).
    pub fn duration(&self) -> Duration {
        let total: i64 = self.samples.iter().map(|s| s.duration as i64).sum();
        Duration::new(total, self.time_base)
    }

    /// Estimated nominal frame rate from the median sample duration.
    pub fn nominal_frame_rate(&self) -> Option<Rational> {
        let mut durations: Vec<u32> = self.samples.iter().map(|s| s.duration).collect();
        durations.sort_unstable();
        let median = durations[durations.len() / 2];
        if median == 0 {
            return None;
        }
        Some(Rational::new(self.track.timescale as i64, median as i64).reduce())
    }

    /// Presentation frame number at or before a timestamp. Pure index
    /// lookup; no decoding.
    pub fn frame_at_time(&self, ts: Timestamp) -> Option<u32> {
        let target = ts.rescale(self.time_base).value;
        let count = self.sample_count();
        // Presentation order is cts-sorted, so binary search over positions.
        let mut lo = 1u32;
        let mut hi = count;
        if self.cts_of_presentation(1)? > target {
            return Some(1);
        }
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if self.cts_of_presentation(mid)? <= target {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Some(lo)
    }

    /// Match a demuxed packet back to its decode-order number using the
    /// recorded byte offset, falling back to the decode timestamp.
    pub fn identify_packet(&self, packet: &Packet<'_>) -> Option<u32> {
        if packet.sample_number >= 1 && packet.sample_number <= self.sample_count() {
            return Some(packet.sample_number);
        }
        if let Some(offset) = packet.byte_offset {
            if let Some(s) = self.samples.iter().find(|s| s.byte_offset == offset) {
                return Some(s.decode_number);
            }
        }
        let dts = packet.dts.rescale(self.time_base).value;
        self.samples
            .iter()
            .find(|s| s.dts == dts)
            .map(|s| s.decode_number)
    }

    /// Check whether `packet` matches the descriptor at `expected`, and if
    /// not scan up to `range` samples on either side for a match. Used by
    /// the audio engine to recover from imprecise container seeks.
    pub fn verify_or_adjust(
        &self,
        expected: u32,
        packet: &Packet<'_>,
        range: u32,
    ) -> Option<u32> {
        let matches = |number: u32| -> bool {
            self.descriptor(number).is_some_and(|s| {
                packet
                    .byte_offset
                    .map(|o| o == s.byte_offset)
                    .unwrap_or_else(|| packet.dts.rescale(self.time_base).value == s.dts)
            })
        };
        if matches(expected) {
            return Some(expected);
        }
        for delta in 1..=range {
            if expected > delta && matches(expected - delta) {
                return Some(expected - delta);
            }
            if matches(expected + delta) {
                return Some(expected + delta);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rap_bitmap_backward_walk() {
        let mut raps = RapBitmap::with_len(100);
        for n in [1u32, 31, 61, 91] {
            raps.set(n);
        }
        assert_eq!(raps.rap_at_or_before(45), Some(31));
        assert_eq!(raps.rap_at_or_before(31), Some(31));
        assert_eq!(raps.rap_at_or_before(30), Some(1));
        assert_eq!(raps.rap_at_or_before(100), Some(91));
        assert_eq!(raps.rap_at_or_before(1), Some(1));
    }

    #[test]
    fn test_rap_bitmap_word_boundaries() {
        let mut raps = RapBitmap::with_len(200);
        raps.set(64);
        raps.set(65);
        raps.set(128);
        assert!(raps.get(64));
        assert!(raps.get(65));
        assert_eq!(raps.rap_at_or_before(64), Some(64));
        assert_eq!(raps.rap_at_or_before(127), Some(65));
        assert_eq!(raps.rap_at_or_before(200), Some(128));
        assert_eq!(raps.rap_at_or_before(63), None);
    }

    #[test]
    fn test_rap_bitmap_empty() {
        let raps = RapBitmap::with_len(0);
        assert!(raps.is_empty());
        assert_eq!(raps.rap_at_or_before(1), None);
    }
}
