//! Compressed sample packets.
//!
//! A packet is one compressed container sample together with the metadata
//! the access engines key on: decode-order sample number, decode and
//! composition timestamps, byte offset, and decoder-configuration index.

use crate::timestamp::{Duration, Timestamp};
use bitflags::bitflags;
use std::borrow::Cow;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This sample is a random access point: decodable without
        /// reference to any earlier sample.
        const RANDOM_ACCESS = 0x0001;
        /// Leading sample: its decode dependency crosses backward over the
        /// preceding random access point.
        const LEADING = 0x0002;
        /// Packet data is corrupted.
        const CORRUPT = 0x0004;
    }
}

/// One compressed container sample.
///
/// Packets can own their data or reference external data (zero-copy).
#[derive(Clone)]
pub struct Packet<'a> {
    /// The compressed payload.
    data: Cow<'a, [u8]>,
    /// Track this packet belongs to.
    pub track_id: u32,
    /// Decode-order sample number, 1-origin (container convention).
    pub sample_number: u32,
    /// Decode timestamp in the track's media time base.
    pub dts: Timestamp,
    /// Composition (presentation) timestamp in the track's media time base.
    pub cts: Timestamp,
    /// Sample duration.
    pub duration: Duration,
    /// Byte offset of the payload in the source file, if known.
    pub byte_offset: Option<u64>,
    /// Decoder configuration entry this sample requires, 1-origin.
    pub config_index: u32,
    /// Packet flags.
    pub flags: PacketFlags,
}

impl<'a> Packet<'a> {
    /// Create a new packet with owned data.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
            track_id: 0,
            sample_number: 0,
            dts: Timestamp::none(),
            cts: Timestamp::none(),
            duration: Duration::zero(),
            byte_offset: None,
            config_index: 1,
            flags: PacketFlags::empty(),
        }
    }

    /// Create a new packet referencing external data.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            track_id: 0,
            sample_number: 0,
            dts: Timestamp::none(),
            cts: Timestamp::none(),
            duration: Duration::zero(),
            byte_offset: None,
            config_index: 1,
            flags: PacketFlags::empty(),
        }
    }

    /// Create an empty packet. Feeding an empty packet to a decoder drains
    /// one pending frame from its pipeline, if any.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the size of the packet data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this sample is a random access point.
    pub fn is_random_access(&self) -> bool {
        self.flags.contains(PacketFlags::RANDOM_ACCESS)
    }

    /// Set the random-access flag.
    pub fn set_random_access(&mut self, rap: bool) {
        if rap {
            self.flags.insert(PacketFlags::RANDOM_ACCESS);
        } else {
            self.flags.remove(PacketFlags::RANDOM_ACCESS);
        }
    }

    /// Check if this is a leading sample.
    pub fn is_leading(&self) -> bool {
        self.flags.contains(PacketFlags::LEADING)
    }

    /// Make the packet own its data.
    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            data: Cow::Owned(self.data.into_owned()),
            track_id: self.track_id,
            sample_number: self.sample_number,
            dts: self.dts,
            cts: self.cts,
            duration: self.duration,
            byte_offset: self.byte_offset,
            config_index: self.config_index,
            flags: self.flags,
        }
    }
}

impl<'a> fmt::Debug for Packet<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("track_id", &self.track_id)
            .field("sample_number", &self.sample_number)
            .field("size", &self.size())
            .field("dts", &self.dts)
            .field("cts", &self.cts)
            .field("config_index", &self.config_index)
            .field("flags", &self.flags)
            .finish()
    }
}

impl<'a> Default for Packet<'a> {
    fn default() -> Self {
        Self::empty()
    }
}

/// An owned packet suitable for storage across calls.
pub type OwnedPacket = Packet<'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_creation() {
        let packet = Packet::new(vec![0u8; 64]);
        assert_eq!(packet.size(), 64);
        assert!(!packet.is_empty());
        assert_eq!(packet.config_index, 1);
    }

    #[test]
    fn test_packet_flags() {
        let mut packet = Packet::empty();
        assert!(!packet.is_random_access());
        packet.set_random_access(true);
        assert!(packet.is_random_access());
        packet.flags.insert(PacketFlags::LEADING);
        assert!(packet.is_leading());
    }

    #[test]
    fn test_packet_into_owned() {
        let data = [1u8, 2, 3];
        let packet = Packet::from_slice(&data);
        let owned: OwnedPacket = packet.into_owned();
        assert_eq!(owned.data(), &[1, 2, 3]);
    }
}
