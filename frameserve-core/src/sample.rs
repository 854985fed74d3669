//! Decoded audio sample buffers.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use std::fmt;

/// Sample format for audio data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit, native endian.
    S16,
    /// Signed 32-bit, native endian.
    S32,
    /// 32-bit float.
    F32,
    /// Signed 16-bit planar.
    S16p,
    /// Signed 32-bit planar.
    S32p,
    /// 32-bit float planar.
    F32p,
}

impl SampleFormat {
    /// Get the number of bytes per sample.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 | Self::S16p => 2,
            Self::S32 | Self::S32p | Self::F32 | Self::F32p => 4,
        }
    }

    /// Check if this is a planar format.
    pub fn is_planar(&self) -> bool {
        matches!(self, Self::S16p | Self::S32p | Self::F32p)
    }

    /// Get the packed equivalent of this format.
    pub fn to_packed(&self) -> Self {
        match self {
            Self::S16p => Self::S16,
            Self::S32p => Self::S32,
            Self::F32p => Self::F32,
            other => *other,
        }
    }

    /// The byte value silence is filled with: the format-appropriate
    /// zero/mid-point (0x80 for unsigned 8-bit, zero bytes otherwise).
    pub fn silence_byte(&self) -> u8 {
        match self {
            Self::U8 => 0x80,
            _ => 0,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::S16p => "s16p",
            Self::S32p => "s32p",
            Self::F32p => "fltp",
        };
        write!(f, "{}", s)
    }
}

/// Channel layout for audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Mono (1 channel).
    Mono,
    /// Stereo (2 channels: left, right).
    #[default]
    Stereo,
    /// 5.1 (6 channels).
    Surround51,
    /// Custom layout with specified channel count.
    Custom(u32),
}

impl ChannelLayout {
    /// Get the number of channels.
    pub fn channels(&self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround51 => 6,
            Self::Custom(n) => *n,
        }
    }

    /// Create a layout from channel count.
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            1 => Self::Mono,
            2 => Self::Stereo,
            6 => Self::Surround51,
            n => Self::Custom(n),
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "mono"),
            Self::Stereo => write!(f, "stereo"),
            Self::Surround51 => write!(f, "5.1"),
            Self::Custom(n) => write!(f, "{}ch", n),
        }
    }
}

/// A decoded audio sample buffer.
#[derive(Clone)]
pub struct Sample {
    /// Sample data buffer.
    buffer: SampleBuffer,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Duration of this sample buffer.
    pub duration: Duration,
}

impl Sample {
    /// Create a new zero-filled sample buffer.
    pub fn new(
        num_samples: usize,
        format: SampleFormat,
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        Self {
            buffer: SampleBuffer::new(num_samples, format, layout, sample_rate),
            pts: Timestamp::none(),
            duration: Duration::zero(),
        }
    }

    /// Create from an existing buffer.
    pub fn from_buffer(buffer: SampleBuffer) -> Self {
        let duration = buffer.duration();
        Self {
            buffer,
            pts: Timestamp::none(),
            duration,
        }
    }

    /// Create a buffer filled with format-appropriate silence.
    pub fn silence(
        num_samples: usize,
        format: SampleFormat,
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        let mut sample = Self::new(num_samples, format, layout, sample_rate);
        let fill = format.silence_byte();
        if fill != 0 {
            for ch in &mut sample.buffer.data {
                ch.fill(fill);
            }
        }
        sample
    }

    /// Get the number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.buffer.num_samples
    }

    /// Get the sample format.
    pub fn format(&self) -> SampleFormat {
        self.buffer.format
    }

    /// Get the channel layout.
    pub fn channel_layout(&self) -> ChannelLayout {
        self.buffer.layout
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    /// Get the number of channels.
    pub fn channels(&self) -> u32 {
        self.buffer.layout.channels()
    }

    /// Get the underlying buffer.
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Get a mutable reference to the buffer.
    pub fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut self.buffer
    }

    /// Get a channel's data (planar formats).
    pub fn channel(&self, index: u32) -> Option<&[u8]> {
        self.buffer.channel(index)
    }

    /// Get interleaved data (packed formats).
    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    /// Get mutable interleaved data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.buffer.data_mut()
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("num_samples", &self.num_samples())
            .field("format", &self.format())
            .field("layout", &self.channel_layout())
            .field("sample_rate", &self.sample_rate())
            .field("pts", &self.pts)
            .finish()
    }
}

/// Buffer for storing audio sample data.
#[derive(Clone)]
pub struct SampleBuffer {
    /// Number of samples per channel.
    pub num_samples: usize,
    /// Sample format.
    pub format: SampleFormat,
    /// Channel layout.
    pub layout: ChannelLayout,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Sample data (planar: one Vec per channel, packed: single Vec).
    data: Vec<Vec<u8>>,
}

impl SampleBuffer {
    /// Create a new zero-filled sample buffer.
    pub fn new(
        num_samples: usize,
        format: SampleFormat,
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        let bytes_per_sample = format.bytes_per_sample();
        let channels = layout.channels() as usize;

        let data = if format.is_planar() {
            (0..channels)
                .map(|_| vec![0u8; num_samples * bytes_per_sample])
                .collect()
        } else {
            vec![vec![0u8; num_samples * channels * bytes_per_sample]]
        };

        Self {
            num_samples,
            format,
            layout,
            sample_rate,
            data,
        }
    }

    /// Get the duration of this buffer.
    pub fn duration(&self) -> Duration {
        Duration::new(
            self.num_samples as i64,
            TimeBase::media(self.sample_rate.max(1)),
        )
    }

    /// Get a channel's data (planar formats).
    pub fn channel(&self, index: u32) -> Option<&[u8]> {
        if self.format.is_planar() {
            self.data.get(index as usize).map(|v| v.as_slice())
        } else {
            None
        }
    }

    /// Get interleaved data (packed formats). Empty for planar formats.
    pub fn data(&self) -> &[u8] {
        if self.format.is_planar() {
            &[]
        } else {
            self.data.first().map(|v| v.as_slice()).unwrap_or(&[])
        }
    }

    /// Get mutable interleaved data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        if self.format.is_planar() {
            &mut []
        } else {
            self.data.first_mut().map(|v| v.as_mut_slice()).unwrap_or(&mut [])
        }
    }

    /// Get a mutable channel slice (planar formats).
    pub fn channel_mut(&mut self, index: u32) -> Option<&mut [u8]> {
        if self.format.is_planar() {
            self.data.get_mut(index as usize).map(|v| v.as_mut_slice())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_buffer_layout() {
        let buf = SampleBuffer::new(100, SampleFormat::S16, ChannelLayout::Stereo, 48000);
        assert_eq!(buf.data().len(), 100 * 2 * 2);
        assert!(buf.channel(0).is_none());
    }

    #[test]
    fn test_planar_buffer_layout() {
        let buf = SampleBuffer::new(100, SampleFormat::F32p, ChannelLayout::Stereo, 48000);
        assert_eq!(buf.channel(0).unwrap().len(), 400);
        assert_eq!(buf.channel(1).unwrap().len(), 400);
        assert!(buf.channel(2).is_none());
        assert!(buf.data().is_empty());
    }

    #[test]
    fn test_silence_midpoint_for_u8() {
        let s = Sample::silence(10, SampleFormat::U8, ChannelLayout::Mono, 8000);
        assert!(s.data().iter().all(|&b| b == 0x80));

        let s = Sample::silence(10, SampleFormat::S16, ChannelLayout::Mono, 8000);
        assert!(s.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_buffer_duration() {
        let buf = SampleBuffer::new(48000, SampleFormat::F32, ChannelLayout::Mono, 48000);
        assert_eq!(buf.duration().to_seconds(), 1.0);
    }
}
