//! Decoded video frame buffers.

use crate::timestamp::{Duration, Timestamp};
use bitflags::bitflags;
use std::fmt;

/// Pixel format for decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp.
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp.
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp.
    Yuv444p,
    /// Planar YUV 4:2:0, 10-bit little endian.
    Yuv420p10le,
    /// Y plane + interleaved UV plane.
    Nv12,
    /// Packed RGB, 24bpp.
    Rgb24,
    /// Packed BGRA, 32bpp.
    Bgra,
    /// Grayscale, 8bpp.
    Gray8,
}

impl PixelFormat {
    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuv420p10le => 3,
            Self::Nv12 => 2,
            Self::Rgb24 | Self::Bgra | Self::Gray8 => 1,
        }
    }

    /// Check if this is a planar YUV format.
    pub fn is_planar_yuv(&self) -> bool {
        matches!(
            self,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuv420p10le
        )
    }

    /// Check if this format stores more than 8 bits per component.
    pub fn is_high_depth(&self) -> bool {
        matches!(self, Self::Yuv420p10le)
    }

    /// Get chroma subsampling factors (horizontal, vertical).
    pub fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuv420p10le | Self::Nv12 => (2, 2),
            Self::Yuv422p => (2, 1),
            _ => (1, 1),
        }
    }

    /// Bytes per sample in one plane.
    pub fn bytes_per_component(&self) -> usize {
        if self.is_high_depth() {
            2
        } else {
            1
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Nv12 => "nv12",
            Self::Rgb24 => "rgb24",
            Self::Bgra => "bgra",
            Self::Gray8 => "gray8",
        };
        write!(f, "{}", s)
    }
}

/// Color space for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// BT.601 (SD video).
    #[default]
    Bt601,
    /// BT.709 (HD video).
    Bt709,
}

/// Color range (limited/full).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorRange {
    /// Limited/TV range (16-235 for Y, 16-240 for UV).
    #[default]
    Limited,
    /// Full/PC range (0-255).
    Full,
}

bitflags! {
    /// Frame flags indicating frame properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        /// Decoded from a random access point.
        const KEYFRAME = 0x0001;
        /// Frame is corrupted or incomplete.
        const CORRUPT = 0x0002;
        /// Substituted fallback frame; content is black, not decoded data.
        const BLANK = 0x0004;
    }
}

/// A decoded video frame.
#[derive(Clone)]
pub struct Frame {
    /// Frame data buffer.
    buffer: FrameBuffer,
    /// Presentation timestamp (composition time).
    pub pts: Timestamp,
    /// Frame duration.
    pub duration: Duration,
    /// Frame flags.
    pub flags: FrameFlags,
}

impl Frame {
    /// Create a new zero-filled frame.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            buffer: FrameBuffer::new(width, height, format),
            pts: Timestamp::none(),
            duration: Duration::zero(),
            flags: FrameFlags::empty(),
        }
    }

    /// Create a frame from an existing buffer.
    pub fn from_buffer(buffer: FrameBuffer) -> Self {
        Self {
            buffer,
            pts: Timestamp::none(),
            duration: Duration::zero(),
            flags: FrameFlags::empty(),
        }
    }

    /// Create the designated blank fallback frame: black content with the
    /// [`FrameFlags::BLANK`] flag set.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let mut frame = Self::new(width, height, format);
        frame.buffer.fill_black();
        frame.flags = FrameFlags::BLANK;
        frame
    }

    /// Get the frame width.
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Get the frame height.
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Get the pixel format.
    pub fn format(&self) -> PixelFormat {
        self.buffer.format
    }

    /// Check if this is the substituted fallback frame.
    pub fn is_blank(&self) -> bool {
        self.flags.contains(FrameFlags::BLANK)
    }

    /// Get the frame buffer.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Get a mutable reference to the frame buffer.
    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.buffer.plane(index)
    }

    /// Get a mutable reference to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.buffer.plane_mut(index)
    }

    /// Get the stride (bytes per row) for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.buffer.stride(plane)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts)
            .field("flags", &self.flags)
            .finish()
    }
}

/// A buffer for storing frame pixel data.
#[derive(Clone)]
pub struct FrameBuffer {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Color space.
    pub color_space: ColorSpace,
    /// Color range.
    pub color_range: ColorRange,
    /// Plane data.
    planes: Vec<PlaneData>,
}

#[derive(Clone)]
struct PlaneData {
    data: Vec<u8>,
    stride: usize,
}

impl FrameBuffer {
    /// Create a new zero-filled frame buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let (hsub, vsub) = format.chroma_subsampling();
        let bps = format.bytes_per_component();

        let mut planes = Vec::with_capacity(format.num_planes());
        for plane in 0..format.num_planes() {
            let (plane_width, plane_height) = plane_dimensions(
                width as usize,
                height as usize,
                format,
                plane,
                hsub as usize,
                vsub as usize,
            );
            let row_bytes = match format {
                PixelFormat::Rgb24 => plane_width * 3,
                PixelFormat::Bgra => plane_width * 4,
                _ => plane_width * bps,
            };
            // Align stride to 32 bytes
            let stride = (row_bytes + 31) & !31;
            planes.push(PlaneData {
                data: vec![0u8; stride * plane_height],
                stride,
            });
        }

        Self {
            width,
            height,
            format,
            color_space: ColorSpace::default(),
            color_range: ColorRange::default(),
            planes,
        }
    }

    /// Get the number of planes.
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(|p| p.data.as_slice())
    }

    /// Get a mutable reference to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(index).map(|p| p.data.as_mut_slice())
    }

    /// Get the stride for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.planes.get(plane).map(|p| p.stride).unwrap_or(0)
    }

    /// Height in rows of the given plane.
    pub fn plane_height(&self, plane: usize) -> usize {
        let (_, vsub) = self.format.chroma_subsampling();
        plane_dimensions(
            self.width as usize,
            self.height as usize,
            self.format,
            plane,
            self.format.chroma_subsampling().0 as usize,
            vsub as usize,
        )
        .1
    }

    /// Fill with black (luma floor, chroma mid-point for YUV; zeros for
    /// packed RGB formats).
    pub fn fill_black(&mut self) {
        match self.format {
            PixelFormat::Yuv420p | PixelFormat::Yuv422p | PixelFormat::Yuv444p => {
                if let Some(y) = self.plane_mut(0) {
                    y.fill(16);
                }
                for i in 1..3 {
                    if let Some(c) = self.plane_mut(i) {
                        c.fill(128);
                    }
                }
            }
            PixelFormat::Nv12 => {
                if let Some(y) = self.plane_mut(0) {
                    y.fill(16);
                }
                if let Some(uv) = self.plane_mut(1) {
                    uv.fill(128);
                }
            }
            PixelFormat::Yuv420p10le => {
                // 10-bit: luma floor 64, chroma mid-point 512, little endian
                fill_u16(self.plane_mut(0), 64);
                fill_u16(self.plane_mut(1), 512);
                fill_u16(self.plane_mut(2), 512);
            }
            PixelFormat::Rgb24 | PixelFormat::Bgra | PixelFormat::Gray8 => {
                if let Some(p) = self.plane_mut(0) {
                    p.fill(0);
                }
            }
        }
    }
}

fn plane_dimensions(
    width: usize,
    height: usize,
    format: PixelFormat,
    plane: usize,
    hsub: usize,
    vsub: usize,
) -> (usize, usize) {
    if plane == 0 {
        return (width, height);
    }
    match format {
        PixelFormat::Nv12 => (width, height.div_ceil(2)),
        _ => (width.div_ceil(hsub), height.div_ceil(vsub)),
    }
}

fn fill_u16(plane: Option<&mut [u8]>, value: u16) {
    if let Some(p) = plane {
        for pair in p.chunks_exact_mut(2) {
            pair.copy_from_slice(&value.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_planes() {
        let buf = FrameBuffer::new(64, 48, PixelFormat::Yuv420p);
        assert_eq!(buf.num_planes(), 3);
        assert_eq!(buf.stride(0), 64);
        assert_eq!(buf.plane(0).unwrap().len(), 64 * 48);
        assert_eq!(buf.plane(1).unwrap().len(), 32 * 24);
    }

    #[test]
    fn test_stride_alignment() {
        let buf = FrameBuffer::new(33, 16, PixelFormat::Gray8);
        // 33 rounds up to the next 32-byte boundary
        assert_eq!(buf.stride(0), 64);
    }

    #[test]
    fn test_blank_frame() {
        let frame = Frame::blank(16, 16, PixelFormat::Yuv420p);
        assert!(frame.is_blank());
        assert!(frame.plane(0).unwrap().iter().all(|&b| b == 16));
        assert!(frame.plane(1).unwrap().iter().all(|&b| b == 128));
    }

    #[test]
    fn test_odd_dimensions_chroma() {
        let buf = FrameBuffer::new(63, 47, PixelFormat::Yuv420p);
        // Chroma planes round up
        assert_eq!(buf.plane_height(1), 24);
    }
}
