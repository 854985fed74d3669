//! Host output sinks.
//!
//! Each host adapter consumes frames in a different shape: packed BGRA
//! rows (optionally bottom-up) for editing hosts, planar YUV for scripting
//! hosts, or the decoder's native frame untouched. The set is closed and a
//! sink is selected once, at track-open time.

use crate::video::FrameConverter;
use frameserve_core::error::Result;
use frameserve_core::frame::{Frame, PixelFormat};

/// Output geometry a sink will produce for given source dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Delivered pixel format.
    pub format: PixelFormat,
    /// Whether rows are delivered bottom-up.
    pub bottom_up: bool,
}

/// The closed set of host output shapes.
pub enum OutputSink {
    /// Packed BGRA, as editing hosts expect. `bottom_up` flips row order.
    PackedBgra {
        /// Deliver rows bottom-up.
        bottom_up: bool,
        converter: FrameConverter,
    },
    /// Planar YUV 4:2:0, as scripting hosts expect.
    PlanarYuv { converter: FrameConverter },
    /// The decoded frame as-is.
    Native,
}

impl OutputSink {
    /// A packed-BGRA sink.
    pub fn packed_bgra(bottom_up: bool) -> Self {
        Self::PackedBgra {
            bottom_up,
            converter: FrameConverter::new(),
        }
    }

    /// A planar-YUV sink.
    pub fn planar_yuv() -> Self {
        Self::PlanarYuv {
            converter: FrameConverter::new(),
        }
    }

    /// A native pass-through sink.
    pub fn native() -> Self {
        Self::Native
    }

    /// Compute the layout this sink produces for a source frame shape.
    pub fn layout(&self, width: u32, height: u32, source: PixelFormat) -> OutputLayout {
        match self {
            Self::PackedBgra { bottom_up, .. } => OutputLayout {
                width,
                height,
                format: PixelFormat::Bgra,
                bottom_up: *bottom_up,
            },
            Self::PlanarYuv { .. } => OutputLayout {
                width,
                height,
                format: PixelFormat::Yuv420p,
                bottom_up: false,
            },
            Self::Native => OutputLayout {
                width,
                height,
                format: source,
                bottom_up: false,
            },
        }
    }

    /// Render a decoded frame into this sink's shape. The frame is borrowed
    /// for the duration of the call; the returned frame is host-owned.
    pub fn render(&mut self, frame: &Frame) -> Result<Frame> {
        match self {
            Self::PackedBgra { bottom_up, converter } => {
                let mut out = converter.convert(frame, PixelFormat::Bgra)?;
                if *bottom_up {
                    flip_rows(&mut out);
                }
                Ok(out)
            }
            Self::PlanarYuv { converter } => converter.convert(frame, PixelFormat::Yuv420p),
            Self::Native => Ok(frame.clone()),
        }
    }
}

fn flip_rows(frame: &mut Frame) {
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    if let Some(plane) = frame.plane_mut(0) {
        for row in 0..height / 2 {
            let (top, bottom) = plane.split_at_mut((height - 1 - row) * stride);
            top[row * stride..row * stride + stride]
                .swap_with_slice(&mut bottom[..stride]);
        }
    }
}
