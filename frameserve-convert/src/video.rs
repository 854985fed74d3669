//! Pixel format conversion.
//!
//! A static compatibility table maps (source, requested) pairs to scalar
//! conversion routines. BT.601 limited range throughout.

use frameserve_core::error::{Error, Result};
use frameserve_core::frame::{Frame, PixelFormat};

type ConvertFn = fn(&Frame, &mut Frame);

/// Supported (source, target) conversions.
static CONVERSIONS: &[(PixelFormat, PixelFormat, ConvertFn)] = &[
    (PixelFormat::Yuv420p, PixelFormat::Nv12, yuv420p_to_nv12),
    (PixelFormat::Nv12, PixelFormat::Yuv420p, nv12_to_yuv420p),
    (PixelFormat::Yuv420p, PixelFormat::Bgra, yuv420p_to_bgra),
    (PixelFormat::Yuv422p, PixelFormat::Yuv420p, yuv422p_to_yuv420p),
    (PixelFormat::Yuv420p10le, PixelFormat::Yuv420p, yuv420p10_to_yuv420p),
    (PixelFormat::Gray8, PixelFormat::Bgra, gray8_to_bgra),
];

/// Whether a conversion between the two formats is available. Identity is
/// always available.
pub fn conversion_supported(source: PixelFormat, target: PixelFormat) -> bool {
    source == target
        || CONVERSIONS
            .iter()
            .any(|(s, t, _)| *s == source && *t == target)
}

/// Converts frames through the static table, reusing its output allocation
/// when consecutive frames share dimensions and format.
#[derive(Default)]
pub struct FrameConverter {
    scratch: Option<Frame>,
}

impl FrameConverter {
    /// A converter with no cached buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `frame` to `target`, carrying timing and flags over.
    pub fn convert(&mut self, frame: &Frame, target: PixelFormat) -> Result<Frame> {
        if frame.format() == target {
            return Ok(frame.clone());
        }
        let routine = CONVERSIONS
            .iter()
            .find(|(s, t, _)| *s == frame.format() && *t == target)
            .map(|(_, _, f)| *f)
            .ok_or_else(|| {
                Error::invalid_param(format!(
                    "no conversion from {} to {}",
                    frame.format(),
                    target
                ))
            })?;

        let mut out = match self.scratch.take() {
            Some(f)
                if f.width() == frame.width()
                    && f.height() == frame.height()
                    && f.format() == target =>
            {
                f
            }
            _ => Frame::new(frame.width(), frame.height(), target),
        };
        routine(frame, &mut out);
        out.pts = frame.pts;
        out.duration = frame.duration;
        out.flags = frame.flags;

        // Keep one spare allocation for the next call.
        self.scratch = Some(Frame::new(frame.width(), frame.height(), target));
        Ok(out)
    }
}

fn yuv420p_to_nv12(src: &Frame, dst: &mut Frame) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let cw = width.div_ceil(2);
    let ch = height.div_ceil(2);

    copy_plane(src, 0, dst, 0, width, height);

    let su = src.plane(1).unwrap_or(&[]);
    let sv = src.plane(2).unwrap_or(&[]);
    let sstride = src.stride(1);
    let dstride = dst.stride(1);
    if let Some(uv) = dst.plane_mut(1) {
        for row in 0..ch {
            for col in 0..cw {
                uv[row * dstride + col * 2] = su[row * sstride + col];
                uv[row * dstride + col * 2 + 1] = sv[row * sstride + col];
            }
        }
    }
}

fn nv12_to_yuv420p(src: &Frame, dst: &mut Frame) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let cw = width.div_ceil(2);
    let ch = height.div_ceil(2);

    copy_plane(src, 0, dst, 0, width, height);

    let suv = src.plane(1).unwrap_or(&[]);
    let sstride = src.stride(1);
    let ustride = dst.stride(1);
    let vstride = dst.stride(2);
    // Split the interleaved plane; the two destination planes cannot be
    // borrowed at once, so run twice.
    if let Some(du) = dst.plane_mut(1) {
        for row in 0..ch {
            for col in 0..cw {
                du[row * ustride + col] = suv[row * sstride + col * 2];
            }
        }
    }
    if let Some(dv) = dst.plane_mut(2) {
        for row in 0..ch {
            for col in 0..cw {
                dv[row * vstride + col] = suv[row * sstride + col * 2 + 1];
            }
        }
    }
}

fn yuv420p_to_bgra(src: &Frame, dst: &mut Frame) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let sy = src.plane(0).unwrap_or(&[]);
    let su = src.plane(1).unwrap_or(&[]);
    let sv = src.plane(2).unwrap_or(&[]);
    let ys = src.stride(0);
    let cs = src.stride(1);
    let ds = dst.stride(0);

    if let Some(out) = dst.plane_mut(0) {
        for row in 0..height {
            for col in 0..width {
                let y = sy[row * ys + col] as i32;
                let u = su[(row / 2) * cs + col / 2] as i32 - 128;
                let v = sv[(row / 2) * cs + col / 2] as i32 - 128;
                // BT.601 limited range, fixed point.
                let c = (y - 16) * 298;
                let r = (c + 409 * v + 128) >> 8;
                let g = (c - 100 * u - 208 * v + 128) >> 8;
                let b = (c + 516 * u + 128) >> 8;
                let base = row * ds + col * 4;
                out[base] = b.clamp(0, 255) as u8;
                out[base + 1] = g.clamp(0, 255) as u8;
                out[base + 2] = r.clamp(0, 255) as u8;
                out[base + 3] = 255;
            }
        }
    }
}

fn yuv422p_to_yuv420p(src: &Frame, dst: &mut Frame) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let cw = width.div_ceil(2);
    let ch = height.div_ceil(2);

    copy_plane(src, 0, dst, 0, width, height);

    // Average vertical chroma pairs.
    for plane in 1..3 {
        let sp = src.plane(plane).unwrap_or(&[]);
        let sstride = src.stride(plane);
        let dstride = dst.stride(plane);
        if let Some(dp) = dst.plane_mut(plane) {
            for row in 0..ch {
                let top = (row * 2).min(height - 1);
                let bottom = (row * 2 + 1).min(height - 1);
                for col in 0..cw {
                    let a = sp[top * sstride + col] as u16;
                    let b = sp[bottom * sstride + col] as u16;
                    dp[row * dstride + col] = ((a + b + 1) / 2) as u8;
                }
            }
        }
    }
}

fn yuv420p10_to_yuv420p(src: &Frame, dst: &mut Frame) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let cw = width.div_ceil(2);
    let ch = height.div_ceil(2);
    for plane in 0..3 {
        let (pw, ph) = if plane == 0 { (width, height) } else { (cw, ch) };
        let sp = src.plane(plane).unwrap_or(&[]);
        let sstride = src.stride(plane);
        let dstride = dst.stride(plane);
        if let Some(dp) = dst.plane_mut(plane) {
            for row in 0..ph {
                for col in 0..pw {
                    let lo = sp[row * sstride + col * 2] as u16;
                    let hi = sp[row * sstride + col * 2 + 1] as u16;
                    dp[row * dstride + col] = ((hi << 8 | lo) >> 2).min(255) as u8;
                }
            }
        }
    }
}

fn gray8_to_bgra(src: &Frame, dst: &mut Frame) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let sp = src.plane(0).unwrap_or(&[]);
    let sstride = src.stride(0);
    let dstride = dst.stride(0);
    if let Some(dp) = dst.plane_mut(0) {
        for row in 0..height {
            for col in 0..width {
                let g = sp[row * sstride + col];
                let base = row * dstride + col * 4;
                dp[base] = g;
                dp[base + 1] = g;
                dp[base + 2] = g;
                dp[base + 3] = 255;
            }
        }
    }
}

fn copy_plane(
    src: &Frame,
    src_plane: usize,
    dst: &mut Frame,
    dst_plane: usize,
    width: usize,
    height: usize,
) {
    let sp = src.plane(src_plane).unwrap_or(&[]);
    let sstride = src.stride(src_plane);
    let dstride = dst.stride(dst_plane);
    if let Some(dp) = dst.plane_mut(dst_plane) {
        for row in 0..height {
            dp[row * dstride..row * dstride + width]
                .copy_from_slice(&sp[row * sstride..row * sstride + width]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_always_supported() {
        assert!(conversion_supported(PixelFormat::Yuv420p, PixelFormat::Yuv420p));
        assert!(conversion_supported(PixelFormat::Bgra, PixelFormat::Bgra));
    }

    #[test]
    fn test_unsupported_pair_rejected() {
        assert!(!conversion_supported(PixelFormat::Bgra, PixelFormat::Yuv420p));
        let mut converter = FrameConverter::new();
        let frame = Frame::new(8, 8, PixelFormat::Bgra);
        assert!(converter.convert(&frame, PixelFormat::Yuv420p).is_err());
    }

    #[test]
    fn test_nv12_round_trip() {
        let mut frame = Frame::new(4, 4, PixelFormat::Yuv420p);
        frame.plane_mut(0).unwrap().fill(90);
        frame.plane_mut(1).unwrap().fill(100);
        frame.plane_mut(2).unwrap().fill(200);

        let mut converter = FrameConverter::new();
        let nv12 = converter.convert(&frame, PixelFormat::Nv12).unwrap();
        assert_eq!(nv12.format(), PixelFormat::Nv12);
        // Interleaved UV alternates the two fills.
        let uv = nv12.plane(1).unwrap();
        assert_eq!(uv[0], 100);
        assert_eq!(uv[1], 200);

        let back = converter.convert(&nv12, PixelFormat::Yuv420p).unwrap();
        for plane in 0..3 {
            let want = frame.plane(plane).unwrap();
            let got = back.plane(plane).unwrap();
            assert_eq!(want, got);
        }
    }

    #[test]
    fn test_black_yuv_maps_to_black_bgra() {
        let mut frame = Frame::new(2, 2, PixelFormat::Yuv420p);
        frame.plane_mut(0).unwrap().fill(16);
        frame.plane_mut(1).unwrap().fill(128);
        frame.plane_mut(2).unwrap().fill(128);

        let mut converter = FrameConverter::new();
        let bgra = converter.convert(&frame, PixelFormat::Bgra).unwrap();
        let px = bgra.plane(0).unwrap();
        assert_eq!(&px[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_conversion_preserves_timing() {
        use frameserve_core::{TimeBase, Timestamp};
        let mut frame = Frame::new(4, 4, PixelFormat::Yuv420p);
        frame.pts = Timestamp::new(42, TimeBase::media(30));
        let mut converter = FrameConverter::new();
        let out = converter.convert(&frame, PixelFormat::Nv12).unwrap();
        assert_eq!(out.pts.value, 42);
    }
}
