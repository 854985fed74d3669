//! Audio sample format conversion.
//!
//! The audio engine works internally in interleaved f32; these routines
//! bridge to and from whatever the decoder produced and the host requested.

use frameserve_core::error::{Error, Result};
use frameserve_core::sample::{ChannelLayout, Sample, SampleFormat};

/// Convert any supported buffer into interleaved f32 frames.
pub fn to_f32_interleaved(sample: &Sample) -> Result<Vec<f32>> {
    let channels = sample.channels() as usize;
    let frames = sample.num_samples();
    let mut out = vec![0.0f32; frames * channels];

    if sample.format().is_planar() {
        for ch in 0..channels {
            let plane = sample
                .channel(ch as u32)
                .ok_or_else(|| Error::invalid_param("missing channel plane"))?;
            for frame in 0..frames {
                out[frame * channels + ch] =
                    read_value(plane, frame, sample.format().to_packed())?;
            }
        }
    } else {
        let data = sample.data();
        for i in 0..frames * channels {
            out[i] = read_value(data, i, sample.format())?;
        }
    }
    Ok(out)
}

/// Build a buffer in the requested format from interleaved f32 frames.
pub fn from_f32_interleaved(
    input: &[f32],
    format: SampleFormat,
    layout: ChannelLayout,
    sample_rate: u32,
) -> Result<Sample> {
    let channels = layout.channels() as usize;
    if channels == 0 || input.len() % channels != 0 {
        return Err(Error::invalid_param("input not aligned to channel count"));
    }
    let frames = input.len() / channels;
    let mut sample = Sample::new(frames, format, layout, sample_rate);

    if format.is_planar() {
        for ch in 0..channels {
            let plane = sample
                .buffer_mut()
                .channel_mut(ch as u32)
                .ok_or_else(|| Error::invalid_param("missing channel plane"))?;
            for frame in 0..frames {
                write_value(plane, frame, format.to_packed(), input[frame * channels + ch]);
            }
        }
    } else {
        let data = sample.data_mut();
        for (i, &value) in input.iter().enumerate() {
            write_value(data, i, format, value);
        }
    }
    Ok(sample)
}

fn read_value(data: &[u8], index: usize, format: SampleFormat) -> Result<f32> {
    let size = format.bytes_per_sample();
    let base = index * size;
    let bytes = data
        .get(base..base + size)
        .ok_or_else(|| Error::invalid_param("sample buffer too short"))?;
    Ok(match format {
        SampleFormat::U8 => (bytes[0] as f32 - 128.0) / 128.0,
        SampleFormat::S16 => {
            i16::from_le_bytes(bytes.try_into().unwrap()) as f32 / i16::MAX as f32
        }
        SampleFormat::S32 => {
            i32::from_le_bytes(bytes.try_into().unwrap()) as f32 / i32::MAX as f32
        }
        SampleFormat::F32 => f32::from_le_bytes(bytes.try_into().unwrap()),
        // Planar formats are dispatched through their packed equivalent.
        _ => return Err(Error::invalid_param("unexpected planar format")),
    })
}

fn write_value(data: &mut [u8], index: usize, format: SampleFormat, value: f32) {
    let size = format.bytes_per_sample();
    let base = index * size;
    let clamped = value.clamp(-1.0, 1.0);
    match format {
        SampleFormat::U8 => {
            data[base] = ((clamped * 127.0) + 128.0).round().clamp(0.0, 255.0) as u8;
        }
        SampleFormat::S16 => {
            let v = (clamped * i16::MAX as f32).round() as i16;
            data[base..base + 2].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::S32 => {
            let v = (clamped as f64 * i32::MAX as f64).round() as i32;
            data[base..base + 4].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::F32 => {
            data[base..base + 4].copy_from_slice(&value.to_le_bytes());
        }
        _ => unreachable!("planar formats dispatch through packed equivalents"),
    }
}
