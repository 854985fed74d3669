//! # frameserve-core
//!
//! Core value types shared by the frameserve crates: the error hierarchy,
//! rational/timestamp math, compressed packets, and decoded frame/sample
//! buffers.

pub mod error;
pub mod frame;
pub mod packet;
pub mod rational;
pub mod sample;
pub mod timestamp;

pub use error::{CodecError, DecodeError, Error, IndexError, Result};
pub use frame::{ColorRange, ColorSpace, Frame, FrameBuffer, FrameFlags, PixelFormat};
pub use packet::{OwnedPacket, Packet, PacketFlags};
pub use rational::{rescale_ceil, rescale_floor, Rational};
pub use sample::{ChannelLayout, Sample, SampleBuffer, SampleFormat};
pub use timestamp::{Duration, TimeBase, Timestamp};
