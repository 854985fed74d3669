//! # frameserve-engine
//!
//! The frame-accurate random-access engines and the host-facing track API.
//!
//! The video engine serves "give me presentation frame N" by locating the
//! right random access point, replaying decode forward through the
//! pipeline delay, and retrying from earlier RAPs with a bounded budget.
//! The audio engine serves "give me PCM samples [start, start+len)" by
//! inverting the PCM timeline onto the container's frame grid with
//! pre-roll and post-seek verification. The session owns both behind the
//! open/get/count/close surface hosts integrate against.

pub mod audio;
pub mod heuristics;
pub mod options;
mod seek;
pub mod session;
pub mod stats;
pub mod video;

pub use audio::AudioEngine;
pub use options::{SeekSafety, SinkKind, TrackOptions};
pub use session::{SharedTrack, TrackSelector, TrackSession};
pub use stats::TrackStats;
pub use video::{EngineState, VideoEngine};
