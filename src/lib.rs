//! Compressed skeletal-animation keyframe codec
//!
//! Per-bone rotation and translation curves packed into one of several
//! quantized binary layouts, decoded back to bone transforms at arbitrary
//! playback times. The compressed stream is produced by the asset pipeline;
//! this crate owns decode, key-time resolution, and the byte-order-correct
//! wire import/export path. The authoring-side compressor is out of scope.
//!
//! # Pieces
//!
//! - [`format`] — the quantization formats: per-key byte layouts, constant
//!   stride tables, pure unpack math (and pack helpers for tests/tooling)
//! - [`resolver`] — playback position → bracketing key pair + blend weight,
//!   for uniform and frame-table cadences, with loop wrap-around
//! - [`sequence`] — [`AnimSequence`]: compressed buffer, track offset
//!   table, encoding family, bind-time codec dispatch
//! - [`codec`] (internal) — the three track-decoder families behind
//!   [`AnimSequence::decode_one`] and [`AnimSequence::decode_pose`]
//! - [`swap`] — wire import/export, little-endian, `0x55`-padded, with the
//!   legacy-layout shim
//! - [`stats`] — read-only footprint diagnostics
//!
//! # Usage
//!
//! ```no_run
//! use nether_anim::{AnimSequence, TrackTable, TrackEncoding, KeyFormat};
//!
//! # let (buffer, offsets) = (Vec::new(), Vec::new());
//! let mut seq = AnimSequence::new(
//!     buffer,
//!     TrackTable::Standard(offsets),
//!     TrackEncoding::Uniform,
//!     KeyFormat::Float32,
//!     KeyFormat::Raw,
//!     60,   // frames
//!     1.0,  // seconds
//! );
//! seq.bind().expect("unrecognized codec declaration");
//! let pose = seq.decode_one(0, 0.5, false);
//! # let _ = pose;
//! ```
//!
//! Decode is a pure read: any number of threads may decode the same bound
//! sequence concurrently. [`swap::import`] and [`swap::export`] mutate or
//! walk the buffer and must be excluded from decode by the caller's
//! load/unload boundary. Nothing here blocks or performs I/O.

mod codec;
pub mod error;
pub mod format;
pub mod resolver;
pub mod sequence;
pub mod stats;
pub mod swap;

pub use error::CodecError;
pub use format::{
    ALL_AXES, AXIS_X, AXIS_Y, AXIS_Z, KeyFormat, TrackKind, pack_fixed16, pack_fixed32,
    pack_float3, pack_float32, pack_interval_key, pack_interval_meta, pack_raw_rotation,
    pack_raw_translation, unpack_rotation, unpack_translation,
};
pub use resolver::{FrameTable, KeyBracket, resolve};
pub use sequence::{
    AnimSequence, BonePose, BoundCodec, KEY_COUNT_MAX, NO_TRACK_DATA, PerTrackOffsets,
    StandardTrack, TrackEncoding, TrackHeader, TrackSlot, TrackTable,
};
pub use stats::{SequenceStats, sequence_stats};
pub use swap::{LEGACY_IMPLICIT_INTERVAL_VERSION, PAD_BYTE, WIRE_VERSION, export, import};
