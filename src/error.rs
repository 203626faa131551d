//! Codec error type
//!
//! All failures here are load-time conditions: an unrecognized id or a
//! malformed stream aborts loading the sequence. Once a sequence is bound,
//! decode has no failure mode — data-corruption invariants (misaligned
//! offsets, out-of-range track indices) are `debug_assert!`s.

use crate::format::KeyFormat;

/// Errors raised while binding a sequence or importing its wire stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Track encoding family id not known to this build.
    #[error("unknown track encoding family id {0}")]
    UnknownEncoding(u8),

    /// Key format id not known to this build.
    #[error("unknown key format id {0}")]
    UnknownFormat(u8),

    /// A rotation-only key format was declared for translation tracks.
    #[error("key format {0:?} stores rotations only and cannot carry translation tracks")]
    RotationOnlyFormat(KeyFormat),

    /// Track table shape does not match the declared encoding family.
    #[error("track table shape does not match the declared encoding family")]
    TrackTableMismatch,

    /// Wire stream ended before a section was fully read.
    #[error("compressed stream truncated at byte {offset}: need {need} more bytes, have {have}")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },

    /// Alignment padding did not hold the `0x55` sentinel.
    #[error("corrupt alignment padding at byte {offset}")]
    CorruptPadding { offset: usize },

    /// Per-track header key count exceeds the 24-bit field.
    #[error("per-track key count {0} exceeds the 24-bit header limit")]
    KeyCountOverflow(u32),
}
