//! Key-time resolution
//!
//! Maps a normalized playback position in `[0, 1)` to the pair of key
//! indices bracketing it plus a blend weight. Two cadences:
//!
//! - **Uniform**: keys are evenly spaced across the timeline; the bracket is
//!   pure arithmetic.
//! - **Frame table**: each key records the animation frame it was sampled
//!   from; the bracket is found in the monotonically increasing table and
//!   the blend weight measures fractional position between the two keys'
//!   actual frame numbers, not their array indices.
//!
//! Looping sequences treat the last and first key as adjacent in time: the
//! bracket past the last key wraps `hi` to 0 and, for frame tables, the
//! elapsed-frame denominator wraps through the sequence's total frame count.
//!
//! Pure functions, no hidden state: identical inputs always resolve to the
//! same bracket.

use crate::format::read_u16;

/// Bracketing pair of key indices plus blend weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyBracket {
    pub lo: u32,
    pub hi: u32,
    /// Fractional position between `lo` and `hi`, in `[0, 1]`.
    pub alpha: f32,
}

impl KeyBracket {
    /// Single-key bracket: no interpolation.
    pub const fn single(index: u32) -> Self {
        Self {
            lo: index,
            hi: index,
            alpha: 0.0,
        }
    }
}

/// View over a track's frame-index table inside the compressed stream.
///
/// Entry width depends on the sequence's total frame count: 1 byte when it
/// fits in a u8, else 2 bytes. Entries are monotonically increasing frame
/// numbers, one per key.
#[derive(Debug, Clone, Copy)]
pub enum FrameTable<'a> {
    U8(&'a [u8]),
    /// Two native-endian bytes per entry.
    U16(&'a [u8]),
}

impl FrameTable<'_> {
    /// Entry width in bytes for a sequence with `frame_count` total frames.
    #[inline]
    pub const fn entry_width(frame_count: u32) -> usize {
        if frame_count <= u8::MAX as u32 { 1 } else { 2 }
    }

    /// Number of entries (equals the track's key count).
    pub fn len(&self) -> usize {
        match self {
            Self::U8(bytes) => bytes.len(),
            Self::U16(bytes) => bytes.len() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame number of entry `index`.
    pub fn entry(&self, index: usize) -> u32 {
        match self {
            Self::U8(bytes) => bytes[index] as u32,
            Self::U16(bytes) => read_u16(bytes, index * 2) as u32,
        }
    }
}

/// Resolve a normalized playback position to a bracketing key pair.
///
/// `relative_position` is playback time over duration, in `[0, 1)`;
/// `total_frames` is only consulted on the frame-table path. Passing a
/// position at or past 1.0 clamps to the end (non-looping) or blends the
/// last key toward the first (looping).
pub fn resolve(
    relative_position: f32,
    key_count: u32,
    frame_table: Option<&FrameTable>,
    total_frames: u32,
    looping: bool,
) -> KeyBracket {
    if key_count <= 1 {
        return KeyBracket::single(0);
    }
    let pos = relative_position.clamp(0.0, 1.0);

    match frame_table {
        None => resolve_uniform(pos, key_count, looping),
        Some(table) => {
            debug_assert_eq!(table.len() as u32, key_count);
            resolve_with_table(pos, table, total_frames, looping)
        }
    }
}

/// Uniform cadence: the bracket is arithmetic on the key index line.
fn resolve_uniform(pos: f32, key_count: u32, looping: bool) -> KeyBracket {
    // When looping, the last key still occupies a full interval back to the
    // first, so the position scale spans key_count rather than key_count - 1.
    let target = if looping {
        pos * key_count as f32
    } else {
        pos * (key_count - 1) as f32
    };

    let mut lo = target as u32;
    if lo >= key_count {
        lo = key_count - 1;
    }
    let alpha = target - lo as f32;

    if !looping && lo >= key_count - 1 {
        return KeyBracket::single(key_count - 1);
    }
    let hi = if looping && lo == key_count - 1 { 0 } else { lo + 1 };
    KeyBracket { lo, hi, alpha }
}

/// Frame-table cadence: bracket in frame-number space.
fn resolve_with_table(pos: f32, table: &FrameTable, total_frames: u32, looping: bool) -> KeyBracket {
    let key_count = table.len();
    let target = if looping {
        pos * total_frames as f32
    } else {
        pos * (total_frames.saturating_sub(1)) as f32
    };

    // First entry with frame number strictly greater than the target
    let mut left = 0usize;
    let mut right = key_count;
    while left < right {
        let mid = (left + right) / 2;
        if (table.entry(mid) as f32) <= target {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    if left == 0 {
        // Before the first sampled frame
        return KeyBracket::single(0);
    }
    let lo = left - 1;

    if left == key_count {
        // Past the last sampled frame
        if !looping {
            return KeyBracket::single(lo as u32);
        }
        let lo_frame = table.entry(lo) as f32;
        let span = total_frames as f32 - lo_frame;
        let alpha = if span > 0.0 { (target - lo_frame) / span } else { 0.0 };
        return KeyBracket {
            lo: lo as u32,
            hi: 0,
            alpha,
        };
    }

    let lo_frame = table.entry(lo) as f32;
    let hi_frame = table.entry(left) as f32;
    let span = hi_frame - lo_frame;
    let alpha = if span > 0.0 { (target - lo_frame) / span } else { 0.0 };
    KeyBracket {
        lo: lo as u32,
        hi: left as u32,
        alpha,
    }
}

/// Borrow a frame table region out of the compressed stream.
pub(crate) fn frame_table_view(data: &[u8], offset: usize, key_count: u32, frame_count: u32) -> FrameTable<'_> {
    let width = FrameTable::entry_width(frame_count);
    let bytes = &data[offset..offset + key_count as usize * width];
    if width == 1 {
        FrameTable::U8(bytes)
    } else {
        FrameTable::U16(bytes)
    }
}
