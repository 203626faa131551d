//! Animation sequence and codec binding
//!
//! An [`AnimSequence`] owns one contiguous compressed byte buffer plus the
//! out-of-band metadata needed to interpret it: a flat per-bone track offset
//! table, the declared encoding family, the sequence-wide key formats (the
//! self-describing family ignores these and reads per-track headers), the
//! total frame count, and the playable duration.
//!
//! # Buffer layout (native memory; wire layout matches, little-endian)
//! ```text
//! Per track, in table order (per bone: translation stream, then rotation):
//! [fixed metadata]   interval (min, range) f32 pairs, Interval32 only
//! [packed keys]      key_count × bytes_per_key
//! [pad to 4]         0x55 sentinel bytes
//! [frame table]      key_count × 1-or-2-byte frame numbers, when present
//! [pad to 4]         0x55 sentinel bytes
//! ```
//! The self-describing family prefixes each track with a 4-byte header word:
//! ```text
//! bits  0-23  key count
//! bits 24-27  key format id
//! bits 28-30  axis presence flags (X, Y, Z)
//! bit     31  frame table follows the keys
//! ```
//!
//! All track offsets are 4-byte aligned; a violation is asset-pipeline
//! corruption, checked by `debug_assert!` only.

use glam::{Quat, Vec3};
use tracing::debug;

use crate::codec;
use crate::error::CodecError;
use crate::format::{ALL_AXES, KeyFormat, TrackKind, read_u32};
use crate::resolver::FrameTable;

/// Sentinel offset in the self-describing table: no data, assume identity.
pub const NO_TRACK_DATA: u32 = u32::MAX;

/// Largest key count the 24-bit per-track header field can carry.
pub const KEY_COUNT_MAX: u32 = (1 << 24) - 1;

/// One decoded bone transform component pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl BonePose {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };
}

impl Default for BonePose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// (bone track index, output pose slot) pair for batch decode.
#[derive(Debug, Clone, Copy)]
pub struct TrackSlot {
    pub track: u32,
    pub slot: u32,
}

// ============================================================================
// Encoding family
// ============================================================================

/// Track encoding family declared per sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEncoding {
    /// Uniformly spaced keys, sequence-wide key format, no frame tables.
    Uniform,
    /// Sequence-wide key format; multi-key tracks carry a frame-index table.
    Variable,
    /// Per-track header declares format, key count, and flags.
    PerTrack,
}

impl TrackEncoding {
    pub const fn from_wire(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Uniform),
            1 => Some(Self::Variable),
            2 => Some(Self::PerTrack),
            _ => None,
        }
    }

    pub const fn wire_id(self) -> u8 {
        match self {
            Self::Uniform => 0,
            Self::Variable => 1,
            Self::PerTrack => 2,
        }
    }
}

// ============================================================================
// Track offset tables
// ============================================================================

/// Offset-table entry for the uniform/variable families: four integers per
/// bone. Offsets are byte positions into the sequence buffer.
#[derive(Debug, Clone, Copy)]
pub struct StandardTrack {
    pub trans_offset: u32,
    pub trans_keys: u32,
    pub rot_offset: u32,
    pub rot_keys: u32,
}

/// Offset-table entry for the self-describing family: two integers per bone,
/// either a byte offset or [`NO_TRACK_DATA`].
#[derive(Debug, Clone, Copy)]
pub struct PerTrackOffsets {
    pub trans_offset: u32,
    pub rot_offset: u32,
}

/// Flat per-bone track offset table, shaped by the encoding family.
#[derive(Debug, Clone)]
pub enum TrackTable {
    Standard(Vec<StandardTrack>),
    PerTrack(Vec<PerTrackOffsets>),
}

impl TrackTable {
    /// Number of bone tracks.
    pub fn len(&self) -> usize {
        match self {
            Self::Standard(entries) => entries.len(),
            Self::PerTrack(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the table itself occupies (counted as stream overhead).
    pub fn overhead_bytes(&self) -> usize {
        match self {
            Self::Standard(entries) => entries.len() * 16,
            Self::PerTrack(entries) => entries.len() * 8,
        }
    }
}

// ============================================================================
// Self-describing per-track header
// ============================================================================

/// Decoded per-track header word of the self-describing family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHeader {
    pub format: KeyFormat,
    pub key_count: u32,
    pub axis_flags: u8,
    pub has_frame_table: bool,
}

impl TrackHeader {
    pub const SIZE: usize = 4;

    /// Decode a header word. `None` if the format id is unknown.
    pub fn unpack(word: u32) -> Option<Self> {
        let format = KeyFormat::from_wire(((word >> 24) & 0xF) as u8)?;
        Some(Self {
            format,
            key_count: word & 0x00FF_FFFF,
            axis_flags: ((word >> 28) & 0x7) as u8,
            has_frame_table: word & 0x8000_0000 != 0,
        })
    }

    /// Encode the header word.
    pub fn pack(&self) -> Result<u32, CodecError> {
        if self.key_count > KEY_COUNT_MAX {
            return Err(CodecError::KeyCountOverflow(self.key_count));
        }
        let mut word = self.key_count;
        word |= (self.format.wire_id() as u32) << 24;
        word |= ((self.axis_flags & ALL_AXES) as u32) << 28;
        if self.has_frame_table {
            word |= 0x8000_0000;
        }
        Ok(word)
    }
}

// ============================================================================
// Track layout
// ============================================================================

#[inline]
pub(crate) const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Resolved byte layout of one track's sub-stream. Shared by the decoders,
/// the byte-swap walker, and the statistics pass so all three agree on
/// section boundaries without decoding key values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrackLayout {
    pub format: KeyFormat,
    pub axis_flags: u8,
    pub key_count: u32,
    pub meta_offset: usize,
    pub meta_len: usize,
    pub keys_offset: usize,
    pub keys_len: usize,
    pub table_offset: usize,
    pub table_len: usize,
    pub has_table: bool,
    /// 4-aligned end of the whole track region.
    pub end_offset: usize,
}

/// Layout of a uniform/variable-family track.
pub(crate) fn standard_track_layout(
    offset: u32,
    key_count: u32,
    format: KeyFormat,
    kind: TrackKind,
    frame_count: u32,
    variable_family: bool,
) -> TrackLayout {
    let offset = offset as usize;
    debug_assert!(offset % 4 == 0, "misaligned track offset {offset}");

    if key_count == 0 {
        return TrackLayout {
            format,
            axis_flags: ALL_AXES,
            key_count: 0,
            meta_offset: offset,
            meta_len: 0,
            keys_offset: offset,
            keys_len: 0,
            table_offset: offset,
            table_len: 0,
            has_table: false,
            end_offset: offset,
        };
    }

    let meta_len = format.fixed_meta_bytes(ALL_AXES);
    let keys_offset = offset + meta_len;
    let keys_len = key_count as usize * format.bytes_per_key(kind);
    let has_table = variable_family && key_count > 1;
    let table_offset = align4(keys_offset + keys_len);
    let table_len = if has_table {
        key_count as usize * FrameTable::entry_width(frame_count)
    } else {
        0
    };
    let end_offset = if has_table {
        align4(table_offset + table_len)
    } else {
        table_offset
    };

    TrackLayout {
        format,
        axis_flags: ALL_AXES,
        key_count,
        meta_offset: offset,
        meta_len,
        keys_offset,
        keys_len,
        table_offset,
        table_len,
        has_table,
        end_offset,
    }
}

/// Layout of a self-describing track whose header word has been decoded.
/// `offset` addresses the header word itself.
pub(crate) fn per_track_layout(
    header: &TrackHeader,
    offset: usize,
    kind: TrackKind,
    frame_count: u32,
) -> TrackLayout {
    debug_assert!(offset % 4 == 0, "misaligned track offset {offset}");
    let meta_offset = offset + TrackHeader::SIZE;

    if header.key_count == 0 || header.format == KeyFormat::Identity {
        return TrackLayout {
            format: header.format,
            axis_flags: header.axis_flags,
            key_count: 0,
            meta_offset,
            meta_len: 0,
            keys_offset: meta_offset,
            keys_len: 0,
            table_offset: meta_offset,
            table_len: 0,
            has_table: false,
            end_offset: meta_offset,
        };
    }

    let meta_len = header.format.fixed_meta_bytes(header.axis_flags);
    let keys_offset = meta_offset + meta_len;
    let keys_len = header.key_count as usize * header.format.bytes_per_key(kind);
    let has_table = header.has_frame_table && header.key_count > 1;
    let table_offset = align4(keys_offset + keys_len);
    let table_len = if has_table {
        header.key_count as usize * FrameTable::entry_width(frame_count)
    } else {
        0
    };
    let end_offset = if has_table {
        align4(table_offset + table_len)
    } else {
        table_offset
    };

    TrackLayout {
        format: header.format,
        axis_flags: header.axis_flags,
        key_count: header.key_count,
        meta_offset,
        meta_len,
        keys_offset,
        keys_len,
        table_offset,
        table_len,
        has_table,
        end_offset,
    }
}

// ============================================================================
// Sequence
// ============================================================================

/// Codec binding cached on the sequence at load time.
#[derive(Debug, Clone, Copy)]
pub struct BoundCodec {
    pub encoding: TrackEncoding,
    pub rotation_format: KeyFormat,
    pub translation_format: KeyFormat,
}

/// One animation sequence: compressed stream plus interpretation metadata.
///
/// Immutable during playback. Decode entry points are pure reads and safe to
/// call from any number of threads; [`crate::swap::import`] mutates the
/// buffer and must not overlap decode (enforce via the load/unload boundary).
#[derive(Debug, Clone)]
pub struct AnimSequence {
    /// Compressed key stream, native byte order.
    pub data: Vec<u8>,
    /// Per-bone track offsets, shaped by the encoding family.
    pub tracks: TrackTable,
    pub encoding: TrackEncoding,
    /// Sequence-wide rotation key format (ignored by `PerTrack`).
    pub rotation_format: KeyFormat,
    /// Sequence-wide translation key format (ignored by `PerTrack`).
    pub translation_format: KeyFormat,
    /// Total animation frames across the sequence.
    pub frame_count: u32,
    /// Playable duration in seconds.
    pub duration: f32,
    bound: Option<BoundCodec>,
}

impl AnimSequence {
    /// Assemble an unbound sequence. Call [`Self::bind`] before decoding.
    pub fn new(
        data: Vec<u8>,
        tracks: TrackTable,
        encoding: TrackEncoding,
        rotation_format: KeyFormat,
        translation_format: KeyFormat,
        frame_count: u32,
        duration: f32,
    ) -> Self {
        Self {
            data,
            tracks,
            encoding,
            rotation_format,
            translation_format,
            frame_count,
            duration,
            bound: None,
        }
    }

    /// Assemble and bind from raw wire ids, as read from an asset container.
    #[allow(clippy::too_many_arguments)]
    pub fn from_wire_ids(
        data: Vec<u8>,
        tracks: TrackTable,
        encoding_id: u8,
        rotation_format_id: u8,
        translation_format_id: u8,
        frame_count: u32,
        duration: f32,
    ) -> Result<Self, CodecError> {
        let encoding =
            TrackEncoding::from_wire(encoding_id).ok_or(CodecError::UnknownEncoding(encoding_id))?;
        let rotation_format = KeyFormat::from_wire(rotation_format_id)
            .ok_or(CodecError::UnknownFormat(rotation_format_id))?;
        let translation_format = KeyFormat::from_wire(translation_format_id)
            .ok_or(CodecError::UnknownFormat(translation_format_id))?;
        let mut seq = Self::new(
            data,
            tracks,
            encoding,
            rotation_format,
            translation_format,
            frame_count,
            duration,
        );
        seq.bind()?;
        Ok(seq)
    }

    /// Bind the declared encoding family and key formats to concrete
    /// decoders. Fatal on any unrecognized or inconsistent declaration: the
    /// sequence fails to load, nothing is retried per call.
    pub fn bind(&mut self) -> Result<(), CodecError> {
        match (self.encoding, &self.tracks) {
            (TrackEncoding::Uniform | TrackEncoding::Variable, TrackTable::Standard(_)) => {
                if self.translation_format.rotation_only() {
                    return Err(CodecError::RotationOnlyFormat(self.translation_format));
                }
            }
            (TrackEncoding::PerTrack, TrackTable::PerTrack(entries)) => {
                // Per-track headers are the format authority; reject bad ids
                // here so decode never sees one.
                for entry in entries {
                    for (offset, kind) in [
                        (entry.trans_offset, TrackKind::Translation),
                        (entry.rot_offset, TrackKind::Rotation),
                    ] {
                        if offset == NO_TRACK_DATA {
                            continue;
                        }
                        let word = read_u32(&self.data, offset as usize);
                        let header = TrackHeader::unpack(word)
                            .ok_or(CodecError::UnknownFormat(((word >> 24) & 0xF) as u8))?;
                        if kind == TrackKind::Translation && header.format.rotation_only() {
                            return Err(CodecError::RotationOnlyFormat(header.format));
                        }
                    }
                }
            }
            _ => return Err(CodecError::TrackTableMismatch),
        }

        self.bound = Some(BoundCodec {
            encoding: self.encoding,
            rotation_format: self.rotation_format,
            translation_format: self.translation_format,
        });
        debug!(
            encoding = ?self.encoding,
            rotation = ?self.rotation_format,
            translation = ?self.translation_format,
            tracks = self.tracks.len(),
            "bound animation codec"
        );
        Ok(())
    }

    /// The codec binding, if [`Self::bind`] succeeded.
    pub fn bound(&self) -> Option<BoundCodec> {
        self.bound
    }

    /// Number of bone tracks in the offset table.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Normalize a playback time to `[0, 1)` over the duration.
    pub(crate) fn relative_position(&self, time: f32, looping: bool) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        let pos = time / self.duration;
        if looping { pos.rem_euclid(1.0) } else { pos.clamp(0.0, 1.0) }
    }

    /// Decode one bone track at `time`.
    pub fn decode_one(&self, track: u32, time: f32, looping: bool) -> BonePose {
        codec::decode_one(self, track, time, looping)
    }

    /// Decode a batch of tracks sharing one time value into `out`.
    ///
    /// Bit-identical to calling [`Self::decode_one`] per pair; slots not
    /// named by any pair are left untouched.
    pub fn decode_pose(
        &self,
        rotation_pairs: &[TrackSlot],
        translation_pairs: &[TrackSlot],
        time: f32,
        looping: bool,
        out: &mut [BonePose],
    ) {
        codec::decode_pose(self, rotation_pairs, translation_pairs, time, looping, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AXIS_X, AXIS_Y};

    #[test]
    fn header_word_roundtrip() {
        let header = TrackHeader {
            format: KeyFormat::Interval32,
            key_count: 1234,
            axis_flags: AXIS_X | AXIS_Y,
            has_frame_table: true,
        };
        let word = header.pack().unwrap();
        assert_eq!(TrackHeader::unpack(word), Some(header));
    }

    #[test]
    fn header_key_count_limit() {
        let header = TrackHeader {
            format: KeyFormat::Raw,
            key_count: KEY_COUNT_MAX + 1,
            axis_flags: ALL_AXES,
            has_frame_table: false,
        };
        assert!(matches!(header.pack(), Err(CodecError::KeyCountOverflow(_))));
    }

    #[test]
    fn header_rejects_unknown_format() {
        // Format id 0xF is unassigned
        let word = 0x0F00_0000u32 | 10;
        assert!(TrackHeader::unpack(word).is_none());
    }

    #[test]
    fn bind_rejects_rotation_only_translation_format() {
        let mut seq = AnimSequence::new(
            Vec::new(),
            TrackTable::Standard(Vec::new()),
            TrackEncoding::Uniform,
            KeyFormat::Fixed32,
            KeyFormat::Fixed32,
            10,
            1.0,
        );
        assert!(matches!(
            seq.bind(),
            Err(CodecError::RotationOnlyFormat(KeyFormat::Fixed32))
        ));
        assert!(seq.bound().is_none());
    }

    #[test]
    fn bind_rejects_table_shape_mismatch() {
        let mut seq = AnimSequence::new(
            Vec::new(),
            TrackTable::PerTrack(Vec::new()),
            TrackEncoding::Uniform,
            KeyFormat::Raw,
            KeyFormat::Raw,
            10,
            1.0,
        );
        assert!(matches!(seq.bind(), Err(CodecError::TrackTableMismatch)));
    }

    #[test]
    fn from_wire_ids_rejects_unknown_ids() {
        let err = AnimSequence::from_wire_ids(
            Vec::new(),
            TrackTable::Standard(Vec::new()),
            9,
            0,
            0,
            10,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::UnknownEncoding(9)));

        let err = AnimSequence::from_wire_ids(
            Vec::new(),
            TrackTable::Standard(Vec::new()),
            0,
            11,
            0,
            10,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::UnknownFormat(11)));
    }

    #[test]
    fn standard_layout_sections() {
        // 3 Fixed16 keys: 18 bytes of keys, frame table re-aligned to 4
        let layout = standard_track_layout(8, 3, KeyFormat::Fixed16, TrackKind::Rotation, 60, true);
        assert_eq!(layout.meta_len, 0);
        assert_eq!(layout.keys_offset, 8);
        assert_eq!(layout.keys_len, 18);
        assert_eq!(layout.table_offset, 28); // align4(8 + 18)
        assert_eq!(layout.table_len, 3);
        assert_eq!(layout.end_offset, 32);
    }

    #[test]
    fn standard_layout_interval_meta() {
        let layout =
            standard_track_layout(0, 2, KeyFormat::Interval32, TrackKind::Translation, 30, false);
        assert_eq!(layout.meta_len, 24);
        assert_eq!(layout.keys_offset, 24);
        assert_eq!(layout.keys_len, 8);
        assert!(!layout.has_table);
        assert_eq!(layout.end_offset, 32);
    }

    #[test]
    fn standard_layout_zero_keys() {
        let layout = standard_track_layout(16, 0, KeyFormat::Interval32, TrackKind::Rotation, 60, true);
        assert_eq!(layout.end_offset, 16);
        assert_eq!(layout.keys_len, 0);
        assert_eq!(layout.meta_len, 0);
    }

    #[test]
    fn per_track_layout_sections() {
        let header = TrackHeader {
            format: KeyFormat::Interval32,
            key_count: 5,
            axis_flags: AXIS_X | AXIS_Y,
            has_frame_table: true,
        };
        let layout = per_track_layout(&header, 100, TrackKind::Rotation, 300);
        assert_eq!(layout.meta_offset, 104);
        assert_eq!(layout.meta_len, 16); // two present axes
        assert_eq!(layout.keys_offset, 120);
        assert_eq!(layout.keys_len, 20);
        assert_eq!(layout.table_offset, 140);
        assert_eq!(layout.table_len, 10); // 300 frames forces u16 entries
        assert_eq!(layout.end_offset, 152);
    }
}
