//! Self-describing per-track codec
//!
//! Each track opens with a 4-byte header word declaring its key format, key
//! count, axis presence flags, and whether a frame table follows the keys.
//! The sequence-wide format declarations are ignored. A header with the
//! frame-table bit clear decodes with uniform cadence for that track only,
//! even though the sequence as a whole uses this family.
//!
//! The offset table uses [`NO_TRACK_DATA`] as a "no data, assume identity"
//! sentinel so bones with constant rest transforms cost zero bytes.

use glam::{Quat, Vec3};

use crate::format::{KeyFormat, TrackKind, read_u32};
use crate::resolver::{frame_table_view, resolve};
use crate::sequence::{
    AnimSequence, NO_TRACK_DATA, PerTrackOffsets, TrackHeader, per_track_layout,
};

pub(crate) fn rotation(seq: &AnimSequence, entry: &PerTrackOffsets, pos: f32, looping: bool) -> Quat {
    if entry.rot_offset == NO_TRACK_DATA {
        return Quat::IDENTITY;
    }
    let offset = entry.rot_offset as usize;
    let Some(header) = TrackHeader::unpack(read_u32(&seq.data, offset)) else {
        // Header ids were validated at bind time
        debug_assert!(false, "unbound per-track header at offset {offset}");
        return Quat::IDENTITY;
    };
    if header.key_count == 0 || header.format == KeyFormat::Identity {
        return Quat::IDENTITY;
    }

    let layout = per_track_layout(&header, offset, TrackKind::Rotation, seq.frame_count);
    let table = layout.has_table.then(|| {
        frame_table_view(&seq.data, layout.table_offset, layout.key_count, seq.frame_count)
    });
    let bracket = resolve(pos, header.key_count, table.as_ref(), seq.frame_count, looping);
    super::sample_rotation(seq, &layout, bracket)
}

pub(crate) fn translation(
    seq: &AnimSequence,
    entry: &PerTrackOffsets,
    pos: f32,
    looping: bool,
) -> Vec3 {
    if entry.trans_offset == NO_TRACK_DATA {
        return Vec3::ZERO;
    }
    let offset = entry.trans_offset as usize;
    let Some(header) = TrackHeader::unpack(read_u32(&seq.data, offset)) else {
        debug_assert!(false, "unbound per-track header at offset {offset}");
        return Vec3::ZERO;
    };
    if header.key_count == 0 || header.format == KeyFormat::Identity {
        return Vec3::ZERO;
    }

    let layout = per_track_layout(&header, offset, TrackKind::Translation, seq.frame_count);
    let table = layout.has_table.then(|| {
        frame_table_view(&seq.data, layout.table_offset, layout.key_count, seq.frame_count)
    });
    let bracket = resolve(pos, header.key_count, table.as_ref(), seq.frame_count, looping);
    super::sample_translation(seq, &layout, bracket)
}
