//! Variable-cadence codec
//!
//! Same sequence-wide key format as the uniform family, but every multi-key
//! track carries a frame-index table (4-byte aligned after the packed keys)
//! recording which animation frame each key was sampled from. The resolver
//! brackets in frame-number space, so keys may cluster where the motion is
//! busy and thin out where it is not.

use glam::{Quat, Vec3};

use crate::format::{KeyFormat, TrackKind};
use crate::resolver::{frame_table_view, resolve};
use crate::sequence::{AnimSequence, StandardTrack, standard_track_layout};

pub(crate) fn rotation(seq: &AnimSequence, entry: &StandardTrack, pos: f32, looping: bool) -> Quat {
    if entry.rot_keys == 0 || seq.rotation_format == KeyFormat::Identity {
        return Quat::IDENTITY;
    }
    let layout = standard_track_layout(
        entry.rot_offset,
        entry.rot_keys,
        seq.rotation_format,
        TrackKind::Rotation,
        seq.frame_count,
        true,
    );
    let table = layout.has_table.then(|| {
        frame_table_view(&seq.data, layout.table_offset, layout.key_count, seq.frame_count)
    });
    let bracket = resolve(pos, entry.rot_keys, table.as_ref(), seq.frame_count, looping);
    super::sample_rotation(seq, &layout, bracket)
}

pub(crate) fn translation(seq: &AnimSequence, entry: &StandardTrack, pos: f32, looping: bool) -> Vec3 {
    if entry.trans_keys == 0 || seq.translation_format == KeyFormat::Identity {
        return Vec3::ZERO;
    }
    let layout = standard_track_layout(
        entry.trans_offset,
        entry.trans_keys,
        seq.translation_format,
        TrackKind::Translation,
        seq.frame_count,
        true,
    );
    let table = layout.has_table.then(|| {
        frame_table_view(&seq.data, layout.table_offset, layout.key_count, seq.frame_count)
    });
    let bracket = resolve(pos, entry.trans_keys, table.as_ref(), seq.frame_count, looping);
    super::sample_translation(seq, &layout, bracket)
}
