//! Uniform-cadence codec
//!
//! One sequence-wide key format, keys evenly spaced across the timeline, no
//! per-key frame table. The bracket is pure arithmetic on the key index
//! line ([`crate::resolver`]'s uniform branch).

use glam::{Quat, Vec3};

use crate::format::{KeyFormat, TrackKind};
use crate::resolver::resolve;
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
        false,
    );
    let bracket = resolve(pos, entry.rot_keys, None, seq.frame_count, looping);
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
        false,
    );
    let bracket = resolve(pos, entry.trans_keys, None, seq.frame_count, looping);
    super::sample_translation(seq, &layout, bracket)
}
