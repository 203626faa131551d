//! Track decoders
//!
//! Three interchangeable decoder families over a track's compressed
//! sub-stream:
//!
//! - [`uniform`] — sequence-wide key format, evenly spaced keys
//! - [`variable`] — sequence-wide key format plus a per-track frame table
//! - [`per_track`] — per-track header declares format, key count, and flags
//!
//! All three share the same sampling path: resolve a bracketing key pair,
//! unpack both keys, blend. Rotations blend with a shortest-arc component
//! lerp followed by renormalization (nlerp; the precision trade against
//! spherical interpolation is intentional). Translations lerp directly.
//!
//! Every decoded rotation gets its W component negated once, after
//! blending, to compensate for the authoring tool's sign convention. The
//! correction lives here in the decode drivers, never inside key unpack.

pub(crate) mod per_track;
pub(crate) mod uniform;
pub(crate) mod variable;

use glam::{Quat, Vec3};

use crate::format::{TrackKind, unpack_rotation, unpack_translation};
use crate::resolver::KeyBracket;
use crate::sequence::{AnimSequence, BonePose, TrackEncoding, TrackLayout, TrackSlot, TrackTable};

/// Authoring-tool sign correction applied uniformly to decoded rotations.
#[inline]
fn negate_w(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, -q.w)
}

/// Shortest-arc component lerp, renormalized.
#[inline]
pub(crate) fn blend_rotation(a: Quat, b: Quat, alpha: f32) -> Quat {
    if alpha <= 0.0 {
        return a;
    }
    // Opposite hemispheres: negate one operand to take the short way around
    let b = if a.dot(b) < 0.0 { -b } else { b };
    Quat::from_xyzw(
        a.x + (b.x - a.x) * alpha,
        a.y + (b.y - a.y) * alpha,
        a.z + (b.z - a.z) * alpha,
        a.w + (b.w - a.w) * alpha,
    )
    .normalize()
}

#[inline]
pub(crate) fn blend_translation(a: Vec3, b: Vec3, alpha: f32) -> Vec3 {
    a.lerp(b, alpha)
}

/// Unpack and blend the bracketed rotation keys of a laid-out track.
pub(crate) fn sample_rotation(seq: &AnimSequence, layout: &TrackLayout, bracket: KeyBracket) -> Quat {
    let meta = &seq.data[layout.meta_offset..layout.meta_offset + layout.meta_len];
    let stride = layout.format.bytes_per_key(TrackKind::Rotation);
    let key = |index: u32| {
        let start = layout.keys_offset + index as usize * stride;
        &seq.data[start..start + stride]
    };

    let lo = unpack_rotation(layout.format, layout.axis_flags, meta, key(bracket.lo));
    if bracket.lo == bracket.hi {
        return lo;
    }
    let hi = unpack_rotation(layout.format, layout.axis_flags, meta, key(bracket.hi));
    blend_rotation(lo, hi, bracket.alpha)
}

/// Unpack and blend the bracketed translation keys of a laid-out track.
pub(crate) fn sample_translation(
    seq: &AnimSequence,
    layout: &TrackLayout,
    bracket: KeyBracket,
) -> Vec3 {
    let meta = &seq.data[layout.meta_offset..layout.meta_offset + layout.meta_len];
    let stride = layout.format.bytes_per_key(TrackKind::Translation);
    let key = |index: u32| {
        let start = layout.keys_offset + index as usize * stride;
        &seq.data[start..start + stride]
    };

    let lo = unpack_translation(layout.format, layout.axis_flags, meta, key(bracket.lo));
    if bracket.lo == bracket.hi {
        return lo;
    }
    let hi = unpack_translation(layout.format, layout.axis_flags, meta, key(bracket.hi));
    blend_translation(lo, hi, bracket.alpha)
}

/// Decode one bone track: rotation and translation at `time`.
pub(crate) fn decode_one(seq: &AnimSequence, track: u32, time: f32, looping: bool) -> BonePose {
    debug_assert!(seq.bound().is_some(), "decode on an unbound sequence");
    debug_assert!((track as usize) < seq.track_count(), "track {track} out of range");
    let pos = seq.relative_position(time, looping);

    let (rotation, translation) = match (&seq.tracks, seq.encoding) {
        (TrackTable::Standard(entries), TrackEncoding::Uniform) => {
            let entry = &entries[track as usize];
            (
                uniform::rotation(seq, entry, pos, looping),
                uniform::translation(seq, entry, pos, looping),
            )
        }
        (TrackTable::Standard(entries), TrackEncoding::Variable) => {
            let entry = &entries[track as usize];
            (
                variable::rotation(seq, entry, pos, looping),
                variable::translation(seq, entry, pos, looping),
            )
        }
        (TrackTable::PerTrack(entries), TrackEncoding::PerTrack) => {
            let entry = &entries[track as usize];
            (
                per_track::rotation(seq, entry, pos, looping),
                per_track::translation(seq, entry, pos, looping),
            )
        }
        _ => {
            debug_assert!(false, "track table shape mismatch");
            (Quat::IDENTITY, Vec3::ZERO)
        }
    };

    BonePose {
        rotation: negate_w(rotation),
        translation,
    }
}

/// Batch decode sharing one time value.
///
/// Matches on the encoding family once per batch and runs the concrete
/// family decoder in a tight loop; the result is bit-identical to
/// per-pair [`decode_one`].
pub(crate) fn decode_pose(
    seq: &AnimSequence,
    rotation_pairs: &[TrackSlot],
    translation_pairs: &[TrackSlot],
    time: f32,
    looping: bool,
    out: &mut [BonePose],
) {
    debug_assert!(seq.bound().is_some(), "decode on an unbound sequence");
    let pos = seq.relative_position(time, looping);

    match (&seq.tracks, seq.encoding) {
        (TrackTable::Standard(entries), TrackEncoding::Uniform) => {
            for pair in rotation_pairs {
                let q = uniform::rotation(seq, &entries[pair.track as usize], pos, looping);
                out[pair.slot as usize].rotation = negate_w(q);
            }
            for pair in translation_pairs {
                out[pair.slot as usize].translation =
                    uniform::translation(seq, &entries[pair.track as usize], pos, looping);
            }
        }
        (TrackTable::Standard(entries), TrackEncoding::Variable) => {
            for pair in rotation_pairs {
                let q = variable::rotation(seq, &entries[pair.track as usize], pos, looping);
                out[pair.slot as usize].rotation = negate_w(q);
            }
            for pair in translation_pairs {
                out[pair.slot as usize].translation =
                    variable::translation(seq, &entries[pair.track as usize], pos, looping);
            }
        }
        (TrackTable::PerTrack(entries), TrackEncoding::PerTrack) => {
            for pair in rotation_pairs {
                let q = per_track::rotation(seq, &entries[pair.track as usize], pos, looping);
                out[pair.slot as usize].rotation = negate_w(q);
            }
            for pair in translation_pairs {
                out[pair.slot as usize].translation =
                    per_track::translation(seq, &entries[pair.track as usize], pos, looping);
            }
        }
        _ => debug_assert!(false, "track table shape mismatch"),
    }
}
