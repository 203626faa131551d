//! End-to-end decode tests over hand-assembled compressed streams, one per
//! encoding family, plus the wire roundtrip and statistics passes.

use glam::{Quat, Vec3};
use nether_anim::{
    ALL_AXES, AXIS_X, AXIS_Z, AnimSequence, BonePose, KeyFormat, NO_TRACK_DATA, PAD_BYTE,
    PerTrackOffsets, StandardTrack, TrackEncoding, TrackHeader, TrackSlot, TrackTable,
    WIRE_VERSION, export, import, pack_fixed16, pack_fixed32, pack_float32, pack_interval_key,
    pack_interval_meta, pack_raw_translation, sequence_stats, unpack_rotation,
};

fn pad4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(PAD_BYTE);
    }
}

/// What decode reports for a stored rotation key: the authoring-tool sign
/// convention negates W once per decoded rotation.
fn decoded_key(format: KeyFormat, key: &[u8]) -> Quat {
    let q = unpack_rotation(format, ALL_AXES, &[], key);
    Quat::from_xyzw(q.x, q.y, q.z, -q.w)
}

fn same_rotation(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 0.999
}

// ============================================================================
// Uniform family
// ============================================================================

/// Two bones. Bone 0: 2-key raw translation then 3-key Fixed16 rotation.
/// Bone 1: rotation only, single key.
fn uniform_sequence() -> AnimSequence {
    let rot_keys = [
        Quat::from_rotation_x(0.0),
        Quat::from_rotation_x(0.6),
        Quat::from_rotation_x(1.2),
    ];
    let mut data = Vec::new();
    data.extend_from_slice(&pack_raw_translation(Vec3::new(0.0, 1.0, 0.0)));
    data.extend_from_slice(&pack_raw_translation(Vec3::new(2.0, 1.0, 0.0)));
    let rot_offset = data.len() as u32;
    for q in rot_keys {
        data.extend_from_slice(&pack_fixed16(q));
    }
    pad4(&mut data);
    let bone1_rot_offset = data.len() as u32;
    data.extend_from_slice(&pack_fixed16(Quat::from_rotation_z(0.3)));
    pad4(&mut data);

    let mut seq = AnimSequence::new(
        data,
        TrackTable::Standard(vec![
            StandardTrack {
                trans_offset: 0,
                trans_keys: 2,
                rot_offset,
                rot_keys: 3,
            },
            StandardTrack {
                trans_offset: 0,
                trans_keys: 0,
                rot_offset: bone1_rot_offset,
                rot_keys: 1,
            },
        ]),
        TrackEncoding::Uniform,
        KeyFormat::Fixed16,
        KeyFormat::Raw,
        30,
        1.0,
    );
    seq.bind().unwrap();
    seq
}

#[test]
fn two_key_track_hits_stored_keys_at_endpoints() {
    // 2-key Float32 rotation track over a 1-second, 2-frame sequence
    let k0 = pack_float32(Quat::from_rotation_x(0.4));
    let k1 = pack_float32(Quat::from_rotation_x(1.2));
    let mut data = Vec::new();
    data.extend_from_slice(&k0);
    data.extend_from_slice(&k1);

    let mut seq = AnimSequence::new(
        data,
        TrackTable::Standard(vec![StandardTrack {
            trans_offset: 0,
            trans_keys: 0,
            rot_offset: 0,
            rot_keys: 2,
        }]),
        TrackEncoding::Uniform,
        KeyFormat::Float32,
        KeyFormat::Raw,
        2,
        1.0,
    );
    seq.bind().unwrap();

    // Endpoints reproduce the stored keys bit-exactly, no blend math
    assert_eq!(seq.decode_one(0, 0.0, false).rotation, decoded_key(KeyFormat::Float32, &k0));
    assert_eq!(seq.decode_one(0, 1.0, false).rotation, decoded_key(KeyFormat::Float32, &k1));
    // Past the end clamps to the last key
    assert_eq!(seq.decode_one(0, 5.0, false).rotation, decoded_key(KeyFormat::Float32, &k1));

    // Midpoint: renormalized blend halfway between the two stored rotations
    let mid = seq.decode_one(0, 0.5, false).rotation;
    assert!((mid.length() - 1.0).abs() < 1e-6);
    let expected = {
        let q = Quat::from_rotation_x(0.8);
        Quat::from_xyzw(q.x, q.y, q.z, -q.w)
    };
    assert!(same_rotation(mid, expected), "got {mid:?}");
}

#[test]
fn uniform_translation_lerps_between_keys() {
    let seq = uniform_sequence();
    let pose = seq.decode_one(0, 0.5, false);
    assert!((pose.translation.x - 1.0).abs() < 1e-6);
    assert!((pose.translation.y - 1.0).abs() < 1e-6);
}

#[test]
fn single_key_track_is_constant() {
    let seq = uniform_sequence();
    let reference = seq.decode_one(1, 0.0, false);
    for time in [0.25, 0.5, 1.0, 7.0] {
        for looping in [false, true] {
            assert_eq!(seq.decode_one(1, time, looping), reference);
        }
    }
}

#[test]
fn uniform_looping_returns_toward_first_key() {
    let seq = uniform_sequence();
    let start = seq.decode_one(0, 0.0, true);
    let near_wrap = seq.decode_one(0, 0.9999, true);
    assert!(same_rotation(start.rotation, near_wrap.rotation));
    assert!((near_wrap.translation - start.translation).length() < 0.01);
}

#[test]
fn keyless_track_decodes_to_identity() {
    let mut seq = AnimSequence::new(
        Vec::new(),
        TrackTable::Standard(vec![StandardTrack {
            trans_offset: 0,
            trans_keys: 0,
            rot_offset: 0,
            rot_keys: 0,
        }]),
        TrackEncoding::Uniform,
        KeyFormat::Fixed16,
        KeyFormat::Raw,
        30,
        1.0,
    );
    seq.bind().unwrap();
    let pose = seq.decode_one(0, 0.5, false);
    assert!(same_rotation(pose.rotation, Quat::IDENTITY));
    assert_eq!(pose.translation, Vec3::ZERO);
}

// ============================================================================
// Variable family (per-track frame tables)
// ============================================================================

/// One bone, 60 frames. Translation: 3 raw keys sampled at frames 0, 10, 40
/// whose X value equals the frame number. Rotation: 3 Fixed16 keys at frames
/// 0, 30, 59.
fn variable_sequence() -> AnimSequence {
    let mut data = Vec::new();
    for frame in [0.0f32, 10.0, 40.0] {
        data.extend_from_slice(&pack_raw_translation(Vec3::new(frame, 0.0, 0.0)));
    }
    data.extend_from_slice(&[0u8, 10, 40]);
    pad4(&mut data);

    let rot_offset = data.len() as u32;
    for angle in [0.0f32, 0.7, 1.4] {
        data.extend_from_slice(&pack_fixed16(Quat::from_rotation_y(angle)));
    }
    pad4(&mut data);
    data.extend_from_slice(&[0u8, 30, 59]);
    pad4(&mut data);

    let mut seq = AnimSequence::new(
        data,
        TrackTable::Standard(vec![StandardTrack {
            trans_offset: 0,
            trans_keys: 3,
            rot_offset,
            rot_keys: 3,
        }]),
        TrackEncoding::Variable,
        KeyFormat::Fixed16,
        KeyFormat::Raw,
        60,
        1.0,
    );
    seq.bind().unwrap();
    seq
}

#[test]
fn frame_table_weights_by_frame_numbers() {
    let seq = variable_sequence();
    // Non-looping target frame = pos * 59; frame 20 sits a third of the way
    // between the keys at frames 10 and 40
    let pose = seq.decode_one(0, 20.0 / 59.0, false);
    assert!((pose.translation.x - 20.0).abs() < 1e-3, "got {}", pose.translation.x);

    // Before the first interval boundary the weight is still frame-relative
    let pose = seq.decode_one(0, 5.0 / 59.0, false);
    assert!((pose.translation.x - 5.0).abs() < 1e-3);
}

#[test]
fn frame_table_looping_wraps_through_total_frames() {
    let seq = variable_sequence();
    // Looping target frame = pos * 60; frame 50 blends the key at frame 40
    // halfway toward the first key over the remaining 20 frames
    let pose = seq.decode_one(0, 50.0 / 60.0, true);
    assert!((pose.translation.x - 20.0).abs() < 1e-3, "got {}", pose.translation.x);
}

// ============================================================================
// Self-describing family
// ============================================================================

/// Two bones with mixed per-track declarations. Bone 0: Fixed32 rotation
/// with a frame table, no translation data. Bone 1: interval translation
/// storing only the X and Z axes, no rotation data.
fn per_track_sequence() -> (AnimSequence, [Quat; 2]) {
    let rot_keys = [Quat::from_rotation_x(0.2), Quat::from_rotation_x(1.0)];
    let mut data = Vec::new();

    let rot_header = TrackHeader {
        format: KeyFormat::Fixed32,
        key_count: 2,
        axis_flags: ALL_AXES,
        has_frame_table: true,
    };
    data.extend_from_slice(&rot_header.pack().unwrap().to_ne_bytes());
    for q in rot_keys {
        data.extend_from_slice(&pack_fixed32(q));
    }
    data.extend_from_slice(&[0u8, 30]);
    pad4(&mut data);

    let trans_offset = data.len() as u32;
    let flags = AXIS_X | AXIS_Z;
    let mins = [0.0f32, 0.0, -2.0];
    let ranges = [4.0f32, 0.0, 4.0];
    let trans_header = TrackHeader {
        format: KeyFormat::Interval32,
        key_count: 2,
        axis_flags: flags,
        has_frame_table: false,
    };
    data.extend_from_slice(&trans_header.pack().unwrap().to_ne_bytes());
    data.extend_from_slice(&pack_interval_meta(mins, ranges, flags));
    data.extend_from_slice(&pack_interval_key([1.0, 0.0, -1.0], mins, ranges, flags));
    data.extend_from_slice(&pack_interval_key([3.0, 0.0, 1.0], mins, ranges, flags));

    let mut seq = AnimSequence::new(
        data,
        TrackTable::PerTrack(vec![
            PerTrackOffsets {
                trans_offset: NO_TRACK_DATA,
                rot_offset: 0,
            },
            PerTrackOffsets {
                trans_offset,
                rot_offset: NO_TRACK_DATA,
            },
        ]),
        TrackEncoding::PerTrack,
        // Sequence-wide declarations are ignored by this family
        KeyFormat::Raw,
        KeyFormat::Raw,
        60,
        1.0,
    );
    seq.bind().unwrap();
    (seq, rot_keys)
}

#[test]
fn per_track_headers_override_sequence_formats() {
    let (seq, rot_keys) = per_track_sequence();

    // Bone 0 rotation comes from its Fixed32 header; the frame table places
    // the second key at frame 30 of 60, so decoding there lands on the
    // stored key bit-exactly
    let pose = seq.decode_one(0, 30.0 / 59.0, false);
    assert_eq!(
        pose.rotation,
        decoded_key(KeyFormat::Fixed32, &pack_fixed32(rot_keys[1]))
    );
    assert_eq!(pose.translation, Vec3::ZERO);

    // Bone 1 translation interpolates interval keys; the absent Y axis
    // decodes to zero at every time
    let pose = seq.decode_one(1, 0.5, false);
    assert!((pose.translation.x - 2.0).abs() < 0.01);
    assert_eq!(pose.translation.y, 0.0);
    assert!(pose.translation.z.abs() < 0.01);
    assert!(same_rotation(pose.rotation, Quat::IDENTITY));
}

#[test]
fn per_track_sentinel_costs_nothing_and_decodes_identity() {
    let mut seq = AnimSequence::new(
        Vec::new(),
        TrackTable::PerTrack(vec![PerTrackOffsets {
            trans_offset: NO_TRACK_DATA,
            rot_offset: NO_TRACK_DATA,
        }]),
        TrackEncoding::PerTrack,
        KeyFormat::Raw,
        KeyFormat::Raw,
        60,
        1.0,
    );
    seq.bind().unwrap();
    let pose = seq.decode_one(0, 0.3, true);
    assert!(same_rotation(pose.rotation, Quat::IDENTITY));
    assert_eq!(pose.translation, Vec3::ZERO);
}

// ============================================================================
// Batch decode
// ============================================================================

#[test]
fn batch_decode_matches_per_track_decode() {
    let (per_track, _) = per_track_sequence();
    let cases: [(AnimSequence, u32); 3] = [
        (uniform_sequence(), 2),
        (variable_sequence(), 1),
        (per_track, 2),
    ];

    for (seq, track_count) in &cases {
        let pairs: Vec<TrackSlot> = (0..*track_count)
            .map(|i| TrackSlot { track: i, slot: i })
            .collect();
        for time in [0.0, 0.31, 0.5, 0.99] {
            for looping in [false, true] {
                let mut out = vec![BonePose::IDENTITY; *track_count as usize];
                seq.decode_pose(&pairs, &pairs, time, looping, &mut out);
                for i in 0..*track_count {
                    let single = seq.decode_one(i, time, looping);
                    assert_eq!(out[i as usize], single, "track {i} at t={time}");
                }
            }
        }
    }
}

#[test]
fn batch_decode_leaves_unnamed_slots_untouched() {
    let seq = uniform_sequence();
    let sentinel = BonePose {
        rotation: Quat::from_rotation_z(0.9),
        translation: Vec3::splat(7.0),
    };
    let mut out = vec![sentinel; 3];
    // Only slot 1 is named; rotation comes from track 0, translation is
    // left alone entirely
    let rot = [TrackSlot { track: 0, slot: 1 }];
    seq.decode_pose(&rot, &[], 0.5, false, &mut out);

    assert_eq!(out[0], sentinel);
    assert_eq!(out[2], sentinel);
    assert_eq!(out[1].translation, sentinel.translation);
    assert_eq!(out[1].rotation, seq.decode_one(0, 0.5, false).rotation);
}

// ============================================================================
// Wire roundtrip and statistics
// ============================================================================

#[test]
fn wire_roundtrip_preserves_decode_across_families() {
    let (per_track, _) = per_track_sequence();
    for seq in [uniform_sequence(), variable_sequence(), per_track] {
        let wire = export(&seq);
        let mut imported = seq.clone();
        imported.data.clear();
        import(&mut imported, &wire, WIRE_VERSION).unwrap();

        assert_eq!(imported.data, seq.data);
        assert_eq!(export(&imported), wire);
        for track in 0..seq.track_count() as u32 {
            for time in [0.0, 0.4, 1.0] {
                assert_eq!(
                    imported.decode_one(track, time, true),
                    seq.decode_one(track, time, true)
                );
            }
        }
    }
}

#[test]
fn stats_split_payload_from_overhead() {
    let seq = uniform_sequence();
    let stats = sequence_stats(&seq);

    assert_eq!(stats.bone_tracks, 2);
    assert_eq!(stats.rotation_tracks, 2);
    assert_eq!(stats.translation_tracks, 1);
    assert_eq!(stats.rotation_keys, 4);
    assert_eq!(stats.translation_keys, 2);
    // Payload: 24 B raw translation + 18 + 6 B Fixed16 rotations over 6 keys
    assert_eq!(stats.avg_bytes_per_key, 8.0);
    // Offset table (2 × 16) plus two 2-byte alignment pads
    assert_eq!(stats.overhead_bytes, 36);
    assert_eq!(stats.buffer_bytes, seq.data.len());
    assert!(stats.summary().contains("2 bone tracks"));
}

#[test]
fn stats_count_per_track_headers_as_overhead() {
    let (seq, _) = per_track_sequence();
    let stats = sequence_stats(&seq);

    assert_eq!(stats.bone_tracks, 2);
    assert_eq!(stats.rotation_tracks, 1);
    assert_eq!(stats.translation_tracks, 1);
    assert_eq!(stats.rotation_keys, 2);
    assert_eq!(stats.translation_keys, 2);
    // Payload: 8 B Fixed32 + 8 B interval keys over 4 keys
    assert_eq!(stats.avg_bytes_per_key, 4.0);
    // Offset table (2 × 8) + two header words + frame table with padding
    // (2 entries + 2 pad bytes) + 16 B interval metadata
    assert_eq!(stats.overhead_bytes, 16 + 4 + 4 + 4 + 16);
    assert_eq!(stats.buffer_bytes, seq.data.len());
}
