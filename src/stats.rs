//! Sequence statistics
//!
//! Read-only diagnostics pass over a sequence: track and key counts, the
//! average byte footprint of one key, and how many bytes go to overhead
//! (offset table, per-track headers, frame tables, interval metadata,
//! alignment padding) rather than key payload. For the self-describing
//! family each track header is decomposed first so the true per-key size is
//! counted, not the sequence-wide declaration.

use crate::format::{KeyFormat, TrackKind, read_u32};
use crate::sequence::{
    AnimSequence, NO_TRACK_DATA, TrackEncoding, TrackHeader, TrackLayout, TrackTable,
    per_track_layout, standard_track_layout,
};

/// Aggregate footprint report for one sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SequenceStats {
    /// Bone tracks in the offset table.
    pub bone_tracks: usize,
    /// Rotation tracks carrying at least one key.
    pub rotation_tracks: usize,
    /// Translation tracks carrying at least one key.
    pub translation_tracks: usize,
    pub rotation_keys: u64,
    pub translation_keys: u64,
    /// Key payload bytes divided by total keys (0 when keyless).
    pub avg_bytes_per_key: f32,
    /// Offset table + headers + frame tables + interval metadata + padding.
    pub overhead_bytes: usize,
    /// Total compressed buffer size.
    pub buffer_bytes: usize,
}

impl SequenceStats {
    /// One-line human summary for diagnostics logging.
    pub fn summary(&self) -> String {
        format!(
            "{} bone tracks ({} rot, {} trans), {} keys, {:.1} B/key avg, {} B overhead, {} B total",
            self.bone_tracks,
            self.rotation_tracks,
            self.translation_tracks,
            self.rotation_keys + self.translation_keys,
            self.avg_bytes_per_key,
            self.overhead_bytes,
            self.buffer_bytes
        )
    }
}

struct Accumulator {
    stats: SequenceStats,
    key_payload_bytes: u64,
}

impl Accumulator {
    fn track(&mut self, kind: TrackKind, layout: &TrackLayout, track_start: usize) {
        if layout.key_count == 0 {
            // Keyless self-describing tracks still spend their header word
            self.stats.overhead_bytes += layout.end_offset - track_start;
            return;
        }
        match kind {
            TrackKind::Rotation => {
                self.stats.rotation_tracks += 1;
                self.stats.rotation_keys += layout.key_count as u64;
            }
            TrackKind::Translation => {
                self.stats.translation_tracks += 1;
                self.stats.translation_keys += layout.key_count as u64;
            }
        }
        self.key_payload_bytes += layout.keys_len as u64;
        // Everything in the track region that is not key payload
        let region = layout.end_offset - track_start;
        self.stats.overhead_bytes += region - layout.keys_len;
    }
}

/// Compute the footprint report. Pure read; the sequence is untouched.
pub fn sequence_stats(seq: &AnimSequence) -> SequenceStats {
    let mut acc = Accumulator {
        stats: SequenceStats {
            bone_tracks: seq.tracks.len(),
            buffer_bytes: seq.data.len(),
            overhead_bytes: seq.tracks.overhead_bytes(),
            ..Default::default()
        },
        key_payload_bytes: 0,
    };

    match &seq.tracks {
        TrackTable::Standard(entries) => {
            let variable = seq.encoding == TrackEncoding::Variable;
            for entry in entries {
                for (offset, keys, format, kind) in [
                    (
                        entry.trans_offset,
                        entry.trans_keys,
                        seq.translation_format,
                        TrackKind::Translation,
                    ),
                    (
                        entry.rot_offset,
                        entry.rot_keys,
                        seq.rotation_format,
                        TrackKind::Rotation,
                    ),
                ] {
                    if keys == 0 || format == KeyFormat::Identity {
                        continue;
                    }
                    let layout =
                        standard_track_layout(offset, keys, format, kind, seq.frame_count, variable);
                    acc.track(kind, &layout, layout.meta_offset);
                }
            }
        }
        TrackTable::PerTrack(entries) => {
            for entry in entries {
                for (offset, kind) in [
                    (entry.trans_offset, TrackKind::Translation),
                    (entry.rot_offset, TrackKind::Rotation),
                ] {
                    if offset == NO_TRACK_DATA {
                        continue;
                    }
                    let offset = offset as usize;
                    let Some(header) = TrackHeader::unpack(read_u32(&seq.data, offset)) else {
                        debug_assert!(false, "stats over unbound per-track header");
                        continue;
                    };
                    let layout = per_track_layout(&header, offset, kind, seq.frame_count);
                    acc.track(kind, &layout, offset);
                }
            }
        }
    }

    let total_keys = acc.stats.rotation_keys + acc.stats.translation_keys;
    acc.stats.avg_bytes_per_key = if total_keys > 0 {
        acc.key_payload_bytes as f32 / total_keys as f32
    } else {
        0.0
    };
    acc.stats
}
