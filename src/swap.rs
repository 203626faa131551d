//! Wire import/export
//!
//! Moves a sequence's compressed stream between the portable wire format
//! (little-endian, 4-byte aligned sections, `0x55` padding sentinel) and
//! native memory. The walk is driven entirely by the per-format stride
//! tables — key values are chunked and re-ordered, never decoded.
//!
//! Track payloads appear in table order: per bone, the translation
//! sub-stream then the rotation sub-stream. The offset table itself travels
//! out-of-band with the rest of the sequence metadata.
//!
//! # Legacy streams
//! Version-1 streams stored a vestigial 6-float interval block before the
//! keys of every multi-key rotation track whose format has an implicit
//! range (`Fixed16`, `Fixed32`, `Float32`). Import drops those blocks and
//! rebuilds the buffer, shifting every subsequent track offset down by the
//! cumulative bytes removed. Export always writes the current layout; there
//! is no legacy export.
//!
//! Import and export mutate or read the buffer in place and must not
//! overlap decode against the same sequence; exclude decode via the
//! load/unload boundary.

use tracing::warn;

use crate::error::CodecError;
use crate::format::{ALL_AXES, KeyFormat, TrackKind, read_u16, read_u32};
use crate::resolver::FrameTable;
use crate::sequence::{
    AnimSequence, NO_TRACK_DATA, TrackEncoding, TrackHeader, TrackTable, per_track_layout,
    standard_track_layout,
};

/// Current wire layout version.
pub const WIRE_VERSION: u32 = 2;

/// Last version that stored vestigial interval blocks for implicit-range
/// rotation formats.
pub const LEGACY_IMPLICIT_INTERVAL_VERSION: u32 = 1;

/// Alignment padding sentinel; corrupted padding is detectable on import.
pub const PAD_BYTE: u8 = 0x55;

/// Size of the vestigial per-track interval block in legacy streams.
const LEGACY_INTERVAL_BLOCK: usize = 24;

/// True for rotation formats whose range is implicit (the formats that
/// carried the vestigial interval block in legacy streams).
const fn has_legacy_interval_block(format: KeyFormat) -> bool {
    matches!(format, KeyFormat::Fixed16 | KeyFormat::Fixed32 | KeyFormat::Float32)
}

// ============================================================================
// Export: native memory → wire
// ============================================================================

/// Serialize the sequence's compressed stream into the current wire layout.
pub fn export(seq: &AnimSequence) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.data.len());

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
                    debug_assert_eq!(out.len(), layout.meta_offset, "track out of table order");
                    write_chunks(&seq.data[layout.meta_offset..][..layout.meta_len], 4, &mut out);
                    write_chunks(
                        &seq.data[layout.keys_offset..][..layout.keys_len],
                        format.bytes_per_component(),
                        &mut out,
                    );
                    write_padding(&mut out);
                    if layout.has_table {
                        write_chunks(
                            &seq.data[layout.table_offset..][..layout.table_len],
                            FrameTable::entry_width(seq.frame_count),
                            &mut out,
                        );
                        write_padding(&mut out);
                    }
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
                    let word = read_u32(&seq.data, offset);
                    let Some(header) = TrackHeader::unpack(word) else {
                        debug_assert!(false, "exporting unbound per-track header");
                        continue;
                    };
                    debug_assert_eq!(out.len(), offset, "track out of table order");
                    out.extend_from_slice(&word.to_le_bytes());

                    let layout = per_track_layout(&header, offset, kind, seq.frame_count);
                    write_chunks(&seq.data[layout.meta_offset..][..layout.meta_len], 4, &mut out);
                    write_chunks(
                        &seq.data[layout.keys_offset..][..layout.keys_len],
                        header.format.bytes_per_component(),
                        &mut out,
                    );
                    write_padding(&mut out);
                    if layout.has_table {
                        write_chunks(
                            &seq.data[layout.table_offset..][..layout.table_len],
                            FrameTable::entry_width(seq.frame_count),
                            &mut out,
                        );
                        write_padding(&mut out);
                    }
                }
            }
        }
    }

    out
}

/// Re-order native chunks of `width` bytes into little-endian wire order.
fn write_chunks(src: &[u8], width: usize, out: &mut Vec<u8>) {
    match width {
        0 => {}
        1 => out.extend_from_slice(src),
        2 => {
            for chunk in src.chunks_exact(2) {
                out.extend_from_slice(&read_u16(chunk, 0).to_le_bytes());
            }
        }
        4 => {
            for chunk in src.chunks_exact(4) {
                out.extend_from_slice(&read_u32(chunk, 0).to_le_bytes());
            }
        }
        _ => debug_assert!(false, "unsupported chunk width {width}"),
    }
}

fn write_padding(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(PAD_BYTE);
    }
}

// ============================================================================
// Import: wire → native memory
// ============================================================================

struct WireReader<'a> {
    wire: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + len > self.wire.len() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                need: len,
                have: self.wire.len() - self.pos,
            });
        }
        let slice = &self.wire[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

/// Deserialize a wire stream into the sequence's buffer, rewriting track
/// offsets when a legacy layout shrinks.
///
/// `source_version` comes from the surrounding asset container. Versions
/// newer than this build are read as the newest known layout (best effort).
pub fn import(seq: &mut AnimSequence, wire: &[u8], source_version: u32) -> Result<(), CodecError> {
    let version = if source_version > WIRE_VERSION {
        warn!(
            source_version,
            newest = WIRE_VERSION,
            "animation stream from a newer build; reading as newest known layout"
        );
        WIRE_VERSION
    } else {
        source_version
    };
    let legacy = version <= LEGACY_IMPLICIT_INTERVAL_VERSION;

    let mut reader = WireReader { wire, pos: 0 };
    let mut native: Vec<u8> = Vec::with_capacity(wire.len());
    let frame_count = seq.frame_count;
    let rotation_format = seq.rotation_format;
    let translation_format = seq.translation_format;
    let variable = seq.encoding == TrackEncoding::Variable;

    match &mut seq.tracks {
        TrackTable::Standard(entries) => {
            for entry in entries.iter_mut() {
                if entry.trans_keys > 0 && translation_format != KeyFormat::Identity {
                    entry.trans_offset = native.len() as u32;
                    import_standard_track(
                        &mut reader,
                        &mut native,
                        entry.trans_keys,
                        translation_format,
                        TrackKind::Translation,
                        frame_count,
                        variable,
                        false,
                    )?;
                }
                if entry.rot_keys > 0 && rotation_format != KeyFormat::Identity {
                    entry.rot_offset = native.len() as u32;
                    let skip_legacy_block = legacy
                        && entry.rot_keys > 1
                        && has_legacy_interval_block(rotation_format);
                    import_standard_track(
                        &mut reader,
                        &mut native,
                        entry.rot_keys,
                        rotation_format,
                        TrackKind::Rotation,
                        frame_count,
                        variable,
                        skip_legacy_block,
                    )?;
                }
            }
        }
        TrackTable::PerTrack(entries) => {
            for entry in entries.iter_mut() {
                if entry.trans_offset != NO_TRACK_DATA {
                    entry.trans_offset = native.len() as u32;
                    import_per_track(&mut reader, &mut native, TrackKind::Translation, frame_count)?;
                }
                if entry.rot_offset != NO_TRACK_DATA {
                    entry.rot_offset = native.len() as u32;
                    import_per_track(&mut reader, &mut native, TrackKind::Rotation, frame_count)?;
                }
            }
        }
    }

    debug_assert_eq!(reader.pos, wire.len(), "trailing bytes after last track");
    seq.data = native;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn import_standard_track(
    reader: &mut WireReader,
    native: &mut Vec<u8>,
    key_count: u32,
    format: KeyFormat,
    kind: TrackKind,
    frame_count: u32,
    variable: bool,
    skip_legacy_block: bool,
) -> Result<(), CodecError> {
    if skip_legacy_block {
        reader.take(LEGACY_INTERVAL_BLOCK)?;
    }

    let meta_len = format.fixed_meta_bytes(ALL_AXES);
    read_chunks(reader, native, meta_len, 4)?;

    let keys_len = key_count as usize * format.bytes_per_key(kind);
    read_chunks(reader, native, keys_len, format.bytes_per_component())?;
    read_padding(reader, native)?;

    if variable && key_count > 1 {
        let table_len = key_count as usize * FrameTable::entry_width(frame_count);
        read_chunks(reader, native, table_len, FrameTable::entry_width(frame_count))?;
        read_padding(reader, native)?;
    }
    Ok(())
}

fn import_per_track(
    reader: &mut WireReader,
    native: &mut Vec<u8>,
    kind: TrackKind,
    frame_count: u32,
) -> Result<(), CodecError> {
    let word_bytes = reader.take(TrackHeader::SIZE)?;
    let word = u32::from_le_bytes([word_bytes[0], word_bytes[1], word_bytes[2], word_bytes[3]]);
    let header =
        TrackHeader::unpack(word).ok_or(CodecError::UnknownFormat(((word >> 24) & 0xF) as u8))?;
    let offset = native.len();
    native.extend_from_slice(&word.to_ne_bytes());

    let layout = per_track_layout(&header, offset, kind, frame_count);
    read_chunks(reader, native, layout.meta_len, 4)?;
    read_chunks(reader, native, layout.keys_len, header.format.bytes_per_component())?;
    read_padding(reader, native)?;
    if layout.has_table {
        let width = FrameTable::entry_width(frame_count);
        read_chunks(reader, native, layout.table_len, width)?;
        read_padding(reader, native)?;
    }
    Ok(())
}

/// Re-order little-endian wire chunks of `width` bytes into native memory.
fn read_chunks(
    reader: &mut WireReader,
    native: &mut Vec<u8>,
    len: usize,
    width: usize,
) -> Result<(), CodecError> {
    if len == 0 {
        return Ok(());
    }
    let src = reader.take(len)?;
    match width {
        1 => native.extend_from_slice(src),
        2 => {
            for chunk in src.chunks_exact(2) {
                native.extend_from_slice(&u16::from_le_bytes([chunk[0], chunk[1]]).to_ne_bytes());
            }
        }
        4 => {
            for chunk in src.chunks_exact(4) {
                native.extend_from_slice(
                    &u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]).to_ne_bytes(),
                );
            }
        }
        _ => debug_assert!(false, "unsupported chunk width {width}"),
    }
    Ok(())
}

fn read_padding(reader: &mut WireReader, native: &mut Vec<u8>) -> Result<(), CodecError> {
    while native.len() % 4 != 0 {
        let byte = reader.take(1)?[0];
        if byte != PAD_BYTE {
            return Err(CodecError::CorruptPadding {
                offset: reader.pos - 1,
            });
        }
        native.push(PAD_BYTE);
    }
    Ok(())
}
