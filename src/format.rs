//! Key quantization formats
//!
//! Each animation key is a rotation quaternion or a translation vector packed
//! into one of a fixed set of byte layouts. Formats that drop the quaternion
//! W component reconstruct it as `sqrt(max(0, 1 - x² - y² - z²))`.
//!
//! # Per-key layouts
//! ```text
//! Raw        rotation: 4 × f32 (x, y, z, w)       translation: 3 × f32
//! Float3     rotation: 3 × f32 (x, y, z)          w derived
//! Fixed16    rotation: 3 × u16 fixed-point        w derived
//! Interval32 one u32 [x:11][y:11][z:10], per-axis (min, range) f32 pairs
//!            stored once per track; absent axes decode to 0.0
//! Fixed32    one u32 [x:11][y:11][z:10], implicit range ±1/√2, w derived
//! Float32    one u32 of three mini-floats (1+3+7, 1+3+7, 1+3+6 bits)
//! Identity   zero bytes, zero keys
//! ```
//!
//! All unpack functions are pure reads of native-endian memory; the wire
//! import path in [`crate::swap`] is responsible for byte order.

use glam::{Quat, Vec3};

// ============================================================================
// Axis presence flags (per-track, self-describing family only)
// ============================================================================

/// Axis flag: X component stored
pub const AXIS_X: u8 = 1;
/// Axis flag: Y component stored
pub const AXIS_Y: u8 = 2;
/// Axis flag: Z component stored
pub const AXIS_Z: u8 = 4;
/// All three axes stored (the only shape the sequence-wide families use)
pub const ALL_AXES: u8 = AXIS_X | AXIS_Y | AXIS_Z;

/// Which payload a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Rotation,
    Translation,
}

// ============================================================================
// Format enum and constant stride tables
// ============================================================================

/// Quantization format for one track's keys.
///
/// Closed set, fixed wire ids. Unknown ids are rejected when the sequence is
/// bound, never per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// Uncompressed floats (4 for rotation, 3 for translation)
    Raw,
    /// Three floats, W derived (rotation only)
    Float3,
    /// Three 16-bit fixed-point values, W derived (rotation only)
    Fixed16,
    /// One u32 of 11/11/10-bit fields rescaled through per-track intervals
    Interval32,
    /// One u32 of 11/11/10-bit fields with implicit ±1/√2 range (rotation only)
    Fixed32,
    /// One u32 of three mini-floats, no stored interval (rotation only)
    Float32,
    /// No data; decodes to identity rotation / zero translation
    Identity,
}

impl KeyFormat {
    /// Map a wire id to a format. `None` for ids this build does not know.
    pub const fn from_wire(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Raw),
            1 => Some(Self::Float3),
            2 => Some(Self::Fixed16),
            3 => Some(Self::Interval32),
            4 => Some(Self::Fixed32),
            5 => Some(Self::Float32),
            6 => Some(Self::Identity),
            _ => None,
        }
    }

    /// Fixed wire id of this format.
    pub const fn wire_id(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Float3 => 1,
            Self::Fixed16 => 2,
            Self::Interval32 => 3,
            Self::Fixed32 => 4,
            Self::Float32 => 5,
            Self::Identity => 6,
        }
    }

    /// Byte width of one raw transmitted component.
    ///
    /// The byte-swap layer chunks key data by this width without decoding it.
    #[inline]
    pub const fn bytes_per_component(self) -> usize {
        match self {
            Self::Raw | Self::Float3 => 4,
            Self::Fixed16 => 2,
            Self::Interval32 | Self::Fixed32 | Self::Float32 => 4,
            Self::Identity => 0,
        }
    }

    /// Number of raw components transmitted per key.
    #[inline]
    pub const fn components(self, kind: TrackKind) -> usize {
        match self {
            Self::Raw => match kind {
                TrackKind::Rotation => 4,
                TrackKind::Translation => 3,
            },
            Self::Float3 | Self::Fixed16 => 3,
            Self::Interval32 | Self::Fixed32 | Self::Float32 => 1,
            Self::Identity => 0,
        }
    }

    /// Total packed size of one key in bytes.
    #[inline]
    pub const fn bytes_per_key(self, kind: TrackKind) -> usize {
        self.bytes_per_component() * self.components(kind)
    }

    /// Size of the per-track fixed metadata preceding the keys.
    ///
    /// Only the interval format stores metadata: one (min, range) f32 pair
    /// per present axis.
    #[inline]
    pub const fn fixed_meta_bytes(self, axis_flags: u8) -> usize {
        match self {
            Self::Interval32 => 8 * (axis_flags & ALL_AXES).count_ones() as usize,
            _ => 0,
        }
    }

    /// True for formats that can only encode rotations (they derive the
    /// fourth component and assume a unit quaternion).
    #[inline]
    pub const fn rotation_only(self) -> bool {
        matches!(self, Self::Float3 | Self::Fixed16 | Self::Fixed32 | Self::Float32)
    }
}

// ============================================================================
// Native-endian memory reads
// ============================================================================

#[inline]
pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    bytemuck::pod_read_unaligned(&bytes[offset..offset + 2])
}

// ============================================================================
// Quantizer math
// ============================================================================

/// 11/11/10 bit-field split of a packed u32: `[x:11][y:11][z:10]`.
#[inline]
pub(crate) fn split_fields(word: u32) -> [u32; 3] {
    [(word >> 21) & 0x7FF, (word >> 10) & 0x7FF, word & 0x3FF]
}

#[inline]
pub(crate) fn join_fields(x: u32, y: u32, z: u32) -> u32 {
    debug_assert!(x <= 0x7FF && y <= 0x7FF && z <= 0x3FF);
    (x << 21) | (y << 10) | z
}

/// Maximum raw value per 11/11/10 field.
pub(crate) const FIELD_MAX: [u32; 3] = [0x7FF, 0x7FF, 0x3FF];

/// Reconstruct the dropped quaternion component. A non-positive radicand
/// clamps to zero rather than erroring.
#[inline]
pub(crate) fn derive_fourth(x: f32, y: f32, z: f32) -> f32 {
    (1.0 - x * x - y * y - z * z).max(0.0).sqrt()
}

/// Dequantize a field with implicit symmetric range [-1/√2, 1/√2].
#[inline]
fn dequant_unit(raw: u32, max_raw: u32) -> f32 {
    (raw as f32 / max_raw as f32 * 2.0 - 1.0) * std::f32::consts::FRAC_1_SQRT_2
}

/// Quantize into the implicit symmetric range. Inverse of [`dequant_unit`].
#[inline]
fn quant_unit(value: f32, max_raw: u32) -> u32 {
    let normalized = ((value * std::f32::consts::SQRT_2).clamp(-1.0, 1.0) + 1.0) * 0.5;
    (normalized * max_raw as f32).round() as u32
}

/// Fixed16 dequantizer: [0, 65534] → [-1, 1].
#[inline]
fn dequant_fixed16(raw: u16) -> f32 {
    (raw as i32 - 32767) as f32 / 32767.0
}

/// Fixed16 quantizer. Inverse of [`dequant_fixed16`].
#[inline]
fn quant_fixed16(value: f32) -> u16 {
    ((value.clamp(-1.0, 1.0) * 32767.0).round() as i32 + 32767) as u16
}

// ============================================================================
// Mini-float (Float32 format)
// ============================================================================

/// Exponent bias of the 3-bit mini-float exponent.
const MINI_EXP_BIAS: i32 = 4;

/// Decode a mini-float field: 1 sign bit, 3 exponent bits (bias 4, denormals
/// at exponent 0), `mantissa_bits` mantissa bits.
fn mini_decode(field: u32, mantissa_bits: u32) -> f32 {
    let sign = field >> (mantissa_bits + 3);
    let exp = (field >> mantissa_bits) & 0x7;
    let man = field & ((1 << mantissa_bits) - 1);
    let scale = (1u32 << mantissa_bits) as f32;
    let mag = if exp == 0 {
        man as f32 / scale * (2.0f32).powi(1 - MINI_EXP_BIAS)
    } else {
        (1.0 + man as f32 / scale) * (2.0f32).powi(exp as i32 - MINI_EXP_BIAS)
    };
    if sign != 0 { -mag } else { mag }
}

/// Encode a mini-float field. Magnitudes at or above 16 saturate to the
/// largest finite value.
fn mini_encode(value: f32, mantissa_bits: u32) -> u32 {
    let sign = if value.is_sign_negative() {
        1u32 << (mantissa_bits + 3)
    } else {
        0
    };
    let mag = value.abs();
    let scale = (1u32 << mantissa_bits) as f32;
    if mag == 0.0 {
        return sign;
    }

    let min_normal = (2.0f32).powi(1 - MINI_EXP_BIAS);
    if mag < min_normal {
        let man = (mag / min_normal * scale).round() as u32;
        if man >= 1 << mantissa_bits {
            // Rounded up into the first normal value
            return sign | (1 << mantissa_bits);
        }
        return sign | man;
    }

    let mut exp = (mag.log2().floor() as i32).clamp(1 - MINI_EXP_BIAS, 7 - MINI_EXP_BIAS);
    let mut man = ((mag / (2.0f32).powi(exp) - 1.0) * scale).round() as u32;
    if man >= 1 << mantissa_bits {
        man = 0;
        exp += 1;
        if exp > 7 - MINI_EXP_BIAS {
            // Saturate
            return sign | (0x7 << mantissa_bits) | ((1 << mantissa_bits) - 1);
        }
    }
    sign | (((exp + MINI_EXP_BIAS) as u32) << mantissa_bits) | man
}

// ============================================================================
// Interval rescaling
// ============================================================================

/// Decode the three axes of an interval-quantized u32 sample.
///
/// `meta` holds one native-endian (min, range) f32 pair per present axis, in
/// X, Y, Z order. Absent axes contribute 0.0 and own no pair.
fn unpack_interval_fields(word: u32, axis_flags: u8, meta: &[u8]) -> [f32; 3] {
    let fields = split_fields(word);
    let mut out = [0.0f32; 3];
    let mut meta_off = 0;
    for axis in 0..3 {
        if axis_flags & (1 << axis) != 0 {
            let min = read_f32(meta, meta_off);
            let range = read_f32(meta, meta_off + 4);
            meta_off += 8;
            out[axis] = min + fields[axis] as f32 / FIELD_MAX[axis] as f32 * range;
        }
    }
    out
}

// ============================================================================
// Unpack (decode) — pure functions of native-endian key bytes
// ============================================================================

/// Unpack one rotation key.
///
/// `fixed_meta` is the track's fixed metadata region (empty unless the
/// format stores intervals); `key` is exactly one packed key.
pub fn unpack_rotation(format: KeyFormat, axis_flags: u8, fixed_meta: &[u8], key: &[u8]) -> Quat {
    match format {
        KeyFormat::Raw => Quat::from_xyzw(
            read_f32(key, 0),
            read_f32(key, 4),
            read_f32(key, 8),
            read_f32(key, 12),
        ),
        KeyFormat::Float3 => {
            let (x, y, z) = (read_f32(key, 0), read_f32(key, 4), read_f32(key, 8));
            Quat::from_xyzw(x, y, z, derive_fourth(x, y, z))
        }
        KeyFormat::Fixed16 => {
            let x = dequant_fixed16(read_u16(key, 0));
            let y = dequant_fixed16(read_u16(key, 2));
            let z = dequant_fixed16(read_u16(key, 4));
            Quat::from_xyzw(x, y, z, derive_fourth(x, y, z))
        }
        KeyFormat::Interval32 => {
            let [x, y, z] = unpack_interval_fields(read_u32(key, 0), axis_flags, fixed_meta);
            Quat::from_xyzw(x, y, z, derive_fourth(x, y, z))
        }
        KeyFormat::Fixed32 => {
            let fields = split_fields(read_u32(key, 0));
            let x = dequant_unit(fields[0], FIELD_MAX[0]);
            let y = dequant_unit(fields[1], FIELD_MAX[1]);
            let z = dequant_unit(fields[2], FIELD_MAX[2]);
            Quat::from_xyzw(x, y, z, derive_fourth(x, y, z))
        }
        KeyFormat::Float32 => {
            let fields = split_fields(read_u32(key, 0));
            let x = mini_decode(fields[0], 7);
            let y = mini_decode(fields[1], 7);
            let z = mini_decode(fields[2], 6);
            Quat::from_xyzw(x, y, z, derive_fourth(x, y, z))
        }
        KeyFormat::Identity => Quat::IDENTITY,
    }
}

/// Unpack one translation key.
pub fn unpack_translation(format: KeyFormat, axis_flags: u8, fixed_meta: &[u8], key: &[u8]) -> Vec3 {
    match format {
        KeyFormat::Raw => Vec3::new(read_f32(key, 0), read_f32(key, 4), read_f32(key, 8)),
        KeyFormat::Interval32 => {
            let [x, y, z] = unpack_interval_fields(read_u32(key, 0), axis_flags, fixed_meta);
            Vec3::new(x, y, z)
        }
        KeyFormat::Identity => Vec3::ZERO,
        // Rotation-only formats are rejected at bind time
        KeyFormat::Float3 | KeyFormat::Fixed16 | KeyFormat::Fixed32 | KeyFormat::Float32 => {
            debug_assert!(false, "rotation-only format {format:?} on a translation track");
            Vec3::ZERO
        }
    }
}

// ============================================================================
// Pack (encode) helpers
//
// The authoring-side compressor lives in the asset pipeline; these exist for
// tests, tooling, and the legacy import path's reference data.
// ============================================================================

/// Flip the quaternion sign so the derived component comes out non-negative.
#[inline]
fn positive_w(q: Quat) -> Quat {
    if q.w < 0.0 { -q } else { q }
}

/// Pack an uncompressed rotation key (x, y, z, w).
pub fn pack_raw_rotation(q: Quat) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    for (i, v) in [q.x, q.y, q.z, q.w].into_iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }
    bytes
}

/// Pack a `Float3` rotation key (three floats, W derived on decode).
pub fn pack_float3(q: Quat) -> [u8; 12] {
    let q = positive_w(q);
    let mut bytes = [0u8; 12];
    for (i, v) in [q.x, q.y, q.z].into_iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }
    bytes
}

/// Pack a `Fixed16` rotation key (three u16 fixed-point values).
pub fn pack_fixed16(q: Quat) -> [u8; 6] {
    let q = positive_w(q);
    let mut bytes = [0u8; 6];
    for (i, v) in [q.x, q.y, q.z].into_iter().enumerate() {
        bytes[i * 2..i * 2 + 2].copy_from_slice(&quant_fixed16(v).to_ne_bytes());
    }
    bytes
}

/// Pack a `Fixed32` rotation key (11/11/10 fields, implicit ±1/√2 range).
pub fn pack_fixed32(q: Quat) -> [u8; 4] {
    let q = positive_w(q);
    let word = join_fields(
        quant_unit(q.x, FIELD_MAX[0]),
        quant_unit(q.y, FIELD_MAX[1]),
        quant_unit(q.z, FIELD_MAX[2]),
    );
    word.to_ne_bytes()
}

/// Pack a `Float32` rotation key (three mini-floats in one u32).
pub fn pack_float32(q: Quat) -> [u8; 4] {
    let q = positive_w(q);
    let word = join_fields(mini_encode(q.x, 7), mini_encode(q.y, 7), mini_encode(q.z, 6));
    word.to_ne_bytes()
}

/// Pack an uncompressed translation key.
pub fn pack_raw_translation(v: Vec3) -> [u8; 12] {
    let mut bytes = [0u8; 12];
    for (i, c) in [v.x, v.y, v.z].into_iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&c.to_ne_bytes());
    }
    bytes
}

/// Pack one `Interval32` sample against per-axis intervals.
///
/// Absent axes pack a zero field (ignored on decode).
pub fn pack_interval_key(value: [f32; 3], mins: [f32; 3], ranges: [f32; 3], axis_flags: u8) -> [u8; 4] {
    let mut fields = [0u32; 3];
    for axis in 0..3 {
        if axis_flags & (1 << axis) != 0 && ranges[axis] > 0.0 {
            let normalized = ((value[axis] - mins[axis]) / ranges[axis]).clamp(0.0, 1.0);
            fields[axis] = (normalized * FIELD_MAX[axis] as f32).round() as u32;
        }
    }
    join_fields(fields[0], fields[1], fields[2]).to_ne_bytes()
}

/// Build the fixed metadata block for an `Interval32` track: one
/// (min, range) pair per present axis, X, Y, Z order.
pub fn pack_interval_meta(mins: [f32; 3], ranges: [f32; 3], axis_flags: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(24);
    for axis in 0..3 {
        if axis_flags & (1 << axis) != 0 {
            bytes.extend_from_slice(&mins[axis].to_ne_bytes());
            bytes.extend_from_slice(&ranges[axis].to_ne_bytes());
        }
    }
    bytes
}
