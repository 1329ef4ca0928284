//! Single-channel range and bit depth scaling
//!
//! Used for luma-only (gray) output, alpha, and widening native samples to
//! the 8/16-bit display buffers.

use crate::image::Range;

/// Largest sample value at `depth`
#[inline]
pub fn max_value(depth: u8) -> u16 {
    ((1u32 << depth) - 1) as u16
}

/// Bias and span of the luma channel at `depth`
#[inline]
pub(crate) fn luma_bias_range(range: Range, depth: u8) -> (f32, f32) {
    match range {
        Range::Limited => (
            (16u32 << (depth - 8)) as f32,
            (219u32 << (depth - 8)) as f32,
        ),
        Range::Full => (0.0, f32::from(max_value(depth))),
    }
}

/// Bias and span of the chroma channels at `depth`
#[inline]
pub(crate) fn chroma_bias_range(range: Range, depth: u8) -> (f32, f32) {
    let bias = (1u32 << (depth - 1)) as f32;
    match range {
        Range::Limited => (bias, (224u32 << (depth - 8)) as f32),
        Range::Full => (bias, f32::from(max_value(depth))),
    }
}

/// Expand a limited-range luma-style sample to full range, rounded.
///
/// Footroom and headroom codes clamp to 0 and max.
#[inline]
pub fn limited_to_full(v: u16, depth: u8) -> u16 {
    let max = u32::from(max_value(depth));
    let min = 16u32 << (depth - 8);
    let span = 219u32 << (depth - 8);
    let v = u32::from(v).clamp(min, min + span) - min;
    ((v * max + span / 2) / span) as u16
}

/// Expand `v` to full range if `range` is limited
#[inline]
pub fn to_full_range(v: u16, range: Range, depth: u8) -> u16 {
    match range {
        Range::Full => v.min(max_value(depth)),
        Range::Limited => limited_to_full(v, depth),
    }
}

/// Scale a value from native bit depth to full u16 range using LSB replication.
///
/// For 10-bit: `(v << 6) | (v >> 4)` maps 0→0, 1023→65535
/// For 12-bit: `(v << 4) | (v >> 8)` maps 0→0, 4095→65535
/// Depths below 8 are not supported.
#[inline]
pub fn scale_to_u16(v: u16, depth: u8) -> u16 {
    if depth >= 16 {
        return v;
    }
    let shift = 16 - depth;
    (v << shift) | (v >> (depth - shift))
}

/// Reduce a native sample to 8 bits, rounded
#[inline]
pub fn scale_to_u8(v: u16, depth: u8) -> u8 {
    if depth == 8 {
        return v.min(255) as u8;
    }
    let max = u32::from(max_value(depth));
    ((u32::from(v).min(max) * 255 + max / 2) / max) as u8
}
