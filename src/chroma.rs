//! Chroma sample addressing for subsampled YUV layouts
//!
//! Upsampling is nearest-neighbour: every luma pixel inside a chroma block
//! reads the same chroma sample. Downsampling averages the block, clipped at
//! the right and bottom edges for odd dimensions.

use imgref::{ImgRef, ImgVec};

use crate::image::PixelFormatInfo;

/// Chroma plane coordinate serving luma pixel `(x, y)`
#[inline]
pub fn chroma_position(x: usize, y: usize, info: &PixelFormatInfo) -> (usize, usize) {
    (x >> info.chroma_shift_x, y >> info.chroma_shift_y)
}

/// Average full-resolution chroma values down to the chroma plane size
pub fn downsample(full: ImgRef<'_, f32>, info: &PixelFormatInfo) -> ImgVec<f32> {
    let (sx, sy) = (info.chroma_shift_x, info.chroma_shift_y);
    let cw = (full.width() + (1 << sx) - 1) >> sx;
    let ch = (full.height() + (1 << sy) - 1) >> sy;
    if sx == 0 && sy == 0 {
        return ImgVec::new(full.pixels().collect(), cw, ch);
    }

    let mut out = Vec::with_capacity(cw * ch);
    for cy in 0..ch {
        let rows = (cy << sy)..((cy + 1) << sy).min(full.height());
        for cx in 0..cw {
            let cols = (cx << sx)..((cx + 1) << sx).min(full.width());
            let mut sum = 0.0f32;
            let mut count = 0u32;
            for y in rows.clone() {
                let row = &full.buf()[y * full.stride()..];
                for &v in &row[cols.clone()] {
                    sum += v;
                    count += 1;
                }
            }
            out.push(sum / count as f32);
        }
    }
    ImgVec::new(out, cw, ch)
}
