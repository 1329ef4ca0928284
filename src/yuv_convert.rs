//! YUV <-> RGB conversion on container planes
//!
//! Samples are normalized to floating point, transformed, then rounded back
//! to the image depth. RGB planes produced here stay at the native depth;
//! widening to display buffers happens in [`crate::bitmap`].
//!
//! References:
//! - ITU-T H.273 (matrix coefficients, range)
//! - ITU-R BT.601 (SD video)
//! - ITU-R BT.709 (HD video)
//! - ITU-R BT.2020 (UHD video)

use imgref::ImgVec;
use log::debug;
use whereat::at;

use crate::chroma;
use crate::cicp::{ColorPrimaries, MatrixCoefficients, luma_coefficients};
use crate::convert::{chroma_bias_range, luma_bias_range, max_value};
use crate::error::{Error, Result};
use crate::image::{AvifImage, Channel, PixelFormat, PixelFormatInfo, Plane, Planes, Range, check_depth};

/// How samples map between YUV and RGB
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReformatMode {
    /// Linear matrix defined by luma coefficients
    Yuv {
        kr: f32,
        kg: f32,
        kb: f32,
    },
    /// The "YUV" planes already hold G, B, R
    Identity,
    /// YCgCo
    YCgCo,
}

/// Select the conversion for a matrix coefficients code.
///
/// Unspecified (2) decodes as BT.601. Codes without a linear mapping here
/// are an error rather than a guess.
pub fn reformat_mode(
    matrix: MatrixCoefficients,
    primaries: ColorPrimaries,
) -> Result<ReformatMode> {
    let (kr, kb) = match matrix.0 {
        0 => return Ok(ReformatMode::Identity),
        8 => return Ok(ReformatMode::YCgCo),
        1 => (0.2126, 0.0722),
        2 | 5 | 6 => (0.299, 0.114),
        4 => (0.30, 0.11),
        7 => (0.212, 0.087),
        9 => (0.2627, 0.0593),
        12 => luma_coefficients(primaries)
            .ok_or_else(|| at(Error::UnsupportedMatrixCoefficients(matrix.0)))?,
        code => return Err(at(Error::UnsupportedMatrixCoefficients(code))),
    };
    Ok(ReformatMode::Yuv {
        kr,
        kg: 1.0 - kr - kb,
        kb,
    })
}

/// Everything needed to convert one image's samples
#[derive(Debug, Clone)]
pub struct ReformatState {
    pub mode: ReformatMode,
    pub depth: u8,
    pub range: Range,
    pub format: PixelFormat,
    info: PixelFormatInfo,
    y_bias: f32,
    y_range: f32,
    uv_bias: f32,
    uv_range: f32,
    max: f32,
}

impl ReformatState {
    /// Derive the conversion parameters from an image's tags and profile.
    pub fn new(image: &AvifImage) -> Result<Self> {
        check_depth(image.depth())?;
        let format = image.yuv_format();
        let info = format
            .info()
            .ok_or_else(|| at(Error::UnsupportedPixelFormat(format)))?;
        let mode = reformat_mode(image.matrix_coefficients(), image.colour_primaries())?;
        let depth = image.depth();
        let range = image.yuv_range();
        let (y_bias, y_range) = luma_bias_range(range, depth);
        let (uv_bias, uv_range) = chroma_bias_range(range, depth);
        Ok(Self {
            mode,
            depth,
            range,
            format,
            info,
            y_bias,
            y_range,
            uv_bias,
            uv_range,
            max: f32::from(max_value(depth)),
        })
    }

    /// Normalized, unclamped RGB for one YUV triple; `uv` is `None` for gray
    pub fn yuv_to_rgb_unorm(&self, y: u16, uv: Option<(u16, u16)>) -> [f32; 3] {
        let luma = |v: u16| (f32::from(v) - self.y_bias) / self.y_range;
        let chroma = |v: u16| (f32::from(v) - self.uv_bias) / self.uv_range;

        let Some((u, v)) = uv else {
            let yn = luma(y);
            return [yn, yn, yn];
        };
        match self.mode {
            ReformatMode::Identity => [luma(v), luma(y), luma(u)],
            ReformatMode::YCgCo => {
                let (yn, cg, co) = (luma(y), chroma(u), chroma(v));
                let t = yn - cg;
                [t + co, yn + cg, t - co]
            }
            ReformatMode::Yuv { kr, kg, kb } => {
                let (yn, cb, cr) = (luma(y), chroma(u), chroma(v));
                let vr = 2.0 * (1.0 - kr);
                let ug = -2.0 * kb * (1.0 - kb) / kg;
                let vg = -2.0 * kr * (1.0 - kr) / kg;
                let ub = 2.0 * (1.0 - kb);
                [yn + vr * cr, yn + ug * cb + vg * cr, yn + ub * cb]
            }
        }
    }

    /// Normalized luma and the two chroma components for one RGB triple.
    ///
    /// Chroma is returned centred on zero; for identity it is the raw B and R.
    pub fn rgb_unorm_to_yuv(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        match self.mode {
            ReformatMode::Identity => [g, b, r],
            ReformatMode::YCgCo => [
                0.5 * g + 0.25 * (r + b),
                0.5 * g - 0.25 * (r + b),
                0.5 * (r - b),
            ],
            ReformatMode::Yuv { kr, kg, kb } => {
                let y = kr * r + kg * g + kb * b;
                [y, (b - y) / (2.0 * (1.0 - kb)), (r - y) / (2.0 * (1.0 - kr))]
            }
        }
    }

    /// Round a normalized RGB component to the native depth
    #[inline]
    pub fn quantize_rgb(&self, v: f32) -> u16 {
        (v.clamp(0.0, 1.0) * self.max).round() as u16
    }

    #[inline]
    fn quantize_luma(&self, v: f32) -> u16 {
        (v * self.y_range + self.y_bias).round().clamp(0.0, self.max) as u16
    }

    #[inline]
    fn quantize_chroma(&self, v: f32) -> u16 {
        match self.mode {
            ReformatMode::Identity => self.quantize_luma(v),
            _ => (v * self.uv_range + self.uv_bias).round().clamp(0.0, self.max) as u16,
        }
    }

    /// Native-depth RGB of pixel `(x, y)`
    pub(crate) fn rgb_at(&self, planes: &YuvPlanes<'_>, x: usize, y: usize) -> [u16; 3] {
        let luma = planes.y.sample(x, y);
        let uv = planes.uv.map(|(u, v)| {
            let (cx, cy) = chroma::chroma_position(x, y, &self.info);
            (u.sample(cx, cy), v.sample(cx, cy))
        });
        self.yuv_to_rgb_unorm(luma, uv).map(|c| self.quantize_rgb(c))
    }
}

/// Borrowed YUV planes of an image; chroma absent for gray images
#[derive(Debug, Clone, Copy)]
pub(crate) struct YuvPlanes<'a> {
    pub(crate) y: &'a Plane,
    pub(crate) uv: Option<(&'a Plane, &'a Plane)>,
}

impl<'a> YuvPlanes<'a> {
    pub(crate) fn from_image(image: &'a AvifImage) -> Result<Self> {
        let y = image
            .plane(Channel::Y)
            .ok_or_else(|| at(Error::MissingPlanes(Planes::YUV)))?;
        let uv = if image.is_monochrome() {
            None
        } else {
            image.plane(Channel::U).zip(image.plane(Channel::V))
        };
        Ok(Self { y, uv })
    }
}

/// Convert the YUV planes of `image` into its RGB planes.
///
/// RGB planes are allocated if needed and written at the image depth. The
/// alpha plane is left untouched.
pub fn yuv_to_rgb(image: &mut AvifImage) -> Result<()> {
    let state = ReformatState::new(image)?;
    image.check_alpha_size()?;
    let (width, height) = (image.width() as usize, image.height() as usize);

    let pixels = {
        let planes = YuvPlanes::from_image(image)?;
        debug!(
            "yuv_to_rgb {}x{} depth {} {:?} {:?} {:?} gray={}",
            width,
            height,
            state.depth,
            state.format,
            state.range,
            state.mode,
            planes.uv.is_none()
        );
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(state.rgb_at(&planes, x, y));
            }
        }
        pixels
    };

    image.allocate_planes(Planes::RGB)?;
    for (c, channel) in [Channel::R, Channel::G, Channel::B].into_iter().enumerate() {
        let plane = image
            .plane_mut(channel)
            .ok_or_else(|| at(Error::MissingPlanes(Planes::RGB)))?;
        for y in 0..height {
            for x in 0..width {
                plane.set_sample(x, y, pixels[y * width + x][c]);
            }
        }
    }
    Ok(())
}

/// Convert the RGB planes of `image` into YUV planes for its pixel format.
///
/// Chroma is averaged over each subsampling block. Limited range images are
/// compressed into the studio range. The alpha plane is left untouched.
pub fn rgb_to_yuv(image: &mut AvifImage) -> Result<()> {
    let state = ReformatState::new(image)?;
    image.check_alpha_size()?;
    let (width, height) = (image.width() as usize, image.height() as usize);

    let (r, g, b) = match (
        image.plane(Channel::R),
        image.plane(Channel::G),
        image.plane(Channel::B),
    ) {
        (Some(r), Some(g), Some(b)) => (r, g, b),
        _ => return Err(at(Error::MissingPlanes(Planes::RGB))),
    };
    debug!(
        "rgb_to_yuv {}x{} depth {} {:?} {:?} {:?}",
        width, height, state.depth, state.format, state.range, state.mode
    );

    let mut luma = Vec::with_capacity(width * height);
    let mut cb = Vec::with_capacity(width * height);
    let mut cr = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let rgb = [r, g, b].map(|p| f32::from(p.sample(x, y)) / state.max);
            let [yn, u, v] = state.rgb_unorm_to_yuv(rgb);
            luma.push(state.quantize_luma(yn));
            cb.push(u);
            cr.push(v);
        }
    }

    let chroma_planes = if state.info.monochrome {
        None
    } else {
        let cb = chroma::downsample(ImgVec::new(cb, width, height).as_ref(), &state.info);
        let cr = chroma::downsample(ImgVec::new(cr, width, height).as_ref(), &state.info);
        Some((cb, cr))
    };

    image.free_planes(Planes::YUV);
    image.allocate_planes(Planes::YUV)?;
    if let Some(plane) = image.plane_mut(Channel::Y) {
        for y in 0..height {
            for x in 0..width {
                plane.set_sample(x, y, luma[y * width + x]);
            }
        }
    }
    if let Some((cb, cr)) = chroma_planes {
        for (channel, values) in [(Channel::U, cb), (Channel::V, cr)] {
            let plane = image
                .plane_mut(channel)
                .ok_or_else(|| at(Error::MissingPlanes(Planes::YUV)))?;
            for (y, row) in values.rows().enumerate() {
                for (x, &v) in row.iter().enumerate() {
                    plane.set_sample(x, y, state.quantize_chroma(v));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cicp::TransferCharacteristics;
    use crate::image::{NclxProfile, PlaneSource};

    fn nclx(matrix: u16, range: Range) -> NclxProfile {
        NclxProfile {
            colour_primaries: ColorPrimaries::BT709,
            transfer_characteristics: TransferCharacteristics::BT709,
            matrix_coefficients: MatrixCoefficients(matrix),
            range,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn yuv_image(
        width: u32,
        height: u32,
        format: PixelFormat,
        range: Range,
        matrix: u16,
        y: &[u8],
        u: &[u8],
        v: &[u8],
    ) -> AvifImage {
        let mut img = AvifImage::create(width, height, 8, format).unwrap();
        img.set_yuv_range(range);
        img.set_profile_nclx(nclx(matrix, range));
        let (w, h) = (width as usize, height as usize);
        img.set_plane(Channel::Y, PlaneSource::U8(y), w, h, w).unwrap();
        let (cw, ch) = img.chroma_size().unwrap();
        img.set_plane(Channel::U, PlaneSource::U8(u), cw, ch, cw)
            .unwrap();
        img.set_plane(Channel::V, PlaneSource::U8(v), cw, ch, cw)
            .unwrap();
        img
    }

    fn rgb_of(img: &AvifImage, x: usize, y: usize) -> [u16; 3] {
        [Channel::R, Channel::G, Channel::B].map(|c| img.plane(c).unwrap().sample(x, y))
    }

    #[test]
    fn test_yuv_to_rgb_gray() {
        let state = ReformatState::new(&yuv_image(
            1,
            1,
            PixelFormat::Yuv444,
            Range::Full,
            1,
            &[128],
            &[128],
            &[128],
        ))
        .unwrap();
        let rgb = state.yuv_to_rgb_unorm(128, Some((128, 128)));
        assert_eq!(rgb.map(|c| state.quantize_rgb(c)), [128, 128, 128]);
    }

    #[test]
    fn limited_range_235_is_white() {
        let mut img = yuv_image(
            2,
            2,
            PixelFormat::Yuv420,
            Range::Limited,
            1,
            &[235; 4],
            &[128],
            &[128],
        );
        yuv_to_rgb(&mut img).unwrap();
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(rgb_of(&img, x, y), [255, 255, 255]);
        }
    }

    #[test]
    fn full_range_keeps_235() {
        let mut img = yuv_image(
            2,
            2,
            PixelFormat::Yuv420,
            Range::Full,
            1,
            &[235; 4],
            &[128],
            &[128],
        );
        yuv_to_rgb(&mut img).unwrap();
        assert_eq!(rgb_of(&img, 1, 1), [235, 235, 235]);

        let mut img = yuv_image(
            2,
            2,
            PixelFormat::Yuv420,
            Range::Full,
            1,
            &[255; 4],
            &[128],
            &[128],
        );
        yuv_to_rgb(&mut img).unwrap();
        assert_eq!(rgb_of(&img, 0, 1), [255, 255, 255]);
    }

    #[test]
    fn limited_range_black() {
        let mut img = yuv_image(
            1,
            1,
            PixelFormat::Yuv444,
            Range::Limited,
            6,
            &[16],
            &[128],
            &[128],
        );
        yuv_to_rgb(&mut img).unwrap();
        assert_eq!(rgb_of(&img, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn unmapped_matrices_fail() {
        for code in [3u16, 10, 11, 13, 14, 15, 200] {
            let mut img = yuv_image(
                2,
                2,
                PixelFormat::Yuv420,
                Range::Full,
                code,
                &[100; 4],
                &[128],
                &[128],
            );
            let err = yuv_to_rgb(&mut img).unwrap_err().into_inner();
            assert!(
                matches!(err, Error::UnsupportedMatrixCoefficients(c) if c == code),
                "{code}: {err:?}"
            );
            assert!(img.plane(Channel::R).is_none());
        }
    }

    #[test]
    fn chroma_block_shares_chroma() {
        let mut img = yuv_image(
            2,
            2,
            PixelFormat::Yuv420,
            Range::Full,
            1,
            &[100; 4],
            &[90],
            &[200],
        );
        yuv_to_rgb(&mut img).unwrap();
        let first = rgb_of(&img, 0, 0);
        for (x, y) in [(1, 0), (0, 1), (1, 1)] {
            assert_eq!(rgb_of(&img, x, y), first);
        }
        assert!(first[0] > first[2], "strong Cr should push red");
    }

    #[test]
    fn yv12_reads_logical_planes() {
        let mut a = yuv_image(2, 2, PixelFormat::Yuv420, Range::Full, 6, &[90; 4], &[60], &[190]);
        let mut b = yuv_image(2, 2, PixelFormat::Yv12, Range::Full, 6, &[90; 4], &[60], &[190]);
        yuv_to_rgb(&mut a).unwrap();
        yuv_to_rgb(&mut b).unwrap();
        assert_eq!(rgb_of(&a, 0, 0), rgb_of(&b, 0, 0));
    }

    #[test]
    fn identity_bypasses_matrix() {
        let mut img = yuv_image(
            1,
            1,
            PixelFormat::Yuv444,
            Range::Full,
            0,
            &[10],
            &[20],
            &[30],
        );
        yuv_to_rgb(&mut img).unwrap();
        // G from Y, B from U, R from V
        assert_eq!(rgb_of(&img, 0, 0), [30, 10, 20]);
    }

    #[test]
    fn ycgco_gray_has_no_chroma() {
        let mut img = yuv_image(
            1,
            1,
            PixelFormat::Yuv444,
            Range::Full,
            8,
            &[77],
            &[128],
            &[128],
        );
        yuv_to_rgb(&mut img).unwrap();
        let [r, g, b] = rgb_of(&img, 0, 0);
        assert!(r.abs_diff(77) <= 1 && g.abs_diff(77) <= 1 && b.abs_diff(77) <= 1);
    }

    #[test]
    fn chromaticity_derived_matches_bt709_for_bt709_primaries() {
        let derived = reformat_mode(MatrixCoefficients::CHROMA_DERIVED_NCL, ColorPrimaries::BT709)
            .unwrap();
        let ReformatMode::Yuv { kr, kb, .. } = derived else {
            panic!("expected linear matrix");
        };
        assert!((kr - 0.2126).abs() < 1e-3);
        assert!((kb - 0.0722).abs() < 1e-3);
    }

    #[test]
    fn alpha_passes_through() {
        let mut img = yuv_image(
            2,
            1,
            PixelFormat::Yuv444,
            Range::Limited,
            1,
            &[16, 235],
            &[128, 128],
            &[128, 128],
        );
        img.set_plane(Channel::A, PlaneSource::U8(&[7, 250]), 2, 1, 2)
            .unwrap();
        yuv_to_rgb(&mut img).unwrap();
        let alpha = img.plane(Channel::A).unwrap();
        assert_eq!((alpha.sample(0, 0), alpha.sample(1, 0)), (7, 250));
    }

    #[test]
    fn mismatched_alpha_is_rejected() {
        let mut img = yuv_image(
            2,
            2,
            PixelFormat::Yuv420,
            Range::Full,
            1,
            &[1; 4],
            &[128],
            &[128],
        );
        img.set_plane(Channel::A, PlaneSource::U8(&[255; 2]), 1, 2, 1)
            .unwrap();
        let err = yuv_to_rgb(&mut img).unwrap_err().into_inner();
        assert!(matches!(err, Error::ColorAlphaSizeMismatch { .. }));
    }

    #[test]
    fn missing_or_unknown_layout_is_reported() {
        let mut img = AvifImage::create(2, 2, 8, PixelFormat::Yuv420).unwrap();
        let err = yuv_to_rgb(&mut img).unwrap_err().into_inner();
        assert!(matches!(err, Error::MissingPlanes(_)));

        let mut img = AvifImage::create(2, 2, 8, PixelFormat::None).unwrap();
        img.allocate_planes(Planes::RGB).unwrap();
        let err = rgb_to_yuv(&mut img).unwrap_err().into_inner();
        assert!(matches!(err, Error::UnsupportedPixelFormat(PixelFormat::None)));

        let mut img = AvifImage::create(2, 2, 8, PixelFormat::Yuv444).unwrap();
        let err = rgb_to_yuv(&mut img).unwrap_err().into_inner();
        assert!(matches!(err, Error::MissingPlanes(_)));
    }

    #[test]
    fn monochrome_decodes_to_gray() {
        let mut img = AvifImage::create(2, 1, 10, PixelFormat::Yuv400).unwrap();
        img.set_yuv_range(Range::Limited);
        img.set_plane(Channel::Y, PlaneSource::U16(&[64, 940]), 2, 1, 2)
            .unwrap();
        yuv_to_rgb(&mut img).unwrap();
        assert_eq!(rgb_of(&img, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_of(&img, 1, 0), [1023, 1023, 1023]);
    }

    #[test]
    fn encode_averages_chroma_blocks() {
        let mut img = AvifImage::create(2, 2, 8, PixelFormat::Yuv420).unwrap();
        img.set_profile_nclx(nclx(0, Range::Full));
        img.allocate_planes(Planes::RGB).unwrap();
        // identity: U carries blue, averaged over the block
        let blues = [0u16, 100, 200, 100];
        let b = img.plane_mut(Channel::B).unwrap();
        for (i, &v) in blues.iter().enumerate() {
            b.set_sample(i % 2, i / 2, v);
        }
        rgb_to_yuv(&mut img).unwrap();
        assert_eq!(img.plane(Channel::U).unwrap().sample(0, 0), 100);
    }
}
