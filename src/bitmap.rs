//! Displayable bitmaps for the host
//!
//! Combines the color space resolver with the YUV to RGB step and widens or
//! narrows native samples to 8/16-bit interleaved buffers.

use imgref::ImgVec;
use log::debug;
use rgb::{Rgb, Rgba};
use whereat::at;

use crate::color_space::{ResolvedColorSpace, resolve_color_space_mono, resolve_color_space_rgb};
use crate::config::{DecoderConfig, OutputDepth};
use crate::convert::{scale_to_u8, scale_to_u16, to_full_range};
use crate::error::{Error, Result};
use crate::image::{AvifImage, Channel, Plane, Planes, check_depth};
use crate::yuv_convert::{ReformatState, YuvPlanes};

/// Interleaved pixels ready for display
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DecodedImage {
    /// 8-bit RGB image
    Rgb8(ImgVec<Rgb<u8>>),
    /// 8-bit RGBA image
    Rgba8(ImgVec<Rgba<u8>>),
    /// 16-bit RGB image (10/12-bit expanded to 16-bit)
    Rgb16(ImgVec<Rgb<u16>>),
    /// 16-bit RGBA image (10/12-bit expanded to 16-bit)
    Rgba16(ImgVec<Rgba<u16>>),
    /// 8-bit grayscale image
    Gray8(ImgVec<u8>),
    /// 16-bit grayscale image
    Gray16(ImgVec<u16>),
    /// 8-bit gray plus alpha
    GrayAlpha8(ImgVec<[u8; 2]>),
    /// 16-bit gray plus alpha
    GrayAlpha16(ImgVec<[u16; 2]>),
}

impl DecodedImage {
    /// Get the width of the decoded image
    pub fn width(&self) -> usize {
        match self {
            DecodedImage::Rgb8(img) => img.width(),
            DecodedImage::Rgba8(img) => img.width(),
            DecodedImage::Rgb16(img) => img.width(),
            DecodedImage::Rgba16(img) => img.width(),
            DecodedImage::Gray8(img) => img.width(),
            DecodedImage::Gray16(img) => img.width(),
            DecodedImage::GrayAlpha8(img) => img.width(),
            DecodedImage::GrayAlpha16(img) => img.width(),
        }
    }

    /// Get the height of the decoded image
    pub fn height(&self) -> usize {
        match self {
            DecodedImage::Rgb8(img) => img.height(),
            DecodedImage::Rgba8(img) => img.height(),
            DecodedImage::Rgb16(img) => img.height(),
            DecodedImage::Rgba16(img) => img.height(),
            DecodedImage::Gray8(img) => img.height(),
            DecodedImage::Gray16(img) => img.height(),
            DecodedImage::GrayAlpha8(img) => img.height(),
            DecodedImage::GrayAlpha16(img) => img.height(),
        }
    }

    /// Returns true if the image has an alpha channel
    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            DecodedImage::Rgba8(_)
                | DecodedImage::Rgba16(_)
                | DecodedImage::GrayAlpha8(_)
                | DecodedImage::GrayAlpha16(_)
        )
    }

    /// Returns true if the image is grayscale (monochrome)
    pub fn is_grayscale(&self) -> bool {
        matches!(
            self,
            DecodedImage::Gray8(_)
                | DecodedImage::Gray16(_)
                | DecodedImage::GrayAlpha8(_)
                | DecodedImage::GrayAlpha16(_)
        )
    }

    /// Returns the bit depth of the image (8 or 16)
    pub fn bit_depth(&self) -> u8 {
        match self {
            DecodedImage::Rgb8(_)
            | DecodedImage::Rgba8(_)
            | DecodedImage::Gray8(_)
            | DecodedImage::GrayAlpha8(_) => 8,
            _ => 16,
        }
    }

    /// Interleaved sample bytes, rows packed, 16-bit samples in native endian
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DecodedImage::Rgb8(img) => bytemuck::cast_slice(img.buf()),
            DecodedImage::Rgba8(img) => bytemuck::cast_slice(img.buf()),
            DecodedImage::Rgb16(img) => bytemuck::cast_slice(img.buf()),
            DecodedImage::Rgba16(img) => bytemuck::cast_slice(img.buf()),
            DecodedImage::Gray8(img) => img.buf(),
            DecodedImage::Gray16(img) => bytemuck::cast_slice(img.buf()),
            DecodedImage::GrayAlpha8(img) => bytemuck::cast_slice(img.buf()),
            DecodedImage::GrayAlpha16(img) => bytemuck::cast_slice(img.buf()),
        }
    }
}

/// Pixels plus the color space they are expressed in
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub pixels: DecodedImage,
    pub color_space: ResolvedColorSpace,
}

impl Bitmap {
    /// Whether the receiver owns the color space handle
    pub fn should_release(&self) -> bool {
        self.color_space.should_release()
    }
}

/// Where the output samples come from
enum SampleSource<'a> {
    Gray(&'a Plane),
    Color(ColorSamples<'a>),
}

/// Planes that yield an RGB triple per pixel
enum ColorSamples<'a> {
    Yuv(ReformatState, YuvPlanes<'a>),
    Rgb([&'a Plane; 3]),
}

impl ColorSamples<'_> {
    fn rgb_at(&self, x: usize, y: usize) -> [u16; 3] {
        match self {
            ColorSamples::Yuv(state, planes) => state.rgb_at(planes, x, y),
            ColorSamples::Rgb(planes) => planes.map(|p| p.sample(x, y)),
        }
    }
}

fn build<T>(width: usize, height: usize, f: impl Fn(usize, usize) -> T) -> ImgVec<T> {
    let mut buf = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            buf.push(f(x, y));
        }
    }
    ImgVec::new(buf, width, height)
}

/// Produce a displayable bitmap and its color space for `image`.
///
/// Gray images (monochrome format, or no chroma planes) use the mono
/// resolver and gray output; everything else goes through RGB. An image
/// holding only RGB planes is used as is. Alpha is copied through, rescaled
/// only for the output depth.
pub fn create_bitmap(image: &AvifImage, config: &DecoderConfig) -> Result<Bitmap> {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(at(Error::InvalidDimensions {
            width: w,
            height: h,
        }));
    }
    if !config.allows(w, h) {
        return Err(at(Error::ImageTooLarge {
            width: w,
            height: h,
        }));
    }
    let depth = image.depth();
    check_depth(depth)?;
    image.check_alpha_size()?;

    let source = if image.plane(Channel::Y).is_some() {
        if image.is_monochrome() {
            SampleSource::Gray(
                image
                    .plane(Channel::Y)
                    .ok_or_else(|| at(Error::MissingPlanes(Planes::YUV)))?,
            )
        } else {
            SampleSource::Color(ColorSamples::Yuv(
                ReformatState::new(image)?,
                YuvPlanes::from_image(image)?,
            ))
        }
    } else {
        match (
            image.plane(Channel::R),
            image.plane(Channel::G),
            image.plane(Channel::B),
        ) {
            (Some(r), Some(g), Some(b)) => SampleSource::Color(ColorSamples::Rgb([r, g, b])),
            _ => return Err(at(Error::MissingPlanes(Planes::YUV))),
        }
    };

    let wide = match config.output_depth {
        OutputDepth::Auto => depth > 8,
        OutputDepth::Eight => false,
        OutputDepth::Sixteen => true,
    };
    let (width, height) = (w as usize, h as usize);
    let alpha = image.plane(Channel::A);
    let range = image.yuv_range();
    let s16 = |v: u16| scale_to_u16(v, depth);
    let s8 = |v: u16| scale_to_u8(v, depth);

    let pixels = match &source {
        SampleSource::Gray(luma) => {
            let gray = |x: usize, y: usize| to_full_range(luma.sample(x, y), range, depth);
            match (alpha, wide) {
                (None, false) => DecodedImage::Gray8(build(width, height, |x, y| s8(gray(x, y)))),
                (None, true) => DecodedImage::Gray16(build(width, height, |x, y| s16(gray(x, y)))),
                (Some(a), false) => DecodedImage::GrayAlpha8(build(width, height, |x, y| {
                    [s8(gray(x, y)), s8(a.sample(x, y))]
                })),
                (Some(a), true) => DecodedImage::GrayAlpha16(build(width, height, |x, y| {
                    [s16(gray(x, y)), s16(a.sample(x, y))]
                })),
            }
        }
        SampleSource::Color(samples) => {
            let rgb = |x: usize, y: usize| samples.rgb_at(x, y);
            match (alpha, wide) {
                (None, false) => DecodedImage::Rgb8(build(width, height, |x, y| {
                    let [r, g, b] = rgb(x, y).map(s8);
                    Rgb { r, g, b }
                })),
                (None, true) => DecodedImage::Rgb16(build(width, height, |x, y| {
                    let [r, g, b] = rgb(x, y).map(s16);
                    Rgb { r, g, b }
                })),
                (Some(alpha), false) => DecodedImage::Rgba8(build(width, height, |x, y| {
                    let [r, g, b] = rgb(x, y).map(s8);
                    Rgba {
                        r,
                        g,
                        b,
                        a: s8(alpha.sample(x, y)),
                    }
                })),
                (Some(alpha), true) => DecodedImage::Rgba16(build(width, height, |x, y| {
                    let [r, g, b] = rgb(x, y).map(s16);
                    Rgba {
                        r,
                        g,
                        b,
                        a: s16(alpha.sample(x, y)),
                    }
                })),
            }
        }
    };

    let color_space = if pixels.is_grayscale() {
        resolve_color_space_mono(image)
    } else {
        resolve_color_space_rgb(image)
    };
    debug!(
        "bitmap {}x{} depth {} -> {} bit, gray={} alpha={} owned color space={}",
        width,
        height,
        depth,
        pixels.bit_depth(),
        pixels.is_grayscale(),
        pixels.has_alpha(),
        color_space.should_release()
    );
    Ok(Bitmap {
        pixels,
        color_space,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cicp::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics};
    use crate::color_space::ColorModel;
    use crate::image::{NclxProfile, PixelFormat, PlaneSource, Range};

    fn bt709_420(y: [u8; 4], u: u8, v: u8, range: Range) -> AvifImage {
        let mut img = AvifImage::create(2, 2, 8, PixelFormat::Yuv420).unwrap();
        img.set_yuv_range(range);
        img.set_profile_nclx(NclxProfile {
            colour_primaries: ColorPrimaries::BT709,
            transfer_characteristics: TransferCharacteristics::BT709,
            matrix_coefficients: MatrixCoefficients::BT709,
            range,
        });
        img.set_plane(Channel::Y, PlaneSource::U8(&y), 2, 2, 2).unwrap();
        img.set_plane(Channel::U, PlaneSource::U8(&[u]), 1, 1, 1).unwrap();
        img.set_plane(Channel::V, PlaneSource::U8(&[v]), 1, 1, 1).unwrap();
        img
    }

    #[test]
    fn white_420_bitmap() {
        let img = bt709_420([235; 4], 128, 128, Range::Limited);
        let bitmap = create_bitmap(&img, &DecoderConfig::new()).unwrap();
        let DecodedImage::Rgb8(pixels) = &bitmap.pixels else {
            panic!("expected Rgb8, got {:?}", bitmap.pixels);
        };
        assert!(pixels.pixels().all(|p| p == Rgb { r: 255, g: 255, b: 255 }));
        assert_eq!(bitmap.pixels.as_bytes(), &[255; 12]);
        // BT.709 primaries and transfer hit the shared cache
        assert!(!bitmap.should_release());
        assert_eq!(bitmap.color_space.handle().model(), ColorModel::Rgb);
    }

    #[test]
    fn source_image_is_not_modified() {
        let img = bt709_420([100; 4], 128, 128, Range::Full);
        create_bitmap(&img, &DecoderConfig::new()).unwrap();
        assert!(img.plane(Channel::R).is_none());
    }

    #[test]
    fn deep_gray_with_alpha() {
        let mut img = AvifImage::create(2, 1, 10, PixelFormat::Yuv400).unwrap();
        img.set_yuv_range(Range::Full);
        img.set_plane(Channel::Y, PlaneSource::U16(&[0, 1023]), 2, 1, 2)
            .unwrap();
        img.set_plane(Channel::A, PlaneSource::U16(&[1023, 512]), 2, 1, 2)
            .unwrap();
        let bitmap = create_bitmap(&img, &DecoderConfig::new()).unwrap();
        let DecodedImage::GrayAlpha16(pixels) = &bitmap.pixels else {
            panic!("expected GrayAlpha16, got {:?}", bitmap.pixels);
        };
        assert_eq!(pixels.buf().as_slice(), &[[0, 65535], [65535, 0x8020]]);
        assert_eq!(bitmap.color_space.handle().model(), ColorModel::Gray);
    }

    #[test]
    fn forced_eight_bit_output() {
        let mut img = AvifImage::create(1, 1, 12, PixelFormat::Yuv400).unwrap();
        img.set_plane(Channel::Y, PlaneSource::U16(&[4095]), 1, 1, 1)
            .unwrap();
        let config = DecoderConfig::new().output_depth(OutputDepth::Eight);
        let bitmap = create_bitmap(&img, &config).unwrap();
        assert!(matches!(&bitmap.pixels, DecodedImage::Gray8(p) if p.buf()[0] == 255));
    }

    #[test]
    fn rgb_planes_are_used_directly() {
        let mut img = AvifImage::create(1, 1, 8, PixelFormat::None).unwrap();
        img.set_plane(Channel::R, PlaneSource::U8(&[10]), 1, 1, 1).unwrap();
        img.set_plane(Channel::G, PlaneSource::U8(&[20]), 1, 1, 1).unwrap();
        img.set_plane(Channel::B, PlaneSource::U8(&[30]), 1, 1, 1).unwrap();
        let config = DecoderConfig::new().output_depth(OutputDepth::Sixteen);
        let bitmap = create_bitmap(&img, &config).unwrap();
        let DecodedImage::Rgb16(pixels) = &bitmap.pixels else {
            panic!("expected Rgb16");
        };
        assert_eq!(
            pixels.buf()[0],
            Rgb {
                r: 0x0a0a,
                g: 0x1414,
                b: 0x1e1e
            }
        );
    }

    #[test]
    fn frame_limit_and_missing_planes() {
        let img = bt709_420([1; 4], 128, 128, Range::Full);
        let config = DecoderConfig::new().frame_size_limit(3);
        let err = create_bitmap(&img, &config).unwrap_err().into_inner();
        assert!(matches!(err, Error::ImageTooLarge { width: 2, height: 2 }));

        let empty = AvifImage::create(2, 2, 8, PixelFormat::Yuv420).unwrap();
        let err = create_bitmap(&empty, &DecoderConfig::new())
            .unwrap_err()
            .into_inner();
        assert!(matches!(err, Error::MissingPlanes(_)));
    }
}
