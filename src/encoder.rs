//! AVIF encoding via ravif
//!
//! [`RavifEncoder`] implements [`Av1Encoder`] on top of ravif. ravif only
//! accepts 4:4:4 planes at 8 or 10 bits, so subsampled chroma is replicated
//! before handing them over. ravif always signals BT.709 primaries with the
//! sRGB transfer and cannot embed ICC, so other colorimetry is refused.

use log::debug;
use rav1e::prelude::PixelRange;
use whereat::at;

use crate::chroma::chroma_position;
use crate::cicp::MatrixCoefficients;
use crate::codec::{Av1Encoder, EncodedImage, QUALITY_WORST, encode_with};
use crate::convert::chroma_bias_range;
use crate::error::{Error, Result};
use crate::image::{AvifImage, Channel, Plane, Planes, ProfileDescriptor, Range};

/// Configuration for AVIF encoding
///
/// Uses a builder pattern matching [`crate::DecoderConfig`].
///
/// # Example
///
/// ```
/// use avifcolor::EncoderConfig;
///
/// let config = EncoderConfig::new()
///     .quality(20)
///     .speed(6);
/// ```
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub(crate) quality: u8,
    pub(crate) speed: u8,
    pub(crate) threads: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quality: 25,
            speed: 4,
            threads: None,
        }
    }
}

impl EncoderConfig {
    /// Create a new encoder configuration with default settings
    ///
    /// Defaults: quality 25, speed 4
    pub fn new() -> Self {
        Self::default()
    }

    /// Set encoding quality (0 = lossless/best, 63 = worst)
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set encoding speed (1 = slowest/best, 10 = fastest/worst)
    pub fn speed(mut self, speed: u8) -> Self {
        self.speed = speed;
        self
    }

    /// Set the number of threads
    ///
    /// `None` uses the rayon default. `Some(1)` for single-threaded.
    pub fn threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }
}

/// Map the 0 (best) ..= 63 (worst) scale onto ravif's 100 (best) ..= 1
pub fn ravif_quality(quality: u8) -> f32 {
    let q = f32::from(quality.min(QUALITY_WORST));
    100.0 - q * 99.0 / f32::from(QUALITY_WORST)
}

fn ravif_matrix(matrix: MatrixCoefficients) -> Result<ravif::MatrixCoefficients> {
    Ok(match matrix.0 {
        0 => ravif::MatrixCoefficients::Identity,
        1 => ravif::MatrixCoefficients::BT709,
        2 => ravif::MatrixCoefficients::Unspecified,
        4 => ravif::MatrixCoefficients::FCC,
        5 => ravif::MatrixCoefficients::BT470BG,
        6 => ravif::MatrixCoefficients::BT601,
        7 => ravif::MatrixCoefficients::SMPTE240,
        8 => ravif::MatrixCoefficients::YCgCo,
        9 => ravif::MatrixCoefficients::BT2020NCL,
        12 => ravif::MatrixCoefficients::ChromatNCL,
        code => return Err(at(Error::UnsupportedMatrixCoefficients(code))),
    })
}

/// The colour description ravif writes is fixed, so only matching profiles pass
fn check_profile(profile: &ProfileDescriptor) -> Result<()> {
    match profile {
        ProfileDescriptor::None => Ok(()),
        ProfileDescriptor::Icc(_) => Err(at(Error::UnsupportedProfile(
            "embedded ICC profiles cannot be written",
        ))),
        ProfileDescriptor::Nclx(nclx) => {
            let primaries = nclx.colour_primaries.0;
            let transfer = nclx.transfer_characteristics.0;
            if matches!(primaries, 1 | 2) && matches!(transfer, 2 | 13) {
                Ok(())
            } else {
                debug!("refusing NCLX primaries {primaries} transfer {transfer}");
                Err(at(Error::UnsupportedProfile(
                    "only BT.709 primaries with the sRGB transfer can be written",
                )))
            }
        }
    }
}

/// [`Av1Encoder`] backed by ravif
#[derive(Debug, Clone)]
pub struct RavifEncoder {
    speed: u8,
}

impl RavifEncoder {
    pub fn new(speed: u8) -> Self {
        Self { speed }
    }
}

impl Default for RavifEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default().speed)
    }
}

/// Y, U, V triples at full resolution, chroma replicated from its block
fn yuv444<T>(image: &AvifImage, narrow: impl Fn(u16) -> T) -> Result<Vec<[T; 3]>> {
    let y_plane = image
        .plane(Channel::Y)
        .ok_or_else(|| at(Error::MissingPlanes(Planes::YUV)))?;
    let info = image
        .yuv_format()
        .info()
        .ok_or_else(|| at(Error::UnsupportedPixelFormat(image.yuv_format())))?;
    let chroma = if image.is_monochrome() {
        None
    } else {
        image.plane(Channel::U).zip(image.plane(Channel::V))
    };
    // Gray images get neutral chroma
    let (neutral, _) = chroma_bias_range(image.yuv_range(), image.depth());
    let neutral = neutral as u16;

    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let (u, v) = match chroma {
                Some((u, v)) => {
                    let (cx, cy) = chroma_position(x, y, &info);
                    (u.sample(cx, cy), v.sample(cx, cy))
                }
                None => (neutral, neutral),
            };
            out.push([narrow(y_plane.sample(x, y)), narrow(u), narrow(v)]);
        }
    }
    Ok(out)
}

fn alpha_samples<T>(alpha: Option<&Plane>, narrow: impl Fn(u16) -> T) -> Option<Vec<T>> {
    alpha.map(|a| {
        (0..a.height())
            .flat_map(|y| (0..a.width()).map(move |x| (x, y)))
            .map(|(x, y)| narrow(a.sample(x, y)))
            .collect()
    })
}

impl Av1Encoder for RavifEncoder {
    fn encode(&mut self, image: &AvifImage, quality: u8, threads: u32) -> Result<EncodedImage> {
        if !matches!(image.depth(), 8 | 10) {
            return Err(at(Error::UnsupportedDepth(image.depth())));
        }
        check_profile(image.profile())?;
        let matrix = ravif_matrix(image.matrix_coefficients())?;
        let range = match image.yuv_range() {
            Range::Limited => PixelRange::Limited,
            Range::Full => PixelRange::Full,
        };
        let enc = ravif::Encoder::new()
            .with_quality(ravif_quality(quality))
            .with_alpha_quality(ravif_quality(quality))
            .with_speed(self.speed)
            .with_num_threads((threads > 0).then_some(threads as usize));

        let (width, height) = (image.width() as usize, image.height() as usize);
        let alpha = image.plane(Channel::A);
        debug!(
            "ravif encode {}x{} depth {} quality {} speed {}",
            width,
            height,
            image.depth(),
            ravif_quality(quality),
            self.speed
        );
        let result = if image.depth() == 8 {
            let narrow = |v: u16| v as u8;
            enc.encode_raw_planes_8_bit(
                width,
                height,
                yuv444(image, narrow)?,
                alpha_samples(alpha, narrow),
                range,
                matrix,
            )
        } else {
            enc.encode_raw_planes_10_bit(
                width,
                height,
                yuv444(image, |v| v)?,
                alpha_samples(alpha, |v| v),
                range,
                matrix,
            )
        }
        .map_err(|e| at(Error::Encode(e.to_string())))?;

        Ok(EncodedImage {
            data: result.avif_file,
            color_byte_size: result.color_byte_size,
            alpha_byte_size: result.alpha_byte_size,
        })
    }
}

/// Encode `image` to an AVIF file with ravif
///
/// Converts RGB planes to YUV first when the image has no YUV planes, and
/// records the payload sizes in [`AvifImage::io_stats`].
pub fn encode(image: &mut AvifImage, config: &EncoderConfig) -> Result<EncodedImage> {
    let threads = config.threads.map_or(0, |t| t as u32);
    encode_with(
        image,
        &mut RavifEncoder::new(config.speed),
        config.quality,
        threads,
    )
}
