//! Seams to the external AV1 codec
//!
//! The bitstream itself is decoded and encoded elsewhere. A decoder fills an
//! [`AvifImage`] with planes, geometry and a profile; an encoder turns a
//! populated container into coded bytes. The pipelines here wrap those calls
//! with the color work on either side.

use log::debug;
use whereat::at;

use crate::bitmap::{Bitmap, create_bitmap};
use crate::color_space::validate_icc;
use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::image::{AvifImage, Channel, Planes, ProfileDescriptor, check_depth};
use crate::yuv_convert::rgb_to_yuv;

/// Highest (worst) value of the encode quality scale
pub const QUALITY_WORST: u8 = 63;

/// Coded output of an [`Av1Encoder`]
#[derive(Debug, Clone, Default)]
pub struct EncodedImage {
    /// The complete coded bytes
    pub data: Vec<u8>,
    /// Bytes used for the color AV1 payload
    pub color_byte_size: usize,
    /// Bytes used for the alpha AV1 payload
    pub alpha_byte_size: usize,
}

/// Decodes a coded image item into a container
pub trait Av1Decoder {
    /// Populate `image` from `data`.
    ///
    /// Implementations set geometry, depth, pixel format and range, import
    /// the planes (see [`AvifImage::set_plane`]) and attach the profile
    /// descriptor carried by the file. `threads` is a hint; 0 means auto.
    fn decode(&mut self, data: &[u8], image: &mut AvifImage, threads: u32) -> Result<()>;
}

/// Encodes a container holding YUV planes
pub trait Av1Encoder {
    /// Encode `image`. `quality` runs from 0 (lossless/best) to
    /// [`QUALITY_WORST`]; `threads` is a hint, 0 means auto.
    fn encode(&mut self, image: &AvifImage, quality: u8, threads: u32) -> Result<EncodedImage>;
}

/// Decode `data` into a container without building a bitmap
pub fn decode_image_with<D: Av1Decoder + ?Sized>(
    data: &[u8],
    decoder: &mut D,
    config: &DecoderConfig,
) -> Result<AvifImage> {
    let mut image = AvifImage::create_empty();
    decoder.decode(data, &mut image, config.threads)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(at(Error::InvalidDimensions {
            width: image.width(),
            height: image.height(),
        }));
    }
    if !config.allows(image.width(), image.height()) {
        return Err(at(Error::ImageTooLarge {
            width: image.width(),
            height: image.height(),
        }));
    }
    check_depth(image.depth())?;
    if image.io_stats.color_obu_size == 0 {
        image.io_stats.color_obu_size = data.len();
    }
    debug!(
        "decoded {}x{} depth {} {:?} {:?} planes {:?}",
        image.width(),
        image.height(),
        image.depth(),
        image.yuv_format(),
        image.yuv_range(),
        image.allocated()
    );
    Ok(image)
}

/// Decode `data` with `decoder` and produce a displayable bitmap
pub fn decode_with<D: Av1Decoder + ?Sized>(
    data: &[u8],
    decoder: &mut D,
    config: &DecoderConfig,
) -> Result<Bitmap> {
    let image = decode_image_with(data, decoder, config)?;
    create_bitmap(&image, config)
}

/// Encode `image` with `encoder`.
///
/// An embedded ICC payload must be self-consistent. When the container holds
/// RGB planes but no YUV planes they are converted first. Quality above
/// [`QUALITY_WORST`] is clamped. The payload sizes are recorded in
/// [`AvifImage::io_stats`].
pub fn encode_with<E: Av1Encoder + ?Sized>(
    image: &mut AvifImage,
    encoder: &mut E,
    quality: u8,
    threads: u32,
) -> Result<EncodedImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(at(Error::InvalidDimensions {
            width: image.width(),
            height: image.height(),
        }));
    }
    check_depth(image.depth())?;
    if image.yuv_format().info().is_none() {
        return Err(at(Error::UnsupportedPixelFormat(image.yuv_format())));
    }
    if let ProfileDescriptor::Icc(icc) = image.profile() {
        validate_icc(icc)?;
    }
    image.check_alpha_size()?;

    let allocated = image.allocated();
    if !allocated.contains(Planes::YUV) {
        if allocated.contains(Planes::RGB) {
            rgb_to_yuv(image)?;
        } else {
            return Err(at(Error::MissingPlanes(Planes::YUV)));
        }
    }

    let quality = quality.min(QUALITY_WORST);
    debug!(
        "encoding {}x{} depth {} {:?} quality {} threads {} alpha={}",
        image.width(),
        image.height(),
        image.depth(),
        image.yuv_format(),
        quality,
        threads,
        image.plane(Channel::A).is_some()
    );
    let encoded = encoder.encode(image, quality, threads)?;
    image.io_stats.color_obu_size = encoded.color_byte_size;
    image.io_stats.alpha_obu_size = encoded.alpha_byte_size;
    Ok(encoded)
}
