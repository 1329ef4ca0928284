//! # avifcolor
//!
//! Colorimetry resolution and pixel conversion for AVIF images.
//!
//! The AV1 bitstream is handled by an external codec behind the
//! [`Av1Decoder`] / [`Av1Encoder`] traits. This crate covers what happens
//! around it: resolving the color space signalled by an image (nothing, an
//! embedded ICC profile, or an NCLX/CICP triple), and converting between
//! planar YUV and interleaved RGB with the right matrix, range and depth.
//!
//! ## Quick Start
//!
//! ```
//! use avifcolor::{
//!     AvifImage, Channel, DecodedImage, DecoderConfig, NclxProfile, PixelFormat, PlaneSource,
//!     Range, create_bitmap,
//! };
//! use avifcolor::cicp::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics};
//!
//! let mut image = AvifImage::create(2, 2, 8, PixelFormat::Yuv420).unwrap();
//! image.set_yuv_range(Range::Limited);
//! image.set_profile_nclx(NclxProfile {
//!     colour_primaries: ColorPrimaries::BT709,
//!     transfer_characteristics: TransferCharacteristics::SRGB,
//!     matrix_coefficients: MatrixCoefficients::BT709,
//!     range: Range::Limited,
//! });
//! image.set_plane(Channel::Y, PlaneSource::U8(&[235; 4]), 2, 2, 2).unwrap();
//! image.set_plane(Channel::U, PlaneSource::U8(&[128]), 1, 1, 1).unwrap();
//! image.set_plane(Channel::V, PlaneSource::U8(&[128]), 1, 1, 1).unwrap();
//!
//! let bitmap = create_bitmap(&image, &DecoderConfig::new()).unwrap();
//! match &bitmap.pixels {
//!     DecodedImage::Rgb8(img) => assert_eq!(img.buf()[0].r, 255),
//!     other => panic!("unexpected {other:?}"),
//! }
//! // sRGB over BT.709 primaries is a shared space: never released by the caller
//! assert!(!bitmap.should_release());
//! ```
//!
//! ## Features
//!
//! - **`encode`**: AVIF encoding through [ravif](https://crates.io/crates/ravif)
//! - **`encode-threading`**: multi-threaded encoding
//!
//! ## Configuration
//!
//! For more control over decoding, use `decode_with` with a `DecoderConfig`:
//!
//! ```no_run
//! use avifcolor::{DecoderConfig, OutputDepth, decode_with};
//! # fn get_decoder() -> Box<dyn avifcolor::Av1Decoder> { unimplemented!() }
//!
//! let config = DecoderConfig::new()
//!     .threads(4)
//!     .output_depth(OutputDepth::Sixteen)
//!     .frame_size_limit(8192 * 8192);
//!
//! let avif_data = std::fs::read("image.avif").unwrap();
//! let mut decoder = get_decoder();
//! let bitmap = decode_with(&avif_data, decoder.as_mut(), &config).unwrap();
//! ```

mod bitmap;
mod chroma;
pub mod cicp;
mod codec;
pub mod color_space;
mod config;
mod convert;
#[cfg(feature = "encode")]
mod encoder;
mod error;
mod image;
pub mod yuv_convert;

pub use bitmap::{Bitmap, DecodedImage, create_bitmap};
pub use codec::{
    Av1Decoder, Av1Encoder, EncodedImage, QUALITY_WORST, decode_image_with, decode_with,
    encode_with,
};
pub use color_space::{
    ColorModel, ColorSpace, ResolvedColorSpace, resolve_color_space_mono,
    resolve_color_space_rgb,
};
pub use config::{DecoderConfig, OutputDepth};
pub use convert::{max_value, scale_to_u8, scale_to_u16, to_full_range};
#[cfg(feature = "encode")]
pub use encoder::{EncoderConfig, RavifEncoder, encode, ravif_quality};
pub use error::{Error, Result};
pub use image::{
    AvifImage, Channel, IoStats, NclxProfile, PixelFormat, PixelFormatInfo, Plane, PlaneSource,
    Planes, ProfileDescriptor, Range,
};
pub use yuv_convert::{rgb_to_yuv, yuv_to_rgb};
