//! Error types for avifcolor

use crate::image::{PixelFormat, Planes};

/// Error type for conversion, color space and codec operations
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Bit depth other than 8, 10 or 12
    #[error("Unsupported depth: {0}")]
    UnsupportedDepth(u8),

    /// Pixel format not usable for the requested operation
    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(PixelFormat),

    /// Matrix coefficients code that has no linear YUV<->RGB mapping here
    #[error("Unsupported matrix coefficients: {0}")]
    UnsupportedMatrixCoefficients(u16),

    /// Alpha plane dimensions differ from the color planes
    #[error("Color/alpha size mismatch: color {color:?}, alpha {alpha:?}")]
    ColorAlphaSizeMismatch {
        /// Color plane width and height
        color: (u32, u32),
        /// Alpha plane width and height
        alpha: (u32, u32),
    },

    /// ICC payload inconsistent with its own header
    #[error("ICC size mismatch: header declares {declared} bytes, buffer holds {actual}")]
    IccSizeMismatch {
        /// Size from the profile header (0 if the header is truncated)
        declared: usize,
        /// Size of the buffer
        actual: usize,
    },

    /// A color space could not be built from the given codes
    #[error("Color space construction failed: {0}")]
    ColorSpaceConstruction(&'static str),

    /// Source planes for a conversion are not allocated
    #[error("Missing planes: {0:?}")]
    MissingPlanes(Planes),

    /// Caller plane buffer too small for the plane geometry
    #[error("Plane size mismatch: need {needed} samples, got {actual}")]
    PlaneSizeMismatch {
        /// Samples required by width, height and stride
        needed: usize,
        /// Samples supplied
        actual: usize,
    },

    /// Zero or otherwise unusable dimensions
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },

    /// Image dimensions exceed configured limit
    #[error("Image too large: {width}x{height}")]
    ImageTooLarge {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },

    /// Colorimetry the encoder cannot write into the file
    #[error("Unsupported profile for encoding: {0}")]
    UnsupportedProfile(&'static str),

    /// AV1 decode error reported by the codec collaborator
    #[error("AV1 decode error: {0}")]
    Decode(String),

    /// AV1 encode error reported by the codec collaborator
    #[error("AV1 encode error: {0}")]
    Encode(String),
}

impl Error {
    /// Stable numeric failure code, one per variant.
    ///
    /// Values line up with libavif's result enumeration where a counterpart
    /// exists; the remaining kinds are numbered after it.
    pub fn result_code(&self) -> u32 {
        match self {
            Error::Decode(_) => 11,
            Error::Encode(_) => 7,
            Error::UnsupportedDepth(_) => 6,
            Error::ColorAlphaSizeMismatch { .. } => 13,
            Error::UnsupportedPixelFormat(_) => 15,
            Error::UnsupportedMatrixCoefficients(_) => 16,
            Error::IccSizeMismatch { .. } => 17,
            Error::ColorSpaceConstruction(_) => 18,
            Error::MissingPlanes(_) => 19,
            Error::InvalidDimensions { .. } => 20,
            Error::ImageTooLarge { .. } => 21,
            Error::PlaneSizeMismatch { .. } => 22,
            Error::UnsupportedProfile(_) => 23,
        }
    }
}

/// Result type for avifcolor operations with location tracking
pub type Result<T, E = whereat::At<Error>> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_are_distinct() {
        let errors = [
            Error::UnsupportedDepth(9),
            Error::UnsupportedPixelFormat(PixelFormat::None),
            Error::UnsupportedMatrixCoefficients(3),
            Error::ColorAlphaSizeMismatch {
                color: (2, 2),
                alpha: (1, 1),
            },
            Error::IccSizeMismatch {
                declared: 10,
                actual: 5,
            },
            Error::ColorSpaceConstruction("x"),
            Error::MissingPlanes(Planes::RGB),
            Error::InvalidDimensions {
                width: 0,
                height: 0,
            },
            Error::PlaneSizeMismatch {
                needed: 4,
                actual: 3,
            },
            Error::ImageTooLarge {
                width: 1,
                height: 1,
            },
            Error::UnsupportedProfile("icc"),
            Error::Decode(String::new()),
            Error::Encode(String::new()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(Error::result_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn display_names_the_code() {
        let msg = Error::UnsupportedMatrixCoefficients(14).to_string();
        assert!(msg.contains("14"));
    }
}
