//! Color space resolution
//!
//! Turns an image's profile descriptor into a [`ColorSpace`] for the host.
//! ICC payloads are parsed directly and always win. NCLX codes go through
//! the CICP tables, hitting a process-wide cache for well-known spaces and
//! constructing anything else per call. A missing or unusable description
//! degrades to a default space instead of failing the decode.
//!
//! Cached spaces are handed out borrowed with `should_release == false`;
//! freshly constructed ones are owned by the receiver.

use std::borrow::Cow;
use std::sync::LazyLock;

use log::{debug, warn};
use moxcms::{Chromaticity, ColorProfile, DataColorSpace, ToneReprCurve};
use whereat::at;

use crate::cicp::{
    ColorPrimaries, TransferCharacteristics, TransferFunction, primaries_to_chromaticity,
};
use crate::error::{Error, Result};
use crate::image::{AvifImage, ProfileDescriptor};

/// Size of the fixed ICC profile header
const ICC_HEADER_SIZE: usize = 128;

/// Channel layout a color space describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    Rgb,
    Gray,
}

/// Where a color space came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSource {
    /// Platform default, used when nothing better is known
    Default,
    /// Built from CICP codes
    Cicp {
        primaries: ColorPrimaries,
        transfer: TransferCharacteristics,
    },
    /// Parsed from an embedded ICC profile
    Icc,
}

/// A color space handle: a CMS profile plus how it was derived
#[derive(Debug, Clone)]
pub struct ColorSpace {
    model: ColorModel,
    source: ColorSource,
    profile: ColorProfile,
}

impl ColorSpace {
    pub fn model(&self) -> ColorModel {
        self.model
    }

    pub fn source(&self) -> ColorSource {
        self.source
    }

    /// The underlying moxcms profile, ready for building transforms
    pub fn profile(&self) -> &ColorProfile {
        &self.profile
    }

    pub fn into_profile(self) -> ColorProfile {
        self.profile
    }
}

/// A resolved color space and whether the receiver owns it.
///
/// `should_release` is true exactly when the handle was constructed for this
/// call. Shared handles live for the whole process and are never released.
#[derive(Debug, Clone)]
pub struct ResolvedColorSpace {
    handle: Cow<'static, ColorSpace>,
    should_release: bool,
}

impl ResolvedColorSpace {
    fn shared(space: &'static ColorSpace) -> Self {
        Self {
            handle: Cow::Borrowed(space),
            should_release: false,
        }
    }

    fn owned(space: ColorSpace) -> Self {
        Self {
            handle: Cow::Owned(space),
            should_release: true,
        }
    }

    pub fn handle(&self) -> &ColorSpace {
        &self.handle
    }

    pub fn should_release(&self) -> bool {
        self.should_release
    }

    /// Take the handle; owned handles are released when the `Cow` drops.
    pub fn into_handle(self) -> Cow<'static, ColorSpace> {
        self.handle
    }
}

/// Tone curve for a transfer characteristics code, if one can be built
fn transfer_curve(transfer: TransferCharacteristics) -> Option<ToneReprCurve> {
    if transfer.function() == TransferFunction::Unspecified {
        return None;
    }
    let code = u8::try_from(transfer.0).ok()?;
    let mox = moxcms::TransferCharacteristics::try_from(code).ok()?;
    ToneReprCurve::try_from(mox).ok()
}

fn gray_profile(curve: ToneReprCurve) -> ColorProfile {
    let mut profile = ColorProfile::new_srgb();
    profile.color_space = DataColorSpace::Gray;
    profile.red_trc = None;
    profile.green_trc = None;
    profile.blue_trc = None;
    profile.gray_trc = Some(curve);
    profile
}

/// Build a fresh single-channel color space.
///
/// Gray spaces carry only a tone curve; the primaries code does not change
/// the result but is recorded as the source. Returns `None` when the
/// transfer characteristics have no constructible curve.
pub fn create_color_space_mono(
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> Option<ColorSpace> {
    let curve = transfer_curve(transfer)?;
    Some(ColorSpace {
        model: ColorModel::Gray,
        source: ColorSource::Cicp {
            primaries,
            transfer,
        },
        profile: gray_profile(curve),
    })
}

/// Build a fresh three-channel color space.
///
/// Unknown primaries codes take the BT.709 chromaticities. Returns `None`
/// for degenerate primaries (a zero luminance coordinate, as for XYZ) or a
/// transfer code without a constructible curve.
pub fn create_color_space_rgb(
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> Option<ColorSpace> {
    let [rx, ry, gx, gy, bx, by, wx, wy] = primaries_to_chromaticity(primaries);
    if [ry, gy, by, wy].iter().any(|&y| y <= 0.0) {
        return None;
    }
    let curve = transfer_curve(transfer)?;

    let mut profile = ColorProfile::new_srgb();
    profile.update_rgb_colorimetry(
        Chromaticity::new(wx, wy).to_xyyb(),
        moxcms::ColorPrimaries {
            red: Chromaticity::new(rx, ry),
            green: Chromaticity::new(gx, gy),
            blue: Chromaticity::new(bx, by),
        },
    );
    profile.red_trc = Some(curve.clone());
    profile.green_trc = Some(curve.clone());
    profile.blue_trc = Some(curve);
    Some(ColorSpace {
        model: ColorModel::Rgb,
        source: ColorSource::Cicp {
            primaries,
            transfer,
        },
        profile,
    })
}

static DEFAULT_RGB: LazyLock<ColorSpace> = LazyLock::new(|| ColorSpace {
    model: ColorModel::Rgb,
    source: ColorSource::Default,
    profile: ColorProfile::new_srgb(),
});

static DEFAULT_GRAY: LazyLock<ColorSpace> = LazyLock::new(|| ColorSpace {
    model: ColorModel::Gray,
    source: ColorSource::Default,
    profile: gray_profile(ToneReprCurve::Parametric(vec![2.2])),
});

static SRGB: LazyLock<Option<ColorSpace>> =
    LazyLock::new(|| create_color_space_rgb(ColorPrimaries::SRGB, TransferCharacteristics::SRGB));
static BT709: LazyLock<Option<ColorSpace>> =
    LazyLock::new(|| create_color_space_rgb(ColorPrimaries::BT709, TransferCharacteristics::BT709));
static LINEAR_SRGB: LazyLock<Option<ColorSpace>> = LazyLock::new(|| {
    create_color_space_rgb(ColorPrimaries::SRGB, TransferCharacteristics::LINEAR)
});
static DISPLAY_P3: LazyLock<Option<ColorSpace>> =
    LazyLock::new(|| create_color_space_rgb(ColorPrimaries::P3, TransferCharacteristics::SRGB));
static BT2020: LazyLock<Option<ColorSpace>> = LazyLock::new(|| {
    create_color_space_rgb(ColorPrimaries::BT2020, TransferCharacteristics::BT709)
});
static BT2100_PQ: LazyLock<Option<ColorSpace>> = LazyLock::new(|| {
    create_color_space_rgb(ColorPrimaries::BT2100, TransferCharacteristics::BT2100_PQ)
});
static BT2100_HLG: LazyLock<Option<ColorSpace>> = LazyLock::new(|| {
    create_color_space_rgb(ColorPrimaries::BT2100, TransferCharacteristics::BT2100_HLG)
});
static LINEAR_GRAY: LazyLock<Option<ColorSpace>> = LazyLock::new(|| {
    create_color_space_mono(ColorPrimaries::UNSPECIFIED, TransferCharacteristics::LINEAR)
});

/// Default three-channel space (sRGB)
pub fn default_color_space_rgb() -> &'static ColorSpace {
    &DEFAULT_RGB
}

/// Default single-channel space (gamma 2.2 gray)
pub fn default_color_space_mono() -> &'static ColorSpace {
    &DEFAULT_GRAY
}

/// Process-wide cached space for a well-known RGB code pair
fn cached_rgb(
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> Option<&'static ColorSpace> {
    let cell: &LazyLock<Option<ColorSpace>> = match (primaries.0, transfer.0) {
        (1, 13) => &SRGB,
        (1, 1 | 6 | 14 | 15) => &BT709,
        (1, 8) => &LINEAR_SRGB,
        (12, 13) => &DISPLAY_P3,
        (9, 1 | 6 | 14 | 15) => &BT2020,
        (9, 16) => &BT2100_PQ,
        (9, 18) => &BT2100_HLG,
        _ => return None,
    };
    cell.as_ref()
}

/// Process-wide cached space for a well-known gray transfer
fn cached_mono(transfer: TransferCharacteristics) -> Option<&'static ColorSpace> {
    match transfer.0 {
        4 => Some(&DEFAULT_GRAY),
        8 => LINEAR_GRAY.as_ref(),
        _ => None,
    }
}

/// RGB space for a code pair: shared if cached, otherwise freshly built.
///
/// `None` when the pair is not constructible; callers fall back to
/// [`default_color_space_rgb`].
pub fn color_space_rgb(
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> Option<ResolvedColorSpace> {
    if let Some(space) = cached_rgb(primaries, transfer) {
        return Some(ResolvedColorSpace::shared(space));
    }
    create_color_space_rgb(primaries, transfer).map(ResolvedColorSpace::owned)
}

/// Gray space for a code pair: shared if cached, otherwise freshly built.
pub fn color_space_mono(
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> Option<ResolvedColorSpace> {
    if let Some(space) = cached_mono(transfer) {
        return Some(ResolvedColorSpace::shared(space));
    }
    create_color_space_mono(primaries, transfer).map(ResolvedColorSpace::owned)
}

/// Check an ICC payload against its own header.
///
/// The buffer must hold at least the 128-byte header, and the size field must
/// be no smaller than the header and no larger than the buffer. Trailing
/// padding after the declared size is tolerated.
pub fn validate_icc(icc: &[u8]) -> Result<()> {
    let Some(size_field) = icc.first_chunk::<4>() else {
        return Err(at(Error::IccSizeMismatch {
            declared: 0,
            actual: icc.len(),
        }));
    };
    let declared = u32::from_be_bytes(*size_field) as usize;
    if icc.len() < ICC_HEADER_SIZE || declared < ICC_HEADER_SIZE || declared > icc.len() {
        return Err(at(Error::IccSizeMismatch {
            declared,
            actual: icc.len(),
        }));
    }
    Ok(())
}

/// Parse an ICC payload into a color space of the requested model.
pub fn color_space_from_icc(icc: &[u8], model: ColorModel) -> Result<ColorSpace> {
    validate_icc(icc)?;
    let profile = ColorProfile::new_from_slice(icc).map_err(|e| {
        debug!("ICC parse failed: {e:?}");
        at(Error::ColorSpaceConstruction("unparseable ICC profile"))
    })?;
    let matches = match model {
        ColorModel::Rgb => profile.color_space == DataColorSpace::Rgb,
        ColorModel::Gray => profile.color_space == DataColorSpace::Gray,
    };
    if !matches {
        return Err(at(Error::ColorSpaceConstruction(
            "ICC profile color model does not match the image",
        )));
    }
    Ok(ColorSpace {
        model,
        source: ColorSource::Icc,
        profile,
    })
}

fn resolve(image: &AvifImage, model: ColorModel) -> ResolvedColorSpace {
    let default = match model {
        ColorModel::Rgb => default_color_space_rgb(),
        ColorModel::Gray => default_color_space_mono(),
    };
    match image.profile() {
        ProfileDescriptor::Icc(icc) => match color_space_from_icc(icc, model) {
            Ok(space) => ResolvedColorSpace::owned(space),
            Err(e) => {
                warn!("ignoring embedded ICC profile: {e:?}");
                ResolvedColorSpace::shared(default)
            }
        },
        ProfileDescriptor::Nclx(nclx) => {
            let (primaries, transfer) = (nclx.colour_primaries, nclx.transfer_characteristics);
            let resolved = match model {
                ColorModel::Rgb => color_space_rgb(primaries, transfer),
                ColorModel::Gray => color_space_mono(primaries, transfer),
            };
            resolved.unwrap_or_else(|| {
                if transfer.function() == TransferFunction::Unspecified {
                    debug!("unspecified transfer {}, using default {model:?} space", transfer.0);
                } else {
                    warn!(
                        "cannot build {model:?} color space for primaries {} transfer {}, using default",
                        primaries.0, transfer.0
                    );
                }
                ResolvedColorSpace::shared(default)
            })
        }
        ProfileDescriptor::None => ResolvedColorSpace::shared(default),
    }
}

/// Color space for displaying `image` as RGB.
///
/// ICC beats NCLX beats the default. Never fails: anything unusable falls
/// back to the shared default sRGB space.
pub fn resolve_color_space_rgb(image: &AvifImage) -> ResolvedColorSpace {
    resolve(image, ColorModel::Rgb)
}

/// Color space for displaying `image` as gray; same policy as the RGB entry.
pub fn resolve_color_space_mono(image: &AvifImage) -> ResolvedColorSpace {
    resolve(image, ColorModel::Gray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cicp::MatrixCoefficients;
    use crate::image::{NclxProfile, PixelFormat, Range};

    fn nclx(primaries: u16, transfer: u16) -> NclxProfile {
        NclxProfile {
            colour_primaries: ColorPrimaries(primaries),
            transfer_characteristics: TransferCharacteristics(transfer),
            matrix_coefficients: MatrixCoefficients::BT709,
            range: Range::Full,
        }
    }

    fn image_with(profile: Option<NclxProfile>) -> AvifImage {
        let mut img = AvifImage::create(1, 1, 8, PixelFormat::Yuv444).unwrap();
        if let Some(p) = profile {
            img.set_profile_nclx(p);
        }
        img
    }

    #[test]
    fn well_known_spaces_are_shared() {
        let a = color_space_rgb(ColorPrimaries::BT709, TransferCharacteristics::SRGB).unwrap();
        let b = color_space_rgb(ColorPrimaries::SRGB, TransferCharacteristics::IEC61966_2_1)
            .unwrap();
        assert!(!a.should_release());
        assert!(std::ptr::eq(a.handle(), b.handle()));

        let pq = color_space_rgb(ColorPrimaries::BT2020, TransferCharacteristics::ST2084).unwrap();
        assert!(!pq.should_release());
        assert_eq!(pq.handle().model(), ColorModel::Rgb);
    }

    #[test]
    fn exotic_spaces_are_owned() {
        let space =
            color_space_rgb(ColorPrimaries::EBU3213E, TransferCharacteristics::GAMMA28).unwrap();
        assert!(space.should_release());
        assert_eq!(
            space.handle().source(),
            ColorSource::Cicp {
                primaries: ColorPrimaries::EBU3213E,
                transfer: TransferCharacteristics::GAMMA28,
            }
        );
        assert!(matches!(space.into_handle(), Cow::Owned(_)));
    }

    #[test]
    fn unconstructible_pairs_return_none() {
        assert!(create_color_space_rgb(ColorPrimaries::XYZ, TransferCharacteristics::SRGB).is_none());
        assert!(
            create_color_space_rgb(ColorPrimaries::BT709, TransferCharacteristics(3)).is_none()
        );
        assert!(
            create_color_space_rgb(ColorPrimaries::BT709, TransferCharacteristics::UNSPECIFIED)
                .is_none()
        );
        assert!(
            create_color_space_mono(ColorPrimaries::BT709, TransferCharacteristics(400)).is_none()
        );
    }

    #[test]
    fn unknown_primaries_use_bt709_chromaticities() {
        let space =
            create_color_space_rgb(ColorPrimaries(77), TransferCharacteristics::GAMMA22).unwrap();
        assert_eq!(space.model(), ColorModel::Rgb);
    }

    #[test]
    fn mono_spaces_are_gray() {
        let gray = color_space_mono(ColorPrimaries::BT709, TransferCharacteristics::SRGB).unwrap();
        assert!(gray.should_release());
        assert_eq!(gray.handle().profile().color_space, DataColorSpace::Gray);
        assert!(gray.handle().profile().gray_trc.is_some());

        let linear =
            color_space_mono(ColorPrimaries::BT709, TransferCharacteristics::LINEAR).unwrap();
        assert!(!linear.should_release());
    }

    #[test]
    fn no_profile_resolves_to_shared_default() {
        let img = image_with(None);
        let rgb = resolve_color_space_rgb(&img);
        assert!(!rgb.should_release());
        assert_eq!(rgb.handle().source(), ColorSource::Default);
        let mono = resolve_color_space_mono(&img);
        assert_eq!(mono.handle().model(), ColorModel::Gray);
        assert!(!mono.should_release());
    }

    #[test]
    fn unconstructible_nclx_falls_back() {
        let img = image_with(Some(nclx(10, 13)));
        let resolved = resolve_color_space_rgb(&img);
        assert!(!resolved.should_release());
        assert_eq!(resolved.handle().source(), ColorSource::Default);
    }

    #[test]
    fn icc_wins_over_nclx_even_when_broken() {
        let mut img = image_with(Some(nclx(9, 16)));
        let mut junk = vec![0u8; 200];
        junk[..4].copy_from_slice(&200u32.to_be_bytes());
        img.set_profile_icc(&junk);
        let resolved = resolve_color_space_rgb(&img);
        // the NCLX PQ space must not be consulted
        assert_eq!(resolved.handle().source(), ColorSource::Default);
        assert!(!resolved.should_release());

        img.set_profile_nclx(nclx(9, 16));
        let resolved = resolve_color_space_rgb(&img);
        assert_eq!(
            resolved.handle().source(),
            ColorSource::Cicp {
                primaries: ColorPrimaries::BT2020,
                transfer: TransferCharacteristics::BT2100_PQ,
            }
        );
    }

    #[test]
    fn icc_header_validation() {
        assert!(validate_icc(&[0, 0]).is_err());
        let mut icc = vec![0u8; 160];
        icc[..4].copy_from_slice(&160u32.to_be_bytes());
        assert!(validate_icc(&icc).is_ok());
        icc[..4].copy_from_slice(&300u32.to_be_bytes());
        let err = validate_icc(&icc).unwrap_err().into_inner();
        assert!(matches!(
            err,
            Error::IccSizeMismatch {
                declared: 300,
                actual: 160
            }
        ));
        icc[..4].copy_from_slice(&12u32.to_be_bytes());
        assert!(validate_icc(&icc).is_err());
    }
}
