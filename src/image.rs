//! Image container: planes, format tags and the color profile descriptor

use core::ops::{BitOr, BitOrAssign};

use imgref::ImgVec;
use log::debug;
use whereat::at;

use crate::cicp::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics};
use crate::error::{Error, Result};

/// Chroma layout of the YUV planes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// No YUV layout (RGB-only image, or not yet decoded)
    #[default]
    None,
    /// 4:4:4 - full resolution chroma
    Yuv444,
    /// 4:2:2 - chroma is half resolution horizontally
    Yuv422,
    /// 4:2:0 - chroma is half resolution in both dimensions
    Yuv420,
    /// 4:2:0 with the U and V planes stored in swapped order
    Yv12,
    /// Monochrome, Y plane only
    Yuv400,
}

/// Chroma geometry of a [`PixelFormat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormatInfo {
    /// log2 of the horizontal chroma subsampling factor
    pub chroma_shift_x: u32,
    /// log2 of the vertical chroma subsampling factor
    pub chroma_shift_y: u32,
    /// Physical plane index holding logical U
    pub u_plane_index: usize,
    /// Physical plane index holding logical V
    pub v_plane_index: usize,
    /// No chroma planes at all
    pub monochrome: bool,
}

impl PixelFormat {
    /// Chroma shifts and plane mapping, or `None` for [`PixelFormat::None`]
    pub fn info(self) -> Option<PixelFormatInfo> {
        let (shift_x, shift_y, u, v, monochrome) = match self {
            PixelFormat::None => return None,
            PixelFormat::Yuv444 => (0, 0, 1, 2, false),
            PixelFormat::Yuv422 => (1, 0, 1, 2, false),
            PixelFormat::Yuv420 => (1, 1, 1, 2, false),
            PixelFormat::Yv12 => (1, 1, 2, 1, false),
            PixelFormat::Yuv400 => (1, 1, 1, 2, true),
        };
        Some(PixelFormatInfo {
            chroma_shift_x: shift_x,
            chroma_shift_y: shift_y,
            u_plane_index: u,
            v_plane_index: v,
            monochrome,
        })
    }
}

/// Sample value range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Range {
    /// Studio range (Y: 16-235, UV: 16-240 at 8-bit)
    Limited,
    /// Full range (0-255 at 8-bit)
    #[default]
    Full,
}

/// Plane selection mask for allocation and release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Planes(pub u32);

impl Planes {
    pub const NONE: Self = Self(0);
    pub const RGB: Self = Self(1 << 0);
    pub const YUV: Self = Self(1 << 1);
    pub const A: Self = Self(1 << 2);
    pub const ALL: Self = Self(0xff);

    /// True if every bit of `other` is set in `self`
    pub fn contains(self, other: Planes) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set in `self`
    pub fn intersects(self, other: Planes) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Planes {
    type Output = Planes;

    fn bitor(self, rhs: Planes) -> Planes {
        Planes(self.0 | rhs.0)
    }
}

impl BitOrAssign for Planes {
    fn bitor_assign(&mut self, rhs: Planes) {
        self.0 |= rhs.0;
    }
}

/// Logical channel of a container plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    R,
    G,
    B,
    Y,
    U,
    V,
    A,
}

/// NCLX colorimetry: three CICP codes plus the range flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NclxProfile {
    pub colour_primaries: ColorPrimaries,
    pub transfer_characteristics: TransferCharacteristics,
    pub matrix_coefficients: MatrixCoefficients,
    pub range: Range,
}

/// Active color profile of an image; exactly one variant at a time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProfileDescriptor {
    /// No explicit colorimetry
    #[default]
    None,
    /// Embedded ICC profile, owned copy
    Icc(Vec<u8>),
    /// CICP code triple
    Nclx(NclxProfile),
}

/// Byte counts of the coded payloads, filled by the codec pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoStats {
    pub color_obu_size: usize,
    pub alpha_obu_size: usize,
}

/// One sample plane, 8-bit or 16-bit wide
#[derive(Debug, Clone, PartialEq)]
pub enum Plane {
    U8(ImgVec<u8>),
    U16(ImgVec<u16>),
}

/// Borrowed caller samples for [`AvifImage::set_plane`]
#[derive(Debug, Clone, Copy)]
pub enum PlaneSource<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
}

impl Plane {
    fn zeroed(width: usize, height: usize, wide: bool) -> Plane {
        if wide {
            Plane::U16(ImgVec::new(vec![0; width * height], width, height))
        } else {
            Plane::U8(ImgVec::new(vec![0; width * height], width, height))
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Plane::U8(img) => img.width(),
            Plane::U16(img) => img.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Plane::U8(img) => img.height(),
            Plane::U16(img) => img.height(),
        }
    }

    /// Row stride in samples
    pub fn stride(&self) -> usize {
        match self {
            Plane::U8(img) => img.stride(),
            Plane::U16(img) => img.stride(),
        }
    }

    /// Row stride in bytes
    pub fn row_bytes(&self) -> usize {
        match self {
            Plane::U8(img) => img.stride(),
            Plane::U16(img) => img.stride() * 2,
        }
    }

    pub fn is_u16(&self) -> bool {
        matches!(self, Plane::U16(_))
    }

    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> u16 {
        match self {
            Plane::U8(img) => u16::from(img[(x, y)]),
            Plane::U16(img) => img[(x, y)],
        }
    }

    /// Store a sample; 8-bit planes keep the low byte, callers clamp first
    #[inline]
    pub fn set_sample(&mut self, x: usize, y: usize, value: u16) {
        match self {
            Plane::U8(img) => img[(x, y)] = value as u8,
            Plane::U16(img) => img[(x, y)] = value,
        }
    }
}

/// An AVIF image: dimensions, depth, format tags, owned planes and profile.
///
/// Holds either RGB planes, YUV planes, or both (during conversion), plus an
/// optional full resolution alpha plane. Every plane and the ICC payload are
/// owned copies; dropping the image releases them.
#[derive(Debug, Clone, Default)]
pub struct AvifImage {
    width: u32,
    height: u32,
    depth: u8,
    yuv_format: PixelFormat,
    yuv_range: Range,
    rgb_planes: [Option<Plane>; 3],
    yuv_planes: [Option<Plane>; 3],
    alpha_plane: Option<Plane>,
    allocated: Planes,
    profile: ProfileDescriptor,
    /// Payload sizes recorded by the last encode or decode
    pub io_stats: IoStats,
}

pub(crate) fn check_depth(depth: u8) -> Result<()> {
    match depth {
        8 | 10 | 12 => Ok(()),
        _ => Err(at(Error::UnsupportedDepth(depth))),
    }
}

impl AvifImage {
    /// Create an image with known geometry, ready for plane allocation.
    pub fn create(width: u32, height: u32, depth: u8, yuv_format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(at(Error::InvalidDimensions { width, height }));
        }
        check_depth(depth)?;
        Ok(Self {
            width,
            height,
            depth,
            yuv_format,
            ..Self::default()
        })
    }

    /// Create an empty image for a decoder to populate.
    pub fn create_empty() -> Self {
        Self::default()
    }

    /// Set geometry on an image; drops every plane since their sizes change.
    pub fn set_geometry(
        &mut self,
        width: u32,
        height: u32,
        depth: u8,
        yuv_format: PixelFormat,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(at(Error::InvalidDimensions { width, height }));
        }
        check_depth(depth)?;
        self.free_planes(Planes::ALL);
        self.width = width;
        self.height = height;
        self.depth = depth;
        self.yuv_format = yuv_format;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn yuv_format(&self) -> PixelFormat {
        self.yuv_format
    }

    pub fn yuv_range(&self) -> Range {
        self.yuv_range
    }

    pub fn set_yuv_range(&mut self, range: Range) {
        self.yuv_range = range;
    }

    /// Samples wider than 8 bits are stored as `u16`
    pub fn uses_u16(&self) -> bool {
        self.depth > 8
    }

    /// Mask of plane groups currently allocated
    pub fn allocated(&self) -> Planes {
        self.allocated
    }

    /// Size of the chroma planes for the current format
    pub fn chroma_size(&self) -> Option<(usize, usize)> {
        let info = self.yuv_format.info()?;
        if info.monochrome {
            return None;
        }
        Some((
            ((self.width + info.chroma_shift_x) >> info.chroma_shift_x) as usize,
            ((self.height + info.chroma_shift_y) >> info.chroma_shift_y) as usize,
        ))
    }

    /// Allocate zeroed planes for every group in `planes`.
    ///
    /// Only missing planes are created; imported or allocated ones are kept.
    /// YUV allocation needs a pixel format; a monochrome format allocates the
    /// Y plane only.
    pub fn allocate_planes(&mut self, planes: Planes) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(at(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            }));
        }
        check_depth(self.depth)?;
        let (w, h) = (self.width as usize, self.height as usize);
        let wide = self.uses_u16();

        let zeroed = || Plane::zeroed(w, h, wide);

        if planes.contains(Planes::RGB) {
            for slot in &mut self.rgb_planes {
                slot.get_or_insert_with(zeroed);
            }
        }
        if planes.contains(Planes::YUV) {
            if self.yuv_format.info().is_none() {
                return Err(at(Error::UnsupportedPixelFormat(self.yuv_format)));
            }
            let chroma = self.chroma_size();
            self.yuv_planes[0].get_or_insert_with(zeroed);
            if let Some((cw, ch)) = chroma {
                for slot in &mut self.yuv_planes[1..] {
                    slot.get_or_insert_with(|| Plane::zeroed(cw, ch, wide));
                }
            }
        }
        if planes.contains(Planes::A) {
            self.alpha_plane.get_or_insert_with(zeroed);
        }
        self.refresh_allocated();
        debug!(
            "allocated planes {:?} for {}x{} depth {}",
            self.allocated, self.width, self.height, self.depth
        );
        Ok(())
    }

    /// Release every plane group in `planes`; already free groups are ignored.
    pub fn free_planes(&mut self, planes: Planes) {
        if planes.contains(Planes::RGB) {
            self.rgb_planes = [None, None, None];
            self.allocated.0 &= !Planes::RGB.0;
        }
        if planes.contains(Planes::YUV) {
            self.yuv_planes = [None, None, None];
            self.allocated.0 &= !Planes::YUV.0;
        }
        if planes.contains(Planes::A) {
            self.alpha_plane = None;
            self.allocated.0 &= !Planes::A.0;
        }
    }

    fn slot(&self, channel: Channel) -> &Option<Plane> {
        match channel {
            Channel::R => &self.rgb_planes[0],
            Channel::G => &self.rgb_planes[1],
            Channel::B => &self.rgb_planes[2],
            Channel::Y => &self.yuv_planes[0],
            Channel::U => &self.yuv_planes[1],
            Channel::V => &self.yuv_planes[2],
            Channel::A => &self.alpha_plane,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<Plane> {
        match channel {
            Channel::R => &mut self.rgb_planes[0],
            Channel::G => &mut self.rgb_planes[1],
            Channel::B => &mut self.rgb_planes[2],
            Channel::Y => &mut self.yuv_planes[0],
            Channel::U => &mut self.yuv_planes[1],
            Channel::V => &mut self.yuv_planes[2],
            Channel::A => &mut self.alpha_plane,
        }
    }

    pub fn plane(&self, channel: Channel) -> Option<&Plane> {
        self.slot(channel).as_ref()
    }

    pub fn plane_mut(&mut self, channel: Channel) -> Option<&mut Plane> {
        self.slot_mut(channel).as_mut()
    }

    /// Planes in physical storage order: for [`PixelFormat::Yv12`] index 1
    /// holds V and index 2 holds U.
    pub fn physical_yuv_plane(&self, index: usize) -> Option<&Plane> {
        let info = self.yuv_format.info()?;
        let channel = match index {
            0 => Channel::Y,
            i if i == info.u_plane_index => Channel::U,
            i if i == info.v_plane_index => Channel::V,
            _ => return None,
        };
        self.plane(channel)
    }

    /// Expected dimensions of the plane for `channel`
    fn plane_size(&self, channel: Channel) -> Result<(usize, usize)> {
        match channel {
            Channel::U | Channel::V => self
                .chroma_size()
                .ok_or_else(|| at(Error::UnsupportedPixelFormat(self.yuv_format))),
            _ => Ok((self.width as usize, self.height as usize)),
        }
    }

    /// Copy caller samples into an owned plane.
    ///
    /// `stride` is in samples and may exceed `width`; it is kept on the copy.
    /// The sample width must match the image depth. Color planes must have
    /// the geometry implied by the image; the alpha plane comes from its own
    /// coded item and is accepted at any size; conversions reject a mismatch.
    pub fn set_plane(
        &mut self,
        channel: Channel,
        samples: PlaneSource<'_>,
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<()> {
        check_depth(self.depth)?;
        if width == 0 || height == 0 {
            return Err(at(Error::InvalidDimensions {
                width: width as u32,
                height: height as u32,
            }));
        }
        if channel != Channel::A && self.plane_size(channel)? != (width, height) {
            return Err(at(Error::InvalidDimensions {
                width: width as u32,
                height: height as u32,
            }));
        }
        let needed = stride * (height - 1) + width;
        let actual = match samples {
            PlaneSource::U8(s) => s.len(),
            PlaneSource::U16(s) => s.len(),
        };
        if stride < width || actual < needed {
            return Err(at(Error::PlaneSizeMismatch { needed, actual }));
        }
        let plane = match (samples, self.uses_u16()) {
            (PlaneSource::U8(s), false) => {
                Plane::U8(ImgVec::new_stride(s[..needed].to_vec(), width, height, stride))
            }
            (PlaneSource::U16(s), true) => {
                Plane::U16(ImgVec::new_stride(s[..needed].to_vec(), width, height, stride))
            }
            _ => return Err(at(Error::UnsupportedDepth(self.depth))),
        };
        *self.slot_mut(channel) = Some(plane);
        self.refresh_allocated();
        Ok(())
    }

    /// Alpha plane geometry must equal the color geometry
    pub(crate) fn check_alpha_size(&self) -> Result<()> {
        if let Some(alpha) = &self.alpha_plane {
            let alpha_size = (alpha.width() as u32, alpha.height() as u32);
            if alpha_size != (self.width, self.height) {
                return Err(at(Error::ColorAlphaSizeMismatch {
                    color: (self.width, self.height),
                    alpha: alpha_size,
                }));
            }
        }
        Ok(())
    }

    fn refresh_allocated(&mut self) {
        let mut mask = Planes::NONE;
        if self.rgb_planes.iter().all(Option::is_some) {
            mask |= Planes::RGB;
        }
        let chroma_ok = match self.yuv_format.info() {
            Some(info) if info.monochrome => true,
            _ => self.yuv_planes[1].is_some() && self.yuv_planes[2].is_some(),
        };
        if self.yuv_planes[0].is_some() && chroma_ok {
            mask |= Planes::YUV;
        }
        if self.alpha_plane.is_some() {
            mask |= Planes::A;
        }
        self.allocated = mask;
    }

    /// True when the image carries no chroma
    pub fn is_monochrome(&self) -> bool {
        if self.yuv_format == PixelFormat::Yuv400 {
            return true;
        }
        self.yuv_planes[0].is_some()
            && (self.yuv_planes[1].is_none() || self.yuv_planes[2].is_none())
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha_plane.is_some()
    }

    pub fn profile(&self) -> &ProfileDescriptor {
        &self.profile
    }

    /// Clear the profile; any held ICC buffer is released.
    pub fn set_profile_none(&mut self) {
        self.profile = ProfileDescriptor::None;
    }

    /// Store a copy of an ICC profile, replacing the previous profile.
    pub fn set_profile_icc(&mut self, icc: &[u8]) {
        self.profile = ProfileDescriptor::Icc(icc.to_vec());
    }

    /// Store NCLX codes, replacing the previous profile.
    pub fn set_profile_nclx(&mut self, nclx: NclxProfile) {
        self.profile = ProfileDescriptor::Nclx(nclx);
    }

    /// Matrix coefficients governing YUV<->RGB for this image.
    ///
    /// Only an NCLX profile names a matrix; otherwise it is unspecified.
    pub fn matrix_coefficients(&self) -> MatrixCoefficients {
        match &self.profile {
            ProfileDescriptor::Nclx(nclx) => nclx.matrix_coefficients,
            _ => MatrixCoefficients::UNSPECIFIED,
        }
    }

    /// Primaries named by the NCLX profile, unspecified otherwise
    pub fn colour_primaries(&self) -> ColorPrimaries {
        match &self.profile {
            ProfileDescriptor::Nclx(nclx) => nclx.colour_primaries,
            _ => ColorPrimaries::UNSPECIFIED,
        }
    }
}
