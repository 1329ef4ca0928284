//! CICP (ITU-T H.273) code points and lookup tables
//!
//! Codes are kept as plain 16-bit newtypes rather than closed enums: bitstreams
//! in the wild carry reserved and misused values, and every lookup here has a
//! defined answer for those. Legacy standard names that share a numeric code
//! are exposed as alias constants on the same value.
//!
//! The primaries table is a `static` array, so it is fully initialized before
//! first use and safe to read from any number of threads.

/// Color primaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorPrimaries(pub u16);

impl ColorPrimaries {
    pub const UNKNOWN: Self = Self(0);
    pub const BT709: Self = Self(1);
    pub const BT1361_0: Self = Self(1);
    pub const IEC61966_2_1: Self = Self(1);
    pub const SRGB: Self = Self(1);
    pub const SYCC: Self = Self(1);
    pub const IEC61966_2_4: Self = Self(1);
    pub const UNSPECIFIED: Self = Self(2);
    pub const BT470_6M: Self = Self(4);
    pub const BT601_7_625: Self = Self(5);
    pub const BT470_6G: Self = Self(5);
    pub const BT601_7_525: Self = Self(6);
    pub const BT1358: Self = Self(6);
    pub const ST240: Self = Self(7);
    pub const GENERIC_FILM: Self = Self(8);
    pub const BT2020: Self = Self(9);
    pub const BT2100: Self = Self(9);
    pub const XYZ: Self = Self(10);
    pub const ST428: Self = Self(10);
    pub const RP431_2: Self = Self(11);
    pub const EG432_1: Self = Self(12);
    pub const P3: Self = Self(12);
    pub const EBU3213E: Self = Self(22);

    /// Canonical name of this code, if it has a table entry
    pub fn name(self) -> Option<&'static str> {
        PRIMARIES_TABLE
            .iter()
            .find(|entry| entry.code == self)
            .map(|entry| entry.name)
    }

    /// Whether the table holds chromaticities for this code
    pub fn is_known(self) -> bool {
        self.name().is_some()
    }
}

/// Transfer characteristics (gamma curve)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransferCharacteristics(pub u16);

impl TransferCharacteristics {
    pub const UNKNOWN: Self = Self(0);
    pub const BT709: Self = Self(1);
    pub const BT1361: Self = Self(1);
    pub const UNSPECIFIED: Self = Self(2);
    pub const GAMMA22: Self = Self(4);
    pub const GAMMA28: Self = Self(5);
    pub const BT601: Self = Self(6);
    pub const ST240: Self = Self(7);
    pub const LINEAR: Self = Self(8);
    pub const LOG_100_1: Self = Self(9);
    pub const LOG_100_SQRT: Self = Self(10);
    pub const IEC61966: Self = Self(11);
    pub const BT1361_EXTENDED: Self = Self(12);
    pub const IEC61966_2_1: Self = Self(13);
    pub const SRGB: Self = Self(13);
    pub const SYCC: Self = Self(13);
    pub const BT2020_10BIT: Self = Self(14);
    pub const BT2020_12BIT: Self = Self(15);
    pub const ST2084: Self = Self(16);
    pub const BT2100_PQ: Self = Self(16);
    pub const ST428: Self = Self(17);
    pub const STD_B67: Self = Self(18);
    pub const BT2100_HLG: Self = Self(18);

    /// Classify this code into the transfer function family it encodes
    pub fn function(self) -> TransferFunction {
        match self.0 {
            1 | 6 | 14 | 15 => TransferFunction::Bt709,
            4 => TransferFunction::Gamma(2.2),
            5 => TransferFunction::Gamma(2.8),
            7 => TransferFunction::Smpte240,
            8 => TransferFunction::Linear,
            9 => TransferFunction::Log100,
            10 => TransferFunction::Log100Sqrt10,
            11 => TransferFunction::Iec61966,
            12 => TransferFunction::Bt1361,
            13 => TransferFunction::Srgb,
            16 => TransferFunction::Pq,
            17 => TransferFunction::Smpte428,
            18 => TransferFunction::Hlg,
            _ => TransferFunction::Unspecified,
        }
    }
}

/// Matrix coefficients for YUV <-> RGB conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatrixCoefficients(pub u16);

impl MatrixCoefficients {
    pub const IDENTITY: Self = Self(0);
    pub const BT709: Self = Self(1);
    pub const BT1361_0: Self = Self(1);
    pub const SRGB: Self = Self(1);
    pub const SYCC: Self = Self(1);
    pub const UNSPECIFIED: Self = Self(2);
    pub const USFC_73682: Self = Self(4);
    pub const BT470_6B: Self = Self(5);
    pub const BT601_7_625: Self = Self(5);
    pub const BT601_7_525: Self = Self(6);
    pub const BT1700_NTSC: Self = Self(6);
    pub const ST170: Self = Self(6);
    pub const ST240: Self = Self(7);
    pub const YCGCO: Self = Self(8);
    pub const BT2020_NCL: Self = Self(9);
    pub const BT2100: Self = Self(9);
    pub const BT2020_CL: Self = Self(10);
    pub const ST2085: Self = Self(11);
    pub const CHROMA_DERIVED_NCL: Self = Self(12);
    pub const CHROMA_DERIVED_CL: Self = Self(13);
    pub const ICTCP: Self = Self(14);
}

/// Transfer function family selected by a transfer characteristics code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferFunction {
    /// BT.709 / BT.601 / BT.2020 OETF (codes 1, 6, 14, 15)
    Bt709,
    /// IEC 61966-2-1 piecewise sRGB curve
    Srgb,
    /// Pure power law with the given display gamma
    Gamma(f32),
    /// Identity
    Linear,
    /// SMPTE ST 240
    Smpte240,
    /// SMPTE ST 2084 perceptual quantizer
    Pq,
    /// ARIB STD-B67 hybrid log-gamma
    Hlg,
    /// Logarithmic, 100:1 range
    Log100,
    /// Logarithmic, 100*sqrt(10):1 range
    Log100Sqrt10,
    /// IEC 61966-2-4 (xvYCC, extended range)
    Iec61966,
    /// BT.1361 extended colour gamut
    Bt1361,
    /// SMPTE ST 428-1
    Smpte428,
    /// Reserved, unknown or explicitly unspecified
    Unspecified,
}

/// One row of the primaries table
#[derive(Debug, Clone, Copy)]
pub struct PrimariesEntry {
    /// Numeric code
    pub code: ColorPrimaries,
    /// Canonical name
    pub name: &'static str,
    /// rx, ry, gx, gy, bx, by, wx, wy
    pub values: [f32; 8],
}

/// Chromaticities for every code with a defined meaning, one row per code,
/// ordered by code.
pub static PRIMARIES_TABLE: [PrimariesEntry; 11] = [
    PrimariesEntry {
        code: ColorPrimaries::BT709,
        name: "BT.709",
        values: [0.64, 0.33, 0.30, 0.60, 0.15, 0.06, 0.3127, 0.3290],
    },
    PrimariesEntry {
        code: ColorPrimaries::BT470_6M,
        name: "BT.470-6 System M",
        values: [0.67, 0.33, 0.21, 0.71, 0.14, 0.08, 0.310, 0.316],
    },
    PrimariesEntry {
        code: ColorPrimaries::BT601_7_625,
        name: "BT.601-7 625",
        values: [0.64, 0.33, 0.29, 0.60, 0.15, 0.06, 0.3127, 0.3290],
    },
    PrimariesEntry {
        code: ColorPrimaries::BT601_7_525,
        name: "BT.601-7 525",
        values: [0.630, 0.340, 0.310, 0.595, 0.155, 0.070, 0.3127, 0.3290],
    },
    PrimariesEntry {
        code: ColorPrimaries::ST240,
        name: "ST 240",
        values: [0.630, 0.340, 0.310, 0.595, 0.155, 0.070, 0.3127, 0.3290],
    },
    PrimariesEntry {
        code: ColorPrimaries::GENERIC_FILM,
        name: "Generic film",
        values: [0.681, 0.319, 0.243, 0.692, 0.145, 0.049, 0.310, 0.316],
    },
    PrimariesEntry {
        code: ColorPrimaries::BT2020,
        name: "BT.2020",
        values: [0.708, 0.292, 0.170, 0.797, 0.131, 0.046, 0.3127, 0.3290],
    },
    PrimariesEntry {
        code: ColorPrimaries::XYZ,
        name: "XYZ",
        values: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.3333, 0.3333],
    },
    PrimariesEntry {
        code: ColorPrimaries::RP431_2,
        name: "RP 431-2",
        values: [0.680, 0.320, 0.265, 0.690, 0.150, 0.060, 0.314, 0.351],
    },
    PrimariesEntry {
        code: ColorPrimaries::EG432_1,
        name: "EG 432-1 (P3)",
        values: [0.680, 0.320, 0.265, 0.690, 0.150, 0.060, 0.3127, 0.3290],
    },
    PrimariesEntry {
        code: ColorPrimaries::EBU3213E,
        name: "EBU 3213-E",
        values: [0.630, 0.340, 0.295, 0.605, 0.155, 0.077, 0.3127, 0.3290],
    },
];

/// Legacy and alternative standard names, many-to-one onto table codes.
pub static PRIMARIES_ALIASES: [(&str, ColorPrimaries); 21] = [
    ("BT.709", ColorPrimaries::BT709),
    ("BT.1361-0", ColorPrimaries::BT1361_0),
    ("IEC 61966-2-1", ColorPrimaries::IEC61966_2_1),
    ("sRGB", ColorPrimaries::SRGB),
    ("sYCC", ColorPrimaries::SYCC),
    ("IEC 61966-2-4", ColorPrimaries::IEC61966_2_4),
    ("BT.470-6 System M", ColorPrimaries::BT470_6M),
    ("BT.601-7 625", ColorPrimaries::BT601_7_625),
    ("BT.470-6 System G", ColorPrimaries::BT470_6G),
    ("BT.601-7 525", ColorPrimaries::BT601_7_525),
    ("BT.1358", ColorPrimaries::BT1358),
    ("ST 240", ColorPrimaries::ST240),
    ("Generic film", ColorPrimaries::GENERIC_FILM),
    ("BT.2020", ColorPrimaries::BT2020),
    ("BT.2100", ColorPrimaries::BT2100),
    ("XYZ", ColorPrimaries::XYZ),
    ("ST 428", ColorPrimaries::ST428),
    ("RP 431-2", ColorPrimaries::RP431_2),
    ("EG 432-1 (P3)", ColorPrimaries::EG432_1),
    ("P3", ColorPrimaries::P3),
    ("EBU 3213-E", ColorPrimaries::EBU3213E),
];

/// Largest per-coordinate difference accepted by [`chromaticity_to_primaries`]
pub const PRIMARIES_MATCH_TOLERANCE: f32 = 0.01;

/// Chromaticities `[rx, ry, gx, gy, bx, by, wx, wy]` for a primaries code.
///
/// Never fails: codes without a table entry (reserved, unknown, unspecified)
/// resolve to the BT.709 values.
pub fn primaries_to_chromaticity(primaries: ColorPrimaries) -> [f32; 8] {
    PRIMARIES_TABLE
        .iter()
        .find(|entry| entry.code == primaries)
        .unwrap_or(&PRIMARIES_TABLE[0])
        .values
}

/// Nearest table code and its canonical name for a set of chromaticities.
///
/// The closest row (least squared distance) wins as long as every coordinate
/// is within [`PRIMARIES_MATCH_TOLERANCE`]; ties go to the lower code. Inputs
/// with no acceptable row return `(ColorPrimaries::UNKNOWN, "Unknown")`.
pub fn chromaticity_to_primaries(values: &[f32; 8]) -> (ColorPrimaries, &'static str) {
    let mut best: Option<(&PrimariesEntry, f32)> = None;
    for entry in PRIMARIES_TABLE.iter() {
        let within = entry
            .values
            .iter()
            .zip(values)
            .all(|(a, b)| (a - b).abs() <= PRIMARIES_MATCH_TOLERANCE);
        if !within {
            continue;
        }
        let distance: f32 = entry
            .values
            .iter()
            .zip(values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((entry, distance));
        }
    }
    match best {
        Some((entry, _)) => (entry.code, entry.name),
        None => (ColorPrimaries::UNKNOWN, "Unknown"),
    }
}

/// Look up a primaries code by any of its standard names (case-insensitive)
pub fn primaries_from_name(name: &str) -> Option<ColorPrimaries> {
    PRIMARIES_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
}

/// Luma coefficients `(kr, kb)` derived from chromaticities (H.273 eq. 39, 40).
///
/// Used for the chromaticity-derived matrix coefficients. Returns `None` when
/// the primaries are degenerate.
pub fn luma_coefficients(primaries: ColorPrimaries) -> Option<(f32, f32)> {
    let [xr, yr, xg, yg, xb, yb, xw, yw] = primaries_to_chromaticity(primaries).map(f64::from);
    let zr = 1.0 - (xr + yr);
    let zg = 1.0 - (xg + yg);
    let zb = 1.0 - (xb + yb);
    let zw = 1.0 - (xw + yw);

    let denom = yw * (xr * (yg * zb - yb * zg) + xg * (yb * zr - yr * zb) + xb * (yr * zg - yg * zr));
    if denom.abs() < 1e-9 {
        return None;
    }
    let kr = yr * (xw * (yg * zb - yb * zg) + yw * (xb * zg - xg * zb) + zw * (xg * yb - xb * yg))
        / denom;
    let kb = yb * (xw * (yr * zg - yg * zr) + yw * (xg * zr - xr * zg) + zw * (xr * yg - xg * yr))
        / denom;
    if !(kr.is_finite() && kb.is_finite()) || kr + kb >= 1.0 {
        return None;
    }
    Some((kr as f32, kb as f32))
}
