//! Shape submission vocabulary: kinds, render-state flags and packed colors.

use glam::Vec4;

/// A 4-component float record, the atomic unit of the store's data pool.
///
/// Every shape reserves a fixed run of 1–3 quads holding its raw geometric
/// parameters (endpoints, min/max corners, transform rows, centre + radius).
pub type Quad = Vec4;

/// Fill style of a submitted shape.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    /// Solid triangles with per-face normals.
    Filled = 0,
    /// Line-list wireframe.
    Wire = 1,
}

impl Style {
    pub const COUNT: u32 = 2;

    pub(crate) fn from_bits(bits: u32) -> Self {
        if bits == 0 {
            Self::Filled
        } else {
            Self::Wire
        }
    }
}

/// Depth-test mode of a submitted shape.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ZMode {
    /// Depth-tested against the scene.
    Test = 0,
    /// Drawn over everything.
    NoTest = 1,
}

impl ZMode {
    pub const COUNT: u32 = 2;

    pub(crate) fn from_bits(bits: u32) -> Self {
        if bits == 0 {
            Self::Test
        } else {
            Self::NoTest
        }
    }
}

/// Blend mode of a submitted shape.
///
/// Never supplied directly: derived from the color's alpha byte when the
/// shape is reserved. A fully opaque alpha (`0xff`) selects [`Blend::Opaque`],
/// anything else selects [`Blend::Alpha`].
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Blend {
    Opaque = 0,
    Alpha = 1,
}

impl Blend {
    pub const COUNT: u32 = 2;

    /// Derive the blend mode from a packed color.
    pub fn from_color(color: u32) -> Self {
        if color >> 24 == 0xff {
            Self::Opaque
        } else {
            Self::Alpha
        }
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        if bits == 0 {
            Self::Opaque
        } else {
            Self::Alpha
        }
    }
}

/// Kind of a submitted shape.
///
/// Kinds fit in the 5-bit field of the packed shape header; an out-of-range
/// field value is the "invalid" sentinel written when the data pool
/// overflows, and is skipped by the batch compiler.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line = 0,
    Triangle = 1,
    /// Axis-aligned box, stored as min/max corners.
    Aabb = 2,
    /// Oriented box, stored as transposed transform rows.
    Obb = 3,
    /// Sphere, stored as centre with radius in the fourth lane.
    Sphere = 4,
    Ellipsoid = 5,
    Cone = 6,
    Cylinder = 7,
}

impl ShapeKind {
    pub const COUNT: u32 = 8;

    /// Quads a shape of this kind occupies in the store's data pool.
    pub const fn data_quads(self) -> usize {
        match self {
            Self::Sphere => 1,
            Self::Line | Self::Aabb => 2,
            _ => 3,
        }
    }

    /// Decode a 5-bit header field; `None` is the invalid sentinel.
    pub(crate) fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            0 => Self::Line,
            1 => Self::Triangle,
            2 => Self::Aabb,
            3 => Self::Obb,
            4 => Self::Sphere,
            5 => Self::Ellipsoid,
            6 => Self::Cone,
            7 => Self::Cylinder,
            _ => return None,
        })
    }
}

/// Pack an opaque color (alpha forced to `0xff`, selecting [`Blend::Opaque`]).
///
/// Byte layout is `0xAABBGGRR`: red in the low byte, alpha in the top byte.
#[inline]
pub fn color_rgb(r: u8, g: u8, b: u8) -> u32 {
    color_rgba(r, g, b, 0xff)
}

/// Pack a color with explicit alpha.
///
/// Any alpha other than `0xff` selects [`Blend::Alpha`].
#[inline]
pub fn color_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_derived_from_alpha() {
        assert_eq!(Blend::from_color(color_rgb(255, 0, 0)), Blend::Opaque);
        assert_eq!(Blend::from_color(color_rgba(255, 0, 0, 0xfe)), Blend::Alpha);
        assert_eq!(Blend::from_color(color_rgba(0, 0, 0, 0)), Blend::Alpha);
    }

    #[test]
    fn test_shape_kind_round_trip() {
        for bits in 0..ShapeKind::COUNT {
            let kind = ShapeKind::from_bits(bits).unwrap();
            assert_eq!(kind as u32, bits);
        }
    }

    #[test]
    fn test_shape_kind_sentinel() {
        assert_eq!(ShapeKind::from_bits(ShapeKind::COUNT), None);
        assert_eq!(ShapeKind::from_bits(0x1f), None);
    }

    #[test]
    fn test_data_quads_per_kind() {
        assert_eq!(ShapeKind::Sphere.data_quads(), 1);
        assert_eq!(ShapeKind::Line.data_quads(), 2);
        assert_eq!(ShapeKind::Aabb.data_quads(), 2);
        assert_eq!(ShapeKind::Triangle.data_quads(), 3);
        assert_eq!(ShapeKind::Obb.data_quads(), 3);
        assert_eq!(ShapeKind::Ellipsoid.data_quads(), 3);
        assert_eq!(ShapeKind::Cone.data_quads(), 3);
        assert_eq!(ShapeKind::Cylinder.data_quads(), 3);
    }

    #[test]
    fn test_color_packing() {
        assert_eq!(color_rgba(0x11, 0x22, 0x33, 0x44), 0x4433_2211);
    }
}
