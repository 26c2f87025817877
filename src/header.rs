//! Packed per-shape header and render-state bucket classification.
//!
//! Every committed shape is described by an 8-byte [`ShapeHeader`]. The low
//! 8 bits of the packed word classify the shape by render state — they *are*
//! the bucket index used for batching — so grouping shapes that can be drawn
//! with identical GPU state is a single mask away.

use crate::shape::{Blend, ShapeKind, Style, ZMode};

/// Total bucket count: shape kind (5 bits) x style x depth mode x blend.
pub const BUCKET_COUNT: usize = (ShapeKind::COUNT as usize) << 3;

const STYLE_SHIFT: u32 = 0;
const ZMODE_SHIFT: u32 = 1;
const BLEND_SHIFT: u32 = 2;
const KIND_SHIFT: u32 = 3;
const OFFSET_SHIFT: u32 = 8;

const KIND_MASK: u32 = 0x1f;
const OFFSET_MASK: u32 = 0x00ff_ffff;

/// Largest data-pool offset a header can address (24-bit field).
pub(crate) const MAX_QUAD_OFFSET: u32 = OFFSET_MASK;

/// Fixed-size per-shape record.
///
/// Bit layout of `bits`, LSB first: style (1), depth mode (1), blend (1),
/// shape kind (5), data-pool quad offset (24). A kind field outside
/// [`ShapeKind`]'s range is the invalid sentinel written on data-pool
/// overflow; such headers consume their slot but are skipped by the
/// compiler.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShapeHeader {
    bits: u32,
    /// Packed `0xAABBGGRR` color.
    pub color: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<ShapeHeader>(), 8);

impl ShapeHeader {
    /// Pack a header. `kind_bits` may be [`ShapeKind::COUNT`] to mark the
    /// invalid sentinel; the blend mode is derived from `color`.
    pub(crate) fn new(
        kind_bits: u32,
        style: Style,
        zmode: ZMode,
        color: u32,
        quad_offset: u32,
    ) -> Self {
        debug_assert!(kind_bits <= KIND_MASK);
        debug_assert!(quad_offset <= OFFSET_MASK);
        let blend = Blend::from_color(color);
        let bits = (style as u32) << STYLE_SHIFT
            | (zmode as u32) << ZMODE_SHIFT
            | (blend as u32) << BLEND_SHIFT
            | (kind_bits & KIND_MASK) << KIND_SHIFT
            | (quad_offset & OFFSET_MASK) << OFFSET_SHIFT;
        Self { bits, color }
    }

    /// Reconstruct a representative header from a bucket index.
    ///
    /// Used by the compiler's count phase to recover the render state of a
    /// bucket without touching any shape data. Offset and color are zero.
    pub(crate) fn from_bucket_index(bucket: usize) -> Self {
        debug_assert!(bucket < BUCKET_COUNT);
        Self {
            bits: bucket as u32,
            color: 0,
        }
    }

    pub fn style(&self) -> Style {
        Style::from_bits(self.bits >> STYLE_SHIFT & 1)
    }

    pub fn zmode(&self) -> ZMode {
        ZMode::from_bits(self.bits >> ZMODE_SHIFT & 1)
    }

    pub fn blend(&self) -> Blend {
        Blend::from_bits(self.bits >> BLEND_SHIFT & 1)
    }

    /// Decoded shape kind, or `None` for the invalid sentinel.
    pub fn kind(&self) -> Option<ShapeKind> {
        ShapeKind::from_bits(self.bits >> KIND_SHIFT & KIND_MASK)
    }

    /// Offset of this shape's quad run in the store's data pool.
    pub fn quad_offset(&self) -> u32 {
        self.bits >> OFFSET_SHIFT & OFFSET_MASK
    }

    /// Render-state bucket of this shape (low 8 bits of the packed word).
    ///
    /// Total, deterministic and order-independent: identical
    /// {style, depth mode, derived blend, kind} always map to the same
    /// bucket. Sentinel headers yield an out-of-range kind field and must
    /// be filtered through [`ShapeHeader::kind`] first.
    pub fn bucket_index(&self) -> usize {
        (self.bits & 0xff) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{color_rgb, color_rgba};
    use rstest::rstest;

    #[test]
    fn test_header_fields_round_trip() {
        let header = ShapeHeader::new(
            ShapeKind::Cone as u32,
            Style::Wire,
            ZMode::NoTest,
            color_rgba(1, 2, 3, 4),
            1234,
        );
        assert_eq!(header.style(), Style::Wire);
        assert_eq!(header.zmode(), ZMode::NoTest);
        assert_eq!(header.blend(), Blend::Alpha);
        assert_eq!(header.kind(), Some(ShapeKind::Cone));
        assert_eq!(header.quad_offset(), 1234);
    }

    #[test]
    fn test_sentinel_header_has_no_kind() {
        let header = ShapeHeader::new(
            ShapeKind::COUNT,
            Style::Filled,
            ZMode::Test,
            color_rgb(255, 255, 255),
            0,
        );
        assert_eq!(header.kind(), None);
    }

    #[rstest]
    #[case(ShapeKind::Line, Style::Wire, ZMode::Test)]
    #[case(ShapeKind::Triangle, Style::Filled, ZMode::NoTest)]
    #[case(ShapeKind::Sphere, Style::Filled, ZMode::Test)]
    #[case(ShapeKind::Cylinder, Style::Wire, ZMode::NoTest)]
    fn test_bucket_independent_of_offset_and_order(
        #[case] kind: ShapeKind,
        #[case] style: Style,
        #[case] zmode: ZMode,
    ) {
        let color = color_rgb(10, 20, 30);
        let a = ShapeHeader::new(kind as u32, style, zmode, color, 0);
        let b = ShapeHeader::new(kind as u32, style, zmode, color, 4321);
        assert_eq!(a.bucket_index(), b.bucket_index());
        assert!(a.bucket_index() < BUCKET_COUNT);
    }

    #[test]
    fn test_bucket_distinguishes_render_state() {
        let opaque = color_rgb(0, 0, 0);
        let base = ShapeHeader::new(ShapeKind::Aabb as u32, Style::Filled, ZMode::Test, opaque, 0);
        let wire = ShapeHeader::new(ShapeKind::Aabb as u32, Style::Wire, ZMode::Test, opaque, 0);
        let no_test =
            ShapeHeader::new(ShapeKind::Aabb as u32, Style::Filled, ZMode::NoTest, opaque, 0);
        let alpha = ShapeHeader::new(
            ShapeKind::Aabb as u32,
            Style::Filled,
            ZMode::Test,
            color_rgba(0, 0, 0, 128),
            0,
        );
        let buckets = [
            base.bucket_index(),
            wire.bucket_index(),
            no_test.bucket_index(),
            alpha.bucket_index(),
        ];
        for (i, a) in buckets.iter().enumerate() {
            for b in &buckets[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_bucket_round_trip() {
        let header = ShapeHeader::new(
            ShapeKind::Ellipsoid as u32,
            Style::Wire,
            ZMode::Test,
            color_rgba(9, 9, 9, 9),
            777,
        );
        let representative = ShapeHeader::from_bucket_index(header.bucket_index());
        assert_eq!(representative.style(), header.style());
        assert_eq!(representative.zmode(), header.zmode());
        assert_eq!(representative.blend(), header.blend());
        assert_eq!(representative.kind(), header.kind());
    }
}
