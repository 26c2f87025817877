//! Typed submission surface: one constructor per shape kind.
//!
//! Each method packs its parameters into the shape's quad run and calls
//! [`ShapeStore::reserve`]. All methods take `&self` and are safe to call
//! from any number of threads during the submission phase.
//!
//! Oriented shapes (obb, ellipsoid, cone, cylinder) take three axis vectors
//! and a centre. The axis vectors become the columns of the instance
//! transform; they do not need to be normalized or orthogonal. For cones
//! and cylinders the z axis spans the height while the x/y axes set the
//! radius. Handedness of the axes does not matter: the x axis sign is
//! flipped to match the sign of the scalar triple product (x cross y) dot z,
//! so mirrored caller frames still produce a consistently wound template.

use glam::{Vec3, Vec4};

use crate::shape::{Quad, ShapeKind, Style, ZMode};
use crate::store::ShapeStore;

/// Transpose axis columns + centre into 3x4 row-major transform rows.
fn transform_rows(x_axis: Vec3, y_axis: Vec3, z_axis: Vec3, centre: Vec3) -> [Quad; 3] {
    [
        Vec4::new(x_axis.x, y_axis.x, z_axis.x, centre.x),
        Vec4::new(x_axis.y, y_axis.y, z_axis.y, centre.y),
        Vec4::new(x_axis.z, y_axis.z, z_axis.z, centre.z),
    ]
}

impl ShapeStore {
    /// Draw a line segment. Lines are always wireframe.
    pub fn line(&self, zmode: ZMode, start: Vec3, end: Vec3, color: u32) {
        self.reserve(
            ShapeKind::Line,
            Style::Wire,
            zmode,
            color,
            &[start.extend(0.0), end.extend(0.0)],
        );
    }

    /// Draw a triangle. Filled triangles get a per-face normal at compile
    /// time; wire triangles become their three edges.
    pub fn triangle(
        &self,
        style: Style,
        zmode: ZMode,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        color: u32,
    ) {
        self.reserve(
            ShapeKind::Triangle,
            style,
            zmode,
            color,
            &[a.extend(0.0), b.extend(0.0), c.extend(0.0)],
        );
    }

    /// Draw an axis-aligned box from min/max corners.
    pub fn aabb(&self, style: Style, zmode: ZMode, min: Vec3, max: Vec3, color: u32) {
        self.reserve(
            ShapeKind::Aabb,
            style,
            zmode,
            color,
            &[min.extend(0.0), max.extend(0.0)],
        );
    }

    /// Draw an oriented box; the axis vectors are the box half-extents.
    pub fn obb(
        &self,
        style: Style,
        zmode: ZMode,
        x_axis: Vec3,
        y_axis: Vec3,
        z_axis: Vec3,
        centre: Vec3,
        color: u32,
    ) {
        self.oriented(ShapeKind::Obb, style, zmode, x_axis, y_axis, z_axis, centre, color);
    }

    /// Draw a sphere from centre and radius.
    pub fn sphere(&self, style: Style, zmode: ZMode, centre: Vec3, radius: f32, color: u32) {
        self.reserve(
            ShapeKind::Sphere,
            style,
            zmode,
            color,
            &[centre.extend(radius)],
        );
    }

    /// Draw an ellipsoid; the axis vectors are the semi-axes.
    pub fn ellipsoid(
        &self,
        style: Style,
        zmode: ZMode,
        x_axis: Vec3,
        y_axis: Vec3,
        z_axis: Vec3,
        centre: Vec3,
        color: u32,
    ) {
        self.oriented(
            ShapeKind::Ellipsoid,
            style,
            zmode,
            x_axis,
            y_axis,
            z_axis,
            centre,
            color,
        );
    }

    /// Draw a cone with its apex at `apex`, opening along the z axis. The
    /// z axis magnitude is the height, the x/y magnitudes the base radius.
    pub fn cone(
        &self,
        style: Style,
        zmode: ZMode,
        x_axis: Vec3,
        y_axis: Vec3,
        z_axis: Vec3,
        apex: Vec3,
        color: u32,
    ) {
        self.oriented(ShapeKind::Cone, style, zmode, x_axis, y_axis, z_axis, apex, color);
    }

    /// Draw a cylinder centred at `centre`, spanning one z axis length in
    /// each direction.
    pub fn cylinder(
        &self,
        style: Style,
        zmode: ZMode,
        x_axis: Vec3,
        y_axis: Vec3,
        z_axis: Vec3,
        centre: Vec3,
        color: u32,
    ) {
        self.oriented(
            ShapeKind::Cylinder,
            style,
            zmode,
            x_axis,
            y_axis,
            z_axis,
            centre,
            color,
        );
    }

    /// Draw a pyramidal frustum with its apex at `apex`, opening along the
    /// z axis, with half-extents given by the x/y axes at the far plane.
    ///
    /// Sugar over triangles and lines, not a stored shape kind: filled
    /// emits four side triangles plus two for the far quad, wire emits the
    /// eight edges.
    pub fn frustum(
        &self,
        style: Style,
        zmode: ZMode,
        x_axis: Vec3,
        y_axis: Vec3,
        z_axis: Vec3,
        apex: Vec3,
        color: u32,
    ) {
        let far_centre = apex + z_axis;

        let parity = x_axis.cross(y_axis).dot(z_axis);
        let h_vec = if parity < 0.0 { -x_axis } else { x_axis };

        let edge0 = far_centre - h_vec;
        let edge1 = far_centre + h_vec;

        let corner0 = edge0 - y_axis;
        let corner1 = edge1 - y_axis;
        let corner2 = edge0 + y_axis;
        let corner3 = edge1 + y_axis;

        if style == Style::Filled {
            self.triangle(Style::Filled, zmode, corner0, apex, corner1, color);
            self.triangle(Style::Filled, zmode, corner1, apex, corner3, color);
            self.triangle(Style::Filled, zmode, corner3, apex, corner2, color);
            self.triangle(Style::Filled, zmode, corner2, apex, corner0, color);
            self.triangle(Style::Filled, zmode, corner0, corner1, corner3, color);
            self.triangle(Style::Filled, zmode, corner3, corner2, corner0, color);
        } else {
            self.line(zmode, apex, corner0, color);
            self.line(zmode, apex, corner1, color);
            self.line(zmode, apex, corner2, color);
            self.line(zmode, apex, corner3, color);
            self.line(zmode, corner0, corner1, color);
            self.line(zmode, corner2, corner3, color);
            self.line(zmode, corner0, corner2, color);
            self.line(zmode, corner1, corner3, color);
        }
    }

    /// Shared path for the transform-encoded kinds: normalize chirality,
    /// transpose, reserve.
    #[allow(clippy::too_many_arguments)]
    fn oriented(
        &self,
        kind: ShapeKind,
        style: Style,
        zmode: ZMode,
        x_axis: Vec3,
        y_axis: Vec3,
        z_axis: Vec3,
        centre: Vec3,
        color: u32,
    ) {
        let parity = x_axis.cross(y_axis).dot(z_axis);
        let x_axis = if parity < 0.0 { -x_axis } else { x_axis };
        self.reserve(
            kind,
            style,
            zmode,
            color,
            &transform_rows(x_axis, y_axis, z_axis, centre),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::color_rgb;

    #[test]
    fn test_line_is_always_wire() {
        let store = ShapeStore::new(8, 32);
        store.line(ZMode::Test, Vec3::ZERO, Vec3::ONE, color_rgb(255, 0, 0));
        let header = store.committed_headers()[0];
        assert_eq!(header.style(), Style::Wire);
        assert_eq!(header.kind(), Some(ShapeKind::Line));
    }

    #[test]
    fn test_obb_rows_are_transposed_axes() {
        let store = ShapeStore::new(8, 32);
        store.obb(
            Style::Filled,
            ZMode::Test,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(5.0, 6.0, 7.0),
            color_rgb(255, 255, 255),
        );
        let pool = store.quad_pool();
        assert_eq!(pool[0], Vec4::new(2.0, 0.0, 0.0, 5.0));
        assert_eq!(pool[1], Vec4::new(0.0, 3.0, 0.0, 6.0));
        assert_eq!(pool[2], Vec4::new(0.0, 0.0, 4.0, 7.0));
    }

    #[test]
    fn test_left_handed_axes_get_chirality_flip() {
        let store = ShapeStore::new(8, 32);
        // (x cross y) dot z < 0: the x axis must come out negated.
        store.obb(
            Style::Filled,
            ZMode::Test,
            Vec3::X,
            Vec3::Y,
            -Vec3::Z,
            Vec3::ZERO,
            color_rgb(1, 2, 3),
        );
        let pool = store.quad_pool();
        assert_eq!(pool[0].x, -1.0);
        assert_eq!(pool[2].z, -1.0);
    }

    #[test]
    fn test_filled_frustum_is_six_triangles() {
        let store = ShapeStore::new(16, 64);
        store.frustum(
            Style::Filled,
            ZMode::Test,
            Vec3::X,
            Vec3::Y,
            Vec3::Z * 2.0,
            Vec3::ZERO,
            color_rgb(9, 9, 9),
        );
        assert_eq!(store.shape_count(), 6);
        for header in store.committed_headers() {
            assert_eq!(header.kind(), Some(ShapeKind::Triangle));
            assert_eq!(header.style(), Style::Filled);
        }
    }

    #[test]
    fn test_wire_frustum_is_eight_lines() {
        let store = ShapeStore::new(16, 64);
        store.frustum(
            Style::Wire,
            ZMode::NoTest,
            Vec3::X,
            Vec3::Y,
            Vec3::Z * 2.0,
            Vec3::ZERO,
            color_rgb(9, 9, 9),
        );
        assert_eq!(store.shape_count(), 8);
        for header in store.committed_headers() {
            assert_eq!(header.kind(), Some(ShapeKind::Line));
        }
    }
}
