//! Renderer-facing output records produced by the batch compiler.
//!
//! All records are `#[repr(C)]` and `bytemuck::Pod`, so a backend can write
//! compiled output straight into mapped GPU memory via
//! `bytemuck::cast_slice_mut`.

/// Per-instance 3x4 row-major affine transform for template-mesh shapes.
///
/// `rows[i]` holds `[x_axis[i], y_axis[i], z_axis[i], centre[i]]`: the
/// shape's axis vectors are the columns of the linear part and the centre is
/// the translation column. Applied to the unit template mesh of the shape's
/// kind.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransform {
    pub rows: [[f32; 4]; 3],
}

/// Vertex of the filled triangle-soup stream.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilledVertex {
    pub position: [f32; 3],
    /// Packed `0xAABBGGRR` color.
    pub color: u32,
    pub normal: [f32; 3],
    pub _pad: u32,
}

/// Vertex of the wireframe line-soup stream.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireVertex {
    pub position: [f32; 3],
    /// Packed `0xAABBGGRR` color.
    pub color: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<InstanceTransform>(), 48);
static_assertions::const_assert_eq!(std::mem::size_of::<FilledVertex>(), 32);
static_assertions::const_assert_eq!(std::mem::size_of::<WireVertex>(), 16);
