//! Unit-shape template meshes for the instance stream.
//!
//! Instanced shapes (boxes, spheres, cones, cylinders) are drawn as a shared
//! template mesh deformed by a per-instance transform, so the templates must
//! preserve the unit-shape conventions exactly:
//!
//! - box: spans -1..1 on every axis;
//! - sphere: unit radius, centred at the origin (cube-projected
//!   tessellation, so wireframes form clean grids);
//! - cone: apex at the origin, unit-radius base in the z = 1 plane;
//! - cylinder: unit radius, spanning z = -1..1.
//!
//! Built once at startup, uploaded once; nothing here touches the
//! concurrent core. Each style's four templates are concatenated into one
//! vertex and one index array with per-mesh ranges, so a backend binds a
//! single vertex/index buffer pair per style.

use glam::Vec3;

use crate::batch::Mesh;

const SPHERE_SUB: usize = 6;
const SEGMENTS: usize = 18;

/// Vertex of a filled template mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilledMeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Vertex of a wire template mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireMeshVertex {
    pub position: [f32; 3],
}

static_assertions::const_assert_eq!(std::mem::size_of::<FilledMeshVertex>(), 24);
static_assertions::const_assert_eq!(std::mem::size_of::<WireMeshVertex>(), 12);

/// Location of one template inside a [`MeshSet`]'s shared arrays.
#[derive(Copy, Clone, Debug, Default)]
pub struct MeshRange {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

/// All four templates of one style, concatenated.
///
/// Indices are 16-bit and already rebased onto the shared vertex array, so
/// a batch for mesh `m` draws `ranges[m as usize].index_count` indices
/// starting at `ranges[m as usize].index_offset` with no base-vertex offset.
pub struct MeshSet<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u16>,
    pub ranges: [MeshRange; Mesh::COUNT as usize],
}

impl<V> MeshSet<V> {
    pub fn range(&self, mesh: Mesh) -> MeshRange {
        self.ranges[mesh as usize]
    }
}

/// Build the filled (triangle-list) templates.
pub fn build_filled_meshes() -> MeshSet<FilledMeshVertex> {
    build(&[
        write_filled_box,
        write_filled_sphere,
        write_filled_cone,
        write_filled_cylinder,
    ])
}

/// Build the wire (line-list) templates.
pub fn build_wire_meshes() -> MeshSet<WireMeshVertex> {
    build(&[
        write_wire_box,
        write_wire_sphere,
        write_wire_cone,
        write_wire_cylinder,
    ])
}

fn build<V>(writers: &[fn(&mut Vec<V>, &mut Vec<u16>); Mesh::COUNT as usize]) -> MeshSet<V> {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut ranges = [MeshRange::default(); Mesh::COUNT as usize];
    for (range, writer) in ranges.iter_mut().zip(writers) {
        let vertex_offset = vertices.len() as u32;
        let index_offset = indices.len() as u32;
        writer(&mut vertices, &mut indices);
        *range = MeshRange {
            vertex_offset,
            vertex_count: vertices.len() as u32 - vertex_offset,
            index_offset,
            index_count: indices.len() as u32 - index_offset,
        };
    }
    debug_assert!(vertices.len() <= u16::MAX as usize + 1);
    MeshSet {
        vertices,
        indices,
        ranges,
    }
}

/// Tangent frame of cube face `face` (0..6): normal along axis `face / 2`,
/// sign from the low bit, tangent along the next axis.
fn face_basis(face: usize) -> (Vec3, Vec3, Vec3) {
    let mut n = [0.0f32; 3];
    let mut t = [0.0f32; 3];
    n[face / 2] = if face & 1 != 0 { 1.0 } else { -1.0 };
    t[(1 + face / 2) % 3] = 1.0;
    let normal = Vec3::from(n);
    let tangent = Vec3::from(t);
    let bitangent = normal.cross(tangent);
    (normal, tangent, bitangent)
}

fn write_filled_box(vertices: &mut Vec<FilledMeshVertex>, indices: &mut Vec<u16>) {
    for face in 0..6 {
        let (normal, tangent, bitangent) = face_basis(face);
        let base = vertices.len() as u16;
        for corner in [
            normal - tangent - bitangent,
            normal + tangent - bitangent,
            normal - tangent + bitangent,
            normal + tangent + bitangent,
        ] {
            vertices.push(FilledMeshVertex {
                position: corner.to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend([0, 1, 2, 3, 2, 1].map(|i| base + i));
    }
}

fn write_filled_sphere(vertices: &mut Vec<FilledMeshVertex>, indices: &mut Vec<u16>) {
    let stride = (SPHERE_SUB + 1) as u16;
    for face in 0..6 {
        let (normal, tangent, bitangent) = face_basis(face);
        let base = vertices.len() as u16;
        for y in 0..=SPHERE_SUB {
            for x in 0..=SPHERE_SUB {
                let tx = 2.0 * x as f32 / SPHERE_SUB as f32 - 1.0;
                let ty = 2.0 * y as f32 / SPHERE_SUB as f32 - 1.0;
                let dir = (normal + tangent * tx + bitangent * ty).normalize();
                vertices.push(FilledMeshVertex {
                    position: dir.to_array(),
                    normal: dir.to_array(),
                });
            }
        }
        for y in 0..SPHERE_SUB as u16 {
            for x in 0..SPHERE_SUB as u16 {
                let i0 = base + y * stride + x;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                indices.extend([i0, i1, i2, i3, i2, i1]);
            }
        }
    }
}

fn ring_point(i: usize) -> (f32, f32) {
    let phi = std::f32::consts::TAU * i as f32 / SEGMENTS as f32;
    (phi.cos(), phi.sin())
}

fn write_filled_cone(vertices: &mut Vec<FilledMeshVertex>, indices: &mut Vec<u16>) {
    let base = vertices.len() as u16;
    let sqrt_half = (0.5f32).sqrt();

    // Side: rim/apex vertex pairs sharing the segment's slanted normal.
    for i in 0..SEGMENTS {
        let (cos, sin) = ring_point(i);
        let normal = [cos * sqrt_half, sin * sqrt_half, -sqrt_half];
        vertices.push(FilledMeshVertex {
            position: [cos, sin, 1.0],
            normal,
        });
        vertices.push(FilledMeshVertex {
            position: [0.0, 0.0, 0.0],
            normal,
        });
    }
    for i in 0..SEGMENTS as u16 {
        let i0 = base + 2 * i;
        let i1 = i0 + 1;
        let i2 = base + 2 * ((i + 1) % SEGMENTS as u16);
        let i3 = i2 + 1;
        indices.extend([i0, i1, i2, i3, i2, i1]);
    }

    // End cap at z = 1.
    let cap = vertices.len() as u16;
    for i in 0..SEGMENTS {
        let (cos, sin) = ring_point(i);
        vertices.push(FilledMeshVertex {
            position: [cos, sin, 1.0],
            normal: [0.0, 0.0, 1.0],
        });
    }
    vertices.push(FilledMeshVertex {
        position: [0.0, 0.0, 1.0],
        normal: [0.0, 0.0, 1.0],
    });
    let centre = cap + SEGMENTS as u16;
    for i in 0..SEGMENTS as u16 {
        indices.extend([cap + i, cap + (i + 1) % SEGMENTS as u16, centre]);
    }
}

fn write_filled_cylinder(vertices: &mut Vec<FilledMeshVertex>, indices: &mut Vec<u16>) {
    let base = vertices.len() as u16;

    // Side: bottom/top vertex pairs with radial normals.
    for i in 0..SEGMENTS {
        let (cos, sin) = ring_point(i);
        let normal = [cos, sin, 0.0];
        vertices.push(FilledMeshVertex {
            position: [cos, sin, -1.0],
            normal,
        });
        vertices.push(FilledMeshVertex {
            position: [cos, sin, 1.0],
            normal,
        });
    }
    for i in 0..SEGMENTS as u16 {
        let i0 = base + 2 * i;
        let i1 = i0 + 1;
        let i2 = base + 2 * ((i + 1) % SEGMENTS as u16);
        let i3 = i2 + 1;
        indices.extend([i0, i2, i1, i1, i2, i3]);
    }

    // End caps, wound to face outward.
    for k in 0..2 {
        let nz = if k != 0 { 1.0 } else { -1.0 };
        let cap = vertices.len() as u16;
        for i in 0..SEGMENTS {
            let (cos, sin) = ring_point(i);
            vertices.push(FilledMeshVertex {
                position: [cos, sin, nz],
                normal: [0.0, 0.0, nz],
            });
        }
        vertices.push(FilledMeshVertex {
            position: [0.0, 0.0, nz],
            normal: [0.0, 0.0, nz],
        });
        let centre = cap + SEGMENTS as u16;
        for i in 0..SEGMENTS as u16 {
            let i0 = cap + i;
            let i1 = cap + (i + 1) % SEGMENTS as u16;
            if k != 0 {
                indices.extend([i0, i1, centre]);
            } else {
                indices.extend([i1, i0, centre]);
            }
        }
    }
}

fn write_wire_box(vertices: &mut Vec<WireMeshVertex>, indices: &mut Vec<u16>) {
    let base = vertices.len() as u16;
    for i in 0..8u16 {
        vertices.push(WireMeshVertex {
            position: [
                if i & 1 != 0 { 1.0 } else { -1.0 },
                if i & 2 != 0 { 1.0 } else { -1.0 },
                if i & 4 != 0 { 1.0 } else { -1.0 },
            ],
        });
    }
    const EDGES: [u16; 24] = [
        0, 1, 2, 3, 4, 5, 6, 7, // along x
        0, 2, 1, 3, 4, 6, 5, 7, // along y
        0, 4, 1, 5, 2, 6, 3, 7, // along z
    ];
    indices.extend(EDGES.map(|i| base + i));
}

fn write_wire_sphere(vertices: &mut Vec<WireMeshVertex>, indices: &mut Vec<u16>) {
    let stride = (SPHERE_SUB + 1) as u16;
    for face in 0..6 {
        let (normal, tangent, bitangent) = face_basis(face);
        let base = vertices.len() as u16;
        for y in 0..=SPHERE_SUB {
            for x in 0..=SPHERE_SUB {
                let tx = 2.0 * x as f32 / SPHERE_SUB as f32 - 1.0;
                let ty = 2.0 * y as f32 / SPHERE_SUB as f32 - 1.0;
                let dir = (normal + tangent * tx + bitangent * ty).normalize();
                vertices.push(WireMeshVertex {
                    position: dir.to_array(),
                });
            }
        }
        for y in 0..=SPHERE_SUB as u16 {
            for x in 0..=SPHERE_SUB as u16 {
                let i0 = base + y * stride + x;
                if x < SPHERE_SUB as u16 {
                    indices.extend([i0, i0 + 1]);
                }
                if y < SPHERE_SUB as u16 {
                    indices.extend([i0, i0 + stride]);
                }
            }
        }
    }
}

fn write_wire_cone(vertices: &mut Vec<WireMeshVertex>, indices: &mut Vec<u16>) {
    let base = vertices.len() as u16;
    for i in 0..SEGMENTS {
        let (cos, sin) = ring_point(i);
        vertices.push(WireMeshVertex {
            position: [cos, sin, 1.0],
        });
    }
    vertices.push(WireMeshVertex {
        position: [0.0, 0.0, 0.0],
    });
    let apex = base + SEGMENTS as u16;
    for i in 0..SEGMENTS as u16 {
        let i0 = base + i;
        let i1 = base + (i + 1) % SEGMENTS as u16;
        indices.extend([i0, i1, i0, apex]);
    }
}

fn write_wire_cylinder(vertices: &mut Vec<WireMeshVertex>, indices: &mut Vec<u16>) {
    let base = vertices.len() as u16;
    for i in 0..SEGMENTS {
        let (cos, sin) = ring_point(i);
        vertices.push(WireMeshVertex {
            position: [cos, sin, -1.0],
        });
        vertices.push(WireMeshVertex {
            position: [cos, sin, 1.0],
        });
    }
    for i in 0..SEGMENTS as u16 {
        let i0 = base + 2 * i;
        let i1 = i0 + 1;
        let i2 = base + 2 * ((i + 1) % SEGMENTS as u16);
        let i3 = i2 + 1;
        indices.extend([i0, i2, i0, i1, i1, i3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_mesh_counts() {
        let set = build_filled_meshes();
        let expect = [
            (Mesh::Box, 24, 36),
            (Mesh::Sphere, 294, 1296),
            (Mesh::Cone, 55, 162),
            (Mesh::Cylinder, 74, 216),
        ];
        for (mesh, vertex_count, index_count) in expect {
            let range = set.range(mesh);
            assert_eq!(range.vertex_count, vertex_count, "{mesh:?} vertices");
            assert_eq!(range.index_count, index_count, "{mesh:?} indices");
        }
        assert_eq!(set.vertices.len(), 24 + 294 + 55 + 74);
        assert_eq!(set.indices.len(), 36 + 1296 + 162 + 216);
    }

    #[test]
    fn test_wire_mesh_counts() {
        let set = build_wire_meshes();
        let expect = [
            (Mesh::Box, 8, 24),
            (Mesh::Sphere, 294, 1008),
            (Mesh::Cone, 19, 72),
            (Mesh::Cylinder, 36, 108),
        ];
        for (mesh, vertex_count, index_count) in expect {
            let range = set.range(mesh);
            assert_eq!(range.vertex_count, vertex_count, "{mesh:?} vertices");
            assert_eq!(range.index_count, index_count, "{mesh:?} indices");
        }
    }

    fn assert_ranges_self_contained<V>(set: &MeshSet<V>) {
        for mesh in Mesh::ALL {
            let range = set.range(mesh);
            let indices = &set.indices
                [range.index_offset as usize..(range.index_offset + range.index_count) as usize];
            for &index in indices {
                assert!(u32::from(index) >= range.vertex_offset);
                assert!(u32::from(index) < range.vertex_offset + range.vertex_count);
            }
        }
    }

    #[test]
    fn test_indices_stay_inside_their_template() {
        assert_ranges_self_contained(&build_filled_meshes());
        assert_ranges_self_contained(&build_wire_meshes());
    }

    #[test]
    fn test_sphere_vertices_are_unit_length() {
        let set = build_filled_meshes();
        let range = set.range(Mesh::Sphere);
        for vertex in &set.vertices
            [range.vertex_offset as usize..(range.vertex_offset + range.vertex_count) as usize]
        {
            let len = Vec3::from(vertex.position).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_box_spans_unit_cube() {
        let set = build_filled_meshes();
        let range = set.range(Mesh::Box);
        for vertex in &set.vertices
            [range.vertex_offset as usize..(range.vertex_offset + range.vertex_count) as usize]
        {
            for c in vertex.position {
                assert!(c == 1.0 || c == -1.0);
            }
        }
    }

    #[test]
    fn test_cone_apex_at_origin_base_at_unit_z() {
        let set = build_wire_meshes();
        let range = set.range(Mesh::Cone);
        let vertices = &set.vertices
            [range.vertex_offset as usize..(range.vertex_offset + range.vertex_count) as usize];
        assert_eq!(vertices.last().unwrap().position, [0.0, 0.0, 0.0]);
        for vertex in &vertices[..vertices.len() - 1] {
            assert_eq!(vertex.position[2], 1.0);
        }
    }
}
