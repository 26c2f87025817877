//! Batch compiler: turns quiesced shape stores into render-ready buffers.
//!
//! Shapes reach the renderer through one of three streams:
//!
//! - **instance stream** — template-mesh shapes (boxes, spheres, cones,
//!   cylinders) as a 3x4 transform plus packed color per shape;
//! - **filled-vertex stream** — triangle soup with per-face normals;
//! - **wire-vertex stream** — line soup.
//!
//! Within each stream, shapes are grouped into contiguous regions by render
//! state so a backend can iterate {depth mode x blend x style}, switch GPU
//! state once per combination, and issue one draw per non-empty
//! [`DrawBatch`]. Instanced batches are additionally keyed by template mesh.
//!
//! Compilation is a three-phase, single-reader pass over one or more
//! stores:
//!
//! 1. **Count** — accumulate expected output sizes per batch from the
//!    stores' bucket histograms, O(buckets).
//! 2. **Partition** — assign each batch a contiguous output region in fixed
//!    ascending batch order, clamping to the remaining buffer capacity;
//!    once a buffer is exhausted, later batches get zero-sized regions.
//! 3. **Write** — re-walk every header in submission order, re-derive its
//!    batch, and append at that batch's cursor, O(shapes).
//!
//! The caller must guarantee no producer is active on any store (see the
//! store module's frame protocol).

use glam::Vec4;

use crate::header::{ShapeHeader, BUCKET_COUNT};
use crate::shape::{Blend, Quad, ShapeKind, Style, ZMode};
use crate::store::ShapeStore;
use crate::vertex::{FilledVertex, InstanceTransform, WireVertex};

/// Template meshes shared by all instanced shapes of a kind.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mesh {
    Box = 0,
    Sphere = 1,
    Cone = 2,
    Cylinder = 3,
}

impl Mesh {
    pub const COUNT: u32 = 4;

    pub const ALL: [Mesh; 4] = [Mesh::Box, Mesh::Sphere, Mesh::Cone, Mesh::Cylinder];
}

/// Template mesh used by each shape kind; `None` for raw-geometry kinds.
pub const MESH_FROM_KIND: [Option<Mesh>; ShapeKind::COUNT as usize] = [
    None,                 // Line
    None,                 // Triangle
    Some(Mesh::Box),      // Aabb
    Some(Mesh::Box),      // Obb
    Some(Mesh::Sphere),   // Sphere
    Some(Mesh::Sphere),   // Ellipsoid
    Some(Mesh::Cone),     // Cone
    Some(Mesh::Cylinder), // Cylinder
];

/// Instanced batches: mesh (2 bits) x style x blend x depth mode.
pub const INSTANCE_BATCH_COUNT: usize = (Mesh::COUNT as usize) << 3;
/// Raw-geometry batches: blend x depth mode. Style picks the stream
/// (filled vs wire), so it needs no key bit.
pub const RAW_BATCH_COUNT: usize = 4;

/// Key of an instanced batch within the instance stream.
#[inline]
pub fn instance_batch_index(mesh: Mesh, style: Style, blend: Blend, zmode: ZMode) -> usize {
    (mesh as usize) << 3 | (style as usize) << 2 | (blend as usize) << 1 | zmode as usize
}

/// Key of a raw-geometry batch within the filled or wire stream.
#[inline]
pub fn raw_batch_index(blend: Blend, zmode: ZMode) -> usize {
    (blend as usize) << 1 | zmode as usize
}

/// How an instanced shape's quad run encodes its transform.
#[derive(Copy, Clone, Debug)]
enum InstanceForm {
    /// Two quads: min and max corners (axis-aligned box).
    Extents,
    /// Three quads: transposed 3x4 transform rows, as submitted.
    Transform,
    /// One quad: centre with radius in the fourth lane.
    CentreRadius,
}

/// Per-kind representation: exactly one of instanced or raw geometry.
struct EmitDesc {
    instance: Option<(Mesh, InstanceForm)>,
    /// Output vertices per shape in the filled stream (raw kinds only).
    filled_vertices: u32,
    /// Output vertices per shape in the wire stream (raw kinds only).
    wire_vertices: u32,
}

const EMIT_FROM_KIND: [EmitDesc; ShapeKind::COUNT as usize] = [
    // Line
    EmitDesc {
        instance: None,
        filled_vertices: 0,
        wire_vertices: 2,
    },
    // Triangle: 3 filled vertices or 3 edges as 6 wire vertices
    EmitDesc {
        instance: None,
        filled_vertices: 3,
        wire_vertices: 6,
    },
    // Aabb
    EmitDesc {
        instance: Some((Mesh::Box, InstanceForm::Extents)),
        filled_vertices: 0,
        wire_vertices: 0,
    },
    // Obb
    EmitDesc {
        instance: Some((Mesh::Box, InstanceForm::Transform)),
        filled_vertices: 0,
        wire_vertices: 0,
    },
    // Sphere
    EmitDesc {
        instance: Some((Mesh::Sphere, InstanceForm::CentreRadius)),
        filled_vertices: 0,
        wire_vertices: 0,
    },
    // Ellipsoid
    EmitDesc {
        instance: Some((Mesh::Sphere, InstanceForm::Transform)),
        filled_vertices: 0,
        wire_vertices: 0,
    },
    // Cone
    EmitDesc {
        instance: Some((Mesh::Cone, InstanceForm::Transform)),
        filled_vertices: 0,
        wire_vertices: 0,
    },
    // Cylinder
    EmitDesc {
        instance: Some((Mesh::Cylinder, InstanceForm::Transform)),
        filled_vertices: 0,
        wire_vertices: 0,
    },
];

/// An `{offset, count}` region of one compiled output stream, one GPU draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawBatch {
    pub offset: u32,
    pub count: u32,
}

/// Caller-provided output buffers, typically mapped GPU memory.
///
/// The instance stream is split into a transform buffer and a parallel
/// color buffer; its capacity is the shorter of the two.
pub struct OutputBuffers<'a> {
    pub instance_transforms: &'a mut [InstanceTransform],
    pub instance_colors: &'a mut [u32],
    pub filled_vertices: &'a mut [FilledVertex],
    pub wire_vertices: &'a mut [WireVertex],
}

/// Draw descriptors and realized totals for one compilation.
#[derive(Clone, Debug)]
pub struct CompiledBatches {
    /// Indexed by [`instance_batch_index`].
    pub instance_batches: [DrawBatch; INSTANCE_BATCH_COUNT],
    /// Indexed by [`raw_batch_index`].
    pub filled_batches: [DrawBatch; RAW_BATCH_COUNT],
    /// Indexed by [`raw_batch_index`].
    pub wire_batches: [DrawBatch; RAW_BATCH_COUNT],
    /// Instances written (upper bound of every instance batch region).
    pub instance_count: u32,
    /// Filled-stream vertices reserved (upper bound of every filled batch
    /// region); whole-shape truncation can leave a tail of it unwritten.
    pub filled_vertex_count: u32,
    /// Wire-stream vertices reserved (upper bound of every wire batch
    /// region); whole-shape truncation can leave a tail of it unwritten.
    pub wire_vertex_count: u32,
}

#[derive(Copy, Clone, Default)]
struct Cursor {
    begin: u32,
    current: u32,
    end: u32,
}

impl Cursor {
    /// Claim `n` output slots, or `None` if the region is exhausted.
    fn claim(&mut self, n: u32) -> Option<usize> {
        if self.current + n > self.end {
            return None;
        }
        let at = self.current as usize;
        self.current += n;
        Some(at)
    }

    fn batch(&self) -> DrawBatch {
        DrawBatch {
            offset: self.begin,
            count: self.current - self.begin,
        }
    }
}

/// Assign each batch a contiguous region in ascending batch order, clamped
/// to `capacity`. Returns the cursors and the realized total.
fn partition<const N: usize>(counts: &[u32; N], capacity: u32) -> ([Cursor; N], u32) {
    let mut cursors = [Cursor::default(); N];
    let mut end = 0u32;
    for (cursor, &count) in cursors.iter_mut().zip(counts) {
        let begin = end;
        end = (end.saturating_add(count)).min(capacity);
        *cursor = Cursor {
            begin,
            current: begin,
            end,
        };
    }
    (cursors, end)
}

/// Compile one or more quiesced stores into `out`.
///
/// Single-reader: the caller must guarantee no producer is active on any
/// of the stores. Output that does not fit is truncated batch by batch;
/// everything that is written is complete (no partial shapes).
pub fn compile_stores(stores: &[&ShapeStore], out: &mut OutputBuffers<'_>) -> CompiledBatches {
    // Phase 1: expected output sizes per batch, from the bucket histograms.
    let mut instance_counts = [0u32; INSTANCE_BATCH_COUNT];
    let mut filled_counts = [0u32; RAW_BATCH_COUNT];
    let mut wire_counts = [0u32; RAW_BATCH_COUNT];

    for store in stores {
        for bucket in 0..BUCKET_COUNT {
            let size = store.bucket_size(bucket);
            if size == 0 {
                continue;
            }
            let header = ShapeHeader::from_bucket_index(bucket);
            let Some(kind) = header.kind() else {
                continue;
            };
            let desc = &EMIT_FROM_KIND[kind as usize];

            if let Some((mesh, _)) = desc.instance {
                let index =
                    instance_batch_index(mesh, header.style(), header.blend(), header.zmode());
                instance_counts[index] += size;
            }
            if desc.filled_vertices > 0 && header.style() == Style::Filled {
                let index = raw_batch_index(header.blend(), header.zmode());
                filled_counts[index] += size * desc.filled_vertices;
            }
            if desc.wire_vertices > 0 && header.style() == Style::Wire {
                let index = raw_batch_index(header.blend(), header.zmode());
                wire_counts[index] += size * desc.wire_vertices;
            }
        }
    }

    // Phase 2: partition the output buffers between batches.
    let instance_capacity = out.instance_transforms.len().min(out.instance_colors.len()) as u32;
    let (mut instance_cursors, instance_count) = partition(&instance_counts, instance_capacity);
    let (mut filled_cursors, filled_vertex_count) =
        partition(&filled_counts, out.filled_vertices.len() as u32);
    let (mut wire_cursors, wire_vertex_count) =
        partition(&wire_counts, out.wire_vertices.len() as u32);

    let requested: u64 = instance_counts.iter().map(|&c| c as u64).sum::<u64>()
        + filled_counts.iter().map(|&c| c as u64).sum::<u64>()
        + wire_counts.iter().map(|&c| c as u64).sum::<u64>();
    let realized = (instance_count + filled_vertex_count + wire_vertex_count) as u64;
    if requested > realized {
        log::debug!(
            "debug draw output truncated: {requested} records requested, {realized} written"
        );
    }

    // Phase 3: re-walk the headers in submission order and write.
    for store in stores {
        let pool = store.quad_pool();
        for header in store.committed_headers() {
            let Some(kind) = header.kind() else {
                // Invalid sentinel from a data-pool overflow; slot consumed,
                // shape skipped.
                continue;
            };
            let desc = &EMIT_FROM_KIND[kind as usize];
            let offset = header.quad_offset() as usize;
            // Valid headers always own a fully written, in-bounds quad run
            // of exactly the kind's length (`reserve` sentinels anything
            // else).
            let data = &pool[offset..offset + kind.data_quads()];

            if let Some((mesh, form)) = desc.instance {
                let index =
                    instance_batch_index(mesh, header.style(), header.blend(), header.zmode());
                emit_instance(
                    &mut instance_cursors[index],
                    out.instance_transforms,
                    out.instance_colors,
                    form,
                    header.color,
                    data,
                );
            }
            if desc.filled_vertices > 0 && header.style() == Style::Filled {
                let index = raw_batch_index(header.blend(), header.zmode());
                emit_filled_triangle(
                    &mut filled_cursors[index],
                    out.filled_vertices,
                    header.color,
                    data,
                );
            }
            if desc.wire_vertices > 0 && header.style() == Style::Wire {
                let index = raw_batch_index(header.blend(), header.zmode());
                match kind {
                    ShapeKind::Line => {
                        emit_line(&mut wire_cursors[index], out.wire_vertices, header.color, data)
                    }
                    _ => emit_wire_triangle(
                        &mut wire_cursors[index],
                        out.wire_vertices,
                        header.color,
                        data,
                    ),
                }
            }
        }
    }

    CompiledBatches {
        instance_batches: std::array::from_fn(|i| instance_cursors[i].batch()),
        filled_batches: std::array::from_fn(|i| filled_cursors[i].batch()),
        wire_batches: std::array::from_fn(|i| wire_cursors[i].batch()),
        instance_count,
        filled_vertex_count,
        wire_vertex_count,
    }
}

fn wire_vertex(position: Vec4, color: u32) -> WireVertex {
    WireVertex {
        position: position.truncate().to_array(),
        color,
    }
}

fn emit_line(cursor: &mut Cursor, buf: &mut [WireVertex], color: u32, data: &[Quad]) {
    let Some(at) = cursor.claim(2) else {
        return;
    };
    buf[at] = wire_vertex(data[0], color);
    buf[at + 1] = wire_vertex(data[1], color);
}

fn emit_wire_triangle(cursor: &mut Cursor, buf: &mut [WireVertex], color: u32, data: &[Quad]) {
    let Some(at) = cursor.claim(6) else {
        return;
    };
    let (a, b, c) = (
        wire_vertex(data[0], color),
        wire_vertex(data[1], color),
        wire_vertex(data[2], color),
    );
    buf[at] = a;
    buf[at + 1] = b;
    buf[at + 2] = b;
    buf[at + 3] = c;
    buf[at + 4] = c;
    buf[at + 5] = a;
}

fn emit_filled_triangle(cursor: &mut Cursor, buf: &mut [FilledVertex], color: u32, data: &[Quad]) {
    let Some(at) = cursor.claim(3) else {
        return;
    };
    let (pos_a, pos_b, pos_c) = (data[0].truncate(), data[1].truncate(), data[2].truncate());
    let normal = (pos_c - pos_a).cross(pos_a - pos_b).normalize_or_zero();
    for (i, pos) in [pos_a, pos_b, pos_c].into_iter().enumerate() {
        buf[at + i] = FilledVertex {
            position: pos.to_array(),
            color,
            normal: normal.to_array(),
            _pad: 0,
        };
    }
}

fn emit_instance(
    cursor: &mut Cursor,
    transforms: &mut [InstanceTransform],
    colors: &mut [u32],
    form: InstanceForm,
    color: u32,
    data: &[Quad],
) {
    let Some(at) = cursor.claim(1) else {
        return;
    };
    transforms[at] = match form {
        InstanceForm::Extents => {
            let min = data[0].truncate();
            let max = data[1].truncate();
            let centre = (max + min) * 0.5;
            let half = (max - min) * 0.5;
            InstanceTransform {
                rows: [
                    [half.x, 0.0, 0.0, centre.x],
                    [0.0, half.y, 0.0, centre.y],
                    [0.0, 0.0, half.z, centre.z],
                ],
            }
        }
        InstanceForm::Transform => InstanceTransform {
            rows: [data[0].to_array(), data[1].to_array(), data[2].to_array()],
        },
        InstanceForm::CentreRadius => {
            let centre_radius = data[0];
            let r = centre_radius.w;
            InstanceTransform {
                rows: [
                    [r, 0.0, 0.0, centre_radius.x],
                    [0.0, r, 0.0, centre_radius.y],
                    [0.0, 0.0, r, centre_radius.z],
                ],
            }
        }
    };
    colors[at] = color;
}
