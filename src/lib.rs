//! Immediate-mode debug drawing with lock-free submission and render-state
//! batching.
//!
//! Application code submits primitive shapes (lines, triangles, boxes,
//! spheres, cones, cylinders) every frame, from any number of threads,
//! without synchronization. A compile pass then batches everything by
//! render state into flat buffers a renderer can upload and draw directly.
//!
//! # Architecture
//!
//! - [`ShapeStore`] — fixed-capacity, wait-free, multi-producer store for
//!   one frame's submissions (headers + a flat quad data pool)
//! - Submission surface — typed per-shape methods on the store
//!   ([`line`](ShapeStore::line), [`sphere`](ShapeStore::sphere), ...)
//! - [`compile_stores`] — three-phase count/partition/write pass producing
//!   three output streams (instances, filled vertices, wire vertices) plus
//!   [`DrawBatch`] descriptors grouped by render state
//! - [`mesh`] — unit-shape template meshes for the instance stream, built
//!   once at startup
//!
//! Nothing fails recoverably: when a capacity runs out, the overflowing
//! shapes are dropped and everything else renders as usual.
//!
//! # Usage
//!
//! ```
//! use bytemuck::Zeroable;
//! use glam::Vec3;
//! use glint::{
//!     color_rgb, compile_stores, FilledVertex, InstanceTransform, OutputBuffers, ShapeStore,
//!     Style, WireVertex, ZMode,
//! };
//!
//! // Startup: one store, reused every frame.
//! let store = ShapeStore::with_memory_budget(256 * 1024);
//!
//! // Submission phase: any thread, no locks.
//! store.line(ZMode::Test, Vec3::ZERO, Vec3::ONE, color_rgb(255, 0, 0));
//! store.sphere(Style::Filled, ZMode::Test, Vec3::ZERO, 2.0, color_rgb(0, 255, 0));
//! store.aabb(Style::Wire, ZMode::NoTest, Vec3::splat(-1.0), Vec3::ONE, color_rgb(0, 0, 255));
//!
//! // Compilation phase: single reader, after all producers are done.
//! // The buffers would normally be mapped GPU memory.
//! let mut transforms = vec![InstanceTransform::zeroed(); 1024];
//! let mut colors = vec![0u32; 1024];
//! let mut filled = vec![FilledVertex::zeroed(); 4096];
//! let mut wire = vec![WireVertex::zeroed(); 4096];
//! let compiled = compile_stores(
//!     &[&store],
//!     &mut OutputBuffers {
//!         instance_transforms: &mut transforms,
//!         instance_colors: &mut colors,
//!         filled_vertices: &mut filled,
//!         wire_vertices: &mut wire,
//!     },
//! );
//! assert_eq!(compiled.instance_count, 2);
//! assert_eq!(compiled.wire_vertex_count, 2);
//!
//! // Next frame.
//! store.reset();
//! ```

mod batch;
mod draw_api;
mod header;
mod shape;
mod store;
mod vertex;

pub mod mesh;

pub use batch::{
    compile_stores, instance_batch_index, raw_batch_index, CompiledBatches, DrawBatch, Mesh,
    OutputBuffers, INSTANCE_BATCH_COUNT, MESH_FROM_KIND, RAW_BATCH_COUNT,
};
pub use header::{ShapeHeader, BUCKET_COUNT};
pub use shape::{color_rgb, color_rgba, Blend, Quad, ShapeKind, Style, ZMode};
pub use store::{ShapeStore, APPROX_SHAPE_SIZE_BYTES};
pub use vertex::{FilledVertex, InstanceTransform, WireVertex};
