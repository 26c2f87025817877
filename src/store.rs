//! Lock-free multi-producer shape store.
//!
//! A [`ShapeStore`] is a fixed-capacity, preallocated, append-only container
//! for one frame's debug-draw submissions. Any number of threads may call
//! [`reserve`](ShapeStore::reserve) (usually through the typed constructors
//! in `draw_api`) concurrently and without blocking: each call performs a
//! bounded number of atomic fetch-adds to claim a header slot and a run of
//! data-pool quads, then fills slots it exclusively owns.
//!
//! # Frame protocol
//!
//! A frame has two strictly sequenced phases that must never interleave:
//!
//! 1. **Submission** — producers call the draw methods / `reserve`.
//! 2. **Compilation** — a single reader hands the store to
//!    [`compile_stores`](crate::batch::compile_stores).
//!
//! The caller must guarantee no producer is still active when compilation
//! or [`reset`](ShapeStore::reset) begins (join the threads, or otherwise
//! establish happens-before). This boundary is a documented contract; the
//! store does not fence it internally.
//!
//! Capacity overflow never errors and never corrupts committed data: the
//! overflowing submission is dropped and later submissions are unaffected.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::header::{ShapeHeader, BUCKET_COUNT, MAX_QUAD_OFFSET};
use crate::shape::{Quad, ShapeKind, Style, ZMode};

/// Rough memory footprint of one shape (header plus a typical quad run),
/// handy for choosing a [`ShapeStore::with_memory_budget`] size.
pub const APPROX_SHAPE_SIZE_BYTES: usize = 64;

/// Padded to a cache line so the two hot counters never share one.
#[repr(align(64))]
struct AlignedCounter(AtomicU32);

impl AlignedCounter {
    fn new() -> Self {
        Self(AtomicU32::new(0))
    }
}

/// Fixed-capacity, wait-free, multi-producer store for one frame's shapes.
pub struct ShapeStore {
    header_count: AlignedCounter,
    quad_count: AlignedCounter,
    headers: Box<[UnsafeCell<ShapeHeader>]>,
    quads: Box<[UnsafeCell<Quad>]>,
    /// Per-bucket submission counts, a sizing hint for the compiler's count
    /// phase. Ground truth is always the header array.
    bucket_sizes: [AtomicU32; BUCKET_COUNT],
}

// Safety: concurrent `reserve` calls write only to header/quad slots claimed
// by atomic fetch-add, so no two threads ever touch the same slot. Readers
// (`committed_headers`, `quad_pool`) require the documented quiesce contract:
// no producer is active, with happens-before established by the caller.
unsafe impl Send for ShapeStore {}
unsafe impl Sync for ShapeStore {}

impl ShapeStore {
    /// Create a store with explicit header and data-pool capacities.
    ///
    /// All allocation happens here; a frame performs none. The quad
    /// capacity is clamped to what the header's 24-bit offset field can
    /// address.
    pub fn new(header_capacity: usize, quad_capacity: usize) -> Self {
        let quad_capacity = quad_capacity.min(MAX_QUAD_OFFSET as usize + 1);
        let headers = (0..header_capacity)
            .map(|_| UnsafeCell::new(ShapeHeader::from_bucket_index(0)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let quads = (0..quad_capacity)
            .map(|_| UnsafeCell::new(Quad::ZERO))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        log::debug!(
            "shape store created: {header_capacity} headers, {quad_capacity} quads"
        );
        Self {
            header_count: AlignedCounter::new(),
            quad_count: AlignedCounter::new(),
            headers,
            quads,
            bucket_sizes: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    /// Create a store from a total byte budget, partitioned the way the
    /// store itself consumes memory: roughly 1/8 for headers and the rest
    /// for the quad pool.
    pub fn with_memory_budget(bytes: usize) -> Self {
        let header_capacity = bytes / 8 / std::mem::size_of::<ShapeHeader>();
        let header_bytes = header_capacity * std::mem::size_of::<ShapeHeader>();
        let quad_capacity = (bytes - header_bytes) / std::mem::size_of::<Quad>();
        Self::new(header_capacity, quad_capacity)
    }

    /// The sole mutator: claim a header slot and a quad run, publish the
    /// shape.
    ///
    /// `quads` must be exactly [`kind.data_quads()`](ShapeKind::data_quads)
    /// long; any other length drops the shape the same way a pool overflow
    /// does.
    ///
    /// Wait-free for every caller under any interleaving. Returns `false`
    /// when the shape was dropped:
    ///
    /// - Header array full: nothing is written.
    /// - Data pool full, or quad run of the wrong length: the claimed
    ///   header slot is still consumed, but holds the invalid-kind sentinel
    ///   so the compiler skips it.
    ///
    /// The quads are copied into the pool before the header is written, so
    /// a compiler running after the frame's quiesce point always observes
    /// fully written shape data.
    pub fn reserve(
        &self,
        kind: ShapeKind,
        style: Style,
        zmode: ZMode,
        color: u32,
        quads: &[Quad],
    ) -> bool {
        let slot = self.header_count.0.fetch_add(1, Ordering::Relaxed) as usize;
        if slot >= self.headers.len() {
            return false;
        }

        let offset = self.quad_count.0.fetch_add(quads.len() as u32, Ordering::Relaxed);
        let well_formed = quads.len() == kind.data_quads();
        if !well_formed {
            log::debug!(
                "{kind:?} dropped: {} quads supplied, kind takes {}",
                quads.len(),
                kind.data_quads()
            );
        }
        let fits = well_formed && offset as usize + quads.len() <= self.quads.len();

        let kind_bits = if fits {
            for (i, quad) in quads.iter().enumerate() {
                // Safety: slots [offset, offset + len) were claimed above by
                // fetch-add and are written by this thread only.
                unsafe {
                    *self.quads[offset as usize + i].get() = *quad;
                }
            }
            kind as u32
        } else {
            ShapeKind::COUNT
        };

        let header = ShapeHeader::new(kind_bits, style, zmode, color, offset & MAX_QUAD_OFFSET);
        // Safety: header slot `slot` was claimed above by fetch-add.
        unsafe {
            *self.headers[slot].get() = header;
        }

        if fits {
            self.bucket_sizes[header.bucket_index()].fetch_add(1, Ordering::Release);
        }
        fits
    }

    /// Empty the store for the next frame.
    ///
    /// Zeroes both counters and the bucket histogram. Must not overlap
    /// submission or compilation. Reports last frame's overflow, if any,
    /// at debug level.
    pub fn reset(&self) {
        let submitted = self.header_count.0.swap(0, Ordering::Relaxed);
        if submitted as usize > self.headers.len() {
            log::debug!(
                "shape store dropped {} of {} submissions (header capacity {})",
                submitted as usize - self.headers.len(),
                submitted,
                self.headers.len()
            );
        }
        let quads_requested = self.quad_count.0.swap(0, Ordering::Relaxed);
        if quads_requested as usize > self.quads.len() {
            log::debug!(
                "shape store data pool overflowed: {} quads requested, capacity {}",
                quads_requested,
                self.quads.len()
            );
        }
        for bucket in &self.bucket_sizes {
            bucket.store(0, Ordering::Relaxed);
        }
    }

    /// Number of committed headers (clamped to capacity; the raw counter
    /// keeps advancing past it so overflow drops stay independent).
    pub fn shape_count(&self) -> usize {
        (self.header_count.0.load(Ordering::Acquire) as usize).min(self.headers.len())
    }

    pub fn header_capacity(&self) -> usize {
        self.headers.len()
    }

    pub fn quad_capacity(&self) -> usize {
        self.quads.len()
    }

    /// Histogram count for one bucket.
    pub(crate) fn bucket_size(&self, bucket: usize) -> u32 {
        self.bucket_sizes[bucket].load(Ordering::Acquire)
    }

    /// Committed headers, in submission order.
    ///
    /// Requires the quiesce contract (no active producer).
    pub(crate) fn committed_headers(&self) -> &[ShapeHeader] {
        let count = self.shape_count();
        // Safety: UnsafeCell<ShapeHeader> and ShapeHeader share layout, and
        // under the quiesce contract no writer mutates these slots while the
        // returned borrow lives.
        unsafe { std::slice::from_raw_parts(self.headers.as_ptr().cast::<ShapeHeader>(), count) }
    }

    /// The full quad pool.
    ///
    /// Requires the quiesce contract (no active producer).
    pub(crate) fn quad_pool(&self) -> &[Quad] {
        // Safety: as in `committed_headers`.
        unsafe { std::slice::from_raw_parts(self.quads.as_ptr().cast::<Quad>(), self.quads.len()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::color_rgb;
    use glam::Vec4;

    fn quad(x: f32) -> Quad {
        Vec4::splat(x)
    }

    #[test]
    fn test_reserve_commits_header_and_quads() {
        let store = ShapeStore::new(16, 64);
        assert!(store.reserve(
            ShapeKind::Line,
            Style::Wire,
            ZMode::Test,
            color_rgb(255, 0, 0),
            &[quad(1.0), quad(2.0)],
        ));

        assert_eq!(store.shape_count(), 1);
        let header = store.committed_headers()[0];
        assert_eq!(header.kind(), Some(ShapeKind::Line));
        assert_eq!(header.quad_offset(), 0);
        assert_eq!(store.quad_pool()[0], quad(1.0));
        assert_eq!(store.quad_pool()[1], quad(2.0));
        assert_eq!(store.bucket_size(header.bucket_index()), 1);
    }

    #[test]
    fn test_header_overflow_drops_the_last_shape() {
        let store = ShapeStore::new(2, 64);
        let color = color_rgb(0, 255, 0);
        assert!(store.reserve(ShapeKind::Sphere, Style::Filled, ZMode::Test, color, &[quad(0.0)]));
        assert!(store.reserve(ShapeKind::Sphere, Style::Filled, ZMode::Test, color, &[quad(1.0)]));
        assert!(!store.reserve(ShapeKind::Sphere, Style::Filled, ZMode::Test, color, &[quad(2.0)]));

        // Exactly one dropped; the committed two are intact.
        assert_eq!(store.shape_count(), 2);
        assert_eq!(store.quad_pool()[0], quad(0.0));
        assert_eq!(store.quad_pool()[1], quad(1.0));
    }

    #[test]
    fn test_data_overflow_writes_sentinel_and_keeps_slot() {
        let store = ShapeStore::new(8, 3);
        let color = color_rgb(0, 0, 255);
        assert!(store.reserve(ShapeKind::Obb, Style::Filled, ZMode::Test, color, &[
            quad(1.0),
            quad(2.0),
            quad(3.0),
        ]));
        // Pool is exhausted: slot consumed, sentinel written, no bucket count.
        assert!(!store.reserve(ShapeKind::Obb, Style::Filled, ZMode::Test, color, &[
            quad(4.0),
            quad(5.0),
            quad(6.0),
        ]));

        assert_eq!(store.shape_count(), 2);
        let headers = store.committed_headers();
        assert_eq!(headers[0].kind(), Some(ShapeKind::Obb));
        assert_eq!(headers[1].kind(), None);
        assert_eq!(store.bucket_size(headers[0].bucket_index()), 1);
        // Committed data is uncorrupted.
        assert_eq!(store.quad_pool()[2], quad(3.0));
    }

    #[test]
    fn test_partial_data_overflow_never_crosses_pool_end() {
        let store = ShapeStore::new(8, 4);
        let color = color_rgb(1, 1, 1);
        assert!(store.reserve(ShapeKind::Line, Style::Wire, ZMode::Test, color, &[
            quad(1.0),
            quad(2.0),
        ]));
        // Three quads would start inside the pool but run past its end.
        assert!(!store.reserve(ShapeKind::Cone, Style::Filled, ZMode::Test, color, &[
            quad(7.0),
            quad(8.0),
            quad(9.0),
        ]));
        assert_eq!(store.committed_headers()[1].kind(), None);
        assert_eq!(store.quad_pool()[2], Quad::ZERO);
        assert_eq!(store.quad_pool()[3], Quad::ZERO);
    }

    #[test]
    fn test_wrong_quad_count_writes_sentinel() {
        let store = ShapeStore::new(8, 64);
        let color = color_rgb(5, 5, 5);
        // Triangle takes three quads, sphere takes one.
        assert!(!store.reserve(ShapeKind::Triangle, Style::Filled, ZMode::Test, color, &[
            quad(1.0),
        ]));
        assert!(!store.reserve(ShapeKind::Sphere, Style::Filled, ZMode::Test, color, &[
            quad(1.0),
            quad(2.0),
        ]));

        let headers = store.committed_headers();
        assert_eq!(headers[0].kind(), None);
        assert_eq!(headers[1].kind(), None);
        for bucket in 0..BUCKET_COUNT {
            assert_eq!(store.bucket_size(bucket), 0);
        }

        // Later well-formed submissions are unaffected.
        assert!(store.reserve(ShapeKind::Sphere, Style::Filled, ZMode::Test, color, &[quad(3.0)]));
        let header = store.committed_headers()[2];
        assert_eq!(header.kind(), Some(ShapeKind::Sphere));
        assert_eq!(store.bucket_size(header.bucket_index()), 1);
    }

    #[test]
    fn test_reset_zeroes_counters_and_histogram() {
        let store = ShapeStore::new(4, 16);
        let color = color_rgb(9, 9, 9);
        store.reserve(ShapeKind::Triangle, Style::Filled, ZMode::Test, color, &[
            quad(1.0),
            quad(2.0),
            quad(3.0),
        ]);
        let bucket = store.committed_headers()[0].bucket_index();
        assert_eq!(store.bucket_size(bucket), 1);

        store.reset();
        assert_eq!(store.shape_count(), 0);
        assert_eq!(store.bucket_size(bucket), 0);

        // The store is immediately reusable.
        assert!(store.reserve(ShapeKind::Line, Style::Wire, ZMode::Test, color, &[
            quad(4.0),
            quad(5.0),
        ]));
        assert_eq!(store.shape_count(), 1);
        assert_eq!(store.committed_headers()[0].quad_offset(), 0);
    }

    #[test]
    fn test_memory_budget_partition() {
        let store = ShapeStore::with_memory_budget(64 * 1024);
        // 1/8 of the budget as 8-byte headers, the rest as 16-byte quads.
        assert_eq!(store.header_capacity(), 1024);
        assert_eq!(store.quad_capacity(), (64 * 1024 - 1024 * 8) / 16);
    }

    #[test]
    fn test_concurrent_reserve_has_no_slot_collisions() {
        let store = ShapeStore::new(1024, 4096);
        let threads = 8;
        let per_thread = 128;
        std::thread::scope(|scope| {
            for t in 0..threads {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..per_thread {
                        let value = (t * per_thread + i) as f32;
                        store.reserve(
                            ShapeKind::Line,
                            Style::Wire,
                            ZMode::Test,
                            color_rgb(255, 255, 255),
                            &[quad(value), quad(-value)],
                        );
                    }
                });
            }
        });

        assert_eq!(store.shape_count(), threads * per_thread);
        // Every header owns a fully written, non-overlapping quad run.
        let pool = store.quad_pool();
        let mut seen = vec![false; threads * per_thread];
        for header in store.committed_headers() {
            assert_eq!(header.kind(), Some(ShapeKind::Line));
            let offset = header.quad_offset() as usize;
            let value = pool[offset].x;
            assert_eq!(pool[offset + 1].x, -value);
            let index = value as usize;
            assert!(!seen[index], "quad run {index} emitted twice");
            seen[index] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
