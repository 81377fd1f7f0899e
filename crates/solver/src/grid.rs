//! GPU-style uniform-grid spatial hash built from sorted packed keys.
//!
//! Instead of a `HashMap`, the grid keeps one packed `u32` key per particle
//! (`cell_hash << index_bits | particle_index`), sorts the key array with a
//! bitonic network, and derives per-cell `[start, end)` bucket ranges from
//! run boundaries in the sorted order. The layout is flat arrays end to end,
//! so every phase is a data-parallel pass and nothing chases pointers.
//!
//! Cell size equals the kernel support radius, which bounds neighbor search
//! to the 3x3 block of cells around a particle.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::particle::ParticleBuffers;
use crate::sort;

/// Spatial hash over a `side x side` grid of square cells.
///
/// A tick rebuilds the structure in three phases: [`build_keys`] packs one
/// key per particle, [`sort_keys`] orders them so equal hashes form runs,
/// and [`build_buckets`] records each run as a half-open bucket range.
/// [`gather`] then rearranges particle state into the sorted order so that
/// bucket slots index particle arrays directly.
///
/// [`build_keys`]: SpatialGrid::build_keys
/// [`sort_keys`]: SpatialGrid::sort_keys
/// [`build_buckets`]: SpatialGrid::build_buckets
/// [`gather`]: SpatialGrid::gather
#[derive(Debug)]
pub struct SpatialGrid {
    side: u32,
    cell_count: usize,
    /// Low bits of a key reserved for the particle index.
    index_bits: u32,
    index_mask: u32,
    keys: Vec<u32>,
    cell_start: Vec<AtomicU32>,
    cell_end: Vec<AtomicU32>,
}

impl SpatialGrid {
    /// Create a grid with `side * side` cells holding keys for
    /// `particle_count` particles.
    ///
    /// Both values must be powers of two and the packed key must fit 32 bits;
    /// `Simulation::new` validates this before constructing the grid.
    pub fn new(side: u32, particle_count: usize) -> Self {
        let cell_count = (side as usize) * (side as usize);
        Self {
            side,
            cell_count,
            index_bits: particle_count.trailing_zeros(),
            index_mask: (particle_count as u64 - 1) as u32,
            keys: vec![0; particle_count],
            cell_start: (0..cell_count).map(|_| AtomicU32::new(0)).collect(),
            cell_end: (0..cell_count).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Sorted packed keys, one per particle.
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    /// Particle index stored in a key's low bits.
    #[inline]
    pub fn unpack_index(&self, key: u32) -> usize {
        (key & self.index_mask) as usize
    }

    /// Cell hash stored in a key's high bits.
    #[inline]
    pub fn unpack_hash(&self, key: u32) -> u32 {
        key >> self.index_bits
    }

    /// Pack one key per particle from the current positions.
    ///
    /// Positions left of or below the domain fall into column/row 0,
    /// positions past the far edge into the last column/row, so every
    /// particle lands in a valid cell no matter how far it strayed.
    pub fn build_keys(&mut self, xs: &[f32], ys: &[f32], cell_size: f32) {
        debug_assert_eq!(xs.len(), self.keys.len());
        debug_assert_eq!(ys.len(), self.keys.len());

        let side = self.side;
        let cell_count = self.cell_count as u64;
        let index_bits = self.index_bits;
        self.keys.par_iter_mut().enumerate().for_each(|(i, key)| {
            let cx = cell_coord(xs[i], cell_size, side);
            let cy = cell_coord(ys[i], cell_size, side);
            // The fold is the identity for clamped coordinates; it only bites
            // if the hash function is ever swapped for a non-spatial one.
            let hash = ((cy as u64 * side as u64 + cx as u64) % cell_count) as u32;
            *key = (hash << index_bits) | i as u32;
        });
    }

    /// Sort the packed keys ascending, grouping equal cell hashes into runs
    /// ordered by original particle index.
    pub fn sort_keys(&mut self) {
        sort::bitonic_sort(&mut self.keys);
    }

    /// Derive per-cell bucket ranges from the sorted keys.
    ///
    /// Every slot checks whether it begins or ends a run of equal hashes and
    /// stores the boundary it owns. Each cell's start and end therefore have
    /// exactly one writer, so relaxed atomics are enough; the pass itself is
    /// the only synchronization point. Cells with no particles keep the
    /// cleared `[0, 0)`.
    pub fn build_buckets(&mut self) {
        self.cell_start.par_iter_mut().for_each(|s| *s.get_mut() = 0);
        self.cell_end.par_iter_mut().for_each(|e| *e.get_mut() = 0);

        let n = self.keys.len();
        if n == 0 {
            return;
        }
        let keys = &self.keys;
        let cell_start = &self.cell_start;
        let cell_end = &self.cell_end;
        let index_bits = self.index_bits;
        (0..n).into_par_iter().for_each(|s| {
            let hash = (keys[s] >> index_bits) as usize;
            if s == 0 || (keys[s - 1] >> index_bits) as usize != hash {
                cell_start[hash].store(s as u32, Ordering::Relaxed);
            }
            if s == n - 1 || (keys[s + 1] >> index_bits) as usize != hash {
                cell_end[hash].store(s as u32 + 1, Ordering::Relaxed);
            }
        });
    }

    /// The half-open slot range of one cell in the sorted order.
    #[inline]
    pub fn bucket(&self, hash: usize) -> Range<usize> {
        let start = self.cell_start[hash].load(Ordering::Relaxed) as usize;
        let end = self.cell_end[hash].load(Ordering::Relaxed) as usize;
        start..end
    }

    /// Rearrange particle state from original order into sorted-key order.
    ///
    /// After this, sorted slot `s` holds the particle whose index is packed
    /// into `keys[s]`, and bucket ranges index `dst` directly.
    pub fn gather(&self, src: &ParticleBuffers, dst: &mut ParticleBuffers) {
        debug_assert_eq!(src.len(), self.keys.len());
        debug_assert_eq!(dst.len(), self.keys.len());

        let keys = &self.keys;
        let mask = self.index_mask;
        dst.x
            .par_iter_mut()
            .zip(keys.par_iter())
            .for_each(|(out, &k)| *out = src.x[(k & mask) as usize]);
        dst.y
            .par_iter_mut()
            .zip(keys.par_iter())
            .for_each(|(out, &k)| *out = src.y[(k & mask) as usize]);
        dst.vx
            .par_iter_mut()
            .zip(keys.par_iter())
            .for_each(|(out, &k)| *out = src.vx[(k & mask) as usize]);
        dst.vy
            .par_iter_mut()
            .zip(keys.par_iter())
            .for_each(|(out, &k)| *out = src.vy[(k & mask) as usize]);
    }

    /// Visit every neighbor of the particle at sorted slot `slot` that lies
    /// strictly within `radius_sq`, scanning the 3x3 block of cells around
    /// its own cell (clipped at domain edges).
    ///
    /// `xs`/`ys` must be the rearranged positions matching the current
    /// buckets. The callback receives `(j, dx, dy, r_sq)` where `j` is the
    /// neighbor's sorted slot and `dx, dy` the displacement from j to the
    /// visited particle. The particle itself is skipped.
    pub fn for_each_neighbor<F>(
        &self,
        slot: usize,
        xs: &[f32],
        ys: &[f32],
        cell_size: f32,
        radius_sq: f32,
        mut visit: F,
    ) where
        F: FnMut(usize, f32, f32, f32),
    {
        let px = xs[slot];
        let py = ys[slot];
        let cx = cell_coord(px, cell_size, self.side);
        let cy = cell_coord(py, cell_size, self.side);
        let x_lo = cx.saturating_sub(1);
        let x_hi = (cx + 1).min(self.side - 1);
        let y_lo = cy.saturating_sub(1);
        let y_hi = (cy + 1).min(self.side - 1);

        for ny in y_lo..=y_hi {
            for nx in x_lo..=x_hi {
                let hash =
                    ((ny as u64 * self.side as u64 + nx as u64) % self.cell_count as u64) as usize;
                for j in self.bucket(hash) {
                    if j == slot {
                        continue;
                    }
                    let dx = px - xs[j];
                    let dy = py - ys[j];
                    let r_sq = dx * dx + dy * dy;
                    if r_sq < radius_sq {
                        visit(j, dx, dy, r_sq);
                    }
                }
            }
        }
    }
}

/// Map one coordinate to its cell index, clamped to `[0, side)`.
///
/// Everything below the domain (NaN included) maps to 0; the float-to-int
/// cast saturates, so arbitrarily large coordinates clamp to the last cell.
#[inline]
fn cell_coord(p: f32, cell_size: f32, side: u32) -> u32 {
    let c = (p / cell_size).floor();
    if c >= 0.0 {
        (c as u32).min(side - 1)
    } else {
        0
    }
}
