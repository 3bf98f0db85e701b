//! Field storage and the buffer arenas the steppers write into.
//!
//! Every update reads from the current level(s) and writes a distinct `next`
//! buffer; the buffers are then rotated with `mem::swap`, so no level is
//! reallocated per step and the written buffer never aliases a read one.

use std::mem;

/// Two-level arena for one-step schemes (heat, reaction-diffusion).
#[derive(Clone, Debug)]
pub struct DoubleBuffer {
    current: Vec<f64>,
    next: Vec<f64>,
}

impl DoubleBuffer {
    pub fn new(initial: Vec<f64>) -> DoubleBuffer {
        let next = vec![0.0; initial.len()];
        DoubleBuffer {
            current: initial,
            next,
        }
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut [f64] {
        &mut self.current
    }

    /// `(read, write)` views for one update.
    pub fn split(&mut self) -> (&[f64], &mut [f64]) {
        (&self.current, &mut self.next)
    }

    /// Promote the written buffer to current.
    pub fn swap(&mut self) {
        mem::swap(&mut self.current, &mut self.next);
    }
}

/// Three-level arena for the leapfrog scheme.
#[derive(Clone, Debug)]
pub struct TripleBuffer {
    previous: Vec<f64>,
    current: Vec<f64>,
    next: Vec<f64>,
}

impl TripleBuffer {
    pub fn new(previous: Vec<f64>, current: Vec<f64>) -> TripleBuffer {
        debug_assert_eq!(previous.len(), current.len());
        let next = vec![0.0; current.len()];
        TripleBuffer {
            previous,
            current,
            next,
        }
    }

    pub fn previous(&self) -> &[f64] {
        &self.previous
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn next(&self) -> &[f64] {
        &self.next
    }

    /// `(previous, current, write)` views for one update.
    pub fn split(&mut self) -> (&[f64], &[f64], &mut [f64]) {
        (&self.previous, &self.current, &mut self.next)
    }

    /// `prev <- curr`, `curr <- next`; the old `prev` becomes scratch.
    pub fn rotate(&mut self) {
        mem::swap(&mut self.previous, &mut self.current);
        mem::swap(&mut self.current, &mut self.next);
    }
}

/// Flatten `[x][y]` rows into x-major storage, checking every row length.
///
/// Returns `None` on any shape disagreement.
pub fn flatten_rows(rows: &[Vec<f64>], nx: usize, ny: usize) -> Option<Vec<f64>> {
    if rows.len() != nx || rows.iter().any(|r| r.len() != ny) {
        return None;
    }
    let mut out = Vec::with_capacity(nx * ny);
    for r in rows {
        out.extend_from_slice(r);
    }
    Some(out)
}

/// Inverse of [`flatten_rows`].
pub fn to_rows(data: &[f64], ny: usize) -> Vec<Vec<f64>> {
    data.chunks(ny).map(|c| c.to_vec()).collect()
}
