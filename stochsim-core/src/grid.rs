//! Uniform grids shared by the three solvers.
//!
//! A grid is fixed once a solve starts: the point count is derived from the
//! extent and spacing up front, and the solver only ever borrows it.

use crate::error::{SimError, require_positive};

/// Absorbs round-off in quotients such as `2.0 / 0.05` before flooring.
const COUNT_EPS: f64 = 1e-9;

/// Number of whole `step`s that fit in `span`.
pub fn whole_count(span: f64, step: f64) -> usize {
    (span / step + COUNT_EPS).floor() as usize
}

/// Number of time steps covering `horizon` at `dt`; at least one is required.
pub fn time_steps(horizon: f64, dt: f64) -> Result<usize, SimError> {
    let nt = whole_count(horizon, dt);
    if nt == 0 {
        return Err(SimError::invalid(
            "T",
            format!("horizon {horizon} is shorter than one step dt = {dt}"),
        ));
    }
    Ok(nt)
}

/// Fixed-spacing sample points over `[0, extent]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid1D {
    n: usize,
    dx: f64,
    extent: f64,
}

impl Grid1D {
    pub fn new(extent: f64, dx: f64) -> Result<Grid1D, SimError> {
        require_positive("dx", dx)?;
        require_positive("domain", extent)?;
        let n = whole_count(extent, dx) + 1;
        if n < 3 {
            return Err(SimError::invalid(
                "dx",
                format!("domain {extent} with dx = {dx} gives {n} points; need >= 3"),
            ));
        }
        Ok(Grid1D { n, dx, extent })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Evenly spaced coordinates from 0 to `extent` inclusive.
    pub fn coordinates(&self) -> Vec<f64> {
        let last = (self.n - 1) as f64;
        (0..self.n)
            .map(|i| self.extent * (i as f64) / last)
            .collect()
    }
}

/// Square-celled periodic lattice of `nx` columns by `ny` rows.
///
/// Storage is row-major on the first axis: cell `(i, j)` lives at `i * ny + j`,
/// matching the `[x][y]` nesting of recorded frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2D {
    nx: usize,
    ny: usize,
    dx: f64,
}

impl Grid2D {
    pub const MIN_CELLS: usize = 10;
    pub const MAX_CELLS: usize = 256;

    pub fn new(nx: usize, ny: usize, dx: f64) -> Result<Grid2D, SimError> {
        require_positive("dx", dx)?;
        for (name, v) in [("width", nx), ("height", ny)] {
            if !(Self::MIN_CELLS..=Self::MAX_CELLS).contains(&v) {
                return Err(SimError::invalid(
                    name,
                    format!(
                        "must be within [{}, {}], got {v}",
                        Self::MIN_CELLS,
                        Self::MAX_CELLS
                    ),
                ));
            }
        }
        Ok(Grid2D { nx, ny, dx })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    pub fn x_axis(&self) -> Vec<f64> {
        (0..self.nx).map(|i| i as f64 * self.dx).collect()
    }

    pub fn y_axis(&self) -> Vec<f64> {
        (0..self.ny).map(|j| j as f64 * self.dx).collect()
    }
}
