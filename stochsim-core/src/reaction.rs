//! 2-D Gray-Scott reaction-diffusion with additive noise on a periodic lattice.
//!
//! ```text
//! U_t = Du lap(U) - U V^2 + F (1 - U)     + sigma sqrt(dt) N(0,1)
//! V_t = Dv lap(V) + U V^2 - (F + k) V     + sigma sqrt(dt) N(0,1)
//! ```
//!
//! Forward Euler. There is no upfront stability rejection; every step is
//! checked for non-finite values instead.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SimError, require_non_negative, require_positive};
use crate::field::{DoubleBuffer, to_rows};
use crate::forcing::StochasticForcing;
use crate::grid::{Grid2D, time_steps};
use crate::initial::ReactionInit;
use crate::recorder::{Decimation, FrameRecorder};
use crate::resume::{self, ResumePolicy};
use crate::stability;

pub const DEFAULT_TARGET_FRAMES: usize = 50;

type Lattice = Vec<Vec<f64>>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionParams {
    #[serde(rename = "Du")]
    pub du: f64,
    #[serde(rename = "Dv")]
    pub dv: f64,
    /// Feed rate.
    #[serde(rename = "F")]
    pub feed: f64,
    /// Kill rate.
    #[serde(rename = "k")]
    pub kill: f64,
    pub sigma: f64,
    #[serde(rename = "T")]
    pub t_final: f64,
    pub dt: f64,
    pub dx: f64,
    pub init_type: ReactionInit,
    pub width: usize,
    pub height: usize,
    /// Prior `U` as `[x][y]`.
    pub current_u: Option<Lattice>,
    /// Prior `V` as `[x][y]`.
    pub current_v: Option<Lattice>,
    pub resume_policy: ResumePolicy,
    /// Approximate number of frames returned regardless of step count.
    pub target_frames: usize,
}

impl Default for ReactionParams {
    fn default() -> ReactionParams {
        ReactionParams {
            du: 0.16,
            dv: 0.08,
            feed: 0.035,
            kill: 0.060,
            sigma: 0.0,
            t_final: 100.0,
            dt: 1.0,
            dx: 1.0,
            init_type: ReactionInit::RandomCenter,
            width: 64,
            height: 64,
            current_u: None,
            current_v: None,
            resume_policy: ResumePolicy::Fallback,
            target_frames: DEFAULT_TARGET_FRAMES,
        }
    }
}

impl ReactionParams {
    pub fn validate(&self) -> Result<(), SimError> {
        require_non_negative("Du", self.du)?;
        require_non_negative("Dv", self.dv)?;
        require_non_negative("F", self.feed)?;
        require_non_negative("k", self.kill)?;
        require_non_negative("sigma", self.sigma)?;
        require_positive("T", self.t_final)?;
        require_positive("dt", self.dt)?;
        require_positive("dx", self.dx)?;
        if self.target_frames == 0 {
            return Err(SimError::invalid("target_frames", "must be >= 1"));
        }
        Ok(())
    }

    pub fn rates(&self) -> KineticRates {
        KineticRates {
            du: self.du,
            dv: self.dv,
            feed: self.feed,
            kill: self.kill,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KineticRates {
    #[serde(rename = "Du")]
    pub du: f64,
    #[serde(rename = "Dv")]
    pub dv: f64,
    #[serde(rename = "F")]
    pub feed: f64,
    #[serde(rename = "k")]
    pub kill: f64,
}

/// Decimated `[frame][x][y]` histories of both species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionOutput {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub t: Vec<f64>,
    #[serde(rename = "U")]
    pub u: Vec<Lattice>,
    #[serde(rename = "V")]
    pub v: Vec<Lattice>,
    pub parameters: KineticRates,
}

impl ReactionOutput {
    /// `(current_u, current_v)` for the next call.
    pub fn resume_state(&self) -> Option<(Lattice, Lattice)> {
        Some((self.u.last()?.clone(), self.v.last()?.clone()))
    }
}

pub struct ReactionSolver {
    grid: Grid2D,
    rates: KineticRates,
    dt: f64,
    forcing: StochasticForcing,
    u: DoubleBuffer,
    v: DoubleBuffer,
    nt: usize,
    target_frames: usize,
    steps_taken: usize,
}

impl ReactionSolver {
    pub fn new<R: Rng>(params: &ReactionParams, rng: &mut R) -> Result<ReactionSolver, SimError> {
        params.validate()?;
        let grid = Grid2D::new(params.width, params.height, params.dx)?;
        let nt = time_steps(params.t_final, params.dt)?;
        let ratio = stability::advise_reaction(params.du, params.dv, params.dt, params.dx);

        if let Some(rows) = &params.current_u {
            resume::require_finite("current_u", rows.iter().flatten())?;
        }
        if let Some(rows) = &params.current_v {
            resume::require_finite("current_v", rows.iter().flatten())?;
        }
        let (nx, ny) = (grid.nx(), grid.ny());
        let candidate = resume::pair(
            params.current_u.as_deref(),
            params.current_v.as_deref(),
            "current_u",
            "current_v",
        )
        .map(|halves| {
            halves.and_then(|(u, v)| {
                Ok((
                    resume::lattice("current_u", u, nx, ny)?,
                    resume::lattice("current_v", v, nx, ny)?,
                ))
            })
        });
        let (u, v) = match resume::resolve(params.resume_policy, candidate)? {
            Some(fields) => fields,
            None => params.init_type.generate(&grid, rng),
        };
        debug!(nx, ny, nt, ratio, init = params.init_type.as_str(), "reaction lattice allocated");

        Ok(ReactionSolver {
            grid,
            rates: params.rates(),
            dt: params.dt,
            forcing: StochasticForcing::euler_maruyama(params.sigma, params.dt),
            u: DoubleBuffer::new(u),
            v: DoubleBuffer::new(v),
            nt,
            target_frames: params.target_frames,
            steps_taken: 0,
        })
    }

    pub fn grid(&self) -> &Grid2D {
        &self.grid
    }

    pub fn total_steps(&self) -> usize {
        self.nt
    }

    pub fn u(&self) -> &[f64] {
        self.u.current()
    }

    pub fn v(&self) -> &[f64] {
        self.v.current()
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// One forward-Euler step of both species from the same pre-step state.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Result<(), SimError> {
        let KineticRates { du, dv, feed, kill } = self.rates;
        let dt = self.dt;
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let inv_dx2 = 1.0 / (self.grid.dx() * self.grid.dx());

        let (u, u_next) = self.u.split();
        let (v, v_next) = self.v.split();

        for i in 0..nx {
            let ip = if i + 1 == nx { 0 } else { i + 1 };
            let im = if i == 0 { nx - 1 } else { i - 1 };
            for j in 0..ny {
                let jp = if j + 1 == ny { 0 } else { j + 1 };
                let jm = if j == 0 { ny - 1 } else { j - 1 };
                let k = i * ny + j;
                let (n, s, e, w) = (ip * ny + j, im * ny + j, i * ny + jp, i * ny + jm);

                let lap_u = (u[n] + u[s] + u[e] + u[w] - 4.0 * u[k]) * inv_dx2;
                let lap_v = (v[n] + v[s] + v[e] + v[w] - 4.0 * v[k]) * inv_dx2;
                let uv2 = u[k] * v[k] * v[k];

                let rate_u = du * lap_u - uv2 + feed * (1.0 - u[k]) + self.forcing.sample(rng);
                let rate_v = dv * lap_v + uv2 - (feed + kill) * v[k] + self.forcing.sample(rng);

                u_next[k] = u[k] + rate_u * dt;
                v_next[k] = v[k] + rate_v * dt;
            }
        }

        self.u.swap();
        self.v.swap();
        self.steps_taken += 1;

        let step = self.steps_taken;
        if !self.u.current().iter().all(|x| x.is_finite()) {
            return Err(SimError::Diverged { step, field: "U" });
        }
        if !self.v.current().iter().all(|x| x.is_finite()) {
            return Err(SimError::Diverged { step, field: "V" });
        }
        Ok(())
    }

    pub fn run<R: Rng>(self, rng: &mut R) -> Result<ReactionOutput, SimError> {
        self.run_with_progress(rng, |_, _| {})
    }

    /// Frames start with the state after the first step, then every
    /// `nt / target_frames` steps, and always include the last step.
    pub fn run_with_progress<R: Rng>(
        mut self,
        rng: &mut R,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<ReactionOutput, SimError> {
        let nt = self.nt;
        let ny = self.grid.ny();
        let mut recorder =
            FrameRecorder::new(Decimation::TargetFrames(self.target_frames), nt, self.dt)
                .starting_at(1);

        for n in 1..=nt {
            self.step(rng)?;
            recorder.offer(
                n,
                || (to_rows(self.u.current(), ny), to_rows(self.v.current(), ny)),
                || None,
            );
            progress(n, nt);
        }

        let stride = recorder.stride();
        let rec = recorder.finish();
        info!(steps = nt, stride, frames = rec.frames.len(), "reaction solve finished");
        let (u, v): (Vec<Lattice>, Vec<Lattice>) = rec.frames.into_iter().unzip();
        Ok(ReactionOutput {
            x: self.grid.x_axis(),
            y: self.grid.y_axis(),
            t: rec.t,
            u,
            v,
            parameters: self.rates,
        })
    }
}

/// One stateless reaction-diffusion call.
pub fn solve_reaction<R: Rng>(
    params: &ReactionParams,
    rng: &mut R,
) -> Result<ReactionOutput, SimError> {
    ReactionSolver::new(params, rng)?.run(rng)
}
