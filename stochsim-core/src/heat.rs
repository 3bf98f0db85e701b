//! 1-D stochastic heat equation, explicit forward-time centred-space.
//!
//! `u_next[i] = u[i] + r * (u[i+1] - 2 u[i] + u[i-1]) + sigma * sqrt(dt) * N(0,1)`
//! with `r = alpha * dt / dx^2 <= 0.5` and both ends pinned to zero.

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SimError, require_non_negative, require_positive};
use crate::field::DoubleBuffer;
use crate::forcing::StochasticForcing;
use crate::grid::Grid1D;
use crate::initial::HeatInit;
use crate::recorder::{Decimation, FrameRecorder};
use crate::resume::{self, ResumePolicy};
use crate::stability;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum BoundaryCondition {
    /// Fixed zero value at both ends.
    #[default]
    Dirichlet,
}

impl BoundaryCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryCondition::Dirichlet => "dirichlet",
        }
    }
}

impl FromStr for BoundaryCondition {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dirichlet" => Ok(BoundaryCondition::Dirichlet),
            other => Err(SimError::UnknownSelector {
                kind: "boundary condition",
                value: other.to_string(),
                expected: "dirichlet",
            }),
        }
    }
}

impl TryFrom<String> for BoundaryCondition {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatParams {
    /// Diffusivity.
    pub alpha: f64,
    pub dt: f64,
    pub dx: f64,
    /// Number of time steps in this call.
    pub t_steps: usize,
    /// Length of `[0, domain]`.
    #[serde(default = "default_domain")]
    pub domain: f64,
    #[serde(default)]
    pub init: HeatInit,
    /// Prior profile to continue from instead of `init`.
    #[serde(default)]
    pub current_state: Option<Vec<f64>>,
    #[serde(default)]
    pub bc: BoundaryCondition,
    #[serde(default)]
    pub sigma: f64,
    #[serde(default = "default_interval")]
    pub snapshot_interval: usize,
    #[serde(default)]
    pub resume_policy: ResumePolicy,
}

fn default_domain() -> f64 {
    1.0
}

fn default_interval() -> usize {
    1
}

impl HeatParams {
    pub fn new(alpha: f64, dt: f64, dx: f64, t_steps: usize) -> HeatParams {
        HeatParams {
            alpha,
            dt,
            dx,
            t_steps,
            domain: default_domain(),
            init: HeatInit::default(),
            current_state: None,
            bc: BoundaryCondition::default(),
            sigma: 0.0,
            snapshot_interval: default_interval(),
            resume_policy: ResumePolicy::Fallback,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        require_positive("alpha", self.alpha)?;
        require_positive("dt", self.dt)?;
        require_positive("dx", self.dx)?;
        require_positive("domain", self.domain)?;
        require_non_negative("sigma", self.sigma)?;
        if self.t_steps == 0 {
            return Err(SimError::invalid("t_steps", "must be a positive integer"));
        }
        if self.snapshot_interval == 0 {
            return Err(SimError::invalid("snapshot_interval", "must be >= 1"));
        }
        Ok(())
    }
}

/// Frames and per-frame energy `sum(u^2) * dx`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatOutput {
    pub x: Vec<f64>,
    pub t: Vec<f64>,
    pub frames: Vec<Vec<f64>>,
    pub energy: Vec<f64>,
}

impl HeatOutput {
    /// Snapshot to pass as `current_state` of the next call.
    pub fn resume_state(&self) -> Option<Vec<f64>> {
        self.frames.last().cloned()
    }
}

pub struct HeatSolver {
    grid: Grid1D,
    r: f64,
    bc: BoundaryCondition,
    forcing: StochasticForcing,
    u: DoubleBuffer,
    t_steps: usize,
    interval: usize,
    dt: f64,
}

impl HeatSolver {
    /// Validate, gate on stability, then allocate and seed the field.
    pub fn new(params: &HeatParams) -> Result<HeatSolver, SimError> {
        params.validate()?;
        let r = stability::check_heat(params.alpha, params.dt, params.dx)?;
        let grid = Grid1D::new(params.domain, params.dx)?;

        if let Some(state) = &params.current_state {
            resume::require_finite("current_state", state)?;
        }
        let candidate = params
            .current_state
            .as_deref()
            .map(|s| resume::profile("current_state", s, grid.len()));
        let initial = match resume::resolve(params.resume_policy, candidate)? {
            Some(state) => state,
            None => params.init.generate(&grid.coordinates()),
        };
        debug!(
            n = grid.len(),
            r,
            init = params.init.as_str(),
            resumed = params.current_state.is_some(),
            "heat grid allocated"
        );

        let mut solver = HeatSolver {
            grid,
            r,
            bc: params.bc,
            forcing: StochasticForcing::euler_maruyama(params.sigma, params.dt),
            u: DoubleBuffer::new(initial),
            t_steps: params.t_steps,
            interval: params.snapshot_interval,
            dt: params.dt,
        };
        solver.apply_bc();
        Ok(solver)
    }

    pub fn grid(&self) -> &Grid1D {
        &self.grid
    }

    pub fn ratio(&self) -> f64 {
        self.r
    }

    pub fn field(&self) -> &[f64] {
        self.u.current()
    }

    pub fn energy(&self) -> f64 {
        self.u.current().iter().map(|v| v * v).sum::<f64>() * self.grid.dx()
    }

    /// Advance one explicit step.
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        let r = self.r;
        let (u, next) = self.u.split();
        let n = u.len();
        for i in 1..(n - 1) {
            next[i] = u[i] + r * (u[i + 1] - 2.0 * u[i] + u[i - 1]);
        }
        self.forcing.add_to(rng, &mut next[1..(n - 1)]);

        self.u.swap();
        self.apply_bc();
    }

    pub fn run<R: Rng>(self, rng: &mut R) -> HeatOutput {
        self.run_with_progress(rng, |_, _| {})
    }

    /// Step to the horizon, calling `progress(step, total)` after each step.
    pub fn run_with_progress<R: Rng>(
        mut self,
        rng: &mut R,
        mut progress: impl FnMut(usize, usize),
    ) -> HeatOutput {
        let total = self.t_steps;
        let mut recorder =
            FrameRecorder::new(Decimation::Every(self.interval), total, self.dt);
        recorder.record(0, self.field().to_vec(), Some(self.energy()));

        for n in 1..=total {
            self.step(rng);
            recorder.offer(n, || self.field().to_vec(), || Some(self.energy()));
            progress(n, total);
        }

        let rec = recorder.finish();
        info!(steps = total, frames = rec.frames.len(), "heat solve finished");
        HeatOutput {
            x: self.grid.coordinates(),
            t: rec.t,
            frames: rec.frames,
            energy: rec.diagnostics,
        }
    }

    fn apply_bc(&mut self) {
        match self.bc {
            BoundaryCondition::Dirichlet => {
                let u = self.u.current_mut();
                let n = u.len();
                u[0] = 0.0;
                u[n - 1] = 0.0;
            }
        }
    }
}

/// One stateless heat call.
pub fn solve_heat<R: Rng>(params: &HeatParams, rng: &mut R) -> Result<HeatOutput, SimError> {
    Ok(HeatSolver::new(params)?.run(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(123)
    }

    #[test]
    fn single_step_matches_stencil() {
        let mut p = HeatParams::new(0.25, 0.01, 0.1, 1);
        p.current_state = Some(
            (0..11)
                .map(|i| if i == 5 { 1.0 } else { 0.0 })
                .collect(),
        );
        let mut s = HeatSolver::new(&p).unwrap();
        assert_relative_eq!(s.ratio(), 0.25, epsilon = 1e-12);
        s.step(&mut rng());
        let u = s.field();
        assert_relative_eq!(u[5], 0.5, epsilon = 1e-12);
        assert_relative_eq!(u[4], 0.25, epsilon = 1e-12);
        assert_relative_eq!(u[6], 0.25, epsilon = 1e-12);
        assert_eq!(u[3], 0.0);
    }

    #[test]
    fn boundaries_are_pinned_even_for_resumed_state() {
        let mut p = HeatParams::new(0.1, 0.01, 0.1, 3);
        p.current_state = Some(vec![1.0; 11]);
        p.sigma = 1.0;
        let out = solve_heat(&p, &mut rng()).unwrap();
        for f in &out.frames {
            assert_eq!(f[0], 0.0);
            assert_eq!(f[10], 0.0);
        }
    }

    #[test]
    fn instability_is_rejected_before_allocation() {
        let p = HeatParams::new(1.0, 1e-3, 1e-3, 10);
        let err = HeatSolver::new(&p).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Stability);
    }

    #[test]
    fn configuration_errors() {
        let mut p = HeatParams::new(0.5, 1e-4, 1e-2, 0);
        assert!(matches!(
            solve_heat(&p, &mut rng()),
            Err(SimError::InvalidParameter { name: "t_steps", .. })
        ));
        p.t_steps = 5;
        p.snapshot_interval = 0;
        assert!(solve_heat(&p, &mut rng()).is_err());
        p.snapshot_interval = 1;
        p.dt = -1.0;
        assert!(solve_heat(&p, &mut rng()).is_err());
        assert!("neumann".parse::<BoundaryCondition>().is_err());
    }

    #[test]
    fn mismatched_resume_falls_back_or_rejects() {
        let mut p = HeatParams::new(0.5, 1e-4, 1e-2, 2);
        p.current_state = Some(vec![0.3; 7]);
        let fresh = solve_heat(&HeatParams::new(0.5, 1e-4, 1e-2, 2), &mut rng()).unwrap();
        let out = solve_heat(&p, &mut rng()).unwrap();
        assert_eq!(out.frames, fresh.frames);

        p.resume_policy = ResumePolicy::Strict;
        let err = solve_heat(&p, &mut rng()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn non_finite_resume_state_is_rejected() {
        let mut p = HeatParams::new(0.5, 1e-4, 1e-2, 2);
        let mut state = vec![0.0; 101];
        state[40] = f64::NAN;
        p.current_state = Some(state);
        let err = solve_heat(&p, &mut rng()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, SimError::NonFiniteState { index: 40, .. }));

        // a wrong-length snapshot with garbage is still not adopted silently
        p.current_state = Some(vec![f64::INFINITY; 7]);
        assert!(solve_heat(&p, &mut rng()).is_err());
    }

    #[test]
    fn energy_of_initial_frame() {
        let mut p = HeatParams::new(0.1, 0.01, 0.5, 1);
        p.current_state = Some(vec![0.0, 2.0, 0.0]);
        let out = solve_heat(&p, &mut rng()).unwrap();
        assert_relative_eq!(out.energy[0], 4.0 * 0.5);
        assert_eq!(out.x, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn progress_sees_every_step() {
        let p = HeatParams::new(0.5, 1e-4, 1e-2, 7);
        let mut seen = Vec::new();
        HeatSolver::new(&p)
            .unwrap()
            .run_with_progress(&mut rng(), |n, total| seen.push((n, total)));
        assert_eq!(seen.len(), 7);
        assert_eq!(seen.last(), Some(&(7, 7)));
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let p: HeatParams =
            serde_json::from_str(r#"{"alpha":0.5,"dt":0.0001,"dx":0.01,"t_steps":50}"#).unwrap();
        assert_eq!(p, HeatParams::new(0.5, 1e-4, 1e-2, 50));
        let bad = serde_json::from_str::<HeatParams>(
            r#"{"alpha":0.5,"dt":0.0001,"dx":0.01,"t_steps":50,"init":"square"}"#,
        );
        assert!(bad.is_err());
    }
}
