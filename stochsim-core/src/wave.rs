//! 1-D damped stochastic wave equation `u_tt = c^2 u_xx - damping u_t + sigma xi`.
//!
//! Leapfrog in time with a centred damping term, which isolates the new level as
//!
//! ```text
//! u_next = [2 u - u_prev (1 - k/2) + r^2 D2(u) + sigma dt^2 N(0,1)] / (1 + k/2)
//! ```
//!
//! where `r = c dt / dx`, `k = damping dt` and `D2` is the three-point second
//! difference. Ends are fixed at zero.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SimError, require_non_negative, require_positive};
use crate::field::TripleBuffer;
use crate::forcing::StochasticForcing;
use crate::grid::{Grid1D, time_steps};
use crate::initial::WaveInit;
use crate::recorder::{Decimation, FrameRecorder};
use crate::resume::{self, ResumePolicy};
use crate::stability;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveParams {
    /// Wave speed.
    pub c: f64,
    pub damping: f64,
    pub sigma: f64,
    /// Horizon of this call.
    #[serde(rename = "T")]
    pub t_final: f64,
    pub dt: f64,
    pub dx: f64,
    pub domain_len: f64,
    pub init_type: WaveInit,
    /// Most recent displacement of a previous call.
    pub current_u: Option<Vec<f64>>,
    /// Displacement one step before `current_u`.
    pub current_u_prev: Option<Vec<f64>>,
    pub resume_policy: ResumePolicy,
}

impl Default for WaveParams {
    fn default() -> WaveParams {
        WaveParams {
            c: 1.0,
            damping: 0.0,
            sigma: 0.0,
            t_final: 5.0,
            dt: 0.05,
            dx: 0.1,
            domain_len: 10.0,
            init_type: WaveInit::Pulse,
            current_u: None,
            current_u_prev: None,
            resume_policy: ResumePolicy::Strict,
        }
    }
}

impl WaveParams {
    pub fn validate(&self) -> Result<(), SimError> {
        require_positive("c", self.c)?;
        require_non_negative("damping", self.damping)?;
        require_non_negative("sigma", self.sigma)?;
        require_positive("T", self.t_final)?;
        require_positive("dt", self.dt)?;
        require_positive("dx", self.dx)?;
        require_positive("domain_len", self.domain_len)?;
        Ok(())
    }
}

/// Every step's displacement plus the energy of each level that was stepped
/// from; `energy` is therefore one entry shorter than `frames`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveOutput {
    pub x: Vec<f64>,
    pub t: Vec<f64>,
    pub frames: Vec<Vec<f64>>,
    pub energy: Vec<f64>,
}

impl WaveOutput {
    /// `(current_u, current_u_prev)` for the next call.
    pub fn resume_state(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        match self.frames.as_slice() {
            [.., prev, last] => Some((last.clone(), prev.clone())),
            _ => None,
        }
    }
}

pub struct WaveSolver {
    grid: Grid1D,
    c: f64,
    r2: f64,
    k: f64,
    dt: f64,
    forcing: StochasticForcing,
    levels: TripleBuffer,
    nt: usize,
    steps_taken: usize,
}

impl WaveSolver {
    pub fn new(params: &WaveParams) -> Result<WaveSolver, SimError> {
        params.validate()?;
        let cfl = stability::check_wave(params.c, params.dt, params.dx)?;
        let nt = time_steps(params.t_final, params.dt)?;
        let grid = Grid1D::new(params.domain_len, params.dx)?;
        let n = grid.len();

        if let Some(u) = &params.current_u {
            resume::require_finite("current_u", u)?;
        }
        if let Some(u_prev) = &params.current_u_prev {
            resume::require_finite("current_u_prev", u_prev)?;
        }
        let candidate = resume::pair(
            params.current_u.as_deref(),
            params.current_u_prev.as_deref(),
            "current_u",
            "current_u_prev",
        )
        .map(|halves| {
            halves.and_then(|(u, p)| {
                Ok((
                    resume::profile("current_u", u, n)?,
                    resume::profile("current_u_prev", p, n)?,
                ))
            })
        });

        let (mut current, mut previous) = match resume::resolve(params.resume_policy, candidate)? {
            Some(levels) => levels,
            None => {
                let u = params.init_type.generate(&grid.coordinates());
                (u, Vec::new())
            }
        };
        pin_ends(&mut current);
        if previous.is_empty() {
            // zero initial velocity
            previous = current.clone();
        }
        pin_ends(&mut previous);
        debug!(n, nt, cfl, init = params.init_type.as_str(), "wave grid allocated");

        Ok(WaveSolver {
            c: params.c,
            r2: cfl * cfl,
            k: params.damping * params.dt,
            dt: params.dt,
            forcing: StochasticForcing::acceleration(params.sigma, params.dt),
            levels: TripleBuffer::new(previous, current),
            grid,
            nt,
            steps_taken: 0,
        })
    }

    pub fn grid(&self) -> &Grid1D {
        &self.grid
    }

    pub fn total_steps(&self) -> usize {
        self.nt
    }

    pub fn field(&self) -> &[f64] {
        self.levels.current()
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Advance one level and return the energy of the level stepped from.
    ///
    /// The leapfrog velocity `(u_next - u_prev) / 2dt` is centred on the
    /// current level, so its energy is only known once `u_next` exists.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let (r2, half_k) = (self.r2, 0.5 * self.k);
        let (prev, curr, next) = self.levels.split();
        let n = curr.len();

        for i in 1..(n - 1) {
            let d2 = curr[i + 1] - 2.0 * curr[i] + curr[i - 1];
            let forcing = self.forcing.sample(rng);
            next[i] =
                (2.0 * curr[i] - prev[i] * (1.0 - half_k) + r2 * d2 + forcing) / (1.0 + half_k);
        }
        next[0] = 0.0;
        next[n - 1] = 0.0;

        let e = energy(prev, curr, next, self.c, self.dt, self.grid.dx());
        self.levels.rotate();
        self.steps_taken += 1;
        e
    }

    pub fn run<R: Rng>(self, rng: &mut R) -> WaveOutput {
        self.run_with_progress(rng, |_, _| {})
    }

    pub fn run_with_progress<R: Rng>(
        mut self,
        rng: &mut R,
        mut progress: impl FnMut(usize, usize),
    ) -> WaveOutput {
        let nt = self.nt;
        let mut recorder = FrameRecorder::new(Decimation::Every(1), nt, self.dt);

        for n in 0..nt {
            let e = self.step(rng);
            // level n is now the previous level
            recorder.offer(n, || self.levels.previous().to_vec(), || Some(e));
            progress(n + 1, nt);
        }
        recorder.offer(nt, || self.field().to_vec(), || None);

        let rec = recorder.finish();
        info!(steps = nt, frames = rec.frames.len(), "wave solve finished");
        WaveOutput {
            x: self.grid.coordinates(),
            t: rec.t,
            frames: rec.frames,
            energy: rec.diagnostics,
        }
    }
}

/// `0.5 * sum(v^2 + c^2 s^2) * dx` with leapfrog velocity over interior
/// points and forward-difference strain over every cell.
fn energy(prev: &[f64], curr: &[f64], next: &[f64], c: f64, dt: f64, dx: f64) -> f64 {
    let n = curr.len();
    let kinetic: f64 = (1..(n - 1))
        .map(|i| {
            let v = (next[i] - prev[i]) / (2.0 * dt);
            v * v
        })
        .sum();
    let potential: f64 = curr
        .windows(2)
        .map(|w| {
            let s = (w[1] - w[0]) / dx;
            s * s
        })
        .sum();
    0.5 * kinetic * dx + 0.5 * c * c * potential * dx
}

fn pin_ends(u: &mut [f64]) {
    if let Some(first) = u.first_mut() {
        *first = 0.0;
    }
    if let Some(last) = u.last_mut() {
        *last = 0.0;
    }
}

/// One stateless wave call.
pub fn solve_wave<R: Rng>(params: &WaveParams, rng: &mut R) -> Result<WaveOutput, SimError> {
    Ok(WaveSolver::new(params)?.run(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(5)
    }

    fn small() -> WaveParams {
        WaveParams {
            t_final: 0.5,
            domain_len: 1.0,
            ..WaveParams::default()
        }
    }

    #[test]
    fn cfl_violation_is_a_stability_error() {
        let p = WaveParams {
            dt: 0.2,
            t_final: 1.0,
            ..WaveParams::default()
        };
        assert_eq!(solve_wave(&p, &mut rng()).unwrap_err().kind(), ErrorKind::Stability);
    }

    #[test]
    fn frame_and_energy_counts() {
        let out = solve_wave(&small(), &mut rng()).unwrap();
        assert_eq!(out.frames.len(), 11);
        assert_eq!(out.energy.len(), 10);
        assert_eq!(out.t.len(), 11);
        assert_relative_eq!(*out.t.last().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn one_undamped_step_matches_formula() {
        let mut p = small();
        p.t_final = 0.05;
        let u: Vec<f64> = vec![0.0, 0.2, 0.5, 1.0, 0.5, 0.2, 0.1, 0.0, 0.0, 0.0, 0.0];
        p.current_u = Some(u.clone());
        p.current_u_prev = Some(u);
        let out = solve_wave(&p, &mut rng()).unwrap();
        let next = &out.frames[1];
        let r2 = 0.25;
        // prev == curr, so u_next = u + r^2 D2(u)
        assert_relative_eq!(next[3], 1.0 + r2 * (0.5 - 2.0 + 0.5), epsilon = 1e-12);
        assert_relative_eq!(next[2], 0.5 + r2 * (1.0 - 1.0 + 0.2), epsilon = 1e-12);
    }

    #[test]
    fn damping_divides_by_one_plus_half_k() {
        let mut p = small();
        p.t_final = 0.05;
        p.damping = 4.0;
        let u = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        p.current_u = Some(u);
        p.current_u_prev = Some(vec![0.0; 11]);
        let out = solve_wave(&p, &mut rng()).unwrap();
        let k = 4.0 * 0.05;
        let expected = (2.0 - 0.0 + 0.25 * -2.0) / (1.0 + 0.5 * k);
        assert_relative_eq!(out.frames[1][3], expected, epsilon = 1e-12);
    }

    #[test]
    fn resumed_levels_are_used_verbatim() {
        let mut p = small();
        let first = solve_wave(&p, &mut rng()).unwrap();
        let (u, prev) = first.resume_state().unwrap();
        p.current_u = Some(u.clone());
        p.current_u_prev = Some(prev);
        let second = solve_wave(&p, &mut rng()).unwrap();
        assert_eq!(second.frames[0], u);
    }

    #[test]
    fn mismatched_resume_is_rejected_by_default() {
        let mut p = small();
        p.current_u = Some(vec![0.0; 5]);
        p.current_u_prev = Some(vec![0.0; 5]);
        let err = solve_wave(&p, &mut rng()).unwrap_err();
        assert!(matches!(err, SimError::ResumeShape(_)));

        p.current_u_prev = None;
        p.current_u = Some(vec![0.0; 11]);
        assert!(matches!(
            solve_wave(&p, &mut rng()),
            Err(SimError::ResumeShape(_))
        ));

        p.resume_policy = ResumePolicy::Fallback;
        let out = solve_wave(&p, &mut rng()).unwrap();
        assert_eq!(out.frames[0], solve_wave(&small(), &mut rng()).unwrap().frames[0]);
    }

    #[test]
    fn non_finite_previous_level_is_rejected() {
        let mut p = small();
        p.resume_policy = ResumePolicy::Fallback;
        p.current_u = Some(vec![0.0; 11]);
        let mut prev = vec![0.0; 11];
        prev[5] = f64::NEG_INFINITY;
        p.current_u_prev = Some(prev);
        let err = solve_wave(&p, &mut rng()).unwrap_err();
        assert!(matches!(
            err,
            SimError::NonFiniteState { field: "current_u_prev", index: 5, .. }
        ));
    }

    #[test]
    fn progress_sees_every_step() {
        let mut seen = Vec::new();
        let out = WaveSolver::new(&small())
            .unwrap()
            .run_with_progress(&mut rng(), |n, total| seen.push((n, total)));
        assert_eq!(seen.len(), 10);
        assert_eq!(seen.first(), Some(&(1, 10)));
        assert_eq!(seen.last(), Some(&(10, 10)));
        assert_eq!(out.frames.len(), seen.len() + 1);
    }

    #[test]
    fn energy_of_resting_pulse_is_pure_strain() {
        let curr = vec![0.0, 1.0, 0.0];
        let e = energy(&curr, &curr, &curr, 2.0, 0.1, 0.5);
        // strain^2 = 4 on both cells, 0.5 * c^2 * 8 * dx
        assert_relative_eq!(e, 0.5 * 4.0 * 8.0 * 0.5);
    }

    #[test]
    fn params_use_request_names() {
        let p: WaveParams =
            serde_json::from_str(r#"{"T": 2.0, "init_type": "string", "c": 0.5}"#).unwrap();
        assert_eq!(p.t_final, 2.0);
        assert_eq!(p.init_type, WaveInit::String);
        assert_eq!(p.resume_policy, ResumePolicy::Strict);
        assert_eq!(p.dx, 0.1);
    }
}
