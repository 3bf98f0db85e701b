//! Named initial conditions for each solver.

use std::f64::consts::PI;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::grid::Grid2D;

/// Seed of the heat `random` profile; it does not consume the call's stream.
pub const HEAT_RANDOM_SEED: u64 = 42;

// ---- Heat ----

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum HeatInit {
    /// Gaussian centred on the domain, width 5% of the extent.
    #[default]
    Pulse,
    /// One full sine period across the domain.
    Sin,
    /// Small fixed-seed noise.
    Random,
}

impl HeatInit {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatInit::Pulse => "pulse",
            HeatInit::Sin => "sin",
            HeatInit::Random => "random",
        }
    }

    pub fn generate(&self, x: &[f64]) -> Vec<f64> {
        let (x0, x1) = (x[0], x[x.len() - 1]);
        match self {
            HeatInit::Pulse => {
                let center = 0.5 * (x0 + x1);
                let mut width = 0.05 * (x1 - x0);
                if width == 0.0 {
                    width = 0.05;
                }
                x.iter()
                    .map(|&xi| (-(xi - center).powi(2) / (2.0 * width * width)).exp())
                    .collect()
            }
            HeatInit::Sin => x
                .iter()
                .map(|&xi| (2.0 * PI * (xi - x0) / (x1 - x0)).sin())
                .collect(),
            HeatInit::Random => {
                let mut rng = ChaCha8Rng::seed_from_u64(HEAT_RANDOM_SEED);
                x.iter()
                    .map(|_| {
                        let z: f64 = StandardNormal.sample(&mut rng);
                        0.1 * z
                    })
                    .collect()
            }
        }
    }
}

impl FromStr for HeatInit {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pulse" => Ok(HeatInit::Pulse),
            "sin" => Ok(HeatInit::Sin),
            "random" => Ok(HeatInit::Random),
            other => Err(unknown("heat initial condition", other, "pulse, sin, random")),
        }
    }
}

impl TryFrom<String> for HeatInit {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---- Wave ----

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum WaveInit {
    /// Gaussian bump `exp(-(x - L/2)^2 / 0.5)`.
    #[default]
    Pulse,
    /// Triangular pluck peaking at the middle grid point.
    String,
}

impl WaveInit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaveInit::Pulse => "pulse",
            WaveInit::String => "string",
        }
    }

    /// Displacement at rest; the solver pairs it with an equal previous level.
    pub fn generate(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        match self {
            WaveInit::Pulse => {
                let mid = 0.5 * x[n - 1];
                x.iter().map(|&xi| (-(xi - mid).powi(2) / 0.5).exp()).collect()
            }
            WaveInit::String => {
                let center = n / 2;
                let mut u = linspace(0.0, 1.0, center);
                u.extend(linspace(1.0, 0.0, n - center));
                u
            }
        }
    }
}

impl FromStr for WaveInit {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pulse" => Ok(WaveInit::Pulse),
            "string" => Ok(WaveInit::String),
            other => Err(unknown("wave initial condition", other, "pulse, string")),
        }
    }
}

impl TryFrom<String> for WaveInit {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---- Reaction-diffusion ----

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ReactionInit {
    /// Perturbed square patch in the middle of an otherwise resting lattice.
    #[default]
    RandomCenter,
    /// Small perturbation on every cell.
    RandomEverywhere,
    /// Ten 4x4 seeded squares at random positions.
    Spots,
}

pub const SPOT_COUNT: usize = 10;
const PERTURBATION: f64 = 0.05;

impl ReactionInit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionInit::RandomCenter => "random_center",
            ReactionInit::RandomEverywhere => "random_everywhere",
            ReactionInit::Spots => "spots",
        }
    }

    /// `(U, V)` in x-major storage. The resting state is `U = 1, V = 0`.
    pub fn generate<R: Rng>(&self, grid: &Grid2D, rng: &mut R) -> (Vec<f64>, Vec<f64>) {
        let (nx, ny) = (grid.nx(), grid.ny());
        let mut u = vec![1.0; grid.len()];
        let mut v = vec![0.0; grid.len()];

        match self {
            ReactionInit::RandomCenter => {
                let (cx, cy) = (nx / 2, ny / 2);
                let r = (nx / 4).min(ny / 4).min(10).max(1);
                for i in cx.saturating_sub(r)..(cx + r).min(nx) {
                    for j in cy.saturating_sub(r)..(cy + r).min(ny) {
                        let k = grid.index(i, j);
                        u[k] = 0.5 + PERTURBATION * normal(rng);
                        v[k] = 0.25 + PERTURBATION * normal(rng);
                    }
                }
            }
            ReactionInit::RandomEverywhere => {
                for k in 0..grid.len() {
                    u[k] += PERTURBATION * normal(rng);
                    v[k] += PERTURBATION * normal(rng);
                }
            }
            ReactionInit::Spots => {
                for _ in 0..SPOT_COUNT {
                    let rx = rng.gen_range(0..nx);
                    let ry = rng.gen_range(0..ny);
                    for i in rx.saturating_sub(2)..(rx + 2).min(nx) {
                        for j in ry.saturating_sub(2)..(ry + 2).min(ny) {
                            let k = grid.index(i, j);
                            u[k] = 0.5;
                            v[k] = 0.25;
                        }
                    }
                }
            }
        }
        (u, v)
    }
}

impl FromStr for ReactionInit {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random_center" => Ok(ReactionInit::RandomCenter),
            "random_everywhere" => Ok(ReactionInit::RandomEverywhere),
            "spots" => Ok(ReactionInit::Spots),
            other => Err(unknown(
                "reaction initial condition",
                other,
                "random_center, random_everywhere, spots",
            )),
        }
    }
}

impl TryFrom<String> for ReactionInit {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

fn normal<R: Rng>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let last = (n - 1) as f64;
            (0..n).map(|k| a + (b - a) * k as f64 / last).collect()
        }
    }
}

fn unknown(kind: &'static str, value: &str, expected: &'static str) -> SimError {
    SimError::UnknownSelector {
        kind,
        value: value.to_string(),
        expected,
    }
}
