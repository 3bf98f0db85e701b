use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Independent Gaussian forcing with a scheme-specific amplitude.
///
/// An inactive generator (`sigma == 0`) never touches the random stream, which
/// keeps noiseless runs bit-identical whatever RNG the caller passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StochasticForcing {
    amplitude: f64,
}

impl StochasticForcing {
    /// Wiener increment for first-order-in-time schemes: `sigma * sqrt(dt)`.
    pub fn euler_maruyama(sigma: f64, dt: f64) -> StochasticForcing {
        StochasticForcing {
            amplitude: sigma * dt.sqrt(),
        }
    }

    /// Force term entering a second difference in time: `sigma * dt^2`.
    pub fn acceleration(sigma: f64, dt: f64) -> StochasticForcing {
        StochasticForcing {
            amplitude: sigma * dt * dt,
        }
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn is_active(&self) -> bool {
        self.amplitude != 0.0
    }

    /// One scaled draw, or exactly `0.0` without drawing when inactive.
    #[inline]
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.is_active() {
            let z: f64 = StandardNormal.sample(rng);
            self.amplitude * z
        } else {
            0.0
        }
    }

    /// Add an independent draw to every element of `values`.
    pub fn add_to<R: Rng>(&self, rng: &mut R, values: &mut [f64]) {
        if !self.is_active() {
            return;
        }
        for v in values.iter_mut() {
            let z: f64 = StandardNormal.sample(rng);
            *v += self.amplitude * z;
        }
    }
}
