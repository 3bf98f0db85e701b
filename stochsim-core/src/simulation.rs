use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SimError;
use crate::heat::{HeatOutput, HeatParams, solve_heat};
use crate::reaction::{ReactionOutput, ReactionParams, solve_reaction};
use crate::wave::{WaveOutput, WaveParams, solve_wave};

/// A parameter record that can be solved as one stateless call and chained
/// into the next call through the previous output.
pub trait Simulation: Clone + Serialize + DeserializeOwned {
    type Output: Serialize + DeserializeOwned;

    const NAME: &'static str;

    fn solve<R: Rng>(&self, rng: &mut R) -> Result<Self::Output, SimError>;

    /// Parse a JSON parameter record. Syntax errors and unknown selectors
    /// are both configuration errors.
    fn from_json(json: &str) -> Result<Self, SimError> {
        serde_json::from_str(json).map_err(|e| SimError::MalformedRecord(e.to_string()))
    }

    /// Load the resume state carried by `previous`; false if it has none.
    fn resume_from(&mut self, previous: &Self::Output) -> bool;

    /// Selector choices of this record, e.g. `init=pulse policy=strict`.
    fn summary(&self) -> String;

    fn frame_count(output: &Self::Output) -> usize;

    /// Scalar diagnostic of the last frame that has one.
    fn final_diagnostic(output: &Self::Output) -> Option<f64>;
}

impl Simulation for HeatParams {
    type Output = HeatOutput;

    const NAME: &'static str = "heat";

    fn solve<R: Rng>(&self, rng: &mut R) -> Result<HeatOutput, SimError> {
        solve_heat(self, rng)
    }

    fn resume_from(&mut self, previous: &HeatOutput) -> bool {
        self.current_state = previous.resume_state();
        self.current_state.is_some()
    }

    fn summary(&self) -> String {
        format!(
            "init={} bc={} policy={}",
            self.init.as_str(),
            self.bc.as_str(),
            self.resume_policy.as_str()
        )
    }

    fn frame_count(output: &HeatOutput) -> usize {
        output.frames.len()
    }

    fn final_diagnostic(output: &HeatOutput) -> Option<f64> {
        output.energy.last().copied()
    }
}

impl Simulation for WaveParams {
    type Output = WaveOutput;

    const NAME: &'static str = "wave";

    fn solve<R: Rng>(&self, rng: &mut R) -> Result<WaveOutput, SimError> {
        solve_wave(self, rng)
    }

    fn resume_from(&mut self, previous: &WaveOutput) -> bool {
        match previous.resume_state() {
            Some((u, u_prev)) => {
                self.current_u = Some(u);
                self.current_u_prev = Some(u_prev);
                true
            }
            None => false,
        }
    }

    fn summary(&self) -> String {
        format!(
            "init={} policy={}",
            self.init_type.as_str(),
            self.resume_policy.as_str()
        )
    }

    fn frame_count(output: &WaveOutput) -> usize {
        output.frames.len()
    }

    fn final_diagnostic(output: &WaveOutput) -> Option<f64> {
        output.energy.last().copied()
    }
}

impl Simulation for ReactionParams {
    type Output = ReactionOutput;

    const NAME: &'static str = "reaction";

    fn solve<R: Rng>(&self, rng: &mut R) -> Result<ReactionOutput, SimError> {
        solve_reaction(self, rng)
    }

    fn resume_from(&mut self, previous: &ReactionOutput) -> bool {
        match previous.resume_state() {
            Some((u, v)) => {
                self.current_u = Some(u);
                self.current_v = Some(v);
                true
            }
            None => false,
        }
    }

    fn summary(&self) -> String {
        format!(
            "init={} policy={}",
            self.init_type.as_str(),
            self.resume_policy.as_str()
        )
    }

    fn frame_count(output: &ReactionOutput) -> usize {
        output.u.len()
    }

    fn final_diagnostic(_: &ReactionOutput) -> Option<f64> {
        None
    }
}
