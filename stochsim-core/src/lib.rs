//! Explicit finite-difference engine for stochastic PDEs.
//!
//! Three steppers share one grid/buffer model, stability gate, forcing
//! generator, resume adapter and frame recorder:
//!
//! - [`heat`]: 1-D diffusion, forward Euler with Euler-Maruyama noise.
//! - [`wave`]: 1-D damped wave, three-level leapfrog with energy accounting.
//! - [`reaction`]: 2-D Gray-Scott on a periodic lattice.
//!
//! Each call is stateless. Noise comes from the RNG the caller passes in, and
//! a long run is continued by feeding an output's `resume_state()` into the
//! next call's parameters.

pub mod error;
pub mod field;
pub mod forcing;
pub mod grid;
pub mod heat;
pub mod initial;
pub mod reaction;
pub mod recorder;
pub mod resume;
pub mod simulation;
pub mod stability;
pub mod wave;

pub use error::{ErrorKind, Scheme, SimError};
pub use heat::{BoundaryCondition, HeatOutput, HeatParams, HeatSolver, solve_heat};
pub use initial::{HeatInit, ReactionInit, WaveInit};
pub use reaction::{KineticRates, ReactionOutput, ReactionParams, ReactionSolver, solve_reaction};
pub use resume::ResumePolicy;
pub use simulation::Simulation;
pub use wave::{WaveOutput, WaveParams, WaveSolver, solve_wave};
