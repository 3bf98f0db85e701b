use std::fmt;

use thiserror::Error;

use crate::resume::ShapeMismatch;

/// Explicit scheme whose stability ratio is checked before stepping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// Forward-time centred-space diffusion, bounded by `alpha*dt/dx^2 <= 0.5`.
    Heat,
    /// Leapfrog wave scheme, bounded by `c*dt/dx <= 1.0`.
    Wave,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Heat => f.write_str("diffusion number r = alpha*dt/dx^2"),
            Scheme::Wave => f.write_str("CFL = c*dt/dx"),
        }
    }
}

/// Coarse classification of a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Stability,
    Divergence,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unknown {kind} `{value}` (expected one of: {expected})")]
    UnknownSelector {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("malformed parameter record: {0}")]
    MalformedRecord(String),

    #[error("resume state rejected: {0}")]
    ResumeShape(ShapeMismatch),

    #[error("resume state rejected: `{field}` holds non-finite value {value} at index {index}")]
    NonFiniteState {
        field: &'static str,
        index: usize,
        value: f64,
    },

    #[error(
        "unstable parameters: {scheme} = {ratio:.6} > {limit}; reduce dt, increase dx or lower the coefficient"
    )]
    Unstable {
        scheme: Scheme,
        ratio: f64,
        limit: f64,
    },

    #[error("simulation unstable at step {step}: non-finite value in field {field}; try a smaller dt")]
    Diverged { step: usize, field: &'static str },
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InvalidParameter { .. }
            | SimError::UnknownSelector { .. }
            | SimError::MalformedRecord(_)
            | SimError::ResumeShape(_)
            | SimError::NonFiniteState { .. } => ErrorKind::Configuration,
            SimError::Unstable { .. } => ErrorKind::Stability,
            SimError::Diverged { .. } => ErrorKind::Divergence,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

// ---- Parameter guards shared by the three parameter records ----

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be positive and finite, got {value}")))
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be non-negative and finite, got {value}")))
    }
}
