//! Adoption of caller-supplied prior state.
//!
//! A resume snapshot is shape-checked against the grid before any of it is
//! used. On a match it is deep-copied into fresh buffers; on a mismatch the
//! [`ResumePolicy`] decides between discarding it (fresh initial condition)
//! and rejecting the call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SimError;
use crate::field::flatten_rows;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ResumePolicy {
    /// Discard a mismatched snapshot and start from the initial condition.
    #[default]
    Fallback,
    /// Reject the call with a configuration error.
    Strict,
}

impl ResumePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumePolicy::Fallback => "fallback",
            ResumePolicy::Strict => "strict",
        }
    }
}

impl FromStr for ResumePolicy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fallback" => Ok(ResumePolicy::Fallback),
            "strict" => Ok(ResumePolicy::Strict),
            other => Err(SimError::UnknownSelector {
                kind: "resume policy",
                value: other.to_string(),
                expected: "fallback, strict",
            }),
        }
    }
}

impl TryFrom<String> for ResumePolicy {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Why a supplied snapshot could not be adopted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub field: &'static str,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` has shape {}, grid expects {}",
            self.field, self.found, self.expected
        )
    }
}

impl ShapeMismatch {
    /// One half of a two-field snapshot was supplied without the other.
    pub fn missing(field: &'static str) -> ShapeMismatch {
        ShapeMismatch {
            field,
            expected: "a snapshot".to_string(),
            found: "nothing".to_string(),
        }
    }
}

/// Reject a snapshot carrying NaN or an infinity, whatever the policy.
///
/// `index` counts in row-major order for `[x][y]` snapshots.
pub fn require_finite<'a>(
    field: &'static str,
    values: impl IntoIterator<Item = &'a f64>,
) -> Result<(), SimError> {
    match values.into_iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(SimError::NonFiniteState { field, index, value }),
        None => Ok(()),
    }
}

/// Check a 1-D snapshot against the grid length and copy it out.
pub fn profile(field: &'static str, data: &[f64], n: usize) -> Result<Vec<f64>, ShapeMismatch> {
    if data.len() == n {
        Ok(data.to_vec())
    } else {
        Err(ShapeMismatch {
            field,
            expected: format!("[{n}]"),
            found: format!("[{}]", data.len()),
        })
    }
}

/// Check a `[x][y]` snapshot against the lattice and flatten it.
pub fn lattice(
    field: &'static str,
    rows: &[Vec<f64>],
    nx: usize,
    ny: usize,
) -> Result<Vec<f64>, ShapeMismatch> {
    flatten_rows(rows, nx, ny).ok_or_else(|| ShapeMismatch {
        field,
        expected: format!("[{nx}][{ny}]"),
        found: describe_rows(rows),
    })
}

/// Pair two optional snapshot halves; a lone half counts as a mismatch.
pub fn pair<A, B>(
    first: Option<A>,
    second: Option<B>,
    first_name: &'static str,
    second_name: &'static str,
) -> Option<Result<(A, B), ShapeMismatch>> {
    match (first, second) {
        (None, None) => None,
        (Some(a), Some(b)) => Some(Ok((a, b))),
        (Some(_), None) => Some(Err(ShapeMismatch::missing(second_name))),
        (None, Some(_)) => Some(Err(ShapeMismatch::missing(first_name))),
    }
}

/// Apply the policy to a checked candidate.
///
/// `None` means nothing was supplied. The result is `Some` only when the
/// snapshot is adopted.
pub fn resolve<T>(
    policy: ResumePolicy,
    candidate: Option<Result<T, ShapeMismatch>>,
) -> Result<Option<T>, SimError> {
    match candidate {
        None => Ok(None),
        Some(Ok(state)) => Ok(Some(state)),
        Some(Err(mismatch)) => match policy {
            ResumePolicy::Strict => Err(SimError::ResumeShape(mismatch)),
            ResumePolicy::Fallback => {
                warn!(%mismatch, "discarding resume state; using fresh initial condition");
                Ok(None)
            }
        },
    }
}

fn describe_rows(rows: &[Vec<f64>]) -> String {
    match rows.first() {
        None => "[0]".to_string(),
        Some(first) if rows.iter().all(|r| r.len() == first.len()) => {
            format!("[{}][{}]", rows.len(), first.len())
        }
        Some(_) => format!("[{}][ragged]", rows.len()),
    }
}
