//! Errors surfaced by problem setup, stepping, and dense evaluation.

use crate::Float;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid orders, endpoints, or step-size sign caught before stepping.
    Configuration,
    /// Defect correction or step retries exhausted without meeting tolerance.
    Convergence,
    /// A requested evaluation point lies outside the integrated range.
    Domain,
    /// An ill-conditioned collocation system (e.g. near a turning point).
    Instability,
}

/// Failure of a single evolution or probe call.
///
/// Step rejection is handled internally by shrinking the step size; only the
/// conditions below terminate a call. Partial results are discarded.
#[derive(Debug, Clone)]
pub enum Error {
    InvalidOrder(&'static str, usize),
    OddCollocationOrder(usize),
    EqualEndpoints(Float),
    InvalidStepSign { h: Float, xi: Float, xf: Float },
    EvalOutOfRange { x: Float, lo: Float, hi: Float },
    ResolutionFailure { x: Float, h: Float },
    ProbeStalled { x: Float, h: Float },
    SingularCollocation { x: Float, h: Float },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidOrder(..)
            | Error::OddCollocationOrder(_)
            | Error::EqualEndpoints(_)
            | Error::InvalidStepSign { .. } => ErrorKind::Configuration,
            Error::ResolutionFailure { .. } | Error::ProbeStalled { .. } => {
                ErrorKind::Convergence
            }
            Error::EvalOutOfRange { .. } => ErrorKind::Domain,
            Error::SingularCollocation { .. } => ErrorKind::Instability,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidOrder(name, v) => {
                write!(f, "order {} must be a positive integer >= 2 (got {})", name, v)
            }
            Error::OddCollocationOrder(v) => {
                write!(f, "collocation order p must be even to embed a p/2 companion (got {})", v)
            }
            Error::EqualEndpoints(x) => {
                write!(f, "integration endpoints coincide (xi = xf = {})", x)
            }
            Error::InvalidStepSign { h, xi, xf } => write!(
                f,
                "init_stepsize {} contradicts the travel direction from {} to {}",
                h, xi, xf
            ),
            Error::EvalOutOfRange { x, lo, hi } => write!(
                f,
                "evaluation point {} is outside the integrated range [{}, {}]",
                x, lo, hi
            ),
            Error::ResolutionFailure { x, h } => write!(
                f,
                "step retries exhausted near x = {} (last step size {}); the interval \
                 cannot be resolved at the requested tolerance",
                x, h
            ),
            Error::ProbeStalled { x, h } => write!(
                f,
                "stepsize probe failed to converge at x = {} (last trial {})",
                x, h
            ),
            Error::SingularCollocation { x, h } => write!(
                f,
                "collocation system is numerically singular on the step [{}, {}]",
                x,
                x + h
            ),
        }
    }
}

impl std::error::Error for Error {}
