//! An adaptive solver for second-order linear ODEs of the form
//! y'' + 2 gamma(x) y' + omega(x)^2 y = 0 whose solutions range from rapidly
//! oscillatory to smooth within the same interval.
//!
//! Two steppers share one adaptive loop: an oscillatory integrator that
//! solves the Riccati phase equation by spectral defect correction, and a
//! non-oscillatory Chebyshev collocation integrator with an embedded
//! lower-order companion for error estimation. The driver picks a regime
//! before every step, accepts or retries against the caller's tolerance, and
//! assembles dense output at arbitrary requested points in either travel
//! direction.
//!
//! ```ignore
//! use riccati::prelude::*;
//!
//! let spec = riccati::init(|x: f64| x.sqrt(), |_: f64| 0.0, 32, 32, 32, 32)?;
//! let result = riccati::evolve(
//!     &spec, 1.0, 1e6, yi, dyi, 1e-12, 1e-13,
//!     EvolveOptions::builder().init_stepsize(0.01).build(),
//! )?;
//! ```

mod chebyshev;
mod coeffs;
mod control;
mod dense;
mod error;
mod evolve;
mod linalg;
mod nonosc;
mod osc;
mod problem;
mod regime;
mod status;

pub mod prelude;

pub use chebyshev::SpectralBasis;
pub use coeffs::Coefficient;
pub use dense::StepRecord;
pub use error::{Error, ErrorKind};
pub use evolve::{
    evolve, nonosc_evolve, osc_evolve, EvolveOptions, EvolveResult, Evolver, IntegratorState,
    StepReply,
};
pub use problem::{init, ProblemSpec};
pub use regime::{choose_nonosc_stepsize, choose_osc_stepsize, Regime};
pub use status::Status;

pub use num_complex::Complex;

// Prevent selecting two incompatible float precision features at once.
#[cfg(all(feature = "f32", feature = "f64"))]
compile_error!(
    "features 'f32' and 'f64' cannot both be enabled; pick exactly one Float precision feature"
);

/// Scalar precision of the solver, selected by the `f32`/`f64` features.
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f64")]
pub type Float = f64;
