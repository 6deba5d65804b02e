//! Convenient prelude: import the most commonly used traits, types, and
//! functions.
//!
//! Bring this into scope with:
//!
//! ```rust
//! use riccati::prelude::*;
//! ```

pub use crate::{
    choose_nonosc_stepsize, choose_osc_stepsize, evolve, init, nonosc_evolve, osc_evolve,
    Coefficient, Complex, Error, ErrorKind, EvolveOptions, EvolveResult, Evolver, Float,
    ProblemSpec, Regime, Status, StepReply,
};
