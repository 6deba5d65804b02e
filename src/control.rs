//! Step acceptance and step-size proposals.

use crate::Float;

/// Attempts allowed for one step before raising a resolution failure.
pub(crate) const MAX_STEP_ATTEMPTS: usize = 12;
/// Bounds on the growth/shrink of an accepted step's successor.
const GROW_MAX: Float = 2.0;
const SHRINK_MIN: Float = 0.5;
/// A rejected step is retried at half size.
const REJECT_FACTOR: Float = 0.5;

/// Verdict on one attempted step.
pub(crate) enum Verdict {
    Accept { h_next: Float },
    Reject { h_retry: Float },
}

/// Accept/reject logic shared by both regimes.
pub(crate) struct StepSizeController {
    pub eps: Float,
}

impl StepSizeController {
    pub fn new(eps: Float) -> Self {
        StepSizeController { eps }
    }

    /// Judge a step of size `h` with local error `err`, produced by a method
    /// of the given `order`. The successor proposal follows
    /// h * (eps / err)^(1/order), clamped to bounded growth and shrink.
    pub fn assess(&self, err: Float, h: Float, order: usize) -> Verdict {
        if err <= self.eps {
            let growth = if err <= Float::MIN_POSITIVE {
                GROW_MAX
            } else {
                (self.eps / err)
                    .powf(1.0 / order as Float)
                    .clamp(SHRINK_MIN, GROW_MAX)
            };
            Verdict::Accept { h_next: h * growth }
        } else {
            Verdict::Reject {
                h_retry: h * REJECT_FACTOR,
            }
        }
    }
}
