//! Dense output: the accepted-step log and interpolation at requested points.
//!
//! Accepted steps form an append-only arena of [`StepRecord`]s; the buffer
//! holds indices and sorted request positions, never copies of step data.
//! Each record carries the representation its step was produced with, so
//! oscillatory steps reconstruct from the stored phase while non-oscillatory
//! steps interpolate their collocation values barycentrically.

use num_complex::Complex;

use crate::chebyshev::clenshaw;
use crate::coeffs::Coefficient;
use crate::error::Error;
use crate::problem::ProblemSpec;
use crate::regime::Regime;
use crate::Float;

/// Representation of one accepted step, enough to evaluate (y, y') anywhere
/// inside it.
pub(crate) enum StepData {
    Oscillatory {
        u_coeffs: Vec<Complex<Float>>,
        phase_coeffs: Vec<Complex<Float>>,
        a_plus: Complex<Float>,
        a_minus: Complex<Float>,
    },
    NonOscillatory {
        y_nodes: Vec<Complex<Float>>,
        dy_nodes: Vec<Complex<Float>>,
    },
}

/// One accepted step. Immutable once appended; consecutive records are
/// contiguous (the end of one is the start of the next).
pub struct StepRecord {
    pub x_start: Float,
    /// Landing position; exactly the target endpoint for a hard-stop-clipped
    /// final step.
    pub x_end: Float,
    /// Signed step size the stepper ran with; the sign is the travel
    /// direction.
    pub h: Float,
    pub y_start: Complex<Float>,
    pub dy_start: Complex<Float>,
    pub y_end: Complex<Float>,
    pub dy_end: Complex<Float>,
    pub regime: Regime,
    pub local_error: Float,
    /// Accumulated phase over the step (zero for non-oscillatory steps).
    pub phase: Complex<Float>,
    pub(crate) data: StepData,
}

/// Evaluate (y, y') of a recorded step at `t`, which must lie inside it.
pub(crate) fn interpolate_record<W, G>(
    spec: &ProblemSpec<W, G>,
    rec: &StepRecord,
    t: Float,
) -> (Complex<Float>, Complex<Float>)
where
    W: Coefficient,
    G: Coefficient,
{
    let span = rec.x_end - rec.x_start;
    let sigma = (2.0 * (t - rec.x_start) / span - 1.0).clamp(-1.0, 1.0);
    match &rec.data {
        StepData::Oscillatory {
            u_coeffs,
            phase_coeffs,
            a_plus,
            a_minus,
        } => {
            let u = clenshaw(u_coeffs, sigma);
            let up = clenshaw(phase_coeffs, sigma);
            let ep = up.exp();
            let em = up.conj().exp();
            let y = *a_plus * ep + *a_minus * em;
            let dy = *a_plus * u * ep + *a_minus * u.conj() * em;
            (y, dy)
        }
        StepData::NonOscillatory { y_nodes, dy_nodes } => {
            let basis = spec.basis(spec.p);
            (
                basis.interpolate(y_nodes, sigma),
                basis.interpolate(dy_nodes, sigma),
            )
        }
    }
}

/// Pending evaluation requests plus their results.
///
/// Requests are sorted into travel order up front while remembering their
/// original positions, so ascending, descending, or shuffled inputs all
/// produce identical per-point results. As steps are accepted, the covered
/// prefix of the pending window is flushed.
pub(crate) struct DenseOutputBuffer {
    sorted: Vec<Float>,
    origin: Vec<usize>,
    cursor: usize,
    y: Vec<Complex<Float>>,
    dy: Vec<Complex<Float>>,
}

impl DenseOutputBuffer {
    pub fn new(x_eval: &[Float], direction: Float) -> Self {
        let mut origin: Vec<usize> = (0..x_eval.len()).collect();
        origin.sort_by(|&a, &b| {
            if direction > 0.0 {
                x_eval[a].total_cmp(&x_eval[b])
            } else {
                x_eval[b].total_cmp(&x_eval[a])
            }
        });
        let sorted: Vec<Float> = origin.iter().map(|&i| x_eval[i]).collect();
        let zero = Complex::new(0.0, 0.0);
        DenseOutputBuffer {
            sorted,
            origin,
            cursor: 0,
            y: vec![zero; x_eval.len()],
            dy: vec![zero; x_eval.len()],
        }
    }

    /// Flush every pending request covered by the newly accepted step.
    pub fn flush<W, G>(&mut self, spec: &ProblemSpec<W, G>, rec: &StepRecord)
    where
        W: Coefficient,
        G: Coefficient,
    {
        let dir = rec.h.signum();
        let x_end = rec.x_end;
        while self.cursor < self.sorted.len() {
            let t = self.sorted[self.cursor];
            if (t - x_end) * dir > 0.0 {
                break;
            }
            let (y, dy) = interpolate_record(spec, rec, t);
            let i = self.origin[self.cursor];
            self.y[i] = y;
            self.dy[i] = dy;
            self.cursor += 1;
        }
    }

    /// First request not yet covered by any accepted step.
    pub fn first_pending(&self) -> Option<Float> {
        self.sorted.get(self.cursor).copied()
    }

    pub fn into_results(self) -> (Vec<Complex<Float>>, Vec<Complex<Float>>) {
        (self.y, self.dy)
    }
}

/// Evaluate (y, y') at arbitrary points against a finished step log. Points
/// are located by binary search on the step starts; anything outside the
/// achieved range raises a domain error.
pub(crate) fn evaluate_records<W, G>(
    spec: &ProblemSpec<W, G>,
    records: &[StepRecord],
    xs: &[Float],
) -> Result<(Vec<Complex<Float>>, Vec<Complex<Float>>), Error>
where
    W: Coefficient,
    G: Coefficient,
{
    let (lo, hi) = match records {
        [] => (Float::NAN, Float::NAN),
        [only] => (only.x_start.min(only.x_end), only.x_start.max(only.x_end)),
        [first, .., last] => (
            first.x_start.min(last.x_end),
            first.x_start.max(last.x_end),
        ),
    };
    let mut ys = Vec::with_capacity(xs.len());
    let mut dys = Vec::with_capacity(xs.len());
    for &t in xs {
        if !(t >= lo && t <= hi) {
            return Err(Error::EvalOutOfRange { x: t, lo, hi });
        }
        let dir = records[0].h.signum();
        let i = records.partition_point(|r| (r.x_start - t) * dir <= 0.0);
        let rec = &records[i - 1];
        let (y, dy) = interpolate_record(spec, rec, t);
        ys.push(y);
        dys.push(dy);
    }
    Ok((ys, dys))
}
