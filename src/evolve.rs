//! The evolution driver: full-interval traversal, plus single-step
//! primitives for callers driving the loop manually.

use bon::Builder;
use num_complex::Complex;

use crate::coeffs::Coefficient;
use crate::control::{StepSizeController, Verdict, MAX_STEP_ATTEMPTS};
use crate::dense::{
    evaluate_records, interpolate_record, DenseOutputBuffer, StepData, StepRecord,
};
use crate::error::Error;
use crate::nonosc::nonosc_step;
use crate::osc::{osc_step, OscStep};
use crate::problem::ProblemSpec;
use crate::regime::{
    choose_nonosc_stepsize, choose_osc_stepsize, select, variation_scale, Regime,
};
use crate::status::Status;
use crate::Float;

/// Largest admissible step magnitude.
const H_MAX: Float = 1e8;
/// Representability knob handed to the non-oscillatory probe by the driver;
/// the caller's eps_h governs the oscillatory probe.
const NONOSC_PROBE_TOL: Float = 0.2;

/// Optional knobs of [`evolve`] and [`Evolver::new`].
#[derive(Builder)]
pub struct EvolveOptions {
    /// Signed initial step size. Its sign must match the travel direction.
    /// Defaults to sign(xf - xi) * min(1e8, 1 / |omega(xi)|).
    pub init_stepsize: Option<Float>,
    /// Points at which dense output is requested, in any order. Every point
    /// must lie within [min(xi, xf), max(xi, xf)].
    pub x_eval: Option<Vec<Float>>,
    /// Clip the final step to land exactly on xf instead of overshooting it.
    #[builder(default = false)]
    pub hard_stop: bool,
    /// Safety valve on the total number of step attempts.
    #[builder(default = 100_000)]
    pub nmax: usize,
}

impl Default for EvolveOptions {
    fn default() -> Self {
        EvolveOptions::builder().build()
    }
}

/// Per-evolution mutable state, exclusively owned by one [`Evolver`].
#[derive(Debug, Clone)]
pub struct IntegratorState {
    /// Current position.
    pub x: Float,
    pub y: Complex<Float>,
    pub dy: Complex<Float>,
    /// Working signed step size (the next trial seed).
    pub h: Float,
    /// Regime of the last accepted step.
    pub regime: Regime,
    pub naccept: usize,
    pub nreject: usize,
    /// Accepted oscillatory / non-oscillatory step counts.
    pub nosc: usize,
    pub nslo: usize,
}

/// Everything produced by a completed evolution: one entry per accepted step
/// for the first six vectors, dense output parallel to the requested points.
#[derive(Debug, Clone)]
pub struct EvolveResult {
    pub xs: Vec<Float>,
    pub ys: Vec<Complex<Float>>,
    pub dys: Vec<Complex<Float>>,
    pub step_sizes: Vec<Float>,
    pub phases: Vec<Complex<Float>>,
    pub step_types: Vec<Regime>,
    pub y_eval: Vec<Complex<Float>>,
    pub dy_eval: Vec<Complex<Float>>,
    pub naccept: usize,
    pub nreject: usize,
    pub nosc: usize,
    pub nslo: usize,
    pub status: Status,
}

enum Stage {
    Idle,
    Stepping,
    Done,
    Failed,
}

/// The adaptive state machine driving one traversal from xi toward xf.
///
/// [`evolve`] wraps `new` + [`run`](Self::run) + [`into_result`](Self::into_result);
/// the pieces are public so a caller can advance step by step, inspect the
/// [`IntegratorState`], or query dense output mid-flight via
/// [`solution`](Self::solution).
pub struct Evolver<'a, W, G> {
    spec: &'a ProblemSpec<W, G>,
    xf: Float,
    eps: Float,
    eps_h: Float,
    hard_stop: bool,
    nmax: usize,
    direction: Float,
    first: bool,
    state: IntegratorState,
    records: Vec<StepRecord>,
    buffer: DenseOutputBuffer,
    stage: Stage,
}

impl<'a, W: Coefficient, G: Coefficient> Evolver<'a, W, G> {
    /// Validate the configuration eagerly, before any stepping: endpoints
    /// must differ, the initial step must point from xi toward xf, and every
    /// evaluation point must lie within the nominal range.
    pub fn new(
        spec: &'a ProblemSpec<W, G>,
        xi: Float,
        xf: Float,
        yi: Complex<Float>,
        dyi: Complex<Float>,
        eps: Float,
        eps_h: Float,
        options: EvolveOptions,
    ) -> Result<Self, Error> {
        if xi == xf {
            return Err(Error::EqualEndpoints(xi));
        }
        let direction = if xf > xi { 1.0 } else { -1.0 };
        let h0 = match options.init_stepsize {
            Some(h) => {
                if h == 0.0 || !h.is_finite() || h.signum() != direction {
                    return Err(Error::InvalidStepSign { h, xi, xf });
                }
                h
            }
            None => direction * (1.0 / spec.omega_abs(xi)).min(H_MAX),
        };
        let (lo, hi) = (xi.min(xf), xi.max(xf));
        if let Some(xe) = &options.x_eval {
            for &t in xe {
                if !t.is_finite() || t < lo || t > hi {
                    return Err(Error::EvalOutOfRange { x: t, lo, hi });
                }
            }
        }
        let buffer = DenseOutputBuffer::new(options.x_eval.as_deref().unwrap_or(&[]), direction);
        Ok(Evolver {
            spec,
            xf,
            eps,
            eps_h,
            hard_stop: options.hard_stop,
            nmax: options.nmax,
            direction,
            first: true,
            state: IntegratorState {
                x: xi,
                y: yi,
                dy: dyi,
                h: h0,
                regime: Regime::NonOscillatory,
                naccept: 0,
                nreject: 0,
                nosc: 0,
                nslo: 0,
            },
            records: Vec::new(),
            buffer,
            stage: Stage::Idle,
        })
    }

    pub fn state(&self) -> &IntegratorState {
        &self.state
    }

    /// The accepted-step log so far.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Advance by one accepted step (retrying internally as needed).
    /// Returns `NoProgress` once the target has been reached.
    pub fn step(&mut self) -> Result<Status, Error> {
        if matches!(self.stage, Stage::Done | Stage::Failed) {
            return Ok(Status::NoProgress);
        }
        self.stage = Stage::Stepping;
        let spec = self.spec;
        let dir = self.direction;
        let x = self.state.x;

        if self.state.naccept + self.state.nreject >= self.nmax {
            self.stage = Stage::Failed;
            return Err(Error::ResolutionFailure { x, h: self.state.h });
        }

        // Candidate sizes for both regimes. The non-oscillatory scale is set
        // by 1/|omega|; the oscillatory one by how slowly the coefficients
        // vary, compounded with the controller's last proposal. Under
        // hard_stop the trials are clipped onto the target BEFORE probing,
        // so a refined candidate never spans past xf unprobed.
        let mut slo_trial = dir * (1.0 / spec.omega_abs(x)).min(H_MAX);
        if self.hard_stop && (x + slo_trial - self.xf) * dir > 0.0 {
            slo_trial = self.xf - x;
        }
        let mut h_slo = match choose_nonosc_stepsize(spec, x, slo_trial, NONOSC_PROBE_TOL) {
            Ok(h) => h,
            Err(e) => {
                self.stage = Stage::Failed;
                return Err(e);
            }
        };
        let mut osc_mag = variation_scale(spec, x, h_slo)
            .min(H_MAX)
            .max(h_slo.abs());
        if self.first {
            // The caller's init_stepsize caps the very first step.
            h_slo = dir * h_slo.abs().min(self.state.h.abs());
            osc_mag = osc_mag.min(self.state.h.abs());
        } else {
            osc_mag = osc_mag.max(self.state.h.abs().min(H_MAX));
        }
        let mut osc_trial = dir * osc_mag;
        if self.hard_stop && (x + osc_trial - self.xf) * dir > 0.0 {
            osc_trial = self.xf - x;
        }
        let h_osc = match choose_osc_stepsize(spec, x, osc_trial, self.eps_h) {
            Ok((h, _, _)) => h,
            // An unconverged probe just rules the oscillatory regime out
            // for this step; it is not fatal on its own.
            Err(_) => 0.0,
        };

        let mut regime = select(spec, x, h_osc, h_slo);
        let mut h = match regime {
            Regime::Oscillatory => h_osc,
            Regime::NonOscillatory => h_slo,
        };
        let ctrl = StepSizeController::new(self.eps);

        let mut attempts = 0;
        loop {
            attempts += 1;
            if attempts > MAX_STEP_ATTEMPTS {
                self.stage = Stage::Failed;
                return Err(Error::ResolutionFailure { x, h });
            }
            // Clip onto the target when hard_stop is set and the step would
            // reach it (within rounding); the record then lands on xf exactly.
            let span_eps = 4.0 * Float::EPSILON * x.abs().max(self.xf.abs());
            let clipped = self.hard_stop && (x + h - self.xf) * dir > -span_eps;
            if clipped {
                h = self.xf - x;
            }
            let x_end = if clipped { self.xf } else { x + h };

            match regime {
                Regime::Oscillatory => {
                    if let Some(s) = osc_step(spec, x, h, self.state.y, self.state.dy, self.eps)
                    {
                        if let Verdict::Accept { h_next } = ctrl.assess(s.err, h, spec.n) {
                            let rec =
                                oscillatory_record(x, x_end, h, self.state.y, self.state.dy, s);
                            return self.accept(rec, h_next);
                        }
                    }
                    // Rejected: shrink, and hand over to collocation once the
                    // candidate no longer beats the non-oscillatory scale.
                    self.state.nreject += 1;
                    h *= 0.5;
                    if h.abs() <= h_slo.abs() {
                        regime = Regime::NonOscillatory;
                        h = h_slo;
                    }
                }
                Regime::NonOscillatory => {
                    let s = match nonosc_step(spec, x, h, self.state.y, self.state.dy) {
                        Ok(s) => s,
                        Err(e) => {
                            self.stage = Stage::Failed;
                            return Err(e);
                        }
                    };
                    match ctrl.assess(s.err, h, spec.p) {
                        Verdict::Accept { h_next } => {
                            let rec = StepRecord {
                                x_start: x,
                                x_end,
                                h,
                                y_start: self.state.y,
                                dy_start: self.state.dy,
                                y_end: s.y,
                                dy_end: s.dy,
                                regime: Regime::NonOscillatory,
                                local_error: s.err,
                                phase: Complex::new(0.0, 0.0),
                                data: StepData::NonOscillatory {
                                    y_nodes: s.y_nodes,
                                    dy_nodes: s.dy_nodes,
                                },
                            };
                            return self.accept(rec, h_next);
                        }
                        Verdict::Reject { h_retry } => {
                            self.state.nreject += 1;
                            h = h_retry;
                        }
                    }
                }
            }
        }
    }

    fn accept(&mut self, rec: StepRecord, h_next: Float) -> Result<Status, Error> {
        let x_next = rec.x_end;
        if x_next == rec.x_start {
            // The step underflowed against the position.
            self.stage = Stage::Failed;
            return Err(Error::ResolutionFailure {
                x: rec.x_start,
                h: rec.h,
            });
        }
        self.buffer.flush(self.spec, &rec);
        self.state.x = x_next;
        self.state.y = rec.y_end;
        self.state.dy = rec.dy_end;
        self.state.h = h_next;
        self.state.regime = rec.regime;
        self.state.naccept += 1;
        match rec.regime {
            Regime::Oscillatory => self.state.nosc += 1,
            Regime::NonOscillatory => self.state.nslo += 1,
        }
        self.records.push(rec);
        self.first = false;
        if (self.xf - x_next) * self.direction <= 0.0 {
            self.stage = Stage::Done;
        }
        Ok(Status::Success)
    }

    /// Run to completion (target reached or crossed) or failure.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            match self.step()? {
                Status::Success => {}
                Status::NoProgress => return Ok(()),
            }
        }
    }

    /// Dense evaluation over the range covered so far; points outside it
    /// raise a domain error.
    pub fn solution(
        &self,
        xs: &[Float],
    ) -> Result<(Vec<Complex<Float>>, Vec<Complex<Float>>), Error> {
        evaluate_records(self.spec, &self.records, xs)
    }

    /// Assemble the final result. All requested evaluation points must have
    /// been covered by accepted steps.
    pub fn into_result(self) -> Result<EvolveResult, Error> {
        if let Some(t) = self.buffer.first_pending() {
            let (lo, hi) = match (self.records.first(), self.records.last()) {
                (Some(f), Some(l)) => (f.x_start.min(l.x_end), f.x_start.max(l.x_end)),
                _ => (Float::NAN, Float::NAN),
            };
            return Err(Error::EvalOutOfRange { x: t, lo, hi });
        }
        let n = self.records.len();
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        let mut dys = Vec::with_capacity(n);
        let mut step_sizes = Vec::with_capacity(n);
        let mut phases = Vec::with_capacity(n);
        let mut step_types = Vec::with_capacity(n);
        for rec in &self.records {
            xs.push(rec.x_end);
            ys.push(rec.y_end);
            dys.push(rec.dy_end);
            step_sizes.push(rec.h);
            phases.push(rec.phase);
            step_types.push(rec.regime);
        }
        let (y_eval, dy_eval) = self.buffer.into_results();
        Ok(EvolveResult {
            xs,
            ys,
            dys,
            step_sizes,
            phases,
            step_types,
            y_eval,
            dy_eval,
            naccept: self.state.naccept,
            nreject: self.state.nreject,
            nosc: self.state.nosc,
            nslo: self.state.nslo,
            status: Status::Success,
        })
    }
}

fn oscillatory_record(
    x: Float,
    x_end: Float,
    h: Float,
    y_start: Complex<Float>,
    dy_start: Complex<Float>,
    s: OscStep,
) -> StepRecord {
    StepRecord {
        x_start: x,
        x_end,
        h,
        y_start,
        dy_start,
        y_end: s.y,
        dy_end: s.dy,
        regime: Regime::Oscillatory,
        local_error: s.err,
        phase: s.phase,
        data: StepData::Oscillatory {
            u_coeffs: s.u_coeffs,
            phase_coeffs: s.phase_coeffs,
            a_plus: s.a_plus,
            a_minus: s.a_minus,
        },
    }
}

/// Solve y'' + 2 gamma y' + omega^2 y = 0 from (xi, yi, dyi) to xf.
///
/// `eps` is the local acceptance tolerance, `eps_h` the stepsize-selection
/// tolerance of the oscillatory probe. Dense output at `options.x_eval` comes
/// back parallel to the request order.
#[allow(clippy::too_many_arguments)]
pub fn evolve<W, G>(
    spec: &ProblemSpec<W, G>,
    xi: Float,
    xf: Float,
    yi: Complex<Float>,
    dyi: Complex<Float>,
    eps: Float,
    eps_h: Float,
    options: EvolveOptions,
) -> Result<EvolveResult, Error>
where
    W: Coefficient,
    G: Coefficient,
{
    let mut evolver = Evolver::new(spec, xi, xf, yi, dyi, eps, eps_h, options)?;
    evolver.run()?;
    evolver.into_result()
}

/// Reply of the single-step primitives [`osc_evolve`] and [`nonosc_evolve`].
#[derive(Debug, Clone)]
pub struct StepReply {
    /// `NoProgress` signals boundary-crossing or a step that could not be
    /// resolved; the state echoes the inputs in that case.
    pub status: Status,
    pub x_next: Float,
    /// Refined proposal for the next call's init_stepsize.
    pub h_next: Float,
    pub y_next: Complex<Float>,
    pub dy_next: Complex<Float>,
    /// Phase accumulated over the step (zero for non-oscillatory steps).
    pub phase: Complex<Float>,
    /// Dense output at the covered window of `x_eval`.
    pub y_eval: Vec<Complex<Float>>,
    pub dy_eval: Vec<Complex<Float>>,
    /// Position and length of the covered window within `x_eval`.
    pub dense_start: usize,
    pub dense_size: usize,
}

impl StepReply {
    fn no_progress(x: Float, h: Float, y: Complex<Float>, dy: Complex<Float>) -> Self {
        StepReply {
            status: Status::NoProgress,
            x_next: x,
            h_next: h,
            y_next: y,
            dy_next: dy,
            phase: Complex::new(0.0, 0.0),
            y_eval: Vec::new(),
            dy_eval: Vec::new(),
            dense_start: 0,
            dense_size: 0,
        }
    }
}

fn validate_single_step(x: Float, xf: Float, h: Float) -> Result<Float, Error> {
    if x == xf {
        return Err(Error::EqualEndpoints(x));
    }
    let dir = if xf > x { 1.0 } else { -1.0 };
    if h == 0.0 || !h.is_finite() || h.signum() != dir {
        return Err(Error::InvalidStepSign { h, xi: x, xf });
    }
    Ok(dir)
}

/// Dense output of one step over the covered window of `x_eval`, which must
/// be sorted in the travel direction.
fn flush_window<W, G>(
    spec: &ProblemSpec<W, G>,
    rec: &StepRecord,
    x_eval: Option<&[Float]>,
) -> (Vec<Complex<Float>>, Vec<Complex<Float>>, usize, usize)
where
    W: Coefficient,
    G: Coefficient,
{
    let xe = match x_eval {
        Some(v) if !v.is_empty() => v,
        _ => return (Vec::new(), Vec::new(), 0, 0),
    };
    let dir = rec.h.signum();
    let start = xe.partition_point(|&t| (t - rec.x_start) * dir <= 0.0);
    let end = xe.partition_point(|&t| (t - rec.x_end) * dir <= 0.0);
    let mut ys = Vec::with_capacity(end.saturating_sub(start));
    let mut dys = Vec::with_capacity(end.saturating_sub(start));
    for &t in &xe[start..end] {
        let (y, dy) = interpolate_record(spec, rec, t);
        ys.push(y);
        dys.push(dy);
    }
    let size = end - start;
    (ys, dys, start, size)
}

/// Take exactly one oscillatory step from `x` toward `xf`, including its own
/// acceptance logic, without touching any driver state. A step that would
/// cross `xf`, or that cannot be resolved within the retry budget, reports
/// `NoProgress` instead of advancing.
#[allow(clippy::too_many_arguments)]
pub fn osc_evolve<W, G>(
    spec: &ProblemSpec<W, G>,
    x: Float,
    xf: Float,
    y: Complex<Float>,
    dy: Complex<Float>,
    eps: Float,
    eps_h: Float,
    init_stepsize: Float,
    x_eval: Option<&[Float]>,
) -> Result<StepReply, Error>
where
    W: Coefficient,
    G: Coefficient,
{
    let dir = validate_single_step(x, xf, init_stepsize)?;
    let mut h = init_stepsize;
    if (x + h - xf) * dir > 0.0 {
        return Ok(StepReply::no_progress(x, h, y, dy));
    }
    let ctrl = StepSizeController::new(eps);
    for _ in 0..MAX_STEP_ATTEMPTS {
        if let Some(s) = osc_step(spec, x, h, y, dy, eps) {
            if let Verdict::Accept { h_next: grown } = ctrl.assess(s.err, h, spec.n) {
                let rec = oscillatory_record(x, x + h, h, y, dy, s);
                let x_next = rec.x_end;
                let (h_next, _, _) = choose_osc_stepsize(spec, x_next, grown, eps_h)?;
                let (y_eval, dy_eval, dense_start, dense_size) =
                    flush_window(spec, &rec, x_eval);
                return Ok(StepReply {
                    status: Status::Success,
                    x_next,
                    h_next,
                    y_next: rec.y_end,
                    dy_next: rec.dy_end,
                    phase: rec.phase,
                    y_eval,
                    dy_eval,
                    dense_start,
                    dense_size,
                });
            }
        }
        h *= 0.5;
    }
    Ok(StepReply::no_progress(x, init_stepsize, y, dy))
}

/// Take exactly one non-oscillatory (collocation) step from `x` toward `xf`.
/// The `eps_h` here is the looser Chebyshev-step representability knob.
#[allow(clippy::too_many_arguments)]
pub fn nonosc_evolve<W, G>(
    spec: &ProblemSpec<W, G>,
    x: Float,
    xf: Float,
    y: Complex<Float>,
    dy: Complex<Float>,
    eps: Float,
    eps_h: Float,
    init_stepsize: Float,
    x_eval: Option<&[Float]>,
) -> Result<StepReply, Error>
where
    W: Coefficient,
    G: Coefficient,
{
    let dir = validate_single_step(x, xf, init_stepsize)?;
    let mut h = init_stepsize;
    if (x + h - xf) * dir > 0.0 {
        return Ok(StepReply::no_progress(x, h, y, dy));
    }
    let ctrl = StepSizeController::new(eps);
    for _ in 0..MAX_STEP_ATTEMPTS {
        let s = nonosc_step(spec, x, h, y, dy)?;
        match ctrl.assess(s.err, h, spec.p) {
            Verdict::Accept { .. } => {
                let rec = StepRecord {
                    x_start: x,
                    x_end: x + h,
                    h,
                    y_start: y,
                    dy_start: dy,
                    y_end: s.y,
                    dy_end: s.dy,
                    regime: Regime::NonOscillatory,
                    local_error: s.err,
                    phase: Complex::new(0.0, 0.0),
                    data: StepData::NonOscillatory {
                        y_nodes: s.y_nodes,
                        dy_nodes: s.dy_nodes,
                    },
                };
                let x_next = rec.x_end;
                let trial = dir * (1.0 / spec.omega_abs(x_next)).min(H_MAX);
                let h_next = choose_nonosc_stepsize(spec, x_next, trial, eps_h)?;
                let (y_eval, dy_eval, dense_start, dense_size) =
                    flush_window(spec, &rec, x_eval);
                return Ok(StepReply {
                    status: Status::Success,
                    x_next,
                    h_next,
                    y_next: rec.y_end,
                    dy_next: rec.dy_end,
                    phase: rec.phase,
                    y_eval,
                    dy_eval,
                    dense_start,
                    dense_size,
                });
            }
            Verdict::Reject { h_retry } => h = h_retry,
        }
    }
    Ok(StepReply::no_progress(x, init_stepsize, y, dy))
}
