//! Regime selection and standalone stepsize probes.
//!
//! Neither probe advances any state: both refine a trial step size until the
//! coefficients are representable over the step to the stepsize-selection
//! tolerance `eps_h`, a looser knob than the acceptance tolerance.

use crate::coeffs::Coefficient;
use crate::error::Error;
use crate::problem::ProblemSpec;
use crate::Float;

const TWO_PI: Float = std::f64::consts::TAU as Float;

/// Probe refinement budget.
const PROBE_MAX: usize = 100;
/// Minimum oscillation count for the oscillatory regime.
const OSC_COUNT_MIN: Float = 1.0;
/// Maximum admissible relative variation of the coefficients over a step.
const OSC_VAR_MAX: Float = 4.0;

/// Which stepper applies to the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Oscillatory,
    NonOscillatory,
}

/// Refine a trial step for the oscillatory stepper at `x`.
///
/// Shrinks `h_trial` until omega and gamma, sampled on the `n_node` Chebyshev
/// nodes of the step, interpolate onto the interleaved refinement grid with a
/// maximum relative error below `eps_h`. Returns the refined step together
/// with the two stage estimates (the omega and gamma interpolation errors).
pub fn choose_osc_stepsize<W, G>(
    spec: &ProblemSpec<W, G>,
    x: Float,
    h_trial: Float,
    eps_h: Float,
) -> Result<(Float, Float, Float), Error>
where
    W: Coefficient,
    G: Coefficient,
{
    if h_trial == 0.0 || !h_trial.is_finite() {
        return Err(Error::ProbeStalled { x, h: h_trial });
    }
    let basis = spec.basis(spec.n_node);
    let mut h = h_trial;
    for _ in 0..PROBE_MAX {
        let ts = basis.scaled_nodes(x, h);
        let wn = spec.omega_at(&ts);
        let gn = spec.gamma_at(&ts);
        let tf: Vec<Float> = spec.refine.iter().map(|&s| x + 0.5 * h * (s + 1.0)).collect();
        let wa = spec.omega_at(&tf);
        let ga = spec.gamma_at(&tf);
        let wscale = wa.iter().fold(0.0 as Float, |m, w| m.max(w.abs()));

        let mut err_w = 0.0 as Float;
        let mut err_g = 0.0 as Float;
        let mut finite = true;
        for (m, &s) in spec.refine.iter().enumerate() {
            let wi = basis.interpolate_real(&wn, s);
            let gi = basis.interpolate_real(&gn, s);
            let tw = (wi - wa[m]).abs() / wa[m].abs().max(Float::MIN_POSITIVE);
            let tg = (gi - ga[m]).abs() / ga[m].abs().max(wscale).max(Float::MIN_POSITIVE);
            // Float::max ignores NaN, so non-finite samples must be caught
            // here or a window escaping the coefficients' domain would pass.
            if !tw.is_finite() || !tg.is_finite() {
                finite = false;
                break;
            }
            err_w = err_w.max(tw);
            err_g = err_g.max(tg);
        }
        if !finite {
            h *= 0.5;
            continue;
        }
        let err = err_w.max(err_g);
        if err <= eps_h {
            return Ok((h, err_w, err_g));
        }
        let shrink = (0.9 * (eps_h / err).powf(1.0 / (spec.n_node as Float - 1.0))).min(0.7);
        h *= shrink;
    }
    Err(Error::ProbeStalled { x, h })
}

/// Refine a trial step for the non-oscillatory stepper at `x`: halve until
/// max |omega| * |h| <= 1 + eps_h over the sampled step. The `eps_h` here is
/// the looser Chebyshev-step knob (typically ~0.2), not the oscillatory one.
pub fn choose_nonosc_stepsize<W, G>(
    spec: &ProblemSpec<W, G>,
    x: Float,
    h_trial: Float,
    eps_h: Float,
) -> Result<Float, Error>
where
    W: Coefficient,
    G: Coefficient,
{
    if h_trial == 0.0 || !h_trial.is_finite() {
        return Err(Error::ProbeStalled { x, h: h_trial });
    }
    let basis = spec.basis(spec.n_node);
    let mut h = h_trial;
    for _ in 0..PROBE_MAX {
        let ts = basis.scaled_nodes(x, h);
        let wn = spec.omega_at(&ts);
        if wn.iter().all(|w| w.is_finite()) {
            let wmax = wn.iter().fold(0.0 as Float, |m, w| m.max(w.abs()));
            if wmax * h.abs() <= 1.0 + eps_h {
                return Ok(h);
            }
        }
        h *= 0.5;
    }
    Err(Error::ProbeStalled { x, h })
}

/// Decide the regime for the next step from the refined candidate sizes.
/// `h_osc == 0` marks an unavailable oscillatory candidate.
pub(crate) fn select<W, G>(
    spec: &ProblemSpec<W, G>,
    x: Float,
    h_osc: Float,
    h_slo: Float,
) -> Regime
where
    W: Coefficient,
    G: Coefficient,
{
    if h_osc == 0.0 || h_osc.abs() <= h_slo.abs() {
        return Regime::NonOscillatory;
    }
    let basis = spec.basis(spec.n_node);
    let ts = basis.scaled_nodes(x, h_osc);
    let wn = spec.omega_at(&ts);
    let gn = spec.gamma_at(&ts);
    let np = wn.len() as Float;
    let wmean = wn.iter().fold(0.0 as Float, |s, w| s + w.abs()) / np;
    let wmax = wn.iter().fold(0.0 as Float, |m, w| m.max(w.abs()));

    let count = wmean * h_osc.abs() / TWO_PI;
    if !count.is_finite() || count <= OSC_COUNT_MIN {
        return Regime::NonOscillatory;
    }

    // Relative variation of the coefficients over the step: |h| max|f'| / scale,
    // with f' formed through the differentiation matrix.
    let dw = basis.differentiate(&wn);
    let dg = basis.differentiate(&gn);
    let scale = wmax.max(Float::MIN_POSITIVE);
    let var_w = 2.0 * dw.iter().fold(0.0 as Float, |m, d| m.max(d.abs())) / scale;
    let var_g = 2.0 * dg.iter().fold(0.0 as Float, |m, d| m.max(d.abs())) / scale;
    if var_w.max(var_g) >= OSC_VAR_MAX {
        return Regime::NonOscillatory;
    }
    Regime::Oscillatory
}

/// Local frequency-variation scale |omega / omega'| (and the gamma analogue)
/// over a probe window, used to seed the oscillatory trial step.
pub(crate) fn variation_scale<W, G>(
    spec: &ProblemSpec<W, G>,
    x: Float,
    h_probe: Float,
) -> Float
where
    W: Coefficient,
    G: Coefficient,
{
    let basis = spec.basis(spec.n_node);
    let ts = basis.scaled_nodes(x, h_probe);
    let wn = spec.omega_at(&ts);
    let gn = spec.gamma_at(&ts);
    if wn.iter().chain(gn.iter()).any(|v| !v.is_finite()) {
        return Float::INFINITY;
    }
    let wmax = wn.iter().fold(0.0 as Float, |m, w| m.max(w.abs()));
    // Physical derivative = (2/h) d/dsigma.
    let dw = basis.differentiate(&wn);
    let dg = basis.differentiate(&gn);
    let dmax = dw
        .iter()
        .chain(dg.iter())
        .fold(0.0 as Float, |m, d| m.max(d.abs()))
        * (2.0 / h_probe.abs());
    if dmax <= Float::MIN_POSITIVE || wmax <= Float::MIN_POSITIVE {
        return Float::INFINITY;
    }
    wmax / dmax
}
