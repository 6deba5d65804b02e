//! Oscillatory stepping via Riccati defect correction.
//!
//! The Riccati transform u = y'/y turns the linear equation into
//! u' + u^2 + 2 gamma u + omega^2 = 0. Starting from the leading asymptotic
//! u = i omega - gamma, each sweep removes the algebraic part of the residual;
//! the differentiation matrix supplies u' on the step's Chebyshev nodes. The
//! endpoint update is an exact superposition of the two conjugate Riccati
//! solutions, so the Wronskian of the pair is preserved by construction.

use num_complex::Complex;

use crate::chebyshev::antiderivative;
use crate::coeffs::Coefficient;
use crate::problem::ProblemSpec;
use crate::Float;

/// Defect-correction sweep budget per step attempt.
const ITER_MAX: usize = 32;
/// Stop sweeping once the correction is safely below the step tolerance.
const CONV_MARGIN: Float = 0.1;

/// One converged oscillatory step.
pub(crate) struct OscStep {
    pub y: Complex<Float>,
    pub dy: Complex<Float>,
    /// Magnitude of the last correction relative to the solution, i.e. the
    /// phase error |int delta_u|.
    pub err: Float,
    /// Accumulated phase int u over the step.
    pub phase: Complex<Float>,
    /// Chebyshev coefficients of u on the step.
    pub u_coeffs: Vec<Complex<Float>>,
    /// Chebyshev coefficients of int u, in physical units, zero at the start.
    pub phase_coeffs: Vec<Complex<Float>>,
    pub a_plus: Complex<Float>,
    pub a_minus: Complex<Float>,
}

/// Attempt one oscillatory step over [x0, x0 + h]. `None` means the defect
/// correction failed to contract below `eps`; the caller shrinks the step or
/// switches regime.
pub(crate) fn osc_step<W, G>(
    spec: &ProblemSpec<W, G>,
    x0: Float,
    h: Float,
    y0: Complex<Float>,
    dy0: Complex<Float>,
    eps: Float,
) -> Option<OscStep>
where
    W: Coefficient,
    G: Coefficient,
{
    let basis = spec.basis(spec.n);
    let np = spec.n + 1;
    let ts = basis.scaled_nodes(x0, h);
    let ws = spec.omega_at(&ts);
    let gs = spec.gamma_at(&ts);
    let wmax = ws.iter().fold(0.0 as Float, |m, w| m.max(w.abs()));
    let floor = wmax * 1e-14 + Float::MIN_POSITIVE;

    let mut u: Vec<Complex<Float>> = (0..np)
        .map(|j| Complex::new(-gs[j], ws[j]))
        .collect();

    // Residual of the leading asymptotic, formed analytically:
    // R(i omega - gamma) = i omega' - gamma' - gamma^2. Evaluating the
    // quadratic terms directly would cancel catastrophically at large omega.
    let dws = basis.differentiate(&ws);
    let dgs = basis.differentiate(&gs);
    let mut r: Vec<Complex<Float>> = (0..np)
        .map(|j| {
            Complex::new(
                -(2.0 / h) * dgs[j] - gs[j] * gs[j],
                (2.0 / h) * dws[j],
            )
        })
        .collect();

    let mut delta = vec![Complex::new(0.0, 0.0); np];
    let mut prev = Float::INFINITY;
    let mut err = Float::INFINITY;
    for _ in 0..ITER_MAX {
        for j in 0..np {
            let den = (u[j] + gs[j]) * 2.0;
            if den.norm() < floor {
                return None;
            }
            delta[j] = -r[j] / den;
        }
        let corr = (basis.integrate(&delta) * (0.5 * h)).norm();
        if !corr.is_finite() {
            return None;
        }
        for j in 0..np {
            u[j] += delta[j];
        }
        let dd = basis.differentiate_complex(&delta);
        for j in 0..np {
            r[j] = dd[j] * (2.0 / h) + delta[j] * delta[j];
        }
        err = corr;
        if corr <= eps * CONV_MARGIN {
            break;
        }
        if corr >= prev {
            // Stopped contracting; good enough only if already below eps.
            break;
        }
        prev = corr;
    }
    if err > eps {
        return None;
    }

    let u_start = u[spec.n];
    let u_end = u[0];
    let denom = u_start - u_start.conj();
    if denom.norm() < floor {
        return None;
    }
    let a_plus = (dy0 - y0 * u_start.conj()) / denom;
    let a_minus = y0 - a_plus;

    let u_coeffs = basis.coefficients(&u);
    let phase_coeffs: Vec<Complex<Float>> = antiderivative(&u_coeffs)
        .into_iter()
        .map(|c| c * (0.5 * h))
        .collect();
    let phase: Complex<Float> = phase_coeffs.iter().copied().sum();

    let ep = phase.exp();
    let em = phase.conj().exp();
    let y1 = a_plus * ep + a_minus * em;
    let dy1 = a_plus * u_end * ep + a_minus * u_end.conj() * em;
    if !(y1.re.is_finite() && y1.im.is_finite() && dy1.re.is_finite() && dy1.im.is_finite()) {
        return None;
    }

    Some(OscStep {
        y: y1,
        dy: dy1,
        err,
        phase,
        u_coeffs,
        phase_coeffs,
        a_plus,
        a_minus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chebyshev::clenshaw;
    use crate::init;

    #[test]
    fn constant_frequency_step_is_exact() {
        // omega = 1, gamma = 0: y = e^{ix} for y(0) = 1, y'(0) = i.
        let spec = init(|_: Float| 1.0, |_: Float| 0.0, 32, 32, 32, 32).unwrap();
        let h = 7.5;
        let step = osc_step(
            &spec,
            0.0,
            h,
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 1.0),
            1e-12,
        )
        .unwrap();
        assert!((step.y - Complex::new(h.cos(), h.sin())).norm() < 1e-12);
        assert!((step.dy - Complex::new(-h.sin(), h.cos())).norm() < 1e-12);
        assert!((step.phase - Complex::new(0.0, h)).norm() < 1e-10);
        assert!(step.err <= 1e-12);
    }

    #[test]
    fn dense_representation_matches_endpoints() {
        let spec = init(|x: Float| x.sqrt(), |_: Float| 0.0, 32, 32, 32, 32).unwrap();
        let x0 = 100.0;
        let h = 40.0;
        let y0 = Complex::new(0.3, -0.1);
        let dy0 = Complex::new(1.0, 2.0);
        let step = osc_step(&spec, x0, h, y0, dy0, 1e-12).unwrap();
        // The stored representation reproduces the step start exactly.
        let u_s = clenshaw(&step.u_coeffs, -1.0);
        let p_s = clenshaw(&step.phase_coeffs, -1.0);
        let y_at_start = step.a_plus * p_s.exp() + step.a_minus * p_s.conj().exp();
        let dy_at_start = step.a_plus * u_s * p_s.exp()
            + step.a_minus * u_s.conj() * p_s.conj().exp();
        assert!((y_at_start - y0).norm() < 1e-9 * y0.norm().max(1.0));
        assert!((dy_at_start - dy0).norm() < 1e-9 * dy0.norm().max(1.0));
        // And the step end agrees with the reconstruction.
        let p_e = clenshaw(&step.phase_coeffs, 1.0);
        let u_e = clenshaw(&step.u_coeffs, 1.0);
        let y_at_end = step.a_plus * p_e.exp() + step.a_minus * p_e.conj().exp();
        let dy_at_end =
            step.a_plus * u_e * p_e.exp() + step.a_minus * u_e.conj() * p_e.conj().exp();
        assert!((y_at_end - step.y).norm() < 1e-10 * step.y.norm());
        assert!((dy_at_end - step.dy).norm() < 1e-10 * step.dy.norm());
    }
}
