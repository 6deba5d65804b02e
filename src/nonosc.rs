//! Non-oscillatory stepping by direct Chebyshev spectral collocation.
//!
//! The step solves y'' + 2 gamma y' + omega^2 y = 0 on the p + 1 nodes of
//! [x0, x0 + h] with both initial conditions imposed at the step start, and
//! repeats the solve at order p/2 as the embedded companion of the pair; the
//! endpoint disagreement of the two is the local error estimate.

use num_complex::Complex;

use crate::coeffs::Coefficient;
use crate::error::Error;
use crate::linalg::LuFactors;
use crate::problem::ProblemSpec;
use crate::{Float, SpectralBasis};

/// One non-oscillatory step with its embedded error estimate.
pub(crate) struct NonoscStep {
    pub y: Complex<Float>,
    pub dy: Complex<Float>,
    /// Relative endpoint difference between the order-p and order-p/2 solves.
    pub err: Float,
    /// y at the p + 1 collocation nodes (dense-output representation).
    pub y_nodes: Vec<Complex<Float>>,
    /// y' at the p + 1 collocation nodes.
    pub dy_nodes: Vec<Complex<Float>>,
}

/// Solve the collocation system of one order on [x0, x0 + h]. The rows
/// collocating at the two extreme nodes are replaced by the value and
/// derivative conditions at the step start.
fn collocate<W, G>(
    spec: &ProblemSpec<W, G>,
    basis: &SpectralBasis,
    x0: Float,
    h: Float,
    y0: Complex<Float>,
    dy0: Complex<Float>,
) -> Result<(Vec<Complex<Float>>, Vec<Complex<Float>>), Error>
where
    W: Coefficient,
    G: Coefficient,
{
    let k = basis.order;
    let np = k + 1;
    let ts = basis.scaled_nodes(x0, h);
    let ws = spec.omega_at(&ts);
    let gs = spec.gamma_at(&ts);

    // The system is assembled pre-multiplied by h^2/4 (and the derivative
    // row by h/2) to keep the row magnitudes balanced for any step size:
    // D^2 y + h gamma D y + (h/2)^2 omega^2 y = 0.
    let half_h = 0.5 * h;
    let mut m = vec![0.0 as Float; np * np];
    for i in 1..k {
        for j in 0..np {
            let mut d2 = 0.0;
            for l in 0..np {
                d2 += basis.diff[i * np + l] * basis.diff[l * np + j];
            }
            let mut entry = d2 + h * gs[i] * basis.diff[i * np + j];
            if i == j {
                entry += half_h * half_h * ws[i] * ws[i];
            }
            m[i * np + j] = entry;
        }
    }
    // Initial conditions at the step start (the last node).
    m[..np].copy_from_slice(&basis.diff[k * np..(k + 1) * np]);
    m[k * np + k] = 1.0;

    let mut rhs = vec![Complex::new(0.0, 0.0); np];
    rhs[0] = dy0 * half_h;
    rhs[k] = y0;

    let lu = LuFactors::factor(m, np)
        .map_err(|_| Error::SingularCollocation { x: x0, h })?;
    let y_nodes = lu.solve_complex(&rhs);
    let dy_nodes: Vec<Complex<Float>> = basis
        .differentiate_complex(&y_nodes)
        .into_iter()
        .map(|d| d * (2.0 / h))
        .collect();
    Ok((y_nodes, dy_nodes))
}

/// Attempt one non-oscillatory step over [x0, x0 + h]. The caller compares
/// `err` against its tolerance; an ill-conditioned system surfaces as
/// [`Error::SingularCollocation`].
pub(crate) fn nonosc_step<W, G>(
    spec: &ProblemSpec<W, G>,
    x0: Float,
    h: Float,
    y0: Complex<Float>,
    dy0: Complex<Float>,
) -> Result<NonoscStep, Error>
where
    W: Coefficient,
    G: Coefficient,
{
    let (y_nodes, dy_nodes) = collocate(spec, spec.basis(spec.p), x0, h, y0, dy0)?;
    let (y_lo, _) = collocate(spec, spec.basis(spec.p / 2), x0, h, y0, dy0)?;

    let y1 = y_nodes[0];
    let dy1 = dy_nodes[0];
    let mut err = (y1 - y_lo[0]).norm() / y1.norm();
    if !err.is_finite() {
        err = Float::INFINITY;
    }
    Ok(NonoscStep {
        y: y1,
        dy: dy1,
        err,
        y_nodes,
        dy_nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init;

    #[test]
    fn reproduces_cosine_on_a_short_step() {
        let spec = init(|_: Float| 1.0, |_: Float| 0.0, 16, 32, 32, 32).unwrap();
        let h = 0.5;
        let step = nonosc_step(
            &spec,
            0.0,
            h,
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 0.0),
        )
        .unwrap();
        assert!((step.y.re - h.cos()).abs() < 1e-12);
        assert!((step.dy.re + h.sin()).abs() < 1e-11);
        assert!(step.err < 1e-12);
    }

    #[test]
    fn backward_step_matches_forward_reference() {
        // Damped problem: y'' + 2*0.1 y' + y = 0 stepped backwards.
        let spec = init(|_: Float| 1.0, |_: Float| 0.1, 16, 32, 32, 32).unwrap();
        let h = -0.4;
        let y0 = Complex::new(0.7, 0.2);
        let dy0 = Complex::new(-0.3, 0.5);
        let step = nonosc_step(&spec, 1.0, h, y0, dy0).unwrap();
        // Step forward again from the landing point; must return to the start.
        let back = nonosc_step(&spec, 1.0 + h, -h, step.y, step.dy).unwrap();
        assert!((back.y - y0).norm() < 1e-10);
        assert!((back.dy - dy0).norm() < 1e-10);
    }
}
