//! Problem definition: coefficient functions plus precomputed spectral bases.

use crate::chebyshev::BasisCache;
use crate::coeffs::Coefficient;
use crate::error::Error;
use crate::{Float, SpectralBasis};

const PI: Float = std::f64::consts::PI as Float;

/// Immutable description of one ODE problem y'' + 2 gamma(x) y' + omega(x)^2 y = 0.
///
/// Built once by [`init`] and shared read-only across any number of
/// evolutions, including concurrent ones on different threads.
pub struct ProblemSpec<W, G> {
    pub(crate) omega: W,
    pub(crate) gamma: G,
    /// Order of the Riccati phase solve in oscillatory steps.
    pub n: usize,
    /// Order of the Chebyshev collocation step; its embedded companion runs
    /// at p/2.
    pub p: usize,
    /// Sampling order for regime selection and stepsize probes.
    pub n_node: usize,
    /// Size of the interior refinement grid used by the oscillatory probe.
    pub n_basis: usize,
    pub(crate) cache: BasisCache,
    /// Chebyshev-Gauss points of the refinement grid, interleaving the
    /// Lobatto sampling nodes so interpolation error is measured off-grid.
    pub(crate) refine: Vec<Float>,
}

/// Validate the spectral orders and precompute the bases.
///
/// `omega` and `gamma` are the coefficient functions; `n` is the phase-solve
/// order, `p` the collocation-step order (even, so the embedded p/2 companion
/// exists), `n_node` the probe sampling order and `n_basis` the probe
/// refinement order.
pub fn init<W, G>(
    omega: W,
    gamma: G,
    n: usize,
    p: usize,
    n_node: usize,
    n_basis: usize,
) -> Result<ProblemSpec<W, G>, Error>
where
    W: Coefficient,
    G: Coefficient,
{
    for (name, v) in [("n", n), ("p", p), ("n_node", n_node), ("n_basis", n_basis)] {
        if v < 2 {
            return Err(Error::InvalidOrder(name, v));
        }
    }
    if p % 2 != 0 || p / 2 < 2 {
        return Err(Error::OddCollocationOrder(p));
    }

    let cache = BasisCache::new(&[n, p, p / 2, n_node]);
    cache.populate();

    let m = n_basis + 1;
    let refine: Vec<Float> = (0..m)
        .map(|j| (PI * (2 * j + 1) as Float / (2 * m) as Float).cos())
        .collect();

    Ok(ProblemSpec {
        omega,
        gamma,
        n,
        p,
        n_node,
        n_basis,
        cache,
        refine,
    })
}

impl<W, G> std::fmt::Debug for ProblemSpec<W, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemSpec")
            .field("n", &self.n)
            .field("p", &self.p)
            .field("n_node", &self.n_node)
            .field("n_basis", &self.n_basis)
            .finish_non_exhaustive()
    }
}

impl<W: Coefficient, G: Coefficient> ProblemSpec<W, G> {
    pub(crate) fn basis(&self, k: usize) -> &SpectralBasis {
        self.cache.basis(k)
    }

    pub(crate) fn omega_at(&self, xs: &[Float]) -> Vec<Float> {
        let mut out = vec![0.0 as Float; xs.len()];
        self.omega.evaluate(xs, &mut out);
        out
    }

    pub(crate) fn gamma_at(&self, xs: &[Float]) -> Vec<Float> {
        let mut out = vec![0.0 as Float; xs.len()];
        self.gamma.evaluate(xs, &mut out);
        out
    }

    /// |omega| at a single position, used for the non-oscillatory step scale.
    pub(crate) fn omega_abs(&self, x: Float) -> Float {
        self.omega_at(&[x])[0].abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_rejects_bad_orders() {
        let w = |x: Float| x.sqrt();
        let g = |_: Float| 0.0;
        assert!(init(w, g, 1, 32, 32, 32).is_err());
        assert!(init(w, g, 16, 31, 32, 32).is_err());
        assert!(init(w, g, 16, 2, 32, 32).is_err());
        assert!(init(w, g, 16, 32, 32, 32).is_ok());
    }

    #[test]
    fn spec_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        let spec = init(|x: Float| x, |_: Float| 0.0, 4, 8, 8, 8).unwrap();
        assert_send_sync(&spec);
    }

    #[test]
    fn refinement_grid_is_interior_and_descending() {
        let spec = init(|x: Float| x, |_: Float| 0.0, 4, 8, 8, 8).unwrap();
        assert_eq!(spec.refine.len(), 9);
        assert!(spec.refine.windows(2).all(|w| w[0] > w[1]));
        assert!(spec.refine.iter().all(|&t| t.abs() < 1.0));
    }
}
