//! Chebyshev spectral machinery: nodes, differentiation, interpolation,
//! quadrature, and coefficient-space antiderivatives.
//!
//! Everything here lives on the reference interval [-1, 1] with
//! Chebyshev-Lobatto nodes in descending order (node 0 at +1, node k at -1),
//! so for a step [x0, x0 + h] the last node is the step start. Physical
//! derivatives pick up a factor 2/h, physical integrals a factor h/2.

use num_complex::Complex;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;

use crate::Float;

const PI: Float = std::f64::consts::PI as Float;

/// Precomputed spectral operators for one collocation order.
///
/// Pure function of the order: two bases of the same order are identical.
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone)]
pub struct SpectralBasis {
    /// Collocation order k; the basis carries k + 1 nodes.
    pub order: usize,
    /// Chebyshev-Lobatto nodes cos(j*pi/k), descending from +1 to -1.
    pub nodes: Vec<Float>,
    /// (k+1) x (k+1) spectral differentiation matrix, row-major, d/dsigma.
    pub diff: Vec<Float>,
    /// Barycentric interpolation weights (+-1 alternating, halved at the ends).
    pub bary: Vec<Float>,
    /// Clenshaw-Curtis quadrature weights over [-1, 1].
    pub quad: Vec<Float>,
    /// (k+1) x (k+1) analysis matrix: node values -> Chebyshev coefficients.
    pub analysis: Vec<Float>,
}

impl SpectralBasis {
    /// Build all operators for order `k` (k >= 2).
    pub fn new(k: usize) -> Self {
        let np = k + 1;
        let nodes: Vec<Float> = (0..np)
            .map(|j| (PI * j as Float / k as Float).cos())
            .collect();

        // Trefethen-style differentiation matrix with the negative-sum-trick
        // diagonal to suppress rounding in the dominant entries.
        let c = |i: usize| -> Float {
            if i == 0 || i == k {
                2.0
            } else {
                1.0
            }
        };
        let mut diff = vec![0.0 as Float; np * np];
        for i in 0..np {
            let mut row_sum = 0.0;
            for j in 0..np {
                if i == j {
                    continue;
                }
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                let d = (c(i) / c(j)) * sign / (nodes[i] - nodes[j]);
                diff[i * np + j] = d;
                row_sum += d;
            }
            diff[i * np + i] = -row_sum;
        }

        let mut bary = vec![0.0 as Float; np];
        for (j, w) in bary.iter_mut().enumerate() {
            *w = if j % 2 == 0 { 1.0 } else { -1.0 };
        }
        bary[0] *= 0.5;
        bary[k] *= 0.5;

        // Analysis via explicit cosine sums; orders stay small enough that a
        // dense matrix beats setting up an FFT.
        let mut analysis = vec![0.0 as Float; np * np];
        for m in 0..np {
            for j in 0..np {
                let cosine = (PI * (m * j) as Float / k as Float).cos();
                analysis[m * np + j] = 2.0 * cosine / (k as Float * c(m) * c(j));
            }
        }

        // Clenshaw-Curtis weights follow from the analysis matrix and the
        // exact moments of T_m: zero for odd m, 2/(1 - m^2) for even m.
        let mut quad = vec![0.0 as Float; np];
        for (j, q) in quad.iter_mut().enumerate() {
            let mut acc = 0.0;
            for m in (0..np).step_by(2) {
                let moment = 2.0 / (1.0 - (m * m) as Float);
                acc += analysis[m * np + j] * moment;
            }
            *q = acc;
        }

        SpectralBasis {
            order: k,
            nodes,
            diff,
            bary,
            quad,
            analysis,
        }
    }

    /// Nodes mapped onto the step [x0, x0 + h]; index 0 is the step end,
    /// index `order` the step start, for either sign of h.
    pub fn scaled_nodes(&self, x0: Float, h: Float) -> Vec<Float> {
        self.nodes
            .iter()
            .map(|&s| x0 + 0.5 * h * (s + 1.0))
            .collect()
    }

    /// d/dsigma of real node values.
    pub fn differentiate(&self, vals: &[Float]) -> Vec<Float> {
        let np = self.order + 1;
        let mut out = vec![0.0 as Float; np];
        for i in 0..np {
            let row = &self.diff[i * np..(i + 1) * np];
            let mut acc = 0.0;
            for (d, v) in row.iter().zip(vals.iter()) {
                acc += d * v;
            }
            out[i] = acc;
        }
        out
    }

    /// d/dsigma of complex node values.
    pub fn differentiate_complex(&self, vals: &[Complex<Float>]) -> Vec<Complex<Float>> {
        let np = self.order + 1;
        let mut out = vec![Complex::new(0.0, 0.0); np];
        for i in 0..np {
            let row = &self.diff[i * np..(i + 1) * np];
            let mut acc = Complex::new(0.0, 0.0);
            for (d, v) in row.iter().zip(vals.iter()) {
                acc += *v * *d;
            }
            out[i] = acc;
        }
        out
    }

    /// Chebyshev coefficients of the interpolant through complex node values.
    pub fn coefficients(&self, vals: &[Complex<Float>]) -> Vec<Complex<Float>> {
        let np = self.order + 1;
        let mut out = vec![Complex::new(0.0, 0.0); np];
        for m in 0..np {
            let row = &self.analysis[m * np..(m + 1) * np];
            let mut acc = Complex::new(0.0, 0.0);
            for (a, v) in row.iter().zip(vals.iter()) {
                acc += *v * *a;
            }
            out[m] = acc;
        }
        out
    }

    /// Clenshaw-Curtis quadrature of complex node values over [-1, 1].
    pub fn integrate(&self, vals: &[Complex<Float>]) -> Complex<Float> {
        let mut acc = Complex::new(0.0, 0.0);
        for (q, v) in self.quad.iter().zip(vals.iter()) {
            acc += *v * *q;
        }
        acc
    }

    /// Barycentric interpolation of complex node values at `sigma`.
    pub fn interpolate(&self, vals: &[Complex<Float>], sigma: Float) -> Complex<Float> {
        let mut num = Complex::new(0.0, 0.0);
        let mut den = 0.0;
        for j in 0..vals.len() {
            let d = sigma - self.nodes[j];
            if d == 0.0 {
                return vals[j];
            }
            let w = self.bary[j] / d;
            num += vals[j] * w;
            den += w;
        }
        num / den
    }

    /// Barycentric interpolation of real node values at `sigma`.
    pub fn interpolate_real(&self, vals: &[Float], sigma: Float) -> Float {
        let mut num = 0.0;
        let mut den = 0.0;
        for j in 0..vals.len() {
            let d = sigma - self.nodes[j];
            if d == 0.0 {
                return vals[j];
            }
            let w = self.bary[j] / d;
            num += vals[j] * w;
            den += w;
        }
        num / den
    }
}

/// Coefficients of the antiderivative of `sum a_m T_m`, normalized to vanish
/// at sigma = -1. The result has one more coefficient than the input.
pub fn antiderivative(a: &[Complex<Float>]) -> Vec<Complex<Float>> {
    let n = a.len();
    let get = |q: usize| -> Complex<Float> {
        if q < n {
            a[q]
        } else {
            Complex::new(0.0, 0.0)
        }
    };
    let mut b = vec![Complex::new(0.0, 0.0); n + 1];
    b[1] = get(0) - get(2) * 0.5;
    for q in 2..=n {
        b[q] = (get(q - 1) - get(q + 1)) / (2.0 * q as Float);
    }
    // Fix the constant so the antiderivative vanishes at the step start.
    let mut at_start = Complex::new(0.0, 0.0);
    for (q, bq) in b.iter().enumerate().skip(1) {
        let sign = if q % 2 == 0 { 1.0 } else { -1.0 };
        at_start += *bq * sign;
    }
    b[0] = -at_start;
    b
}

/// Evaluate `sum c_m T_m(sigma)` by the Clenshaw recurrence.
pub fn clenshaw(c: &[Complex<Float>], sigma: Float) -> Complex<Float> {
    let mut b1 = Complex::new(0.0, 0.0);
    let mut b2 = Complex::new(0.0, 0.0);
    for m in (1..c.len()).rev() {
        let b = c[m] + b1 * (2.0 * sigma) - b2;
        b2 = b1;
        b1 = b;
    }
    c[0] + b1 * sigma - b2
}

/// Lazily populated, read-only-after-construction store of bases, one slot
/// per configured order. Population is guarded per slot; reads are lock-free,
/// so a [`crate::ProblemSpec`] can be shared across threads.
#[derive(Debug)]
pub struct BasisCache {
    slots: BTreeMap<usize, OnceCell<SpectralBasis>>,
}

impl BasisCache {
    /// Create empty slots for the given orders (duplicates collapse).
    pub fn new(orders: &[usize]) -> Self {
        let mut slots = BTreeMap::new();
        for &k in orders {
            slots.entry(k).or_insert_with(OnceCell::new);
        }
        BasisCache { slots }
    }

    /// Fetch the basis for `k`, building it on first use. The order must be
    /// one of those the cache was created with.
    pub fn basis(&self, k: usize) -> &SpectralBasis {
        self.slots
            .get(&k)
            .expect("basis order not registered at init")
            .get_or_init(|| SpectralBasis::new(k))
    }

    /// Build every registered basis now.
    pub fn populate(&self) {
        for k in self.slots.keys() {
            self.basis(*k);
        }
    }
}
