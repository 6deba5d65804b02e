//! Dense linear solves: LU with partial pivoting, reusing one factorization
//! for the real and imaginary halves of a complex right-hand side.

use num_complex::Complex;

use crate::Float;

/// Marker for a numerically singular matrix.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Singular;

/// LU factorization PA = LU of a dense row-major matrix.
pub(crate) struct LuFactors {
    n: usize,
    lu: Vec<Float>,
    piv: Vec<usize>,
}

impl LuFactors {
    /// Factor an n x n row-major matrix. A pivot that is negligible against
    /// the matrix scale reports [`Singular`] rather than dividing through.
    pub fn factor(mut a: Vec<Float>, n: usize) -> Result<Self, Singular> {
        assert_eq!(a.len(), n * n, "matrix storage does not match dimension");
        let scale = a.iter().fold(0.0 as Float, |m, v| m.max(v.abs()));
        let tiny = scale * Float::EPSILON * n as Float;
        let mut piv = Vec::with_capacity(n);

        for k in 0..n {
            let mut pivot_row = k;
            let mut pivot_val = a[k * n + k].abs();
            for i in (k + 1)..n {
                let val = a[i * n + k].abs();
                if val > pivot_val {
                    pivot_val = val;
                    pivot_row = i;
                }
            }
            if pivot_val <= tiny {
                return Err(Singular);
            }
            if pivot_row != k {
                for j in 0..n {
                    a.swap(k * n + j, pivot_row * n + j);
                }
            }
            piv.push(pivot_row);

            let akk = a[k * n + k];
            for i in (k + 1)..n {
                let factor = a[i * n + k] / akk;
                a[i * n + k] = factor;
                for j in (k + 1)..n {
                    a[i * n + j] -= factor * a[k * n + j];
                }
            }
        }

        Ok(LuFactors { n, lu: a, piv })
    }

    /// In-place solve of a real right-hand side.
    pub fn solve(&self, b: &mut [Float]) {
        let n = self.n;
        assert_eq!(b.len(), n, "rhs length does not match dimension");
        for (k, &p) in self.piv.iter().enumerate() {
            if p != k {
                b.swap(k, p);
            }
        }
        // Forward Ly = Pb, then backward Ux = y.
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.lu[i * n + k] * b[k];
            }
            b[i] = sum;
        }
        for i in (0..n).rev() {
            let mut sum = b[i];
            for k in (i + 1)..n {
                sum -= self.lu[i * n + k] * b[k];
            }
            b[i] = sum / self.lu[i * n + i];
        }
    }

    /// Solve a complex right-hand side as two real solves on one
    /// factorization.
    pub fn solve_complex(&self, b: &[Complex<Float>]) -> Vec<Complex<Float>> {
        let mut re: Vec<Float> = b.iter().map(|z| z.re).collect();
        let mut im: Vec<Float> = b.iter().map(|z| z.im).collect();
        self.solve(&mut re);
        self.solve(&mut im);
        re.into_iter()
            .zip(im)
            .map(|(r, i)| Complex::new(r, i))
            .collect()
    }
}
