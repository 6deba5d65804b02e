//! Shared fixtures for the integration tests: closed-form reference values
//! the solver output is checked against. These mirror the special-function
//! references the solver itself never sees.
#![allow(dead_code)]

use riccati::{Complex, Float};

const PI: Float = std::f64::consts::PI as Float;

// Airy function values at the origin (DLMF 9.2).
const AI0: Float = 0.355_028_053_887_817_24;
const AIP0: Float = -0.258_819_403_792_806_8;
const BI0: Float = 0.614_926_627_446_000_7;
const BIP0: Float = 0.448_288_357_353_826_36;

/// Reference solution of y'' + x y = 0: the combination
/// M(x) = Ai(-x) + i Bi(-x), returned with its derivative M'(x).
///
/// Maclaurin series below x = 8, large-argument asymptotics above; both
/// branches agree to ~1e-9 relative at the seam, far below what the solver
/// scenarios assert.
pub fn airy_ref(x: Float) -> (Complex<Float>, Complex<Float>) {
    assert!(x >= 0.0, "reference only covers the oscillatory side");
    if x <= 8.0 {
        airy_series(x)
    } else {
        airy_asymptotic(x)
    }
}

fn airy_series(x: Float) -> (Complex<Float>, Complex<Float>) {
    let z = -x;
    let z3 = z * z * z;

    // f, g solve the Airy equation with f(0)=1, f'(0)=0 and g(0)=0, g'(0)=1.
    let mut f = 1.0;
    let mut t = 1.0 as Float;
    for k in 1..80 {
        let k = k as Float;
        t *= z3 / ((3.0 * k) * (3.0 * k - 1.0));
        f += t;
        if t.abs() < 1e-20 * (1.0 + f.abs()) {
            break;
        }
    }
    let mut fp = z * z / 2.0;
    let mut t = fp;
    for k in 2..80 {
        let k = k as Float;
        t *= z3 / ((3.0 * k - 1.0) * (3.0 * k - 3.0));
        fp += t;
        if t.abs() < 1e-20 * (1.0 + fp.abs()) {
            break;
        }
    }
    let mut g = z;
    let mut t = z;
    for k in 1..80 {
        let k = k as Float;
        t *= z3 / ((3.0 * k + 1.0) * (3.0 * k));
        g += t;
        if t.abs() < 1e-20 * (1.0 + g.abs()) {
            break;
        }
    }
    let mut gp = 1.0;
    let mut t = 1.0 as Float;
    for k in 1..80 {
        let k = k as Float;
        t *= z3 / ((3.0 * k) * (3.0 * k - 2.0));
        gp += t;
        if t.abs() < 1e-20 * (1.0 + gp.abs()) {
            break;
        }
    }

    let ai = AI0 * f + AIP0 * g;
    let aip = AI0 * fp + AIP0 * gp;
    let bi = BI0 * f + BIP0 * g;
    let bip = BI0 * fp + BIP0 * gp;
    // d/dx Ai(-x) = -Ai'(z) at z = -x.
    (Complex::new(ai, bi), Complex::new(-aip, -bip))
}

fn airy_asymptotic(x: Float) -> (Complex<Float>, Complex<Float>) {
    const K: usize = 12;
    let mut u = [0.0 as Float; K];
    let mut v = [0.0 as Float; K];
    u[0] = 1.0;
    v[0] = 1.0;
    for k in 1..K {
        let kf = k as Float;
        u[k] = u[k - 1] * (6.0 * kf - 5.0) * (6.0 * kf - 3.0) * (6.0 * kf - 1.0)
            / (216.0 * kf * (2.0 * kf - 1.0));
        v[k] = u[k] * (6.0 * kf + 1.0) / (1.0 - 6.0 * kf);
    }

    let zeta = 2.0 / 3.0 * x.powf(1.5);
    let inv2 = 1.0 / (zeta * zeta);
    let (mut p, mut q, mut r, mut s) = (0.0, 0.0, 0.0, 0.0);
    let mut pw = 1.0 as Float;
    let mut sign = 1.0 as Float;
    for k in 0..(K / 2) {
        p += sign * u[2 * k] * pw;
        q += sign * u[2 * k + 1] * pw / zeta;
        r += sign * v[2 * k] * pw;
        s += sign * v[2 * k + 1] * pw / zeta;
        pw *= inv2;
        sign = -sign;
    }

    let c = 1.0 / PI.sqrt();
    let phase = Complex::from_polar(1.0, -(zeta + PI / 4.0));
    let i = Complex::new(0.0, 1.0);
    let m = i * c * x.powf(-0.25) * phase * Complex::new(p, q);
    let mp = c * x.powf(0.25) * phase * Complex::new(r, s);
    (m, mp)
}

/// Closed-form "burst" solution of y'' + omega^2 y = 0 with
/// omega = sqrt(m^2 - 1) / (1 + x^2).
pub fn burst_y(x: Float, m: Float) -> Complex<Float> {
    let theta = m * x.atan();
    Complex::from_polar((1.0 + x * x).sqrt() / m, theta)
}

pub fn burst_dy(x: Float, m: Float) -> Complex<Float> {
    let theta = m * x.atan();
    let scale = 1.0 / ((1.0 + x * x).sqrt() * m);
    Complex::new(x, m) * Complex::from_polar(1.0, theta) * scale
}

/// `n` evenly spaced points from `a` to `b` inclusive.
pub fn linspace(a: Float, b: Float, n: usize) -> Vec<Float> {
    (0..n)
        .map(|i| a + (b - a) * i as Float / (n - 1) as Float)
        .collect()
}

/// Relative error of `got` against a nonzero reference.
pub fn rel_err(got: Complex<Float>, want: Complex<Float>) -> Float {
    (got - want).norm() / want.norm()
}

#[cfg(test)]
mod sanity {
    use super::*;

    #[test]
    fn series_and_asymptotics_agree_at_the_seam() {
        let (ys, dys) = airy_series(8.0);
        let (ya, dya) = airy_asymptotic(8.0);
        assert!(rel_err(ys, ya) < 1e-8);
        assert!(rel_err(dys, dya) < 1e-8);
    }
}
