//! Example: the "burst" equation, a wave packet squeezed around the origin.
//!
//! omega = sqrt(m^2 - 1) / (1 + x^2) concentrates ~m radians of phase inside
//! |x| < ~m / 4pi while the tails are smooth; dense output samples the packet
//! without constraining the solver's own steps.

use riccati::prelude::*;

const M: f64 = 1e5;

fn burst_y(x: f64) -> Complex<f64> {
    Complex::from_polar((1.0 + x * x).sqrt() / M, M * x.atan())
}

fn burst_dy(x: f64) -> Complex<f64> {
    Complex::new(x, M) * Complex::from_polar(1.0, M * x.atan())
        / ((1.0 + x * x).sqrt() * M)
}

fn main() -> Result<(), Error> {
    let omega = |x: f64| (M * M - 1.0).sqrt() / (1.0 + x * x);
    let spec = riccati::init(omega, |_: f64| 0.0, 32, 32, 32, 32)?;

    let x_eval: Vec<f64> = (0..=20).map(|i| -50.0 + 5.0 * i as f64).collect();
    let result = riccati::evolve(
        &spec,
        -M,
        M,
        burst_y(-M),
        burst_dy(-M),
        1e-10,
        1e-12,
        EvolveOptions::builder()
            .hard_stop(true)
            .x_eval(x_eval.clone())
            .build(),
    )?;

    println!(
        "accepted {} steps ({} oscillatory, {} collocation)",
        result.naccept, result.nosc, result.nslo
    );
    println!("samples through the packet:");
    for (i, &x) in x_eval.iter().enumerate() {
        let got = result.y_eval[i];
        let want = burst_y(x);
        println!(
            "x = {:>7.1}  y = {:>9.2e}{:+.2e}i  rel err = {:.1e}",
            x,
            got.re,
            got.im,
            (got - want).norm() / want.norm()
        );
    }
    Ok(())
}
