//! Example: the Airy equation y'' + x y = 0 across six decades.
//!
//! The solution Ai(-x) + i Bi(-x) oscillates ever faster as x grows; the
//! solver switches from collocation steps near x = 1 to Riccati steps whose
//! size grows with x.

use riccati::prelude::*;

fn main() -> Result<(), Error> {
    let spec = riccati::init(|x: f64| x.sqrt(), |_: f64| 0.0, 32, 32, 32, 32)?;

    // Ai(-1) + i Bi(-1) and its derivative.
    let yi = Complex::new(0.535_560_883_292_352_1, 0.103_997_389_496_944_61);
    let dyi = Complex::new(0.010_160_567_116_645_209, -0.592_375_626_422_792_4);

    let result = riccati::evolve(
        &spec,
        1.0,
        1e6,
        yi,
        dyi,
        1e-12,
        1e-13,
        EvolveOptions::builder().init_stepsize(0.01).build(),
    )?;

    println!(
        "accepted {} steps ({} oscillatory, {} collocation), {} rejections",
        result.naccept, result.nosc, result.nslo, result.nreject
    );
    for i in (0..result.xs.len()).step_by(result.xs.len() / 10 + 1) {
        println!(
            "x = {:>12.3e}  h = {:>11.3e}  |y| = {:>11.4e}  regime = {:?}",
            result.xs[i],
            result.step_sizes[i],
            result.ys[i].norm(),
            result.step_types[i],
        );
    }
    Ok(())
}
