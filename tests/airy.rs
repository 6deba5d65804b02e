//! Reference scenario: y'' + x y = 0 on [1, 1e6], whose solution is the
//! Airy combination Ai(-x) + i Bi(-x).

mod common;
use common::{airy_ref, linspace, rel_err};
use riccati::prelude::*;

fn airy_spec() -> ProblemSpec<impl Coefficient, impl Coefficient> {
    riccati::init(|x: Float| x.sqrt(), |_: Float| 0.0, 32, 32, 32, 32).unwrap()
}

#[test]
fn forward_solve_matches_reference() {
    let spec = airy_spec();
    let (yi, dyi) = airy_ref(1.0);
    let result = riccati::evolve(
        &spec,
        1.0,
        1e6,
        yi,
        dyi,
        1e-12,
        1e-13,
        EvolveOptions::builder().init_stepsize(0.01).build(),
    )
    .unwrap();

    assert!(result.naccept > 0);
    assert_eq!(result.xs.len(), result.ys.len());
    assert_eq!(result.xs.len(), result.step_types.len());
    // Both regimes must have contributed: collocation near x = 1, the
    // Riccati stepper over the long oscillatory tail.
    assert!(result.step_types.contains(&Regime::NonOscillatory));
    assert!(result.step_types.contains(&Regime::Oscillatory));

    let mut max_err: Float = 0.0;
    for (i, &x) in result.xs.iter().enumerate() {
        let (y_ref, dy_ref) = airy_ref(x);
        max_err = max_err.max(rel_err(result.ys[i], y_ref));
        max_err = max_err.max(rel_err(result.dys[i], dy_ref));
    }
    assert!(max_err < 1e-6, "max relative error {:e}", max_err);
}

#[test]
fn backward_solve_with_hard_stop_matches_reference() {
    let spec = airy_spec();
    let (yi, dyi) = airy_ref(1e6);
    let result = riccati::evolve(
        &spec,
        1e6,
        1.0,
        yi,
        dyi,
        1e-12,
        1e-13,
        EvolveOptions::builder()
            .init_stepsize(-0.01)
            .hard_stop(true)
            .build(),
    )
    .unwrap();

    // Hard stop lands the last step exactly on the target.
    assert_eq!(*result.xs.last().unwrap(), 1.0);
    assert!(result.step_sizes.iter().all(|&h| h < 0.0));

    let mut max_err: Float = 0.0;
    for (i, &x) in result.xs.iter().enumerate() {
        let (y_ref, _) = airy_ref(x);
        max_err = max_err.max(rel_err(result.ys[i], y_ref));
    }
    assert!(max_err < 1e-6, "max relative error {:e}", max_err);
}

#[test]
fn dense_output_matches_reference() {
    let spec = airy_spec();
    let (yi, dyi) = airy_ref(1.0);
    let x_eval = linspace(1.0, 1e6, 100);
    let result = riccati::evolve(
        &spec,
        1.0,
        1e6,
        yi,
        dyi,
        1e-12,
        1e-13,
        EvolveOptions::builder()
            .init_stepsize(0.01)
            .x_eval(x_eval.clone())
            .build(),
    )
    .unwrap();

    assert_eq!(result.y_eval.len(), x_eval.len());
    let mut max_err: Float = 0.0;
    let mut max_derr: Float = 0.0;
    for (i, &x) in x_eval.iter().enumerate() {
        let (y_ref, dy_ref) = airy_ref(x);
        max_err = max_err.max(rel_err(result.y_eval[i], y_ref));
        max_derr = max_derr.max(rel_err(result.dy_eval[i], dy_ref));
    }
    assert!(max_err < 1e-6, "max y error {:e}", max_err);
    assert!(max_derr < 1e-6, "max dy error {:e}", max_derr);
}

#[test]
fn dense_output_is_order_invariant() {
    let spec = airy_spec();
    let (yi, dyi) = airy_ref(1.0);
    let ascending = linspace(1.0, 1e6, 57);
    let mut descending = ascending.clone();
    descending.reverse();
    let mut shuffled = ascending.clone();
    // Deterministic scramble: pair up ends toward the middle.
    shuffled.sort_by(|a, b| {
        let ka = (a * 7919.0).sin();
        let kb = (b * 7919.0).sin();
        ka.total_cmp(&kb)
    });

    let run = |points: &[Float]| {
        riccati::evolve(
            &spec,
            1.0,
            1e6,
            yi,
            dyi,
            1e-12,
            1e-13,
            EvolveOptions::builder()
                .init_stepsize(0.01)
                .x_eval(points.to_vec())
                .build(),
        )
        .unwrap()
    };
    let up = run(&ascending);
    let down = run(&descending);
    let mixed = run(&shuffled);

    for (i, &x) in ascending.iter().enumerate() {
        let j = descending.iter().position(|&t| t == x).unwrap();
        let k = shuffled.iter().position(|&t| t == x).unwrap();
        assert_eq!(up.y_eval[i], down.y_eval[j], "y mismatch at x = {}", x);
        assert_eq!(up.y_eval[i], mixed.y_eval[k], "y mismatch at x = {}", x);
        assert_eq!(up.dy_eval[i], down.dy_eval[j], "dy mismatch at x = {}", x);
        assert_eq!(up.dy_eval[i], mixed.dy_eval[k], "dy mismatch at x = {}", x);
    }
}

#[test]
fn backward_dense_output_matches_reference() {
    let spec = airy_spec();
    let (yi, dyi) = airy_ref(1e6);
    // Points requested in the direction opposite to travel.
    let x_eval = linspace(1.0, 1e6, 100);
    let result = riccati::evolve(
        &spec,
        1e6,
        1.0,
        yi,
        dyi,
        1e-12,
        1e-13,
        EvolveOptions::builder()
            .init_stepsize(-0.01)
            .hard_stop(true)
            .x_eval(x_eval.clone())
            .build(),
    )
    .unwrap();

    let mut max_err: Float = 0.0;
    for (i, &x) in x_eval.iter().enumerate() {
        let (y_ref, _) = airy_ref(x);
        max_err = max_err.max(rel_err(result.y_eval[i], y_ref));
    }
    assert!(max_err < 1e-6, "max y error {:e}", max_err);
}

#[test]
fn forward_and_backward_traversals_agree() {
    let spec = airy_spec();
    let shared = linspace(10.0, 9.0e3, 41);

    let (yi, dyi) = airy_ref(1.0);
    let fwd = riccati::evolve(
        &spec,
        1.0,
        1e4,
        yi,
        dyi,
        1e-12,
        1e-13,
        EvolveOptions::builder()
            .hard_stop(true)
            .x_eval(shared.clone())
            .build(),
    )
    .unwrap();

    let (yf, dyf) = airy_ref(1e4);
    let bwd = riccati::evolve(
        &spec,
        1e4,
        1.0,
        yf,
        dyf,
        1e-12,
        1e-13,
        EvolveOptions::builder()
            .init_stepsize(-0.01)
            .hard_stop(true)
            .x_eval(shared.clone())
            .build(),
    )
    .unwrap();

    for i in 0..shared.len() {
        assert!(
            rel_err(fwd.y_eval[i], bwd.y_eval[i]) < 1e-7,
            "mismatch at x = {}",
            shared[i]
        );
    }
}

#[test]
fn tightening_eps_does_not_worsen_the_error() {
    let spec = airy_spec();
    let (yi, dyi) = airy_ref(1.0);
    let x_eval = linspace(10.0, 1e4, 50);

    let run = |eps: Float, eps_h: Float| {
        let result = riccati::evolve(
            &spec,
            1.0,
            1e4,
            yi,
            dyi,
            eps,
            eps_h,
            EvolveOptions::builder()
                .hard_stop(true)
                .x_eval(x_eval.clone())
                .build(),
        )
        .unwrap();
        let mut max_err: Float = 0.0;
        for (i, &x) in x_eval.iter().enumerate() {
            let (y_ref, _) = airy_ref(x);
            max_err = max_err.max(rel_err(result.y_eval[i], y_ref));
        }
        max_err
    };

    let loose = run(1e-6, 1e-7);
    let tight = run(1e-11, 1e-12);
    assert!(
        tight <= loose * 1.05 + 1e-12,
        "tight {:e} vs loose {:e}",
        tight,
        loose
    );
}
