//! Numeric helpers: a bounded scalar maximizer, uniform grids, and nearest-point lookup.

/// Golden-section fraction `(3 - √5) / 2`.
const GOLDEN: f64 = 0.381_966_011_250_105_1;

/// Result of a bounded search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Maximum {
    pub x: f64,
    pub value: f64,
    pub evals: usize,
    /// `false` when the evaluation budget ran out before the bracket closed.
    pub converged: bool,
}

/// Maximizes `f` on `[lo, hi]` with Brent's bounded method (golden section plus
/// parabolic steps).
///
/// Only evaluates `f`; no concavity or smoothness is assumed, so the result
/// may be a local maximum or a boundary point. A degenerate interval returns
/// `lo` after a single evaluation.
pub fn maximize_bounded<F>(mut f: F, lo: f64, hi: f64, xatol: f64, max_evals: usize) -> Maximum
where
    F: FnMut(f64) -> f64,
{
    if !(hi > lo) {
        return Maximum { x: lo, value: f(lo), evals: 1, converged: true };
    }
    let sqrt_eps = 2.2e-16_f64.sqrt();
    let mut neg = |x: f64| -f(x);

    let (mut a, mut b) = (lo, hi);
    let mut fulc = a + GOLDEN * (b - a);
    let (mut nfc, mut xf) = (fulc, fulc);
    let (mut rat, mut e) = (0.0_f64, 0.0_f64);
    let mut fx = neg(xf);
    let mut evals = 1;
    let (mut ffulc, mut fnfc) = (fx, fx);
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
    let mut tol2 = 2.0 * tol1;
    let mut converged = true;

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        let mut golden = true;
        if e.abs() > tol1 {
            golden = false;
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;
            if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = if xm - xf >= 0.0 { tol1 } else { -tol1 };
                }
            } else {
                golden = true;
            }
        }
        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = GOLDEN * e;
        }

        let step = if rat >= 0.0 { 1.0 } else { -1.0 };
        let x = xf + step * rat.abs().max(tol1);
        let fu = neg(x);
        evals += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            (fulc, ffulc) = (nfc, fnfc);
            (nfc, fnfc) = (xf, fx);
            (xf, fx) = (x, fu);
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                (fulc, ffulc) = (nfc, fnfc);
                (nfc, fnfc) = (x, fu);
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                (fulc, ffulc) = (x, fu);
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
        tol2 = 2.0 * tol1;
        if evals >= max_evals {
            converged = false;
            break;
        }
    }

    Maximum { x: xf, value: -fx, evals, converged }
}

/// `n` evenly spaced points from `lo` to `hi`, both ends included.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            let mut v: Vec<f64> = (0..n).map(|i| lo + step * i as f64).collect();
            // pin the end so the grid top is exactly the budget
            v[n - 1] = hi;
            v
        }
    }
}

/// Index of the grid value closest to `target`; the first index wins ties.
pub fn nearest_index(grid: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, g) in grid.iter().enumerate() {
        let d = (g - target).abs();
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}
