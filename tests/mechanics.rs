// tests/mechanics.rs
use bevy_prng::WyRand;
use proptest::prelude::*;
use rand_core::{RngCore, SeedableRng};

use treaty_game::config::{GameParams, IncomeCurve};
use treaty_game::mechanics::econ;
use treaty_game::mechanics::optimize::{linspace, maximize_bounded, nearest_index};
use treaty_game::mechanics::payoff::{self, LAND_POOL, Player};
use treaty_game::mechanics::stoch;

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/* ──────────────────────────────────────────────────────────────────────────
Payoff
────────────────────────────────────────────────────────────────────────── */

#[test]
fn income_is_zero_at_zero_land() {
    let p = GameParams::default();
    assert_eq!(payoff::income(&p, Player::Native, 0.0), 0.0);
    assert_eq!(payoff::income(&p, Player::Settler, 0.0), 0.0);
}

#[test]
fn expansion_needs_spending() {
    let p = GameParams::default();
    assert_eq!(payoff::expansion(&p, Player::Native, 0.0, 40.0), 0.0);
    assert_eq!(payoff::expansion(&p, Player::Settler, -3.0, 60.0), 0.0);
    assert!(payoff::expansion(&p, Player::Settler, 10.0, 60.0) > 0.0);
}

#[test]
fn settler_expands_less_for_the_same_spending() {
    // the handicap sits in the settler's denominator
    let p = GameParams::default();
    let n = payoff::expansion(&p, Player::Native, 25.0, 50.0);
    let s = payoff::expansion(&p, Player::Settler, 25.0, 50.0);
    assert!(s < n, "settler {s} vs native {n}");
}

#[test]
fn land_gain_is_zero_sum() {
    let p = GameParams::default();
    let native = payoff::land_gain(&p, Player::Native, 12.0, 30.0, 62.0);
    let settler = payoff::land_gain(&p, Player::Settler, 30.0, 12.0, LAND_POOL - 62.0);
    assert!(approx(native, -settler, 1e-12), "{native} vs {settler}");
}

#[test]
fn marginal_income_matches_finite_difference() {
    let p = GameParams::default();
    let h = 1e-4;
    for player in [Player::Native, Player::Settler] {
        for land in [5.0, 18.0, 40.0, 77.0] {
            let fd = (payoff::income(&p, player, land + h) - payoff::income(&p, player, land - h)) / (2.0 * h);
            let mi = payoff::marginal_income(&p, player, land);
            assert!(approx(fd, mi, 1e-6), "{player:?} at {land}: {fd} vs {mi}");
        }
    }
}

#[test]
fn expansion_marginal_matches_finite_difference() {
    let p = GameParams::default();
    let h = 1e-4;
    for (player, s, land) in [(Player::Native, 8.0, 60.0), (Player::Settler, 35.0, 40.0)] {
        let fd = (payoff::expansion(&p, player, s + h, land) - payoff::expansion(&p, player, s - h, land)) / (2.0 * h);
        let em = payoff::expansion_marginal(&p, player, s, land);
        assert!(approx(fd, em, 1e-6), "{player:?}: {fd} vs {em}");
    }
}

#[test]
fn efficient_split_gives_settlers_seventy() {
    let p = GameParams::default();
    let eff = payoff::efficient_settler_land(&p);
    assert_eq!(eff, 70.0);
    let best = payoff::total_income(&p, LAND_POOL - eff);
    for s in [60.0, 69.0, 71.0, 80.0] {
        assert!(payoff::total_income(&p, LAND_POOL - s) < best);
    }
}

#[test]
fn period_weight_counts_down_then_flattens() {
    let p = GameParams::default();
    assert!(approx(p.expected_continuation(), 5.0, 1e-12));
    assert!(approx(p.period_weight(1), 14.0, 1e-12));
    assert!(approx(p.period_weight(10), 5.0, 1e-12));
    assert!(approx(p.period_weight(11), 5.0, 1e-12));
    assert!(approx(p.period_weight(40), 5.0, 1e-12));
}

proptest! {
    #[test]
    fn income_strictly_increasing(land in 0.0f64..99.0, step in 0.01f64..1.0) {
        let p = GameParams::default();
        for player in [Player::Native, Player::Settler] {
            prop_assert!(payoff::income(&p, player, land + step) > payoff::income(&p, player, land));
        }
    }

    #[test]
    fn income_zero_at_origin_for_any_curve(
        scale in 1.0f64..500.0,
        steepness in 0.001f64..0.5,
        midpoint in 0.0f64..100.0,
    ) {
        let p = GameParams {
            native: IncomeCurve { scale, steepness, midpoint },
            ..GameParams::default()
        };
        prop_assert_eq!(payoff::income(&p, Player::Native, 0.0), 0.0);
        prop_assert!(payoff::income(&p, Player::Native, 50.0) > 0.0);
    }
}

/* ──────────────────────────────────────────────────────────────────────────
Bounded maximizer and grids
────────────────────────────────────────────────────────────────────────── */

#[test]
fn maximizer_finds_interior_peak() {
    let m = maximize_bounded(|x| -(x - 3.7).powi(2) + 2.0, 0.0, 10.0, 1e-5, 500);
    assert!(m.converged);
    assert!(approx(m.x, 3.7, 1e-4), "x = {}", m.x);
    assert!(approx(m.value, 2.0, 1e-8));
}

#[test]
fn maximizer_accepts_boundary_optimum() {
    let m = maximize_bounded(|x| x, 0.0, 10.0, 1e-5, 500);
    assert!(m.x > 10.0 - 1e-3, "x = {}", m.x);
    let m = maximize_bounded(|x| -x, 0.0, 10.0, 1e-5, 500);
    assert!(m.x < 1e-3, "x = {}", m.x);
}

#[test]
fn maximizer_degenerate_interval_returns_lo() {
    let m = maximize_bounded(|x| x * x, 4.0, 4.0, 1e-5, 500);
    assert_eq!(m.x, 4.0);
    assert_eq!(m.evals, 1);
}

#[test]
fn maximizer_respects_eval_budget() {
    let m = maximize_bounded(|x| (x * 7.0).sin(), 0.0, 100.0, 1e-12, 5);
    assert!(m.evals <= 5);
    assert!((0.0..=100.0).contains(&m.x));
}

#[test]
fn linspace_pins_both_ends() {
    let g = linspace(0.0, 37.3, 250);
    assert_eq!(g.len(), 250);
    assert_eq!(g[0], 0.0);
    assert_eq!(g[249], 37.3);
    assert!(g.windows(2).all(|w| w[1] > w[0]));
    assert!(linspace(1.0, 2.0, 0).is_empty());
    assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
}

#[test]
fn nearest_index_breaks_ties_low() {
    let g = [0.0, 1.0, 2.0, 3.0];
    assert_eq!(nearest_index(&g, 1.5), Some(1));
    assert_eq!(nearest_index(&g, 2.9), Some(3));
    assert_eq!(nearest_index(&g, -8.0), Some(0));
    assert_eq!(nearest_index(&[], 1.0), None);
}

/* ──────────────────────────────────────────────────────────────────────────
Draws
────────────────────────────────────────────────────────────────────────── */

#[test]
fn uniform_stays_in_range() {
    let mut rng = WyRand::seed_from_u64(7);
    for _ in 0..10_000 {
        let u = stoch::uniform01(&mut rng);
        assert!((0.0..1.0).contains(&u));
        let v = stoch::uniform(&mut rng, 0.0, 0.4);
        assert!((0.0..0.4).contains(&v));
    }
}

#[test]
fn geometric_has_mean_one_over_p() {
    let mut rng = WyRand::seed_from_u64(11);
    let n = 20_000;
    let mut sum = 0u64;
    for _ in 0..n {
        let k = stoch::geometric(&mut rng, 1.0 / 6.0);
        assert!(k >= 1);
        sum += u64::from(k);
    }
    let mean = sum as f64 / n as f64;
    assert!(approx(mean, 6.0, 0.3), "mean = {mean}");
    assert_eq!(stoch::geometric(&mut rng, 1.0), 1);
}

#[test]
fn normal_moments_are_close() {
    let mut rng = WyRand::seed_from_u64(3);
    let n = 20_000;
    let xs: Vec<f64> = (0..n).map(|_| stoch::normal(&mut rng, 1.0, 2.0)).collect();
    let mean = xs.iter().sum::<f64>() / n as f64;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    assert!(approx(mean, 1.0, 0.1), "mean = {mean}");
    assert!(approx(var, 4.0, 0.3), "var = {var}");
}

#[test]
fn weighted_index_skips_nonpositive_weights() {
    let mut rng = WyRand::seed_from_u64(5);
    assert_eq!(stoch::weighted_index(&mut rng, &[0.0, -1.0]), None);
    assert_eq!(stoch::weighted_index(&mut rng, &[]), None);
    for _ in 0..100 {
        assert_eq!(stoch::weighted_index(&mut rng, &[0.0, 3.0, 0.0]), Some(1));
    }
}

#[test]
fn child_streams_reproduce_and_differ() {
    let mut a = stoch::child_rng(42, 0);
    let mut b = stoch::child_rng(42, 0);
    let mut c = stoch::child_rng(42, 1);
    let xa: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
    let xb: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
    let xc: Vec<u64> = (0..4).map(|_| c.next_u64()).collect();
    assert_eq!(xa, xb);
    assert_ne!(xa, xc);
}

/* ──────────────────────────────────────────────────────────────────────────
Savings
────────────────────────────────────────────────────────────────────────── */

#[test]
fn savings_tally_or_replace() {
    // tally: budget is income only
    assert_eq!(econ::settle_savings(false, 10.0, 30.0, 12.0), 28.0);
    // replace: budget already holds the old savings
    assert_eq!(econ::settle_savings(true, 10.0, 40.0, 12.0), 28.0);
    assert_eq!(econ::spendable(true, 30.0, 10.0), 40.0);
    assert_eq!(econ::spendable(false, 30.0, 10.0), 30.0);
    assert_eq!(econ::cumulative(&[1.0, 2.0, 3.5]), vec![1.0, 3.0, 6.5]);
}
