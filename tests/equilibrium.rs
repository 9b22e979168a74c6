// tests/equilibrium.rs
use treaty_game::SimError;
use treaty_game::config::{GameParams, GridConfig};
use treaty_game::mechanics::payoff::{self, Player};
use treaty_game::systems::best_response::BestResponse;
use treaty_game::systems::equilibrium::{EquilibriumFinder, ResponseCurves, Snapshot, land_delta};

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn best_response_is_within_income() {
    let p = GameParams::default();
    let grid = GridConfig::default();
    let br = BestResponse::new(&p, &grid);
    for opp in [0.0, 5.0, 40.0, 120.0] {
        let n = br.respond(Player::Native, 75.0, opp, 1);
        assert!(n >= 0.0 && n <= payoff::income(&p, Player::Native, 75.0), "native {n}");
        let s = br.respond(Player::Settler, 25.0, opp, 1);
        assert!(s >= 0.0 && s <= payoff::income(&p, Player::Settler, 25.0), "settler {s}");
    }
}

#[test]
fn best_response_beats_nearby_spending() {
    let p = GameParams::default();
    let grid = GridConfig::default();
    let br = BestResponse::new(&p, &grid);
    let best = br.respond(Player::Settler, 25.0, 8.0, 1);
    let at = |x: f64| br.profit(Player::Settler, 25.0, x, 8.0, 1);
    assert!(at(best) >= at(best * 0.9));
    assert!(at(best) >= at(best * 1.1));
}

#[test]
fn first_period_equilibrium_from_seventy_five() {
    let p = GameParams::default();
    let grid = GridConfig::default();
    let eq = EquilibriumFinder::new(&p, &grid).solve(&Snapshot::new(75.0, 1), false).unwrap();
    assert!(approx(eq.point.native, 8.04, 0.05), "native {}", eq.point.native);
    assert!(approx(eq.point.settler, 36.85, 0.05), "settler {}", eq.point.settler);
    // settlers outspend enough to push native land down
    let delta = land_delta(&p, 75.0, &eq.point);
    assert!(delta < -2.5 && delta > -4.0, "delta {delta}");
}

#[test]
fn equilibrium_is_a_mutual_best_response() {
    let p = GameParams::default();
    let grid = GridConfig::default();
    let finder = EquilibriumFinder::new(&p, &grid);
    let br = BestResponse::new(&p, &grid);
    for land in [75.0, 40.0] {
        let snap = Snapshot::new(land, 1);
        let eq = finder.solve(&snap, false).unwrap();
        let n = br.respond(Player::Native, land, eq.point.settler, 1);
        let s = br.respond(Player::Settler, 100.0 - land, eq.point.native, 1);
        assert!(approx(n, eq.point.native, 0.01), "land {land}: native {n} vs {}", eq.point.native);
        assert!(approx(s, eq.point.settler, 0.01), "land {land}: settler {s} vs {}", eq.point.settler);
    }
}

#[test]
fn equilibrium_stays_within_budgets() {
    let p = GameParams::default();
    let grid = GridConfig::coarse(60);
    let finder = EquilibriumFinder::new(&p, &grid);
    for (land, period) in [(75.0, 1), (60.0, 3), (40.0, 1)] {
        let eq = finder.solve(&Snapshot::new(land, period), false).unwrap();
        assert!(eq.point.native >= 0.0 && eq.point.native <= eq.native_budget);
        assert!(eq.point.settler >= 0.0 && eq.point.settler <= eq.settler_budget);
        assert!(approx(eq.native_budget, payoff::income(&p, Player::Native, land), 1e-12));
    }
}

#[test]
fn solve_is_idempotent() {
    let p = GameParams::default();
    let grid = GridConfig::coarse(60);
    let finder = EquilibriumFinder::new(&p, &grid);
    let snap = Snapshot::new(62.5, 2);
    let a = finder.solve(&snap, false).unwrap();
    let b = finder.solve(&snap, false).unwrap();
    assert_eq!(a, b);
}

#[test]
fn savings_widen_the_budget() {
    let p = GameParams::default();
    let grid = GridConfig::coarse(40);
    let finder = EquilibriumFinder::new(&p, &grid);
    let snap = Snapshot { native_land: 60.0, period: 2, native_savings: 10.0, settler_savings: 30.0 };
    let (n0, s0) = finder.budgets(&snap, false);
    let (n1, s1) = finder.budgets(&snap, true);
    assert!(approx(n1 - n0, 10.0, 1e-12));
    assert!(approx(s1 - s0, 30.0, 1e-12));
    let curves = finder.response_curves(&snap, true);
    assert_eq!(curves.native_grid.len(), grid.saving_points);
    assert_eq!(curves.native_grid.last().copied(), Some(n1));
}

#[test]
fn crossing_follows_the_round_trip() {
    let curves = ResponseCurves {
        native_grid: vec![0.0, 1.0, 2.0],
        settler_grid: vec![0.0, 1.0, 2.0],
        native_best: vec![0.0, 2.0, 2.0],
        settler_best: vec![1.0, 1.0, 1.0],
    };
    let pt = curves.crossing(0.01).unwrap();
    assert_eq!((pt.native, pt.settler), (2.0, 1.0));
}

#[test]
fn cycling_curves_have_no_crossing() {
    let curves = ResponseCurves {
        native_grid: vec![0.0, 2.0],
        settler_grid: vec![0.0, 2.0],
        native_best: vec![2.0, 0.0],
        settler_best: vec![0.0, 2.0],
    };
    assert_eq!(curves.crossing(0.01), None);
}

#[test]
fn missing_crossing_is_an_error() {
    let p = GameParams::default();
    // a zero tolerance accepts nothing
    let grid = GridConfig { crossing_tol: 0.0, ..GridConfig::coarse(20) };
    let err = EquilibriumFinder::new(&p, &grid).solve(&Snapshot::new(70.0, 4), false).unwrap_err();
    match err {
        SimError::NoEquilibrium { native_land, period } => {
            assert_eq!(native_land, 70.0);
            assert_eq!(period, 4);
        }
        other => panic!("unexpected error {other}"),
    }
}
