//! Discretized Nash search over two sampled best-response curves.
//!
//! Each side's spending range is cut into a uniform grid. For every grid point
//! of one side the other side's best response is computed, which samples the
//! two response curves. The equilibrium is the first grid crossing found by a
//! nearest-point round trip:
//!
//! 1. take a settler response value `s` (to some native grid point),
//! 2. snap `s` to the nearest settler grid point and read the native response `n` there,
//! 3. snap `n` to the nearest native grid point and read the settler response there,
//! 4. accept `(n, s)` when that response is within `crossing_tol` of `s`.
//!
//! Ties snap to the lowest index. Resolution therefore depends on grid density,
//! which [`GridConfig`] exposes.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GameParams, GridConfig};
use crate::error::{SimError, SimResult};
use crate::mechanics::econ;
use crate::mechanics::optimize::{linspace, nearest_index};
use crate::mechanics::payoff::{self, LAND_POOL, Player};
use crate::systems::best_response::BestResponse;

/// Inputs for one period's search.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub native_land: f64,
    pub period: u32,
    pub native_savings: f64,
    pub settler_savings: f64,
}

impl Snapshot {
    pub fn new(native_land: f64, period: u32) -> Self {
        Self { native_land, period, ..Self::default() }
    }

    #[inline]
    pub fn settler_land(&self) -> f64 {
        LAND_POOL - self.native_land
    }
}

/// A mutually best-responding spending pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumPoint {
    pub native: f64,
    pub settler: f64,
}

/// Both response curves sampled on their grids.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseCurves {
    pub native_grid: Vec<f64>,
    pub settler_grid: Vec<f64>,
    /// Native best response to each `settler_grid` point.
    pub native_best: Vec<f64>,
    /// Settler best response to each `native_grid` point.
    pub settler_best: Vec<f64>,
}

impl ResponseCurves {
    /// First grid crossing of the two curves, if any.
    pub fn crossing(&self, tol: f64) -> Option<EquilibriumPoint> {
        for &s in &self.settler_best {
            let k = nearest_index(&self.settler_grid, s)?;
            let n = *self.native_best.get(k)?;
            let m = nearest_index(&self.native_grid, n)?;
            let back = *self.settler_best.get(m)?;
            if (back - s).abs() < tol {
                return Some(EquilibriumPoint { native: n, settler: s });
            }
        }
        None
    }
}

/// A period's equilibrium plus the budgets it was searched within.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Equilibrium {
    pub point: EquilibriumPoint,
    pub native_budget: f64,
    pub settler_budget: f64,
}

/// Stateless equilibrium search for a fixed parameter set.
#[derive(Clone, Copy, Debug)]
pub struct EquilibriumFinder<'a> {
    params: &'a GameParams,
    grid: &'a GridConfig,
}

impl<'a> EquilibriumFinder<'a> {
    pub fn new(params: &'a GameParams, grid: &'a GridConfig) -> Self {
        Self { params, grid }
    }

    #[inline]
    pub fn params(&self) -> &'a GameParams {
        self.params
    }

    /// Spendable resources of each side: income, plus savings when `saving`.
    pub fn budgets(&self, snap: &Snapshot, saving: bool) -> (f64, f64) {
        let n_income = payoff::income(self.params, Player::Native, snap.native_land);
        let s_income = payoff::income(self.params, Player::Settler, snap.settler_land());
        (
            econ::spendable(saving, n_income, snap.native_savings),
            econ::spendable(saving, s_income, snap.settler_savings),
        )
    }

    pub fn response_curves(&self, snap: &Snapshot, saving: bool) -> ResponseCurves {
        let (n_budget, s_budget) = self.budgets(snap, saving);
        let points = self.grid.points_for(saving);
        let native_grid = linspace(0.0, n_budget, points);
        let settler_grid = linspace(0.0, s_budget, points);
        let br = BestResponse::new(self.params, self.grid);

        let native_best = sample(&settler_grid, |s| {
            br.respond_within(Player::Native, snap.native_land, s, snap.period, n_budget)
        });
        let settler_best = sample(&native_grid, |n| {
            br.respond_within(Player::Settler, snap.settler_land(), n, snap.period, s_budget)
        });

        ResponseCurves { native_grid, settler_grid, native_best, settler_best }
    }

    /// Equilibrium for one period; no crossing is an error.
    ///
    /// Native land must lie strictly inside the pool; at either edge one
    /// side's expansion may be undefined.
    pub fn solve(&self, snap: &Snapshot, saving: bool) -> SimResult<Equilibrium> {
        if !(snap.native_land > 0.0 && snap.native_land < LAND_POOL) {
            return Err(SimError::invalid(format!(
                "native land {} in period {} is outside (0, {LAND_POOL})",
                snap.native_land, snap.period
            )));
        }
        let curves = self.response_curves(snap, saving);
        let native_budget = curves.native_grid.last().copied().unwrap_or(0.0);
        let settler_budget = curves.settler_grid.last().copied().unwrap_or(0.0);
        match curves.crossing(self.grid.crossing_tol) {
            Some(point) => Ok(Equilibrium { point, native_budget, settler_budget }),
            None => {
                debug!(native_land = snap.native_land, period = snap.period, "no best-response crossing");
                Err(SimError::NoEquilibrium { native_land: snap.native_land, period: snap.period })
            }
        }
    }

    /// Native land change produced by spending `point` at `native_land`.
    #[inline]
    pub fn land_delta(&self, native_land: f64, point: &EquilibriumPoint) -> f64 {
        land_delta(self.params, native_land, point)
    }
}

/// Native land change when both sides spend `point`.
#[inline]
pub fn land_delta(params: &GameParams, native_land: f64, point: &EquilibriumPoint) -> f64 {
    payoff::land_gain(params, Player::Native, point.native, point.settler, native_land)
}

#[cfg(feature = "parallel")]
fn sample<F>(grid: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    grid.par_iter().map(|&x| f(x)).collect()
}

#[cfg(not(feature = "parallel"))]
fn sample<F>(grid: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    grid.iter().map(|&x| f(x)).collect()
}
