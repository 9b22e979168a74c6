//! Period-by-period iteration to a stationary land split.
//!
//! Each iteration opens at the land the previous one left, solves the period
//! equilibrium there, settles savings and computes the next land delta. The
//! run converges once |delta| drops below `land_tol`; hitting `max_iters` is
//! reported through [`Status`], not as an error. A period without an
//! equilibrium aborts the run.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DynamicConfig, GameParams, GridConfig};
use crate::error::SimResult;
use crate::mechanics::econ;
use crate::mechanics::payoff::{self, LAND_POOL, Player};
use crate::refine_det;
use crate::systems::equilibrium::{EquilibriumFinder, EquilibriumPoint};
use crate::systems::sdk::{ContestState, ContestStep, play};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Converged,
    MaxIterReached,
}

/// Every period a dynamic run played, and how it stopped.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub steps: Vec<ContestStep>,
    pub status: Status,
}

impl Trajectory {
    #[inline]
    pub fn converged(&self) -> bool {
        self.status == Status::Converged
    }

    #[inline]
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }

    /// Native land of the last period played.
    pub fn native_land(&self) -> Option<f64> {
        self.steps.last().map(|s| s.native_land)
    }

    /// Spending of the last period played.
    pub fn equilibrium(&self) -> Option<EquilibriumPoint> {
        self.steps.last().map(|s| s.played)
    }

    pub fn native_lands(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.native_land).collect()
    }

    /// Consumption per period and cumulatively, for both sides.
    pub fn summary(&self, params: &GameParams) -> PeriodSummary {
        let mut native = Vec::with_capacity(self.steps.len());
        let mut settler = Vec::with_capacity(self.steps.len());
        for s in &self.steps {
            let n_inc = payoff::income(params, Player::Native, s.native_land);
            let s_inc = payoff::income(params, Player::Settler, LAND_POOL - s.native_land);
            native.push(econ::consumption(n_inc, s.played.native));
            settler.push(econ::consumption(s_inc, s.played.settler));
        }
        PeriodSummary {
            native_cumulative: econ::cumulative(&native),
            settler_cumulative: econ::cumulative(&settler),
            native_consumption: native,
            settler_consumption: settler,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeriodSummary {
    pub native_consumption: Vec<f64>,
    pub settler_consumption: Vec<f64>,
    pub native_cumulative: Vec<f64>,
    pub settler_cumulative: Vec<f64>,
}

#[derive(Clone, Copy, Debug)]
pub struct DynamicIterator<'a> {
    finder: EquilibriumFinder<'a>,
    cfg: &'a DynamicConfig,
}

impl<'a> DynamicIterator<'a> {
    pub fn new(params: &'a GameParams, grid: &'a GridConfig, cfg: &'a DynamicConfig) -> Self {
        Self { finder: EquilibriumFinder::new(params, grid), cfg }
    }

    /// Runs from `native_land` with zero savings until land settles or the cap is hit.
    pub fn run(&self, native_land: f64) -> SimResult<Trajectory> {
        self.run_from(ContestState::start(native_land))
    }

    pub fn run_from(&self, start: ContestState) -> SimResult<Trajectory> {
        let saving = self.cfg.saving;
        let tol = self.cfg.land_tol;
        let mut steps = Vec::new();

        let out = refine_det(
            start,
            |st: &ContestState| -> SimResult<ContestStep> {
                let step = play(&self.finder, st, saving, |eq| eq.point)?;
                debug!(
                    iteration = step.period,
                    native_land = step.native_land,
                    native_spending = step.played.native,
                    settler_spending = step.played.settler,
                    land_delta = step.land_delta,
                    "dynamic iteration"
                );
                steps.push(step);
                Ok(step)
            },
            |_st, step| step.next_state(),
            |step| step.land_delta.abs() < tol,
            self.cfg.max_iters,
        )?;

        let status = if out.converged { Status::Converged } else { Status::MaxIterReached };
        match (status, out.obs) {
            (Status::Converged, Some(last)) => info!(
                iterations = out.iters,
                native_land = last.native_land,
                settler_land = LAND_POOL - last.native_land,
                native_spending = last.played.native,
                settler_spending = last.played.settler,
                native_savings = last.native_savings,
                settler_savings = last.settler_savings,
                "land split converged"
            ),
            _ => warn!(iterations = out.iters, "land split did not converge"),
        }
        Ok(Trajectory { steps, status })
    }
}
