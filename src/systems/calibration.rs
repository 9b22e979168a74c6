//! Calibration surface: what an outer fitting routine needs to drive the
//! contest toward a target land split.
//!
//! A trial is the tuple `(D, E, H, α)` with both cost exponents set to `α`.
//! [`Calibration::evaluate`] turns a trial into a converged land share and a
//! squared gap to the target; the minimizer around it lives elsewhere.
//! [`foc_residuals`] gives the stationary first-order conditions for callers
//! that prefer to solve them directly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DynamicConfig, GameParams, GridConfig};
use crate::error::SimResult;
use crate::mechanics::payoff::{self, LAND_POOL, Player};
use crate::systems::dynamic::DynamicIterator;

/// Free parameters of one calibration trial.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTrial {
    pub congestion: f64,
    pub settler_handicap: f64,
    pub ceiling: f64,
    /// Shared cost exponent for both sides.
    pub elasticity: f64,
}

impl CalibrationTrial {
    pub fn new(congestion: f64, settler_handicap: f64, ceiling: f64, elasticity: f64) -> Self {
        Self { congestion, settler_handicap, ceiling, elasticity }
    }

    /// `base` with this trial's expansion constants swapped in.
    pub fn apply(&self, base: &GameParams) -> GameParams {
        GameParams {
            congestion: self.congestion,
            settler_handicap: self.settler_handicap,
            ceiling: self.ceiling,
            native_elasticity: self.elasticity,
            settler_elasticity: self.elasticity,
            ..*base
        }
    }
}

/// Stationary first-order conditions at `(native_land, n, s)`:
/// `[native FOC, settler FOC, land balance]`. All zero at a steady state.
///
/// Each FOC is marginal income after the period's gain, times marginal
/// expansion, times the expected continuation, minus one.
pub fn foc_residuals(p: &GameParams, native_land: f64, native_spending: f64, settler_spending: f64) -> [f64; 3] {
    let settler_land = LAND_POOL - native_land;
    let weight = p.expected_continuation();
    let n_gain = payoff::land_gain(p, Player::Native, native_spending, settler_spending, native_land);
    let s_gain = -n_gain;
    let native = payoff::marginal_income(p, Player::Native, native_land + n_gain)
        * payoff::expansion_marginal(p, Player::Native, native_spending, native_land)
        * weight
        - 1.0;
    let settler = payoff::marginal_income(p, Player::Settler, settler_land + s_gain)
        * payoff::expansion_marginal(p, Player::Settler, settler_spending, settler_land)
        * weight
        - 1.0;
    [native, settler, n_gain]
}

/// Where a trial's dynamic run ended up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProbe {
    pub land: f64,
    /// `false` when the run hit its iteration cap; `land` is then the last one played.
    pub converged: bool,
    pub iterations: usize,
}

/// Native land share the contest settles at under `params`, starting from `initial_land`.
pub fn equilibrium_land(
    params: &GameParams,
    grid: &GridConfig,
    dynamic: &DynamicConfig,
    initial_land: f64,
) -> SimResult<CalibrationProbe> {
    let traj = DynamicIterator::new(params, grid, dynamic).run(initial_land)?;
    Ok(CalibrationProbe {
        land: traj.native_land().unwrap_or(initial_land),
        converged: traj.converged(),
        iterations: traj.iterations(),
    })
}

/// Squared distance of `land` from `target`.
#[inline]
pub fn land_objective(land: f64, target: f64) -> f64 {
    (land - target).powi(2)
}

/// One evaluated trial.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub trial: CalibrationTrial,
    pub probe: CalibrationProbe,
    pub loss: f64,
}

/// Black-box objective for an external minimizer.
#[derive(Clone, Copy, Debug)]
pub struct Calibration<'a> {
    pub base: &'a GameParams,
    pub grid: &'a GridConfig,
    pub dynamic: &'a DynamicConfig,
    pub initial_land: f64,
    pub target_land: f64,
}

impl<'a> Calibration<'a> {
    /// Runs the contest under `trial`. Trials outside the valid parameter domain are errors.
    pub fn evaluate(&self, trial: &CalibrationTrial) -> SimResult<CalibrationPoint> {
        let params = trial.apply(self.base);
        params.validate()?;
        let probe = equilibrium_land(&params, self.grid, self.dynamic, self.initial_land)?;
        let loss = land_objective(probe.land, self.target_land);
        debug!(
            congestion = trial.congestion,
            settler_handicap = trial.settler_handicap,
            ceiling = trial.ceiling,
            elasticity = trial.elasticity,
            land = probe.land,
            converged = probe.converged,
            loss,
            "calibration trial"
        );
        Ok(CalibrationPoint { trial: *trial, probe, loss })
    }

    /// Lowest-loss point among `trials`. Converged points beat unconverged ones.
    pub fn best_of(&self, trials: &[CalibrationTrial]) -> SimResult<Option<CalibrationPoint>> {
        let mut best: Option<CalibrationPoint> = None;
        for t in trials {
            let pt = self.evaluate(t)?;
            let better = match &best {
                None => true,
                Some(b) => (pt.probe.converged, -pt.loss) > (b.probe.converged, -b.loss),
            };
            if better {
                best = Some(pt);
            }
        }
        Ok(best)
    }
}
