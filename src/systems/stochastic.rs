//! Fixed-horizon contest play with optional spending shocks.
//!
//! Unlike the dynamic iterator there is no convergence test: the game simply
//! lasts `horizon` periods. A horizon is the guaranteed window plus a
//! geometric number of uncertain periods, capped.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rand_core::RngCore;
use tracing::debug;

use crate::config::{GameParams, GridConfig, ShockConfig};
use crate::error::SimResult;
use crate::mechanics::payoff::{self, LAND_POOL, Player};
use crate::mechanics::stoch;
use crate::record::{PeriodRow, SimulationRecord};
use crate::systems::equilibrium::EquilibriumFinder;
use crate::systems::sdk::{ContestState, ContestStep, play, shock_spending};

/// Length of one uncertain-length game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Horizon {
    pub guaranteed: u32,
    pub uncertain: u32,
}

impl Horizon {
    #[inline]
    pub fn total(&self) -> u32 {
        self.guaranteed + self.uncertain
    }

    /// Guaranteed periods from `params` plus Geometric(end_prob) − 1 extra ones, at most `max_uncertain`.
    pub fn sample<R: RngCore + ?Sized>(rng: &mut R, params: &GameParams, max_uncertain: u32) -> Self {
        let extra = stoch::geometric(rng, params.end_prob).saturating_sub(1);
        Self { guaranteed: params.guaranteed_periods, uncertain: extra.min(max_uncertain) }
    }
}

/// Outcome of one fixed-horizon game.
#[derive(Clone, Debug, PartialEq)]
pub struct StochasticRun {
    pub horizon: u32,
    pub steps: Vec<ContestStep>,
    pub native_savings: f64,
    pub settler_savings: f64,
}

impl StochasticRun {
    /// Land after the last period's delta is applied.
    pub fn final_native_land(&self) -> Option<f64> {
        self.steps.last().map(|s| s.native_land + s.land_delta)
    }

    /// Contest rows for this run. Treaty columns stay empty.
    pub fn to_record(&self, match_id: u32, params: &GameParams) -> SimulationRecord {
        let mut record = SimulationRecord::new();
        let (mut n_open, mut s_open) = (0.0, 0.0);
        for step in &self.steps {
            let land_close = step.native_land + step.land_delta;
            record.push(PeriodRow {
                match_id,
                period: step.period,
                native_spending: step.played.native,
                settler_spending: step.played.settler,
                native_savings_open: n_open,
                native_savings_close: step.native_savings,
                settler_savings_open: s_open,
                settler_savings_close: step.settler_savings,
                native_land_open: step.native_land,
                native_land_close: land_close,
                settler_land_open: LAND_POOL - step.native_land,
                settler_land_close: LAND_POOL - land_close,
                native_income: payoff::income(params, Player::Native, step.native_land),
                settler_income: payoff::income(params, Player::Settler, LAND_POOL - step.native_land),
                treaty_type: None,
                treaty_payment: None,
                status: None,
            });
            (n_open, s_open) = (step.native_savings, step.settler_savings);
        }
        record
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StochasticSimulator<'a> {
    finder: EquilibriumFinder<'a>,
    saving: bool,
    shock: Option<ShockConfig>,
}

impl<'a> StochasticSimulator<'a> {
    pub fn new(params: &'a GameParams, grid: &'a GridConfig, saving: bool, shock: Option<ShockConfig>) -> Self {
        Self { finder: EquilibriumFinder::new(params, grid), saving, shock }
    }

    /// Plays exactly `periods` periods from `native_land` with zero savings.
    pub fn run<R: RngCore + ?Sized>(&self, native_land: f64, periods: u32, rng: &mut R) -> SimResult<StochasticRun> {
        let mut state = ContestState::start(native_land);
        let mut steps = Vec::with_capacity(periods as usize);
        for _ in 0..periods {
            let step = match &self.shock {
                Some(shock) => play(&self.finder, &state, self.saving, |eq| shock_spending(rng, shock, eq))?,
                None => play(&self.finder, &state, self.saving, |eq| eq.point)?,
            };
            state = step.next_state();
            steps.push(step);
        }
        Ok(StochasticRun {
            horizon: periods,
            native_savings: state.native_savings,
            settler_savings: state.settler_savings,
            steps,
        })
    }

    /// Plays a game whose length is drawn with [`Horizon::sample`].
    pub fn run_uncertain<R: RngCore + ?Sized>(
        &self,
        native_land: f64,
        max_uncertain: u32,
        rng: &mut R,
    ) -> SimResult<StochasticRun> {
        let horizon = Horizon::sample(rng, self.finder.params(), max_uncertain);
        debug!(guaranteed = horizon.guaranteed, uncertain = horizon.uncertain, "sampled horizon");
        self.run(native_land, horizon.total(), rng)
    }

    /// Independent uncertain-length games, one generator stream per game.
    ///
    /// Results are in game order and do not depend on how games are scheduled.
    pub fn run_batch(&self, native_land: f64, games: u32, max_uncertain: u32, seed: u64) -> SimResult<Vec<StochasticRun>> {
        let one = |g: u32| {
            let mut rng = stoch::child_rng(seed, u64::from(g));
            self.run_uncertain(native_land, max_uncertain, &mut rng)
        };
        #[cfg(feature = "parallel")]
        return (0..games).into_par_iter().map(one).collect();
        #[cfg(not(feature = "parallel"))]
        (0..games).map(one).collect()
    }
}
