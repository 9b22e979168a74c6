//! Best response of one side to a fixed opponent spending.

use crate::config::{GameParams, GridConfig};
use crate::mechanics::optimize::maximize_bounded;
use crate::mechanics::payoff::{self, Player};

/// Profit-maximizing spending for one player, holding the opponent fixed.
#[derive(Clone, Copy, Debug)]
pub struct BestResponse<'a> {
    params: &'a GameParams,
    xatol: f64,
    max_evals: usize,
}

impl<'a> BestResponse<'a> {
    pub fn new(params: &'a GameParams, grid: &GridConfig) -> Self {
        Self { params, xatol: grid.xatol, max_evals: grid.max_evals }
    }

    /// Discounted income gain from this period's land change, net of spending.
    pub fn profit(&self, player: Player, own_land: f64, own: f64, opp: f64, period: u32) -> f64 {
        let p = self.params;
        let gain = payoff::land_gain(p, player, own, opp, own_land);
        let revenue = payoff::income(p, player, own_land + gain) - payoff::income(p, player, own_land);
        revenue * p.period_weight(period) - own
    }

    /// Best spending in `[0, income(own_land)]`.
    pub fn respond(&self, player: Player, own_land: f64, opp: f64, period: u32) -> f64 {
        let budget = payoff::income(self.params, player, own_land);
        self.respond_within(player, own_land, opp, period, budget)
    }

    /// Best spending in `[0, budget]`. Boundary answers are legitimate.
    pub fn respond_within(&self, player: Player, own_land: f64, opp: f64, period: u32, budget: f64) -> f64 {
        let hi = budget.max(0.0);
        maximize_bounded(
            |s| self.profit(player, own_land, s, opp, period),
            0.0,
            hi,
            self.xatol,
            self.max_evals,
        )
        .x
    }
}
