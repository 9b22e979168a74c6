//! Payoff model: income from land and land gained from spending.
//!
//! Pure functions of an explicit [`GameParams`]; nothing here holds state.

use serde::{Deserialize, Serialize};

use crate::config::GameParams;
use crate::mechanics::logistic;

/// Size of the contested land pool. Native and settler shares sum to this.
pub const LAND_POOL: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Native,
    Settler,
}

impl Player {
    #[inline]
    pub fn opponent(self) -> Self {
        match self {
            Self::Native => Self::Settler,
            Self::Settler => Self::Native,
        }
    }
}

/// Income from holding `land`: the player's logistic curve shifted to pass through zero.
#[inline]
pub fn income(p: &GameParams, player: Player, land: f64) -> f64 {
    let c = p.curve(player);
    logistic::curve(c.scale, c.steepness, c.midpoint, land)
        - c.scale / (1.0 + (c.steepness * c.midpoint).exp())
}

/// Derivative of [`income`] with respect to land.
#[inline]
pub fn marginal_income(p: &GameParams, player: Player, land: f64) -> f64 {
    let c = p.curve(player);
    logistic::curve_slope(c.scale, c.steepness, c.midpoint, land)
}

/// Land a player adds by spending, before netting out the opponent.
///
/// `spending^(1-γ) / (land + D [+E]) · (H - land)`. Zero spending expands
/// nothing; negative spending is treated as zero.
#[inline]
pub fn expansion(p: &GameParams, player: Player, spending: f64, land: f64) -> f64 {
    let s = spending.max(0.0);
    s.powf(1.0 - p.elasticity(player)) / (land + p.crowding(player)) * (p.ceiling - land)
}

/// Derivative of [`expansion`] with respect to spending.
#[inline]
pub fn expansion_marginal(p: &GameParams, player: Player, spending: f64, land: f64) -> f64 {
    let g = p.elasticity(player);
    spending.powf(-g) / (land + p.crowding(player)) * (p.ceiling - land) * (1.0 - g)
}

/// Net land change for `player` when both sides spend at once.
#[inline]
pub fn land_gain(p: &GameParams, player: Player, own_spending: f64, opp_spending: f64, own_land: f64) -> f64 {
    expansion(p, player, own_spending, own_land)
        - expansion(p, player.opponent(), opp_spending, LAND_POOL - own_land)
}

/// Joint income when the native side holds `native_land`.
#[inline]
pub fn total_income(p: &GameParams, native_land: f64) -> f64 {
    income(p, Player::Native, native_land) + income(p, Player::Settler, LAND_POOL - native_land)
}

/// Whole-unit settler share that maximizes joint income. Ties go to the smaller share.
pub fn efficient_settler_land(p: &GameParams) -> f64 {
    let mut best = (0.0, f64::NEG_INFINITY);
    for s in 0..=100u32 {
        let s = f64::from(s);
        let t = total_income(p, LAND_POOL - s);
        if t > best.1 {
            best = (s, t);
        }
    }
    best.0
}
