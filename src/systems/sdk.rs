// src/systems/sdk.rs

//! # Systems SDK
//!
//! The one contest period every system plays, factored out so the dynamic
//! iterator, the stochastic simulator and the treaty protocol all move land
//! and savings the same way.
//!
//! A period is:
//! 1. solve the equilibrium at the opening land split (and savings, when they
//!    are spendable),
//! 2. let the caller turn the equilibrium into the spending actually played
//!    (identity, or a shocked draw),
//! 3. settle savings against the period's budgets,
//! 4. compute the native land delta from the played spending.
//!
//! The land delta is applied by the *next* period. [`ContestStep::next_state`]
//! does that, so convergence checks can stop before the last move lands.

use rand_core::RngCore;

use crate::config::ShockConfig;
use crate::error::{SimError, SimResult};
use crate::mechanics::{econ, stoch};
use crate::systems::equilibrium::{Equilibrium, EquilibriumFinder, EquilibriumPoint, Snapshot};

/// Land and savings carried from one contest period to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContestState {
    pub native_land: f64,
    pub native_savings: f64,
    pub settler_savings: f64,
    /// 1-based index of the period about to be played.
    pub period: u32,
}

impl ContestState {
    pub fn start(native_land: f64) -> Self {
        Self { native_land, native_savings: 0.0, settler_savings: 0.0, period: 1 }
    }

    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            native_land: self.native_land,
            period: self.period,
            native_savings: self.native_savings,
            settler_savings: self.settler_savings,
        }
    }
}

/// Everything one contest period produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContestStep {
    pub period: u32,
    pub native_land: f64,
    /// Equilibrium as solved.
    pub solved: EquilibriumPoint,
    /// Spending actually played; differs from `solved` only under shocks.
    pub played: EquilibriumPoint,
    pub native_budget: f64,
    pub settler_budget: f64,
    pub native_savings: f64,
    pub settler_savings: f64,
    pub land_delta: f64,
}

impl ContestStep {
    /// State the following period opens with.
    #[inline]
    pub fn next_state(&self) -> ContestState {
        ContestState {
            native_land: self.native_land + self.land_delta,
            native_savings: self.native_savings,
            settler_savings: self.settler_savings,
            period: self.period + 1,
        }
    }
}

/// Plays one contest period from `state`.
///
/// `spend` maps the solved equilibrium to the spending played.
pub fn play<F>(finder: &EquilibriumFinder<'_>, state: &ContestState, saving: bool, spend: F) -> SimResult<ContestStep>
where
    F: FnOnce(&Equilibrium) -> EquilibriumPoint,
{
    let eq = finder.solve(&state.snapshot(), saving)?;
    let played = spend(&eq);
    let land_delta = finder.land_delta(state.native_land, &played);
    if !land_delta.is_finite() {
        return Err(SimError::invalid(format!(
            "land delta at native land {} in period {} is not finite",
            state.native_land, state.period
        )));
    }
    Ok(ContestStep {
        period: state.period,
        native_land: state.native_land,
        solved: eq.point,
        played,
        native_budget: eq.native_budget,
        settler_budget: eq.settler_budget,
        native_savings: econ::settle_savings(saving, state.native_savings, eq.native_budget, played.native),
        settler_savings: econ::settle_savings(saving, state.settler_savings, eq.settler_budget, played.settler),
        land_delta,
    })
}

/// Adds independent normal noise to both spending values.
///
/// A perturbed value that goes negative or exceeds its budget is dropped in
/// favor of the unperturbed one, per side.
pub fn shock_spending<R: RngCore + ?Sized>(rng: &mut R, shock: &ShockConfig, eq: &Equilibrium) -> EquilibriumPoint {
    let n = stoch::normal(rng, shock.mean, shock.sd);
    let s = stoch::normal(rng, shock.mean, shock.sd);
    EquilibriumPoint {
        native: keep_within(eq.point.native + n, eq.point.native, eq.native_budget),
        settler: keep_within(eq.point.settler + s, eq.point.settler, eq.settler_budget),
    }
}

#[inline]
fn keep_within(perturbed: f64, fallback: f64, budget: f64) -> f64 {
    if perturbed > budget || perturbed < 0.0 { fallback } else { perturbed }
}
