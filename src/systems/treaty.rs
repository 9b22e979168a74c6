//! Treaty protocol: a probabilistic state machine layered over the contest.
//!
//! ```text
//!            NoProposal / Reject                 Hazard(ContinueTreaty)
//!              ┌──────┐                               ┌──────┐
//!              ▼      │     Propose        Accept     ▼      │
//!   ──▶  Fighting ────┴──▶ Proposed ───────────▶ Active ─────┘
//!              ▲                                     │
//!              │ Resume                              │ Hazard(broken) / HorizonReached
//!              └──────────────── Ended(reason) ◀─────┘
//! ```
//!
//! [`transition`] is the whole protocol as a pure function of `(phase, event)`;
//! [`TreatyProtocol`] draws the events, applies the returned [`Effect`] to the
//! match state and writes rows.
//!
//! Rows written while a treaty is in force are held back until the next
//! period's hazard draw decides their status tag, so a row is complete when
//! it is appended. A broken treaty leaves a no-contest period behind (income
//! accrues, land holds) before fighting resumes; proposals are only drawn
//! right after a contest period.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GameParams, GridConfig, MatchConfig, TreatyKind, TreatyParams};
use crate::error::{SimError, SimResult};
use crate::mechanics::logistic::odds_to_prob;
use crate::mechanics::payoff::{self, LAND_POOL, Player};
use crate::mechanics::stoch;
use crate::record::{PeriodRow, SimulationRecord, TreatyStatus};
use crate::systems::equilibrium::{EquilibriumFinder, EquilibriumPoint};
use crate::systems::sdk::{ContestState, play, shock_spending};

/// Maps the two hazard draws to a period outcome.
///
/// A side breaks when its uniform draw is at or below its hazard.
pub fn ending_reason(draw_settler: f64, draw_native: f64, settler_hazard: f64, native_hazard: f64) -> TreatyStatus {
    let settler_breaks = draw_settler <= settler_hazard;
    let native_breaks = draw_native <= native_hazard;
    match (settler_breaks, native_breaks) {
        (false, false) => TreatyStatus::ContinueTreaty,
        (true, true) => TreatyStatus::BothBroken,
        (true, false) => TreatyStatus::SettlerBroken,
        (false, true) => TreatyStatus::NativeBroken,
    }
}

/// What a signed treaty says.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreatyTerms {
    pub kind: TreatyKind,
    pub settler_land: f64,
    /// Paid by the settler to the native side.
    pub transfer: f64,
}

impl TreatyTerms {
    #[inline]
    pub fn native_land(&self) -> f64 {
        LAND_POOL - self.settler_land
    }
}

/// Joint gain from ending the contest: income from moving to the efficient
/// split plus the fighting both sides stop paying for.
pub fn total_treaty_benefit(
    game: &GameParams,
    efficient_settler_land: f64,
    native_land: f64,
    spending: &EquilibriumPoint,
) -> f64 {
    let income_gain =
        payoff::total_income(game, LAND_POOL - efficient_settler_land) - payoff::total_income(game, native_land);
    income_gain + spending.native + spending.settler
}

/// Negotiation and breakdown behavior of one pair of players.
#[derive(Clone, Copy, Debug)]
pub struct Treaty<'a> {
    params: &'a TreatyParams,
    efficient_settler_land: f64,
}

impl<'a> Treaty<'a> {
    pub fn new(params: &'a TreatyParams, game: &GameParams) -> Self {
        Self { params, efficient_settler_land: payoff::efficient_settler_land(game) }
    }

    #[inline]
    pub fn params(&self) -> &'a TreatyParams {
        self.params
    }

    #[inline]
    pub fn efficient_settler_land(&self) -> f64 {
        self.efficient_settler_land
    }

    /// Probability of a proposal this period, with fresh logistic noise.
    pub fn propose_prob<R: RngCore + ?Sized>(&self, settler_land: f64, settler_spending: f64, rng: &mut R) -> f64 {
        let noise = stoch::normal(rng, 0.0, self.params.noise_sd);
        self.propose_prob_with(settler_land, settler_spending, noise)
    }

    #[inline]
    pub fn propose_prob_with(&self, settler_land: f64, settler_spending: f64, noise: f64) -> f64 {
        let p = self.params;
        let land_gap = LAND_POOL - settler_land;
        odds_to_prob(p.propensity_intercept - p.propensity_spending * settler_spending - p.propensity_land * land_gap + noise)
    }

    /// Whole-unit settler shares a treaty may grant, between the floor and the efficient share.
    ///
    /// Both sides keep at least one unit so contest can resume after a break.
    pub fn land_choices(&self) -> Vec<f64> {
        let a = self.params.land_floor.round().clamp(1.0, LAND_POOL - 1.0);
        let b = self.efficient_settler_land.round().clamp(1.0, LAND_POOL - 1.0);
        let (lo, hi) = if a <= b { (a as u32, b as u32) } else { (b as u32, a as u32) };
        (lo..=hi).map(f64::from).collect()
    }

    /// Transfer owed for `total_benefit`, never more than the settler holds.
    #[inline]
    pub fn transfer(&self, total_benefit: f64, settler_savings: f64) -> f64 {
        (self.params.payment_share() * total_benefit).min(settler_savings)
    }

    /// Draws the treaty land (weighted by its size) and prices the transfer.
    pub fn content<R: RngCore + ?Sized>(&self, total_benefit: f64, settler_savings: f64, rng: &mut R) -> TreatyTerms {
        let choices = self.land_choices();
        let settler_land = stoch::weighted_index(rng, &choices)
            .and_then(|i| choices.get(i).copied())
            .or_else(|| choices.first().copied())
            .unwrap_or(self.efficient_settler_land);
        TreatyTerms { kind: self.params.kind, settler_land, transfer: self.transfer(total_benefit, settler_savings) }
    }

    /// Proposals are currently always accepted.
    #[inline]
    pub fn accept_prob(&self) -> f64 {
        1.0
    }

    /// `(settler, native)` hazard of breaking the treaty this period.
    pub fn hazards<R: RngCore + ?Sized>(&self, settler_land: f64, rng: &mut R) -> (f64, f64) {
        let noise = stoch::normal(rng, 0.0, self.params.noise_sd);
        let settler = self.settler_hazard_with(settler_land, noise);
        let native = stoch::uniform(rng, 0.0, self.params.native_hazard_cap);
        (settler, native)
    }

    #[inline]
    pub fn settler_hazard_with(&self, settler_land: f64, noise: f64) -> f64 {
        let p = self.params;
        odds_to_prob(p.hazard_intercept - p.hazard_land * (LAND_POOL - settler_land) + noise)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Fighting,
    Proposed(TreatyTerms),
    Active(TreatyTerms),
    Ended(TreatyStatus),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fighting => "Fighting",
            Self::Proposed(_) => "Proposed",
            Self::Active(_) => "Active",
            Self::Ended(_) => "Ended",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    NoProposal,
    Propose(TreatyTerms),
    Accept,
    Reject,
    /// Outcome of the two hazard draws.
    Hazard(TreatyStatus),
    HorizonReached,
    Resume,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoProposal => "NoProposal",
            Self::Propose(_) => "Propose",
            Self::Accept => "Accept",
            Self::Reject => "Reject",
            Self::Hazard(_) => "Hazard",
            Self::HorizonReached => "HorizonReached",
            Self::Resume => "Resume",
        }
    }
}

/// Side effect the driver performs after a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Play an ordinary contest period.
    Fight,
    /// Nothing this step; a decision is pending.
    Await,
    /// Pay the transfer, move land to the treaty split.
    Sign(TreatyTerms),
    /// Tag the last treaty row as continued and play another treaty period.
    Honor(TreatyTerms),
    /// Tag the last treaty row with how the treaty ended.
    Close(TreatyStatus),
    /// No-contest period after a breakdown.
    Recover,
}

/// The protocol. Pairs that are not listed are illegal.
pub fn transition(phase: Phase, event: Event) -> SimResult<(Phase, Effect)> {
    use TreatyStatus::*;
    let next = match (phase, event) {
        (Phase::Fighting, Event::NoProposal) => (Phase::Fighting, Effect::Fight),
        (Phase::Fighting, Event::Propose(t)) => (Phase::Proposed(t), Effect::Await),
        (Phase::Proposed(t), Event::Accept) => (Phase::Active(t), Effect::Sign(t)),
        (Phase::Proposed(_), Event::Reject) => (Phase::Fighting, Effect::Fight),
        (Phase::Active(t), Event::Hazard(ContinueTreaty)) => (Phase::Active(t), Effect::Honor(t)),
        (Phase::Active(_), Event::Hazard(r @ (BothBroken | SettlerBroken | NativeBroken))) => {
            (Phase::Ended(r), Effect::Close(r))
        }
        (Phase::Active(_), Event::HorizonReached) => (Phase::Ended(MatchEnding), Effect::Close(MatchEnding)),
        (Phase::Ended(BothBroken | SettlerBroken | NativeBroken), Event::Resume) => (Phase::Fighting, Effect::Recover),
        (phase, event) => {
            return Err(SimError::IllegalTransition { phase: phase.name(), event: event.name() });
        }
    };
    Ok(next)
}

/// Mutable state of one match, advanced one period at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchState {
    pub period: u32,
    pub native_land: f64,
    pub native_savings: f64,
    pub settler_savings: f64,
    /// Spending of the previous period, if it was a contest period.
    pub last_spending: Option<EquilibriumPoint>,
    pub phase: Phase,
    /// Treaty row waiting for its status tag.
    pending: Option<PeriodRow>,
}

impl MatchState {
    pub fn new(cfg: &MatchConfig) -> Self {
        Self {
            period: 1,
            native_land: cfg.start_native_land,
            native_savings: cfg.endowment,
            settler_savings: cfg.endowment,
            last_spending: None,
            phase: Phase::Fighting,
            pending: None,
        }
    }

    #[inline]
    pub fn settler_land(&self) -> f64 {
        LAND_POOL - self.native_land
    }

    /// A proposal can be drawn only right after a contest period, from period 2 on.
    #[inline]
    pub fn may_propose(&self) -> bool {
        self.period >= 2 && self.last_spending.is_some()
    }
}

/// Hard check that a treaty split covers the pool.
pub fn check_treaty_split(native_land: f64, settler_land: f64) -> SimResult<()> {
    if (native_land + settler_land - LAND_POOL).abs() <= 1e-9 * LAND_POOL {
        Ok(())
    } else {
        Err(SimError::TreatyLandSplit { native_land, settler_land })
    }
}

/// Drives matches of contest interleaved with treaty negotiation.
#[derive(Clone, Copy, Debug)]
pub struct TreatyProtocol<'a> {
    game: &'a GameParams,
    finder: EquilibriumFinder<'a>,
    treaty: Treaty<'a>,
    cfg: &'a MatchConfig,
}

impl<'a> TreatyProtocol<'a> {
    pub fn new(game: &'a GameParams, grid: &'a GridConfig, treaty: &'a TreatyParams, cfg: &'a MatchConfig) -> Self {
        Self { game, finder: EquilibriumFinder::new(game, grid), treaty: Treaty::new(treaty, game), cfg }
    }

    /// Match length: Geometric(end_prob), capped at `max_periods`.
    pub fn sample_horizon<R: RngCore + ?Sized>(&self, rng: &mut R) -> u32 {
        stoch::geometric(rng, self.game.end_prob).min(self.cfg.max_periods)
    }

    /// Matches `1..=matches` back to back on one generator.
    pub fn run_matches<R: RngCore + ?Sized>(&self, matches: u32, rng: &mut R) -> SimResult<SimulationRecord> {
        let mut record = SimulationRecord::new();
        for m in 1..=matches {
            let horizon = self.sample_horizon(rng);
            record.extend(self.run_match(m, horizon, rng)?);
        }
        Ok(record)
    }

    /// One match of exactly `horizon` periods.
    pub fn run_match<R: RngCore + ?Sized>(&self, match_id: u32, horizon: u32, rng: &mut R) -> SimResult<SimulationRecord> {
        let mut st = MatchState::new(self.cfg);
        let mut record = SimulationRecord::new();
        for period in 1..=horizon {
            st.period = period;
            self.advance(match_id, &mut st, &mut record, rng)?;
        }
        if let Phase::Active(_) = st.phase {
            self.step(match_id, &mut st, Event::HorizonReached, &mut record, rng)?;
        }
        info!(match_id, horizon, rows = record.len(), phase = st.phase.name(), "match finished");
        Ok(record)
    }

    /// Plays `st.period`: draws whatever events the current phase needs.
    pub fn advance<R: RngCore + ?Sized>(
        &self,
        match_id: u32,
        st: &mut MatchState,
        record: &mut SimulationRecord,
        rng: &mut R,
    ) -> SimResult<()> {
        match st.phase {
            Phase::Fighting => {
                let event = self.proposal_event(st, rng);
                self.step(match_id, st, event, record, rng)?;
                if let Phase::Proposed(_) = st.phase {
                    let event = if stoch::bernoulli(rng, self.treaty.accept_prob()) { Event::Accept } else { Event::Reject };
                    self.step(match_id, st, event, record, rng)?;
                }
                Ok(())
            }
            Phase::Active(terms) => {
                let (settler_hazard, native_hazard) = self.treaty.hazards(terms.settler_land, rng);
                let draw_settler = stoch::uniform01(rng);
                let draw_native = stoch::uniform01(rng);
                let status = ending_reason(draw_settler, draw_native, settler_hazard, native_hazard);
                self.step(match_id, st, Event::Hazard(status), record, rng)?;
                if let Phase::Ended(_) = st.phase {
                    self.step(match_id, st, Event::Resume, record, rng)?;
                }
                Ok(())
            }
            Phase::Proposed(_) | Phase::Ended(_) => {
                Err(SimError::IllegalTransition { phase: st.phase.name(), event: "PeriodStart" })
            }
        }
    }

    fn proposal_event<R: RngCore + ?Sized>(&self, st: &MatchState, rng: &mut R) -> Event {
        let Some(last) = st.last_spending.filter(|_| st.may_propose()) else {
            return Event::NoProposal;
        };
        let prob = self.treaty.propose_prob(st.settler_land(), last.settler, rng);
        if stoch::uniform01(rng) >= prob {
            return Event::NoProposal;
        }
        let benefit =
            total_treaty_benefit(self.game, self.treaty.efficient_settler_land(), st.native_land, &last);
        let settler_available =
            st.settler_savings + payoff::income(self.game, Player::Settler, st.settler_land());
        Event::Propose(self.treaty.content(benefit, settler_available, rng))
    }

    fn step<R: RngCore + ?Sized>(
        &self,
        match_id: u32,
        st: &mut MatchState,
        event: Event,
        record: &mut SimulationRecord,
        rng: &mut R,
    ) -> SimResult<()> {
        let (phase, effect) = transition(st.phase, event)?;
        debug!(match_id, period = st.period, from = st.phase.name(), event = event.name(), to = phase.name(), "treaty transition");
        st.phase = phase;
        match effect {
            Effect::Fight => self.fight(match_id, st, record, rng),
            Effect::Await => Ok(()),
            Effect::Sign(terms) => self.sign(match_id, st, terms),
            Effect::Honor(terms) => {
                close_pending(st, record, TreatyStatus::ContinueTreaty);
                self.honor(match_id, st, terms)
            }
            Effect::Close(status) => {
                close_pending(st, record, status);
                Ok(())
            }
            Effect::Recover => {
                self.recover(match_id, st, record);
                Ok(())
            }
        }
    }

    fn incomes(&self, native_land: f64) -> (f64, f64) {
        (
            payoff::income(self.game, Player::Native, native_land),
            payoff::income(self.game, Player::Settler, LAND_POOL - native_land),
        )
    }

    fn fight<R: RngCore + ?Sized>(
        &self,
        match_id: u32,
        st: &mut MatchState,
        record: &mut SimulationRecord,
        rng: &mut R,
    ) -> SimResult<()> {
        let contest = ContestState {
            native_land: st.native_land,
            native_savings: st.native_savings,
            settler_savings: st.settler_savings,
            period: st.period,
        };
        let step = match &self.cfg.shock {
            Some(shock) => play(&self.finder, &contest, false, |eq| shock_spending(rng, shock, eq))?,
            None => play(&self.finder, &contest, false, |eq| eq.point)?,
        };
        let (n_income, s_income) = self.incomes(st.native_land);
        let land_close = st.native_land + step.land_delta;
        record.push(PeriodRow {
            match_id,
            period: st.period,
            native_spending: step.played.native,
            settler_spending: step.played.settler,
            native_savings_open: st.native_savings,
            native_savings_close: step.native_savings,
            settler_savings_open: st.settler_savings,
            settler_savings_close: step.settler_savings,
            native_land_open: st.native_land,
            native_land_close: land_close,
            settler_land_open: LAND_POOL - st.native_land,
            settler_land_close: LAND_POOL - land_close,
            native_income: n_income,
            settler_income: s_income,
            treaty_type: None,
            treaty_payment: None,
            status: None,
        });
        st.native_land = land_close;
        st.native_savings = step.native_savings;
        st.settler_savings = step.settler_savings;
        st.last_spending = Some(step.played);
        Ok(())
    }

    /// Formation period: incomes at the old split, the transfer changes hands once.
    fn sign(&self, match_id: u32, st: &mut MatchState, terms: TreatyTerms) -> SimResult<()> {
        check_treaty_split(terms.native_land(), terms.settler_land)?;
        let (n_income, s_income) = self.incomes(st.native_land);
        let native_close = st.native_savings + n_income + terms.transfer;
        let settler_close = st.settler_savings + s_income - terms.transfer;
        self.hold_treaty_row(match_id, st, terms, n_income, s_income, native_close, settler_close);
        Ok(())
    }

    /// Continuing period: treaty incomes, plus the annuity if there is one.
    fn honor(&self, match_id: u32, st: &mut MatchState, terms: TreatyTerms) -> SimResult<()> {
        check_treaty_split(st.native_land, terms.settler_land)?;
        let n_income = payoff::income(self.game, Player::Native, st.native_land);
        let s_income = payoff::income(self.game, Player::Settler, terms.settler_land);
        let payment = match terms.kind {
            TreatyKind::Annuity => terms.transfer,
            TreatyKind::Lumpsum => 0.0,
        };
        let native_close = st.native_savings + n_income + payment;
        let settler_close = st.settler_savings + s_income - payment;
        self.hold_treaty_row(match_id, st, terms, n_income, s_income, native_close, settler_close);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn hold_treaty_row(
        &self,
        match_id: u32,
        st: &mut MatchState,
        terms: TreatyTerms,
        n_income: f64,
        s_income: f64,
        native_close: f64,
        settler_close: f64,
    ) {
        let land_close = terms.native_land();
        st.pending = Some(PeriodRow {
            match_id,
            period: st.period,
            native_spending: 0.0,
            settler_spending: 0.0,
            native_savings_open: st.native_savings,
            native_savings_close: native_close,
            settler_savings_open: st.settler_savings,
            settler_savings_close: settler_close,
            native_land_open: st.native_land,
            native_land_close: land_close,
            settler_land_open: LAND_POOL - st.native_land,
            settler_land_close: LAND_POOL - land_close,
            native_income: n_income,
            settler_income: s_income,
            treaty_type: Some(terms.kind),
            treaty_payment: Some(terms.transfer),
            status: None,
        });
        st.native_land = land_close;
        st.native_savings = native_close;
        st.settler_savings = settler_close;
        st.last_spending = None;
    }

    /// Period the treaty broke in: nobody fights, income accrues, land holds.
    fn recover(&self, match_id: u32, st: &mut MatchState, record: &mut SimulationRecord) {
        let (n_income, s_income) = self.incomes(st.native_land);
        let native_close = st.native_savings + n_income;
        let settler_close = st.settler_savings + s_income;
        record.push(PeriodRow {
            match_id,
            period: st.period,
            native_spending: 0.0,
            settler_spending: 0.0,
            native_savings_open: st.native_savings,
            native_savings_close: native_close,
            settler_savings_open: st.settler_savings,
            settler_savings_close: settler_close,
            native_land_open: st.native_land,
            native_land_close: st.native_land,
            settler_land_open: st.settler_land(),
            settler_land_close: st.settler_land(),
            native_income: n_income,
            settler_income: s_income,
            treaty_type: None,
            treaty_payment: None,
            status: None,
        });
        st.native_savings = native_close;
        st.settler_savings = settler_close;
        st.last_spending = None;
    }
}

fn close_pending(st: &mut MatchState, record: &mut SimulationRecord, status: TreatyStatus) {
    if let Some(mut row) = st.pending.take() {
        row.status = Some(status);
        record.push(row);
    }
}
