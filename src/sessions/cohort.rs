// src/sessions/cohort.rs
#![cfg(feature = "session-cohort")]

//! Cohort sessions.
//!
//! A cohort is a population of simulated subjects. Each subject gets its own
//! treaty coefficients `(a, b, c, d, e)`, drawn from independent normals, and
//! one treatment (annuity or lump sum), then plays a fixed number of treaty
//! matches. Subject `i` draws from its own generator stream of the cohort
//! seed, so a cohort reproduces regardless of scheduling.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{CohortConfig, SimulationConfig, TreatyKind, TreatyParams};
use crate::error::SimResult;
use crate::mechanics::stoch;
use crate::record::SimulationRecord;
use crate::systems::treaty::TreatyProtocol;

/// One subject's draws and everything it played.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject_id: u32,
    pub treatment: TreatyKind,
    pub treaty: TreatyParams,
    pub record: SimulationRecord,
}

/// Draws a subject's treaty coefficients and treatment; the rest comes from `base`.
pub fn draw_subject<R: RngCore + ?Sized>(cfg: &CohortConfig, base: &TreatyParams, rng: &mut R) -> TreatyParams {
    let mut coef = [0.0; 5];
    for (k, c) in coef.iter_mut().enumerate() {
        *c = stoch::normal(rng, cfg.coefficient_means[k], cfg.coefficient_variances[k].sqrt());
    }
    let kind = if stoch::bernoulli(rng, cfg.annuity_prob) { TreatyKind::Annuity } else { TreatyKind::Lumpsum };
    let [a, b, c, d, e] = coef;
    TreatyParams {
        propensity_spending: a,
        propensity_land: b,
        propensity_intercept: c,
        hazard_land: d,
        hazard_intercept: e,
        kind,
        ..*base
    }
}

/// Plays subject `index` of the cohort (0-based).
pub fn run_subject(cfg: &SimulationConfig, index: u32) -> SimResult<SessionRecord> {
    let cohort = &cfg.cohort;
    let mut rng = stoch::child_rng(cohort.seed, u64::from(index));
    let treaty = draw_subject(cohort, &cfg.treaty, &mut rng);
    let protocol = TreatyProtocol::new(&cfg.game, &cfg.grid, &treaty, &cfg.matches);
    let record = protocol.run_matches(cohort.matches_per_subject, &mut rng)?;
    let subject_id = cohort.first_subject_id + index;
    info!(
        subject_id,
        treatment = ?treaty.kind,
        rows = record.len(),
        treaty_rows = record.rows().iter().filter(|r| r.under_treaty()).count(),
        "subject finished"
    );
    Ok(SessionRecord { subject_id, treatment: treaty.kind, treaty, record })
}

/// Plays the whole cohort, subjects in id order.
pub fn run_cohort(cfg: &SimulationConfig) -> SimResult<Vec<SessionRecord>> {
    let subjects = cfg.cohort.subjects;
    #[cfg(feature = "parallel")]
    return (0..subjects).into_par_iter().map(|i| run_subject(cfg, i)).collect();
    #[cfg(not(feature = "parallel"))]
    (0..subjects).map(|i| run_subject(cfg, i)).collect()
}
