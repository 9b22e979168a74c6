//! Per-period observation rows and the append-only record that holds them.
//!
//! Field names serialize to the column headers downstream analysis expects
//! (`Match`, `CurrentPeriod`, `NativeSpending`, ...).

use serde::{Deserialize, Serialize};

use crate::config::TreatyKind;
use crate::mechanics::payoff::LAND_POOL;

/// End-of-period tag on treaty rows. Ordinary contest rows carry no tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatyStatus {
    ContinueTreaty,
    BothBroken,
    SettlerBroken,
    NativeBroken,
    MatchEnding,
}

impl TreatyStatus {
    /// `true` for the outcomes that end a treaty.
    #[inline]
    pub fn is_ending(self) -> bool {
        !matches!(self, Self::ContinueTreaty)
    }
}

/// One observed period of one match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeriodRow {
    #[serde(rename = "Match")]
    pub match_id: u32,
    #[serde(rename = "CurrentPeriod")]
    pub period: u32,
    pub native_spending: f64,
    pub settler_spending: f64,
    #[serde(rename = "InitNativeSaving")]
    pub native_savings_open: f64,
    #[serde(rename = "EndNativeSaving")]
    pub native_savings_close: f64,
    #[serde(rename = "InitSettlerSaving")]
    pub settler_savings_open: f64,
    #[serde(rename = "EndSettlerSaving")]
    pub settler_savings_close: f64,
    #[serde(rename = "InitNativeLand")]
    pub native_land_open: f64,
    #[serde(rename = "EndNativeLand")]
    pub native_land_close: f64,
    #[serde(rename = "InitSettlerLand")]
    pub settler_land_open: f64,
    #[serde(rename = "EndSettlerLand")]
    pub settler_land_close: f64,
    pub native_income: f64,
    pub settler_income: f64,
    pub treaty_type: Option<TreatyKind>,
    pub treaty_payment: Option<f64>,
    #[serde(rename = "TreatyEndingReason")]
    pub status: Option<TreatyStatus>,
}

impl PeriodRow {
    /// Both land columns of a row sum to the pool at open and at close.
    pub fn land_balanced(&self) -> bool {
        let ok = |a: f64, b: f64| (a + b - LAND_POOL).abs() <= 1e-9 * LAND_POOL;
        ok(self.native_land_open, self.settler_land_open)
            && ok(self.native_land_close, self.settler_land_close)
    }

    /// A row in which a treaty was in force.
    #[inline]
    pub fn under_treaty(&self) -> bool {
        self.treaty_type.is_some()
    }
}

/// Append-only ordered rows of one simulated match or batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationRecord {
    rows: Vec<PeriodRow>,
}

impl SimulationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished row. Rows are never edited after this.
    #[inline]
    pub fn push(&mut self, row: PeriodRow) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, other: SimulationRecord) {
        self.rows.extend(other.rows);
    }

    #[inline]
    pub fn rows(&self) -> &[PeriodRow] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&PeriodRow> {
        self.rows.last()
    }

    /// Rows of a single match, in period order.
    pub fn match_rows(&self, match_id: u32) -> impl Iterator<Item = &PeriodRow> {
        self.rows.iter().filter(move |r| r.match_id == match_id)
    }
}
