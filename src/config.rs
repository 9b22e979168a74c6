//! Typed configuration for the contest, the grids, and the treaty layer.
//!
//! Every section deserializes with `#[serde(default)]`, so a JSON document only
//! needs the keys it wants to override. Defaults reproduce the calibrated
//! baseline: two logistic income curves, a settler congestion handicap of 100
//! and a one-in-six chance per period that the game stops.
//!
//! Configuration is built once, validated, and then passed by shared
//! reference. Nothing downstream mutates it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::mechanics::payoff::Player;

/// Logistic income curve `A/(1+e^{-B(l-C)})`, shifted so income at zero land is zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomeCurve {
    /// Saturation level `A`.
    pub scale: f64,
    /// Steepness `B`; must be positive.
    pub steepness: f64,
    /// Inflection point `C`.
    pub midpoint: f64,
}

/// Income and expansion constants for both populations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameParams {
    pub native: IncomeCurve,
    pub settler: IncomeCurve,
    /// Congestion term `D` in both expansion denominators.
    pub congestion: f64,
    /// Extra congestion `E` the settler carries.
    pub settler_handicap: f64,
    /// Resource ceiling `H`; expansion vanishes as land approaches it.
    pub ceiling: f64,
    /// Native cost exponent `γ`; expansion grows as `spending^(1-γ)`.
    pub native_elasticity: f64,
    /// Settler cost exponent `β`.
    pub settler_elasticity: f64,
    /// Per-period probability that the game stops.
    pub end_prob: f64,
    /// Periods played for certain before the stopping hazard applies.
    pub guaranteed_periods: u32,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            native: IncomeCurve { scale: 120.0, steepness: 0.045, midpoint: 18.0 },
            settler: IncomeCurve { scale: 180.0, steepness: 0.065, midpoint: 40.0 },
            congestion: 0.0,
            settler_handicap: 100.0,
            ceiling: 150.0,
            native_elasticity: 0.5,
            settler_elasticity: 0.5,
            end_prob: 1.0 / 6.0,
            guaranteed_periods: 10,
        }
    }
}

impl GameParams {
    #[inline]
    pub fn curve(&self, player: Player) -> &IncomeCurve {
        match player {
            Player::Native => &self.native,
            Player::Settler => &self.settler,
        }
    }

    #[inline]
    pub fn elasticity(&self, player: Player) -> f64 {
        match player {
            Player::Native => self.native_elasticity,
            Player::Settler => self.settler_elasticity,
        }
    }

    /// Congestion in a player's expansion denominator (`D`, or `D+E` for the settler).
    #[inline]
    pub fn crowding(&self, player: Player) -> f64 {
        match player {
            Player::Native => self.congestion,
            Player::Settler => self.congestion + self.settler_handicap,
        }
    }

    /// Expected number of periods after the current one, `(1-p)/p`.
    #[inline]
    pub fn expected_continuation(&self) -> f64 {
        (1.0 - self.end_prob) / self.end_prob
    }

    /// How many periods a land gain made in `period` keeps paying.
    ///
    /// Inside the guaranteed window the remaining certain periods are added to
    /// the expected continuation; afterwards only the continuation counts.
    pub fn period_weight(&self, period: u32) -> f64 {
        let tail = self.expected_continuation();
        if period <= self.guaranteed_periods {
            f64::from(self.guaranteed_periods - period) + tail
        } else {
            tail
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        for (name, c) in [("native", &self.native), ("settler", &self.settler)] {
            if !(c.steepness > 0.0) {
                return Err(SimError::invalid(format!("{name} income steepness must be > 0")));
            }
            if !(c.scale > 0.0) {
                return Err(SimError::invalid(format!("{name} income scale must be > 0")));
            }
        }
        if !(self.end_prob > 0.0 && self.end_prob < 1.0) {
            return Err(SimError::invalid("end_prob must lie in (0, 1)"));
        }
        if !(self.ceiling >= 100.0) {
            return Err(SimError::invalid("ceiling must be at least the 100-unit land pool"));
        }
        if self.congestion < 0.0 || self.settler_handicap < 0.0 {
            return Err(SimError::invalid("congestion terms must be non-negative"));
        }
        for (name, e) in [("native", self.native_elasticity), ("settler", self.settler_elasticity)] {
            if !(0.0..1.0).contains(&e) {
                return Err(SimError::invalid(format!("{name} elasticity must lie in [0, 1)")));
            }
        }
        Ok(())
    }
}

/// Resolution of the discretized best-response search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid points per side when savings are not spendable.
    pub points: usize,
    /// Grid points per side when savings are spendable.
    pub saving_points: usize,
    /// Round-trip discrepancy accepted as a crossing.
    pub crossing_tol: f64,
    /// Absolute tolerance of the bounded maximizer.
    pub xatol: f64,
    /// Profit evaluations allowed per best response.
    pub max_evals: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { points: 250, saving_points: 500, crossing_tol: 0.01, xatol: 1e-5, max_evals: 500 }
    }
}

impl GridConfig {
    /// A cheap grid for tests and exploratory runs.
    pub fn coarse(points: usize) -> Self {
        Self { points, saving_points: 2 * points, ..Self::default() }
    }

    #[inline]
    pub fn points_for(&self, saving: bool) -> usize {
        if saving { self.saving_points } else { self.points }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.points < 2 || self.saving_points < 2 {
            return Err(SimError::invalid("grids need at least two points"));
        }
        if !(self.crossing_tol > 0.0 && self.xatol > 0.0) {
            return Err(SimError::invalid("grid tolerances must be > 0"));
        }
        if self.max_evals < 2 {
            return Err(SimError::invalid("max_evals must be at least 2"));
        }
        Ok(())
    }
}

/// Stopping rule of the dynamic iterator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicConfig {
    /// Converged once |land delta| falls below this.
    pub land_tol: f64,
    pub max_iters: usize,
    /// `true`: savings are spendable and replaced each period.
    /// `false`: unspent income only accumulates as a tally.
    pub saving: bool,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self { land_tol: 1e-4, max_iters: 300, saving: false }
    }
}

/// Normal perturbation added to equilibrium spending.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockConfig {
    pub mean: f64,
    pub sd: f64,
}

impl Default for ShockConfig {
    fn default() -> Self {
        Self { mean: 0.0, sd: 2.0 }
    }
}

/// How the treaty transfer is paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatyKind {
    /// Paid at formation and again every period the treaty holds.
    Annuity,
    /// Paid once at formation.
    Lumpsum,
}

/// Negotiation and breakdown coefficients of one treaty-prone pair of players.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatyParams {
    /// `a`: propensity weight on the settler's last spending.
    pub propensity_spending: f64,
    /// `b`: propensity weight on the land gap (native share).
    pub propensity_land: f64,
    /// `c`: propensity intercept.
    pub propensity_intercept: f64,
    /// `d`: settler hazard weight on the native share left by the treaty.
    pub hazard_land: f64,
    /// `e`: settler hazard intercept.
    pub hazard_intercept: f64,
    /// Standard deviation of the logistic noise in propensity and hazard.
    pub noise_sd: f64,
    /// Fraction of the total benefit paid under an annuity.
    pub annuity_share: f64,
    /// Fraction of the total benefit paid as a lump sum.
    pub lumpsum_share: f64,
    /// Smallest settler share a treaty may grant.
    pub land_floor: f64,
    /// Native hazard is uniform on `[0, native_hazard_cap]`.
    pub native_hazard_cap: f64,
    pub kind: TreatyKind,
}

impl Default for TreatyParams {
    fn default() -> Self {
        Self {
            propensity_spending: 1.0 / 20.0,
            propensity_land: 1.0 / 30.0,
            propensity_intercept: 0.0,
            hazard_land: 1.0 / 25.0,
            hazard_intercept: 2.0,
            noise_sd: 2.0,
            annuity_share: 0.5,
            lumpsum_share: 1.5,
            land_floor: 50.0,
            native_hazard_cap: 0.4,
            kind: TreatyKind::Annuity,
        }
    }
}

impl TreatyParams {
    /// Builds parameters from the five behavioral coefficients `(a, b, c, d, e)`.
    pub fn from_coefficients(coef: [f64; 5], kind: TreatyKind) -> Self {
        let [a, b, c, d, e] = coef;
        Self {
            propensity_spending: a,
            propensity_land: b,
            propensity_intercept: c,
            hazard_land: d,
            hazard_intercept: e,
            kind,
            ..Self::default()
        }
    }

    #[inline]
    pub fn payment_share(&self) -> f64 {
        match self.kind {
            TreatyKind::Annuity => self.annuity_share,
            TreatyKind::Lumpsum => self.lumpsum_share,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.noise_sd < 0.0 {
            return Err(SimError::invalid("treaty noise_sd must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.native_hazard_cap) {
            return Err(SimError::invalid("native_hazard_cap must lie in [0, 1]"));
        }
        if !(self.land_floor > 0.0 && self.land_floor < 100.0) {
            return Err(SimError::invalid("land_floor must lie in (0, 100)"));
        }
        Ok(())
    }
}

/// Shape of one simulated treaty match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Hard cap on the geometric match length.
    pub max_periods: u32,
    /// Savings each side starts a match with.
    pub endowment: f64,
    pub start_native_land: f64,
    /// `None` plays exact equilibrium spending.
    pub shock: Option<ShockConfig>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_periods: 20,
            endowment: 100.0,
            start_native_land: 65.0,
            shock: Some(ShockConfig::default()),
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.max_periods == 0 {
            return Err(SimError::invalid("max_periods must be at least 1"));
        }
        if !(self.start_native_land > 0.0 && self.start_native_land < 100.0) {
            return Err(SimError::invalid("start_native_land must lie in (0, 100)"));
        }
        if let Some(s) = self.shock {
            if s.sd < 0.0 {
                return Err(SimError::invalid("shock sd must be non-negative"));
            }
        }
        Ok(())
    }
}

/// Population of subjects whose treaty coefficients are drawn at random.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub subjects: u32,
    pub matches_per_subject: u32,
    pub first_subject_id: u32,
    /// Means of `(a, b, c, d, e)`.
    pub coefficient_means: [f64; 5],
    /// Independent variances of `(a, b, c, d, e)`.
    pub coefficient_variances: [f64; 5],
    /// Probability a subject is assigned the annuity treatment.
    pub annuity_prob: f64,
    pub seed: u64,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            subjects: 50,
            matches_per_subject: 4,
            first_subject_id: 101,
            coefficient_means: [1.0 / 20.0, 1.0 / 30.0, 0.0, 1.0 / 25.0, 2.0],
            coefficient_variances: [0.2, 0.1, 1.0, 0.1, 0.2],
            annuity_prob: 0.5,
            seed: 0x5eed,
        }
    }
}

impl CohortConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.coefficient_variances.iter().any(|v| *v < 0.0) {
            return Err(SimError::invalid("coefficient variances must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.annuity_prob) {
            return Err(SimError::invalid("annuity_prob must lie in [0, 1]"));
        }
        Ok(())
    }
}

/// Everything a run needs, in one immutable bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub game: GameParams,
    pub grid: GridConfig,
    pub dynamic: DynamicConfig,
    pub treaty: TreatyParams,
    pub matches: MatchConfig,
    pub cohort: CohortConfig,
}

impl SimulationConfig {
    /// Parses and validates a JSON document; missing keys keep their defaults.
    pub fn from_json_str(s: &str) -> SimResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.game.validate()?;
        self.grid.validate()?;
        if !(self.dynamic.land_tol > 0.0) || self.dynamic.max_iters == 0 {
            return Err(SimError::invalid("dynamic land_tol must be > 0 and max_iters >= 1"));
        }
        self.treaty.validate()?;
        self.matches.validate()?;
        self.cohort.validate()
    }
}
