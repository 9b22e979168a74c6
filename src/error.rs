//! Error type shared by every system in the crate.
//!
//! Only genuinely fatal conditions live here. Running out of iterations in the
//! dynamic loop is reported through [`crate::systems::dynamic::Status`] instead.

/// Errors raised while solving or simulating the contest.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The best-response curves never crossed within the grid tolerance.
    #[error("no equilibrium crossing at native land {native_land:.4} in period {period}")]
    NoEquilibrium {
        /// Native land share the grid was built at.
        native_land: f64,
        /// Period index the search ran for.
        period: u32,
    },

    /// A treaty land split does not cover the whole pool.
    #[error("treaty land split does not cover the pool: native {native_land} + settler {settler_land} != 100")]
    TreatyLandSplit {
        /// Native share held under the treaty.
        native_land: f64,
        /// Settler share agreed in the treaty.
        settler_land: f64,
    },

    /// The treaty state machine was fed an event its current phase cannot take.
    #[error("illegal treaty transition: {event} while {phase}")]
    IllegalTransition {
        /// Phase name at the time of the event.
        phase: &'static str,
        /// Event name.
        event: &'static str,
    },

    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong and where.
        reason: String,
    },

    /// Configuration JSON could not be parsed.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Configuration file could not be read.
    #[error("failed to read configuration: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }
}
