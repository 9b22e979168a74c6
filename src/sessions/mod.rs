// src/sessions/mod.rs

// Orchestrations that run many matches across a population of subjects.
// Each is feature-gated like the systems it drives.

#[cfg(feature = "session-cohort")]
pub mod cohort;

#[cfg(feature = "session-cohort")]
pub use cohort::*;
