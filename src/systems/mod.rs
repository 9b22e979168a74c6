pub mod sdk;
pub mod best_response;
pub mod equilibrium;
pub mod dynamic;
pub mod stochastic;
pub mod treaty;
#[cfg(feature="system-calibration")] pub mod calibration;
