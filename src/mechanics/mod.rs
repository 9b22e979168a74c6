pub mod econ;
pub mod logistic;
pub mod optimize;
pub mod payoff;
pub mod stoch;

pub use econ::*;
pub use logistic::*;
pub use optimize::*;
pub use payoff::*;
pub use stoch::*;
