/*!
`treaty_game` — a repeated land contest between a Native and a Settler
population, with an optional negotiated treaty layered on top.

What it does
- Prices land through two logistic income curves and turns spending into land
  through a constant-elasticity expansion function (`mechanics::payoff`).
- Finds each side's profit-maximizing spending against a fixed opponent
  (`systems::best_response`) and intersects the two sampled best-response
  curves on a grid to get a period's Nash spending pair
  (`systems::equilibrium`).
- Iterates periods until land stops moving (`systems::dynamic`), or plays a
  fixed, possibly shocked, horizon (`systems::stochastic`).
- Runs a probabilistic treaty protocol: propose, sign, hold or break
  (`systems::treaty`), and whole cohorts of subjects (`sessions`).

How to use (call surface only)
- Build a [`config::SimulationConfig`] (defaults are the calibrated baseline)
  and pass its sections by reference.
- Deterministic loops go through [`refine_det`]; every stochastic call takes a
  caller-owned `rand_core::RngCore`.

What it does NOT do
- No closed-form equilibria, no plotting, no file export, no CLI.
*/

pub mod config;
pub mod error;
pub mod mechanics;
pub mod record;
pub mod sessions;
pub mod systems;

pub use config::SimulationConfig;
pub use error::{SimError, SimResult};

/// Result of a [`refine_det`] run.
#[derive(Clone, Debug)]
pub struct Outcome<Theta, Obs> {
    /// State the last observation was taken at.
    pub theta: Theta,
    /// Last observation; `None` only when `max_iters` is zero.
    pub obs: Option<Obs>,
    pub iters: usize,
    pub converged: bool,
}

/// Deterministic fixed-point loop: observe θ, stop if the observation says so,
/// otherwise θ ← update(θ, obs).
///
/// On convergence the returned θ is the one the converging observation was
/// taken at; the final update is not applied. A failing `simulate` aborts
/// the loop and its error is returned.
pub fn refine_det<Theta, Obs, E, Sim, Upd, Conv>(
    mut theta: Theta,
    mut simulate: Sim,
    mut update: Upd,
    converged: Conv,
    max_iters: usize,
) -> Result<Outcome<Theta, Obs>, E>
where
    Sim: FnMut(&Theta) -> Result<Obs, E>,
    Upd: FnMut(&Theta, &Obs) -> Theta,
    Conv: Fn(&Obs) -> bool,
{
    let mut last = None;
    for iter in 1..=max_iters {
        let obs = simulate(&theta)?;
        if converged(&obs) {
            return Ok(Outcome { theta, obs: Some(obs), iters: iter, converged: true });
        }
        if iter < max_iters {
            theta = update(&theta, &obs);
        }
        last = Some(obs);
    }
    Ok(Outcome { theta, obs: last, iters: max_iters, converged: false })
}
