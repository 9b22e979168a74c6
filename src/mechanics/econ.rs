/// Economy mechanics: savings bookkeeping and consumption.

/// Savings after a contest period.
///
/// With `saving` the budget already contains last period's savings, so what is
/// left of it replaces the old balance. Without it the budget is this period's
/// income only and the unspent part is added to a running tally.
#[inline]
pub fn settle_savings(saving: bool, prev: f64, budget: f64, spent: f64) -> f64 {
    if saving { budget - spent } else { prev + budget - spent }
}

/// Budget a player may spend this period.
#[inline]
pub fn spendable(saving: bool, income: f64, savings: f64) -> f64 {
    if saving { income + savings } else { income }
}

/// Per-period consumption: what income is left after spending.
#[inline]
pub fn consumption(income: f64, spending: f64) -> f64 {
    income - spending
}

/// Running sum of `xs`.
pub fn cumulative(xs: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    xs.iter()
        .map(|x| {
            acc += x;
            acc
        })
        .collect()
}
