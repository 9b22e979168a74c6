/// Logistic mechanics shared by income curves and treaty behavior.

/// Upper-tail logistic: `1 / (1 + e^{z})`, decreasing in `z`.
///
/// Propensity and hazard are both written in this form: a larger exponent
/// makes the event less likely.
#[inline]
pub fn odds_to_prob(z: f64) -> f64 {
    1.0 / (1.0 + z.exp())
}

/// Level of `A/(1+e^{-B(x-C)})`.
#[inline]
pub fn curve(a: f64, b: f64, c: f64, x: f64) -> f64 {
    a / (1.0 + (-b * (x - c)).exp())
}

/// Slope of [`curve`] at `x`: `B·A·e^{-B(x-C)} / (1+e^{-B(x-C)})²`.
#[inline]
pub fn curve_slope(a: f64, b: f64, c: f64, x: f64) -> f64 {
    let ex = (-b * (x - c)).exp();
    b * a * ex / (1.0 + ex).powi(2)
}
