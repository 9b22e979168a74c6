/// Stochastic mechanics: draws used by shocks, horizons, and the treaty layer.
/// Generic over `rand_core::RngCore`; callers own the generator (usually a
/// seeded `bevy_prng::WyRand`) and pass it down by `&mut`.
use bevy_prng::WyRand;
use rand_core::{RngCore, SeedableRng};

/// Uniform in [0, 1) from the top 53 bits.
#[inline]
pub fn uniform01<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    ((rng.next_u64() >> 11) as f64) / ((1u64 << 53) as f64)
}

/// Uniform in [lo, hi).
#[inline]
pub fn uniform<R: RngCore + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * uniform01(rng)
}

/// Gaussian(0,1) via Box–Muller.
#[inline]
pub fn gaussian01<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    // 1 - u keeps the log argument in (0, 1]
    let u1 = 1.0 - uniform01(rng);
    let u2 = uniform01(rng);
    let r = (-2.0 * u1.ln()).sqrt();
    let t = 2.0 * std::f64::consts::PI * u2;
    r * t.cos()
}

/// Gaussian(mean, sd).
#[inline]
pub fn normal<R: RngCore + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    mean + sd * gaussian01(rng)
}

/// Bernoulli(p).
#[inline]
pub fn bernoulli<R: RngCore + ?Sized>(rng: &mut R, p: f64) -> bool {
    uniform01(rng) < p.clamp(0.0, 1.0)
}

/// Trials up to and including the first success, `p` in (0, 1]. Support starts at 1.
pub fn geometric<R: RngCore + ?Sized>(rng: &mut R, p: f64) -> u32 {
    if p >= 1.0 {
        return 1;
    }
    let u = 1.0 - uniform01(rng);
    let k = (u.ln() / (1.0 - p).ln()).ceil();
    if k.is_finite() { k.clamp(1.0, f64::from(u32::MAX)) as u32 } else { u32::MAX }
}

/// Index drawn with probability proportional to `weights`. `None` if no weight is positive.
pub fn weighted_index<R: RngCore + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !(total > 0.0) {
        return None;
    }
    let mut target = uniform01(rng) * total;
    let mut last = None;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        if target < *w {
            return Some(i);
        }
        target -= *w;
        last = Some(i);
    }
    // rounding left a sliver past the last bucket
    last
}

/// Deterministic child generator for stream `stream` of a run seeded with `seed`.
///
/// Each match or subject gets its own stream so runs can be evaluated in any
/// order, or in parallel, and still reproduce.
pub fn child_rng(seed: u64, stream: u64) -> WyRand {
    let mixed = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    WyRand::from_seed(mixed.to_le_bytes())
}
