//! Deterministic random number generation.

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use rand_pcg::Pcg64;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> Pcg64 {
    Pcg64::seed_from_u64(seed)
}

/// Uniform draw in [0, 1).
pub fn uniform_real(rng: &mut Pcg64) -> f64 {
    rng.gen::<f64>()
}

/// Gaussian draw with the given standard deviation.
pub fn gaussian(rng: &mut Pcg64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, sigma).unwrap().sample(rng)
}

/// Exponential waiting time for the given total rate.
///
/// A vanishing rate means the event never fires.
pub fn exponential_time(rng: &mut Pcg64, rate: f64) -> f64 {
    if rate <= 0.0 {
        return f64::INFINITY;
    }
    Exp::new(rate).unwrap().sample(rng)
}
