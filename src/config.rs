//! Tuning constants of the kernel, grouped into one immutable value.

/// Simulation constants. Constructed once and handed to the simulator;
/// every geometric comparison shares `tolerance`.
#[derive(Debug, Clone)]
pub struct SgfrdConfig {
    /// Minimum circular shell radius, as a multiple of the particle radius.
    pub single_circular_shell_factor: f64,
    /// Shrink applied to a circular shell so it never touches its bound.
    pub single_circular_shell_mergin: f64,
    /// Minimum conical shell slant, as a multiple of particle radius plus
    /// apex distance.
    pub single_conical_shell_factor: f64,
    /// Shrink applied to a conical shell so it never touches its bound.
    pub single_conical_shell_mergin: f64,
    /// Relative separation enforced between just-placed particles.
    pub minimum_separation_factor: f64,
    /// Minimum pair shell radius, as a multiple of the larger single bound.
    pub pair_shell_factor: f64,
    /// Attempts at separating the products of a 1 -> 2 reaction.
    pub split_retry_count: usize,
    /// Brownian-dynamics microsteps per multi horizon.
    pub bd_step_count: usize,
    /// Microstep length, as a fraction of r^2 / D of the smallest particle.
    pub bd_dt_factor: f64,
    /// Width of the contact ring in which bimolecular reactions fire,
    /// relative to the contact distance.
    pub reaction_length_factor: f64,
    /// Shared tolerance of geometric comparisons.
    pub tolerance: f64,
}

impl Default for SgfrdConfig {
    fn default() -> Self {
        Self {
            single_circular_shell_factor: 1.5,
            single_circular_shell_mergin: 1.0 - 1e-7,
            single_conical_shell_factor: 1.5,
            single_conical_shell_mergin: 1.0 - 1e-7,
            minimum_separation_factor: 1e-7,
            pair_shell_factor: 3.0,
            split_retry_count: 10,
            bd_step_count: 100,
            bd_dt_factor: 1e-5,
            reaction_length_factor: 0.1,
            tolerance: 1e-12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factors() {
        let cfg = SgfrdConfig::default();
        assert_eq!(cfg.single_circular_shell_factor, 1.5);
        assert!(cfg.single_circular_shell_mergin < 1.0);
        assert_eq!(cfg.split_retry_count, 10);
    }
}
