//! Diffusion on a cone unfolded around a vertex: reflective wedge walls,
//! absorbing outer arc.

use super::{inverse_normal_cdf, GreensFunction2DAbs};

/// Green's function for a walker on a wedge of total angle `phi`, started at
/// radius `r0` from the apex, absorbed at slant radius `a`. The reflecting
/// walls leave the radial marginal of the full disc unchanged, so radial
/// draws delegate to the eccentric disc solver.
#[derive(Debug, Clone)]
pub struct GreensFunction2DRefWedgeAbs {
    radial: GreensFunction2DAbs,
    d: f64,
    r0: f64,
    phi: f64,
}

impl GreensFunction2DRefWedgeAbs {
    pub fn new(d: f64, r0: f64, a: f64, phi: f64) -> Self {
        Self {
            radial: GreensFunction2DAbs::new(d, r0, a),
            d,
            r0,
            phi,
        }
    }

    pub fn survival(&self, t: f64) -> f64 {
        self.radial.survival(t)
    }

    pub fn draw_time(&self, u: f64) -> f64 {
        self.radial.draw_time(u)
    }

    pub fn draw_r(&self, u: f64, t: f64) -> f64 {
        self.radial.draw_r(u, t)
    }

    /// Angular displacement accumulated up to time `t`, given the final
    /// radius `r`. Gaussian with variance `2 d t / r_mean^2`, folded into
    /// `[-phi/2, phi/2]` by the wedge walls.
    pub fn draw_theta(&self, u: f64, r: f64, t: f64) -> f64 {
        if self.d <= 0.0 || t <= 0.0 {
            return 0.0;
        }
        let r_mean = (0.5 * (self.r0 + r)).max(1e-300);
        let sigma = (2.0 * self.d * t).sqrt() / r_mean;
        let theta = sigma * inverse_normal_cdf(u);

        let half = self.phi / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        // Reflect into [-half, half].
        let period = 4.0 * half;
        let mut folded = (theta + half).rem_euclid(period);
        if folded > 2.0 * half {
            folded = period - folded;
        }
        folded - half
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theta_within_wedge() {
        let phi = 1.5;
        let gf = GreensFunction2DRefWedgeAbs::new(1.0, 0.5, 1.0, phi);
        for i in 0..100 {
            let u = (i as f64 + 0.5) / 100.0;
            let theta = gf.draw_theta(u, 0.7, 10.0);
            assert!(theta.abs() <= phi / 2.0 + 1e-12);
        }
    }

    #[test]
    fn test_theta_sign_symmetric() {
        let gf = GreensFunction2DRefWedgeAbs::new(1.0, 0.5, 1.0, 6.0);
        let plus = gf.draw_theta(0.8, 0.5, 0.01);
        let minus = gf.draw_theta(0.2, 0.5, 0.01);
        assert!((plus + minus).abs() < 1e-9);
    }

    #[test]
    fn test_radial_delegates() {
        let gf = GreensFunction2DRefWedgeAbs::new(1.0, 0.2, 1.0, 3.0);
        let t = gf.draw_time(0.5);
        assert!(t.is_finite() && t > 0.0);
        let r = gf.draw_r(0.5, t);
        assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn test_no_motion_without_time() {
        let gf = GreensFunction2DRefWedgeAbs::new(1.0, 0.2, 1.0, 3.0);
        assert_eq!(gf.draw_theta(0.7, 0.2, 0.0), 0.0);
    }
}
