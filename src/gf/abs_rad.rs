//! Diffusion in a disc with an absorbing rim, started off-centre. Radial
//! marginal only; reflecting side walls (the wedge case) do not change it.

use super::bessel::{j0, j0_zero, j1};
use super::{bisect, inverse_normal_cdf, MAX_TERMS, SERIES_CUTOFF};

/// Green's function of 2D diffusion in a disc of radius `a` with absorbing
/// rim, started at radius `r0` from the centre.
#[derive(Debug, Clone)]
pub struct GreensFunction2DAbs {
    d: f64,
    r0: f64,
    a: f64,
}

impl GreensFunction2DAbs {
    pub fn new(d: f64, r0: f64, a: f64) -> Self {
        let r0 = r0.clamp(0.0, a);
        Self { d, r0, a }
    }

    pub fn survival(&self, t: f64) -> f64 {
        if t <= 0.0 || self.a <= 0.0 {
            return 1.0;
        }
        let a = self.a;
        let x = self.d * t / (a * a);
        if x < SERIES_CUTOFF {
            return 1.0;
        }
        let mut sum = 0.0;
        for n in 1..=MAX_TERMS {
            let alpha = j0_zero(n);
            let e = alpha * alpha * x;
            if e > 40.0 {
                break;
            }
            sum += 2.0 * j0(alpha * self.r0 / a) * (-e).exp() / (alpha * j1(alpha));
        }
        sum.clamp(0.0, 1.0)
    }

    pub fn draw_time(&self, u: f64) -> f64 {
        if self.a <= 0.0 {
            return 0.0;
        }
        if self.d <= 0.0 {
            return f64::INFINITY;
        }
        let t_scale = self.a * self.a / self.d;
        let u = u.clamp(1e-12, 1.0 - 1e-12);

        let mut lo = t_scale * SERIES_CUTOFF;
        let mut hi = t_scale;
        let mut grow = 0;
        while self.survival(hi) > u && grow < 100 {
            hi *= 2.0;
            grow += 1;
        }
        while self.survival(lo) < u && lo > t_scale * 1e-12 {
            lo *= 0.5;
        }
        bisect(lo, hi, |t| self.survival(t) - u)
    }

    fn p_int_r(&self, r: f64, t: f64) -> f64 {
        let a = self.a;
        let x = self.d * t / (a * a);
        let mut sum = 0.0;
        for n in 1..=MAX_TERMS {
            let alpha = j0_zero(n);
            let e = alpha * alpha * x;
            if e > 40.0 {
                break;
            }
            let j1a = j1(alpha);
            sum += (-e).exp() * j0(alpha * self.r0 / a) * 2.0 * r * j1(alpha * r / a)
                / (a * alpha * j1a * j1a);
        }
        sum
    }

    /// Radius at time `t`, conditioned on survival.
    pub fn draw_r(&self, u: f64, t: f64) -> f64 {
        if self.a <= 0.0 || self.d <= 0.0 || t <= 0.0 {
            return self.r0;
        }
        let x = self.d * t / (self.a * self.a);
        if x < SERIES_CUTOFF {
            // Boundary out of reach: Gaussian radial step reflected at zero.
            let step = (2.0 * self.d * t).sqrt() * inverse_normal_cdf(u);
            let r = (self.r0 + step).abs();
            return r.min(self.a * (1.0 - 1e-12));
        }
        let total = self.p_int_r(self.a, t);
        if total <= 0.0 {
            return self.r0;
        }
        let target = u * total;
        bisect(0.0, self.a, |r| self.p_int_r(r, t) - target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centre_start_matches_symmetric() {
        use super::super::GreensFunction2DAbsSym;
        let ecc = GreensFunction2DAbs::new(1.0, 0.0, 1.0);
        let sym = GreensFunction2DAbsSym::new(1.0, 1.0);
        for i in 1..10 {
            let t = i as f64 * 0.03;
            assert_relative_eq!(ecc.survival(t), sym.survival(t), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_eccentric_start_escapes_sooner() {
        let near_rim = GreensFunction2DAbs::new(1.0, 0.8, 1.0);
        let centred = GreensFunction2DAbs::new(1.0, 0.0, 1.0);
        let t = 0.05;
        assert!(near_rim.survival(t) < centred.survival(t));
    }

    #[test]
    fn test_draw_r_within_disc() {
        let gf = GreensFunction2DAbs::new(1.0, 0.5, 1.0);
        for &u in &[0.01, 0.5, 0.99] {
            for &t in &[1e-7, 0.02, 0.2] {
                let r = gf.draw_r(u, t);
                assert!((0.0..=1.0).contains(&r));
            }
        }
    }

    #[test]
    fn test_draw_time_inverts_survival() {
        let gf = GreensFunction2DAbs::new(2.0, 0.3, 1.5);
        let t = gf.draw_time(0.4);
        assert!((gf.survival(t) - 0.4).abs() < 1e-6);
    }
}
