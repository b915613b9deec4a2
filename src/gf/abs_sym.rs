//! Diffusion from the centre of a disc with an absorbing rim.

use super::bessel::{j0_zero, j1};
use super::{bisect, MAX_TERMS, SERIES_CUTOFF};

/// Green's function of 2D diffusion started at the centre of a disc of
/// radius `a`, absorbing at the rim.
#[derive(Debug, Clone)]
pub struct GreensFunction2DAbsSym {
    d: f64,
    a: f64,
}

impl GreensFunction2DAbsSym {
    pub fn new(d: f64, a: f64) -> Self {
        Self { d, a }
    }

    /// Probability that the walker is still inside the disc at time `t`.
    pub fn survival(&self, t: f64) -> f64 {
        if t <= 0.0 || self.a <= 0.0 {
            return 1.0;
        }
        let x = self.d * t / (self.a * self.a);
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
            sum += 2.0 * (-e).exp() / (alpha * j1(alpha));
        }
        sum.clamp(0.0, 1.0)
    }

    /// First-passage time to the rim, inverted from `survival`.
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
        // S is 1 near zero and decays to 0; expand until it brackets u.
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

    /// Cumulative radial mass inside radius `r` at time `t`, unnormalized.
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
            sum += (-e).exp() * 2.0 * r * j1(alpha * r / a) / (a * alpha * j1a * j1a);
        }
        sum
    }

    /// Radius at time `t`, conditioned on survival.
    pub fn draw_r(&self, u: f64, t: f64) -> f64 {
        if self.a <= 0.0 || self.d <= 0.0 || t <= 0.0 {
            return 0.0;
        }
        let x = self.d * t / (self.a * self.a);
        if x < SERIES_CUTOFF {
            // The rim is out of reach; the radial law is Rayleigh.
            let r = (-4.0 * self.d * t * (1.0 - u).ln()).sqrt();
            return r.min(self.a * (1.0 - 1e-12));
        }
        let total = self.p_int_r(self.a, t);
        if total <= 0.0 {
            return 0.0;
        }
        let target = u * total;
        bisect(0.0, self.a, |r| self.p_int_r(r, t) - target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survival_monotone() {
        let gf = GreensFunction2DAbsSym::new(1.0, 1.0);
        let mut prev = 1.0;
        for i in 1..20 {
            let t = i as f64 * 0.05;
            let s = gf.survival(t);
            assert!(s <= prev + 1e-12);
            assert!((0.0..=1.0).contains(&s));
            prev = s;
        }
    }

    #[test]
    fn test_draw_time_inverts_survival() {
        let gf = GreensFunction2DAbsSym::new(1e-12, 0.01);
        for &u in &[0.1, 0.5, 0.9] {
            let t = gf.draw_time(u);
            assert!((gf.survival(t) - u).abs() < 1e-6);
        }
    }

    #[test]
    fn test_draw_time_monotone_in_u() {
        let gf = GreensFunction2DAbsSym::new(1.0, 1.0);
        // Larger survival target means an earlier time.
        assert!(gf.draw_time(0.9) < gf.draw_time(0.1));
    }

    #[test]
    fn test_draw_r_within_disc() {
        let gf = GreensFunction2DAbsSym::new(1.0, 1.0);
        for &u in &[0.0, 0.3, 0.7, 0.999] {
            for &t in &[1e-7, 0.01, 0.3] {
                let r = gf.draw_r(u, t);
                assert!((0.0..=1.0).contains(&r), "r = {r} out of disc");
            }
        }
    }

    #[test]
    fn test_draw_r_increases_with_u() {
        let gf = GreensFunction2DAbsSym::new(1.0, 1.0);
        assert!(gf.draw_r(0.2, 0.05) < gf.draw_r(0.8, 0.05));
    }

    #[test]
    fn test_zero_diffusion_never_escapes() {
        let gf = GreensFunction2DAbsSym::new(0.0, 1.0);
        assert!(gf.draw_time(0.5).is_infinite());
    }
}
