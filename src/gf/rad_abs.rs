//! Radial diffusion in an annulus with both rims absorbing: the
//! inter-particle vector of a pair, reacting at contact and escaping at the
//! pair-shell rim.

use super::bessel::{j0, y0};
use super::{bisect, inverse_normal_cdf, SERIES_CUTOFF};

const N_MODES: usize = 64;
const QUAD_INTERVALS: usize = 512;

/// Green's function for the radial coordinate in `sigma < r < a`, absorbing
/// at both rims, started at `r0`. Eigenmodes are J0/Y0 cross products with
/// norms obtained by quadrature at construction.
#[derive(Debug, Clone)]
pub struct GreensFunction2DRadAbs {
    d: f64,
    r0: f64,
    sigma: f64,
    a: f64,
    /// Scaled eigenvalues beta_n (decay rate = d beta_n^2 / a^2).
    betas: Vec<f64>,
    /// Survival coefficients psi_n(r0) * I1_n / I2_n.
    coeffs: Vec<f64>,
}

impl GreensFunction2DRadAbs {
    pub fn new(d: f64, r0: f64, sigma: f64, a: f64) -> Self {
        let r0 = r0.clamp(sigma * (1.0 + 1e-12), a * (1.0 - 1e-12));
        let u = sigma / a;

        let psi = |beta: f64, rho: f64| -> f64 {
            j0(beta * rho) * y0(beta * u) - y0(beta * rho) * j0(beta * u)
        };

        // Roots of psi(beta, 1) are spaced close to pi / (1 - u); scan
        // finer than that and bisect each bracket.
        let spacing = std::f64::consts::PI / (1.0 - u);
        let step = spacing / 16.0;
        let mut betas = Vec::with_capacity(N_MODES);
        let mut x = step * 0.5;
        let mut prev = psi(x, 1.0);
        while betas.len() < N_MODES && x < spacing * (N_MODES as f64 + 2.0) {
            let next = x + step;
            let val = psi(next, 1.0);
            if prev * val < 0.0 {
                betas.push(bisect(x, next, |b| psi(b, 1.0)));
            }
            prev = val;
            x = next;
        }

        let rho0 = r0 / a;
        let h = (1.0 - u) / QUAD_INTERVALS as f64;
        let mut coeffs = Vec::with_capacity(betas.len());
        for &beta in &betas {
            // Simpson's rule for I1 = int psi rho and I2 = int psi^2 rho.
            let mut i1 = 0.0;
            let mut i2 = 0.0;
            for k in 0..=QUAD_INTERVALS {
                let rho = u + h * k as f64;
                let w = if k == 0 || k == QUAD_INTERVALS {
                    1.0
                } else if k % 2 == 1 {
                    4.0
                } else {
                    2.0
                };
                let p = psi(beta, rho);
                i1 += w * p * rho;
                i2 += w * p * p * rho;
            }
            i1 *= h / 3.0;
            i2 *= h / 3.0;
            coeffs.push(if i2 > 0.0 { psi(beta, rho0) * i1 / i2 } else { 0.0 });
        }

        Self {
            d,
            r0,
            sigma,
            a,
            betas,
            coeffs,
        }
    }

    pub fn survival(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 1.0;
        }
        let gap = (self.a - self.r0).min(self.r0 - self.sigma).max(1e-300);
        if self.d * t / (gap * gap) < SERIES_CUTOFF {
            return 1.0;
        }
        let a2 = self.a * self.a;
        let mut sum = 0.0;
        for (beta, c) in self.betas.iter().zip(&self.coeffs) {
            let e = self.d * beta * beta * t / a2;
            if e > 40.0 {
                break;
            }
            sum += c * (-e).exp();
        }
        sum.clamp(0.0, 1.0)
    }

    /// First passage to either rim.
    pub fn draw_time(&self, u: f64) -> f64 {
        if self.d <= 0.0 {
            return f64::INFINITY;
        }
        let beta1 = match self.betas.first() {
            Some(&b) => b,
            None => return f64::INFINITY,
        };
        let t_scale = self.a * self.a / (self.d * beta1 * beta1);
        let u = u.clamp(1e-12, 1.0 - 1e-12);

        let mut lo = t_scale * 1e-6;
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

    /// Probability that the inner rim (contact) is reached before the outer
    /// one: the harmonic splitting of the 2D radial walk.
    pub fn leave_sigma_probability(&self) -> f64 {
        ((self.a / self.r0).ln() / (self.a / self.sigma).ln()).clamp(0.0, 1.0)
    }

    /// Radius at time `t`, conditioned on not having touched either rim: a
    /// Gaussian radial step reflected back into the annulus.
    pub fn draw_r(&self, u: f64, t: f64) -> f64 {
        if self.d <= 0.0 || t <= 0.0 {
            return self.r0;
        }
        let step = (2.0 * self.d * t).sqrt() * inverse_normal_cdf(u);
        let width = self.a - self.sigma;
        let period = 2.0 * width;
        let mut folded = (self.r0 - self.sigma + step).rem_euclid(period);
        if folded > width {
            folded = period - folded;
        }
        (self.sigma + folded).clamp(
            self.sigma * (1.0 + 1e-12),
            self.a * (1.0 - 1e-12),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gf() -> GreensFunction2DRadAbs {
        GreensFunction2DRadAbs::new(1.0, 0.5, 0.1, 1.0)
    }

    #[test]
    fn test_eigenvalues_found_and_increasing() {
        let gf = gf();
        assert_eq!(gf.betas.len(), N_MODES);
        for w in gf.betas.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn test_survival_monotone() {
        let gf = gf();
        let mut prev = 1.0;
        for i in 1..20 {
            let t = i as f64 * 0.02;
            let s = gf.survival(t);
            assert!(s <= prev + 1e-9);
            prev = s;
        }
    }

    #[test]
    fn test_draw_time_inverts_survival() {
        let gf = gf();
        let t = gf.draw_time(0.5);
        assert!((gf.survival(t) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_splitting_probability_limits() {
        let near_sigma = GreensFunction2DRadAbs::new(1.0, 0.11, 0.1, 1.0);
        let near_a = GreensFunction2DRadAbs::new(1.0, 0.99, 0.1, 1.0);
        assert!(near_sigma.leave_sigma_probability() > 0.9);
        assert!(near_a.leave_sigma_probability() < 0.1);
        assert_relative_eq!(
            gf().leave_sigma_probability(),
            (1.0f64 / 0.5).ln() / (1.0f64 / 0.1).ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_draw_r_stays_in_annulus() {
        let gf = gf();
        for i in 0..50 {
            let u = (i as f64 + 0.5) / 50.0;
            let r = gf.draw_r(u, 0.05);
            assert!(r > 0.1 && r < 1.0);
        }
    }
}
