/*!
Target distributions and momentum sources for gradient-based sampling.

A target distribution exposes its unnormalized log-density and the gradient
of that log-density through the [`GradientTarget`] trait; the sampler never
needs anything else from it. Momenta come from a [`MomentumSampler`], by
default independent standard-normal draws.

# Examples

```rust
use ra_hmc::distributions::{DiffableGaussian2D, GradientTarget, Normalized};

let gauss = DiffableGaussian2D::new([0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
let logp = gauss.unnorm_logp(&[0.5, -0.5]);
let grad = gauss.grad_logp(&[0.5, -0.5]);
assert!(logp < 0.0);
assert_eq!(grad.len(), 2);
```
*/

use crate::euclidean::EuclideanVector;
use num_traits::Float;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;

/// A continuous target distribution that can evaluate its unnormalized
/// log-density and the gradient of that log-density.
///
/// Implementations must be deterministic and defined on all of R^d.
/// Returning `-inf` (or another non-finite value) from [`unnorm_logp`] is
/// the supported way to mark zero-density regions; the sampler turns such
/// values into rejections rather than errors.
///
/// [`unnorm_logp`]: GradientTarget::unnorm_logp
pub trait GradientTarget<T: Float> {
    /// Returns the log of the unnormalized density at `position`.
    fn unnorm_logp(&self, position: &[T]) -> T;

    /// Returns the gradient of the unnormalized log-density at `position`.
    ///
    /// The returned vector must have the same length as `position`.
    fn grad_logp(&self, position: &[T]) -> Vec<T>;
}

/// A trait for distributions that provide a normalized log-density (e.g., for diagnostics).
pub trait Normalized<T: Float> {
    /// Returns the normalized log-density at `position`.
    fn logp(&self, position: &[T]) -> T;
}

/// A source of auxiliary momentum vectors, drawn fresh at the start of
/// every proposal.
///
/// Samplers also use this source to draw the chain's initial position at
/// reset, so the source must be seedable for reproducible runs.
pub trait MomentumSampler<T: Float> {
    /// Draws an independent momentum vector of dimension `dim`.
    fn sample(&mut self, dim: usize) -> Vec<T>;

    /// Reseeds the sampler's random number generator.
    fn reseed(&mut self, seed: u64);
}

/// The default momentum source: independent draws from a d-dimensional
/// standard multivariate normal.
#[derive(Debug, Clone)]
pub struct GaussianMomentum {
    rng: SmallRng,
}

impl GaussianMomentum {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Returns this source reseeded with `seed`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

impl Default for GaussianMomentum {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> MomentumSampler<T> for GaussianMomentum
where
    StandardNormal: Distribution<T>,
{
    fn sample(&mut self, dim: usize) -> Vec<T> {
        let mut p = vec![T::zero(); dim];
        p.fill_standard_normal(&mut self.rng);
        p
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }
}

/**
An isotropic Gaussian centered at the origin, usable as a differentiable
target of any dimension.

The unnormalized log-density is `-|q|^2 / (2 std^2)` with gradient
`-q / std^2`.
*/
#[derive(Debug, Clone, Copy)]
pub struct IsotropicGaussian<T: Float> {
    pub std: T,
}

impl<T: Float> IsotropicGaussian<T> {
    /// Creates a new isotropic Gaussian target with the specified standard deviation.
    pub fn new(std: T) -> Self {
        Self { std }
    }
}

impl<T: Float> GradientTarget<T> for IsotropicGaussian<T> {
    fn unnorm_logp(&self, position: &[T]) -> T {
        let mut sum = T::zero();
        for &x in position.iter() {
            sum = sum + x * x;
        }
        -T::from(0.5).unwrap() * sum / (self.std * self.std)
    }

    fn grad_logp(&self, position: &[T]) -> Vec<T> {
        let inv_var = (self.std * self.std).recip();
        position.iter().map(|&x| -x * inv_var).collect()
    }
}

impl<T: Float> Normalized<T> for IsotropicGaussian<T> {
    fn logp(&self, position: &[T]) -> T {
        let d = T::from(position.len()).unwrap();
        let two_pi = T::from(2.0 * PI).unwrap();
        let log_norm = -d * T::from(0.5).unwrap() * (two_pi * self.std * self.std).ln();
        self.unnorm_logp(position) + log_norm
    }
}

/**
A 2D Gaussian with full covariance and an analytic log-density gradient.

# Examples

```rust
use ra_hmc::distributions::{DiffableGaussian2D, GradientTarget};

let gauss = DiffableGaussian2D::<f64>::new([0.0, 1.0], [[4.0, 2.0], [2.0, 3.0]]);
// The gradient vanishes at the mean.
let grad = gauss.grad_logp(&[0.0, 1.0]);
assert!(grad[0].abs() < 1e-12 && grad[1].abs() < 1e-12);
```
*/
#[derive(Debug, Clone, Copy)]
pub struct DiffableGaussian2D<T: Float> {
    pub mean: [T; 2],
    pub cov: [[T; 2]; 2],
}

impl<T: Float> DiffableGaussian2D<T> {
    /// Creates a new 2D Gaussian. The covariance must be symmetric positive
    /// definite; this is the caller's responsibility.
    pub fn new(mean: [T; 2], cov: [[T; 2]; 2]) -> Self {
        Self { mean, cov }
    }

    /// Returns `inv(cov) * (position - mean)` using the 2x2 adjugate inverse.
    fn whitened_diff(&self, position: &[T]) -> [T; 2] {
        let (a, b, c, d) = (
            self.cov[0][0],
            self.cov[0][1],
            self.cov[1][0],
            self.cov[1][1],
        );
        let det = a * d - b * c;
        let dx = position[0] - self.mean[0];
        let dy = position[1] - self.mean[1];
        [(d * dx - b * dy) / det, (-c * dx + a * dy) / det]
    }

    fn log_det(&self) -> T {
        let (a, b, c, d) = (
            self.cov[0][0],
            self.cov[0][1],
            self.cov[1][0],
            self.cov[1][1],
        );
        (a * d - b * c).abs().ln()
    }
}

impl<T: Float> GradientTarget<T> for DiffableGaussian2D<T> {
    fn unnorm_logp(&self, position: &[T]) -> T {
        let w = self.whitened_diff(position);
        let dx = position[0] - self.mean[0];
        let dy = position[1] - self.mean[1];
        -T::from(0.5).unwrap() * (dx * w[0] + dy * w[1])
    }

    fn grad_logp(&self, position: &[T]) -> Vec<T> {
        let w = self.whitened_diff(position);
        vec![-w[0], -w[1]]
    }
}

impl<T: Float> Normalized<T> for DiffableGaussian2D<T> {
    fn logp(&self, position: &[T]) -> T {
        let term_1 = -(T::from(2.0 * PI).unwrap()).ln();
        let term_2 = -T::from(0.5).unwrap() * self.log_det();
        term_1 + term_2 + self.unnorm_logp(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Normalizes the unnormalized log-density of an isotropic Gaussian into
    /// a probability value so it can be compared against known densities.
    fn normalize_isogauss(x: f64, d: usize, std: f64) -> f64 {
        let log_normalizer = -((d as f64) / 2.0) * ((2.0_f64).ln() + PI.ln() + 2.0 * std.ln());
        (x + log_normalizer).exp()
    }

    #[test]
    fn iso_gauss_density_1d() {
        let distr = IsotropicGaussian::new(1.0);
        let p = normalize_isogauss(distr.unnorm_logp(&[1.0]), 1, distr.std);
        let true_p = 0.24197072451914337;
        assert_abs_diff_eq!(p, true_p, epsilon = 1e-7);
        assert_abs_diff_eq!(distr.logp(&[1.0]), true_p.ln(), epsilon = 1e-10);
    }

    #[test]
    fn iso_gauss_gradient_points_to_origin() {
        let distr = IsotropicGaussian::new(2.0);
        let grad = distr.grad_logp(&[0.42, 9.6]);
        assert_abs_diff_eq!(grad[0], -0.42 / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], -9.6 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn gaussian_2d_gradient_matches_finite_differences() {
        let gauss = DiffableGaussian2D::new([0.5, -1.0], [[4.0, 2.0], [2.0, 3.0]]);
        let q = [1.3, 0.7];
        let grad = gauss.grad_logp(&q);
        let eps = 1e-6;
        for i in 0..2 {
            let mut hi = q;
            let mut lo = q;
            hi[i] = hi[i] + eps;
            lo[i] = lo[i] - eps;
            let fd = (gauss.unnorm_logp(&hi) - gauss.unnorm_logp(&lo)) / (2.0 * eps);
            assert_abs_diff_eq!(grad[i], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn gaussian_2d_normalized_unit_cov() {
        let gauss = DiffableGaussian2D::new([0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
        // At the mean the density of a standard 2D normal is 1/(2*pi).
        assert_abs_diff_eq!(gauss.logp(&[0.0, 0.0]), -(2.0 * PI).ln(), epsilon = 1e-12);
    }

    #[test]
    fn gaussian_momentum_is_seedable() {
        let mut a = GaussianMomentum::new().set_seed(7);
        let mut b = GaussianMomentum::new().set_seed(7);
        let x: Vec<f64> = a.sample(5);
        let y: Vec<f64> = b.sample(5);
        assert_eq!(x, y);
        assert_eq!(x.len(), 5);
    }

    #[test]
    fn gaussian_momentum_matches_standard_normal_fill() {
        let mut source = GaussianMomentum::new().set_seed(11);
        let drawn: Vec<f64> = source.sample(4);

        let mut rng = SmallRng::seed_from_u64(11);
        let mut filled = vec![0.0f64; 4];
        filled.fill_standard_normal(&mut rng);
        assert_eq!(drawn, filled);
    }
}
