use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Abstraction over a mutable Euclidean vector that supports the in-place
/// operations required by the conformal leapfrog integrator.
///
/// Position and momentum vectors must always have equal length; passing
/// mismatched vectors to any binary operation is a programming error and
/// panics with a descriptive message.
pub trait EuclideanVector: Clone {
    type Scalar: Float + Copy;

    /// Returns the dimensionality of the vector.
    fn len(&self) -> usize;

    /// In-place fused multiply-add: `self += alpha * other`.
    fn add_scaled_assign(&mut self, other: &Self, alpha: Self::Scalar);

    /// Scales the vector in-place.
    fn scale_assign(&mut self, alpha: Self::Scalar);

    /// Dot product between two vectors.
    fn dot(&self, other: &Self) -> Self::Scalar;

    /// Squared L2 norm, i.e. the sum of squared entries.
    fn norm2(&self) -> Self::Scalar {
        self.dot(self)
    }

    /// Fills the vector with samples from N(0, 1) in-place.
    fn fill_standard_normal(&mut self, rng: &mut impl Rng)
    where
        StandardNormal: Distribution<Self::Scalar>;
}

impl<T> EuclideanVector for Vec<T>
where
    T: Float + Copy,
{
    type Scalar = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn add_scaled_assign(&mut self, other: &Self, alpha: T) {
        assert_eq!(
            self.as_slice().len(),
            other.as_slice().len(),
            "add_scaled_assign called with mismatched vector lengths"
        );
        for (a, &b) in self.iter_mut().zip(other.iter()) {
            *a = *a + b * alpha;
        }
    }

    fn scale_assign(&mut self, alpha: T) {
        for a in self.iter_mut() {
            *a = *a * alpha;
        }
    }

    fn dot(&self, other: &Self) -> T {
        assert_eq!(
            self.as_slice().len(),
            other.as_slice().len(),
            "dot called with mismatched vector lengths"
        );
        self.iter()
            .zip(other.iter())
            .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
    }

    fn fill_standard_normal(&mut self, rng: &mut impl Rng)
    where
        StandardNormal: Distribution<T>,
    {
        self.iter_mut()
            .for_each(|x| *x = rng.sample(StandardNormal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_add_scaled_assign() {
        let mut v = vec![1.0, -2.0, 0.5];
        let delta = vec![2.0, 2.0, -4.0];
        v.add_scaled_assign(&delta, 0.5);
        assert_abs_diff_eq!(v[0], 2.0);
        assert_abs_diff_eq!(v[1], -1.0);
        assert_abs_diff_eq!(v[2], -1.5);
    }

    #[test]
    fn test_scale_and_norm2() {
        let mut v = vec![3.0, 4.0];
        assert_abs_diff_eq!(v.norm2(), 25.0);
        v.scale_assign(-1.0);
        assert_eq!(v, vec![-3.0, -4.0]);
        assert_abs_diff_eq!(v.norm2(), 25.0);
    }

    #[test]
    fn test_copy_is_independent() {
        let v = vec![1.0, 2.0];
        let mut w = v.clone();
        w.scale_assign(10.0);
        assert_eq!(v, vec![1.0, 2.0]);
        assert_eq!(w, vec![10.0, 20.0]);
    }

    #[test]
    fn test_fill_standard_normal_keeps_length() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut v = vec![0.0f64; 7];
        v.fill_standard_normal(&mut rng);
        assert_eq!(EuclideanVector::len(&v), 7);
        assert!(v.iter().any(|&x| x != 0.0));
    }

    #[test]
    #[should_panic(expected = "mismatched vector lengths")]
    fn test_mismatched_dot_panics() {
        let v = vec![1.0, 2.0];
        let w = vec![1.0, 2.0, 3.0];
        let _ = v.dot(&w);
    }
}
