/*!
Friction schedules for repelling-attracting trajectories.

A schedule maps a 0-indexed leapfrog sub-step to the instantaneous friction
coefficient used by that sub-step of the conformal integrator. Negative
friction injects energy (repelling), positive friction dissipates it
(attracting). Both schedules here are antisymmetric about the trajectory
midpoint: the first half pushes the trajectory away from the current mode,
the second half pulls it back in.
*/

use num_traits::Float;

/// Maps a sub-step index to the friction coefficient consumed by one
/// conformal leapfrog sub-step.
pub trait FrictionSchedule<T: Float>: Clone {
    /// Total number of leapfrog sub-steps per proposal.
    fn n_steps(&self) -> usize;

    /// Friction coefficient for the 0-indexed sub-step `step`.
    ///
    /// Callers only pass `step < n_steps()`.
    fn gamma_at(&self, step: usize) -> T;
}

/// Two-phase schedule: constant `-gamma` for the first `floor(L / 2)`
/// sub-steps, constant `+gamma` for the rest.
///
/// For odd `L` the extra sub-step goes to the attracting phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitFriction<T: Float> {
    gamma: T,
    n_steps: usize,
}

impl<T: Float> SplitFriction<T> {
    pub fn new(gamma: T, n_steps: usize) -> Self {
        Self { gamma, n_steps }
    }
}

impl<T: Float> FrictionSchedule<T> for SplitFriction<T> {
    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn gamma_at(&self, step: usize) -> T {
        if step < self.n_steps / 2 {
            -self.gamma
        } else {
            self.gamma
        }
    }
}

/// Smooth sigmoid schedule:
/// `gamma(t) = gamma * (2 / (1 + exp(-steepness * (t/T - 0.5))) - 1)`
/// with `t = step * dt` and `T = n_steps * dt`, so `t/T` reduces to
/// `step / n_steps`.
///
/// The value ranges in `(-gamma, +gamma)`, passes through zero at the
/// trajectory midpoint, and approaches the hard split of [`SplitFriction`]
/// as `steepness` grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidFriction<T: Float> {
    gamma: T,
    steepness: T,
    n_steps: usize,
}

impl<T: Float> SigmoidFriction<T> {
    pub fn new(gamma: T, steepness: T, n_steps: usize) -> Self {
        Self {
            gamma,
            steepness,
            n_steps,
        }
    }
}

impl<T: Float> FrictionSchedule<T> for SigmoidFriction<T> {
    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn gamma_at(&self, step: usize) -> T {
        let half = T::from(0.5).unwrap();
        let two = T::from(2.0).unwrap();
        let frac = T::from(step).unwrap() / T::from(self.n_steps).unwrap();
        let u = self.steepness * (frac - half);
        self.gamma * (two / (T::one() + (-u).exp()) - T::one())
    }
}
