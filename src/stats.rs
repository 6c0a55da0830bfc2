//! Running per-chain statistics: sliding-window acceptance probability and
//! running moments, used for progress reporting and test assertions.

use ndarray::Array1;
use num_traits::ToPrimitive;
use std::collections::VecDeque;

/// Number of most recent transitions used for the acceptance estimate.
const ACCEPT_WINDOW: usize = 100;

/// Tracks one chain's acceptance behavior and per-coordinate running
/// mean / mean-of-squares without storing the sample history.
///
/// Acceptance is inferred from state identity: a transition whose state
/// differs from the previous one counts as accepted. Exact ties between a
/// proposal and the current state are measure-zero for continuous targets.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTracker<T> {
    n: u64,
    mean: Array1<f64>,
    mean_sq: Array1<f64>,
    last_state: Vec<T>,
    accept_window: VecDeque<bool>,
}

impl<T: Copy + PartialEq + ToPrimitive> ChainTracker<T> {
    pub fn new(dim: usize, initial_state: &[T]) -> Self {
        assert_eq!(
            initial_state.len(),
            dim,
            "initial state length does not match tracker dimension"
        );
        Self {
            n: 0,
            mean: Array1::zeros(dim),
            mean_sq: Array1::zeros(dim),
            last_state: initial_state.to_vec(),
            accept_window: VecDeque::with_capacity(ACCEPT_WINDOW),
        }
    }

    /// Records the state reached by one transition.
    pub fn observe(&mut self, state: &[T]) {
        assert_eq!(
            state.len(),
            self.mean.len(),
            "observed state length does not match tracker dimension"
        );
        let accepted = self.last_state.iter().ne(state.iter());
        if self.accept_window.len() == ACCEPT_WINDOW {
            self.accept_window.pop_front();
        }
        self.accept_window.push_back(accepted);
        self.last_state.copy_from_slice(state);

        self.n += 1;
        let n = self.n as f64;
        for (i, x) in state.iter().enumerate() {
            let x = x.to_f64().expect("state entries must convert to f64");
            self.mean[i] = (self.mean[i] * (n - 1.0) + x) / n;
            self.mean_sq[i] = (self.mean_sq[i] * (n - 1.0) + x * x) / n;
        }
    }

    /// Number of transitions observed so far.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Acceptance probability over the most recent transitions.
    pub fn acceptance_rate(&self) -> f64 {
        if self.accept_window.is_empty() {
            return 0.0;
        }
        let accepted = self.accept_window.iter().filter(|&&a| a).count();
        accepted as f64 / self.accept_window.len() as f64
    }

    /// Per-coordinate running mean.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Per-coordinate sample variance (unbiased). Requires `n >= 2`.
    pub fn sample_variance(&self) -> Array1<f64> {
        let n = self.n as f64;
        (&self.mean_sq - &self.mean.mapv(|m| m * m)) * (n / (n - 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn acceptance_rate_counts_changed_states() {
        let mut tracker = ChainTracker::new(1, &[0.0]);
        // Two accepted moves, two rejections (state unchanged).
        tracker.observe(&[1.0]);
        tracker.observe(&[1.0]);
        tracker.observe(&[2.0]);
        tracker.observe(&[2.0]);
        assert_abs_diff_eq!(tracker.acceptance_rate(), 0.5);
    }

    #[test]
    fn acceptance_window_is_bounded() {
        let mut tracker = ChainTracker::new(1, &[0.0]);
        for i in 0..150 {
            tracker.observe(&[(i + 1) as f64]);
        }
        assert_abs_diff_eq!(tracker.acceptance_rate(), 1.0);
        // 100 rejections flush the window completely.
        for _ in 0..100 {
            tracker.observe(&[150.0]);
        }
        assert_abs_diff_eq!(tracker.acceptance_rate(), 0.0);
        assert_eq!(tracker.n(), 250);
    }

    #[test]
    fn running_moments_match_direct_computation() {
        let mut tracker = ChainTracker::new(2, &[0.0, 0.0]);
        tracker.observe(&[1.0, -1.0]);
        tracker.observe(&[3.0, 1.0]);
        assert_abs_diff_eq!(tracker.mean()[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tracker.mean()[1], 0.0, epsilon = 1e-12);
        let var = tracker.sample_variance();
        assert_abs_diff_eq!(var[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(var[1], 2.0, epsilon = 1e-12);
    }
}
