use crate::stats::ChainTracker;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use ndarray::{s, Array2, ArrayView1};
use num_traits::{Float, ToPrimitive};
use rayon::prelude::*;

pub trait MarkovChain<S> {
    /// Does one iteration of the chain, returning the new current state.
    fn step(&mut self) -> &Vec<S>;

    /// Optional: get the current state without stepping.
    fn current_state(&self) -> &Vec<S>;
}

/// Runs `chain` for `n_steps`, collecting every visited state into a
/// `[n_steps, dim]` matrix.
pub fn run_chain<S, M>(chain: &mut M, n_steps: usize) -> Array2<S>
where
    M: MarkovChain<S>,
    S: Float,
{
    let dim = chain.current_state().len();
    let mut out = Array2::<S>::zeros((n_steps, dim));

    for i in 0..n_steps {
        let state = chain.step();
        out.row_mut(i).assign(&ArrayView1::from(state.as_slice()));
    }

    out
}

/// Like [`run_chain`], but drives a progress bar and reports the chain's
/// sliding-window acceptance probability as the bar message.
pub fn run_chain_with_progress<S, M>(chain: &mut M, n_steps: usize, pb: &ProgressBar) -> Array2<S>
where
    M: MarkovChain<S>,
    S: Float + ToPrimitive,
{
    let dim = chain.current_state().len();
    let mut out = Array2::<S>::zeros((n_steps, dim));
    let mut tracker = ChainTracker::new(dim, chain.current_state());

    pb.set_length(n_steps as u64);

    for i in 0..n_steps {
        let state = chain.step();
        out.row_mut(i).assign(&ArrayView1::from(state.as_slice()));

        tracker.observe(state);
        pb.set_message(format!("p(accept)≈{:.2}", tracker.acceptance_rate()));
        pb.inc(1);
    }

    out
}

/// A trait for "anything that owns multiple MarkovChains".
/// - `S` is the state element type (e.g. f64).
/// - `Chain` is the MarkovChain type stored by this struct.
pub trait HasChains<S> {
    type Chain: MarkovChain<S> + std::marker::Send;

    /// Returns a mutable reference to the vector of chains.
    fn chains_mut(&mut self) -> &mut Vec<Self::Chain>;
}

pub trait ChainRunner<S>: HasChains<S>
where
    S: Float + ToPrimitive + std::marker::Send + std::marker::Sync + std::fmt::Debug + 'static,
{
    /// Runs the chains in parallel, discarding burn-in.
    fn run(&mut self, n_steps: usize, discard: usize) -> Vec<Array2<S>> {
        let results: Vec<Array2<S>> = self
            .chains_mut()
            .par_iter_mut()
            .map(|chain| run_chain(chain, n_steps))
            .collect();

        // Now we can discard burn-in rows from each matrix
        results
            .into_iter()
            .map(|mat| {
                let keep = mat.nrows().saturating_sub(discard);
                mat.slice(s![mat.nrows() - keep.., ..]).to_owned()
            })
            .collect()
    }

    /// Runs the chains in parallel with one progress bar per chain.
    fn run_with_progress(&mut self, n_steps: usize, discard: usize) -> Vec<Array2<S>> {
        let multi = MultiProgress::new();
        let pb_style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-");

        let results: Vec<Array2<S>> = self
            .chains_mut()
            .par_iter_mut()
            .enumerate()
            .map(|(i, chain)| {
                let pb = multi.add(ProgressBar::new(n_steps as u64));
                pb.set_prefix(format!("Chain {i}"));
                pb.set_style(pb_style.clone());

                let samples = run_chain_with_progress(chain, n_steps, &pb);

                pb.finish_with_message("Done!");
                samples
            })
            .collect();

        // Discard burn-in
        results
            .into_par_iter()
            .map(|samples| {
                let keep = samples.nrows().saturating_sub(discard);
                samples.slice(s![samples.nrows() - keep.., ..]).to_owned()
            })
            .collect()
    }
}

impl<S, T> ChainRunner<S> for T
where
    S: Float + ToPrimitive + std::marker::Send + std::marker::Sync + std::fmt::Debug + 'static,
    T: HasChains<S>,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic one-dimensional chain that counts up by one per step.
    struct CountingChain {
        state: Vec<f64>,
    }

    impl MarkovChain<f64> for CountingChain {
        fn step(&mut self) -> &Vec<f64> {
            self.state[0] += 1.0;
            &self.state
        }

        fn current_state(&self) -> &Vec<f64> {
            &self.state
        }
    }

    struct ManyCounters {
        chains: Vec<CountingChain>,
    }

    impl HasChains<f64> for ManyCounters {
        type Chain = CountingChain;

        fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
            &mut self.chains
        }
    }

    #[test]
    fn run_chain_collects_every_state() {
        let mut chain = CountingChain { state: vec![0.0] };
        let out = run_chain(&mut chain, 5);
        assert_eq!(out.shape(), &[5, 1]);
        for i in 0..5 {
            assert_eq!(out[(i, 0)], (i + 1) as f64);
        }
    }

    #[test]
    fn runner_discards_burnin_rows() {
        let mut many = ManyCounters {
            chains: vec![
                CountingChain { state: vec![0.0] },
                CountingChain { state: vec![10.0] },
            ],
        };
        let out = many.run(6, 2);
        assert_eq!(out.len(), 2);
        for mat in &out {
            assert_eq!(mat.shape(), &[4, 1]);
        }
        assert_eq!(out[0][(0, 0)], 3.0);
        assert_eq!(out[1][(0, 0)], 13.0);
    }

    #[test]
    fn runner_survives_excess_discard() {
        let mut many = ManyCounters {
            chains: vec![CountingChain { state: vec![0.0] }],
        };
        let out = many.run(3, 10);
        assert_eq!(out[0].nrows(), 0);
    }
}
