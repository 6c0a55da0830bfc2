/*!
# Repelling-Attracting Hamiltonian Monte Carlo

This module implements the RA-HMC transition kernel ([arXiv:2403.04607]):
an HMC proposal whose leapfrog trajectory carries a sign-changing friction
term. Friction is negative (energy-injecting, repelling) over the first
half of the trajectory and positive (energy-dissipating, attracting) over
the second half, which lets proposals cross low-density regions between
modes before being pulled back toward high density. The sign envelope is a
pluggable [`FrictionSchedule`]; both the hard [`SplitFriction`] and the
smooth [`SigmoidFriction`] variants drive the same conformal leapfrog
sub-step.

The sampler maintains a vector of independent [`RAHMCMarkovChain`]s, each
with its own seedable RNG and momentum source, and implements
[`HasChains`] so the parallel [`ChainRunner`](crate::core::ChainRunner)
machinery applies.

# Examples

```rust
use ra_hmc::core::ChainRunner;
use ra_hmc::distributions::DiffableGaussian2D;
use ra_hmc::rahmc::{RAHMC, RAHMCConfig};

let target = DiffableGaussian2D::new([0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
let mut sampler = RAHMC::split(target, RAHMCConfig::default(), 2, 2)
    .unwrap()
    .set_seed(42);
let sample = sampler.run(100, 10);
assert_eq!(sample.len(), 2);
assert_eq!(sample[0].shape(), &[90, 2]);
```

[arXiv:2403.04607]: https://arxiv.org/abs/2403.04607
*/

use crate::core::{HasChains, MarkovChain};
use crate::distributions::{GaussianMomentum, GradientTarget, MomentumSampler};
use crate::euclidean::EuclideanVector;
use crate::friction::{FrictionSchedule, SigmoidFriction, SplitFriction};
use crate::integrator::ConformalLeapfrog;
use num_traits::Float;
use rand::prelude::*;
use std::error::Error;
use std::fmt;

/// Decorrelates the momentum stream from the accept-draw stream when both
/// are derived from one chain seed (SplitMix64 increment).
const MOMENTUM_SEED_OFFSET: u64 = 0x9E3779B97F4A7C15;

/// Algorithm parameters for RA-HMC.
///
/// Fixed during a single step; mutable between runs. The defaults match
/// the reference algorithm (`leapfrog_steps = 40`, `dt = 0.1`,
/// `gamma = 0.5`, `steepness = 10.0`). Recommended ranges are
/// `leapfrog_steps` in `[5, 100]`, `dt` in `[0.05, 0.5]`, `gamma` in
/// `[0.1, 2.0]` and `steepness` in `[1, 20]`; [`validate`] enforces only
/// the hard constraints below.
///
/// [`validate`]: RAHMCConfig::validate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RAHMCConfig<T: Float> {
    /// Total number of leapfrog sub-steps per proposal. Must be >= 1.
    pub leapfrog_steps: usize,
    /// Leapfrog step size. Must be positive.
    pub dt: T,
    /// Friction magnitude. Must be non-negative; zero recovers plain HMC.
    pub gamma: T,
    /// Sharpness of the sigmoid schedule's sign transition. Must be
    /// positive. Ignored by the split schedule.
    pub steepness: T,
}

impl<T: Float> Default for RAHMCConfig<T> {
    fn default() -> Self {
        Self {
            leapfrog_steps: 40,
            dt: T::from(0.1).unwrap(),
            gamma: T::from(0.5).unwrap(),
            steepness: T::from(10.0).unwrap(),
        }
    }
}

impl<T: Float> RAHMCConfig<T> {
    /// Checks the hard parameter constraints. Called by the sampler
    /// constructors so that invalid configurations are rejected before any
    /// trajectory runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leapfrog_steps < 1 {
            return Err(ConfigError::NonPositiveLeapfrogSteps);
        }
        if !(self.dt > T::zero()) {
            return Err(ConfigError::NonPositiveStepSize);
        }
        if !(self.gamma >= T::zero()) {
            return Err(ConfigError::NegativeGamma);
        }
        if !(self.steepness > T::zero()) {
            return Err(ConfigError::NonPositiveSteepness);
        }
        Ok(())
    }
}

/// Rejected configuration, reported at configuration time rather than
/// mid-trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    NonPositiveLeapfrogSteps,
    NonPositiveStepSize,
    NegativeGamma,
    NonPositiveSteepness,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveLeapfrogSteps => {
                write!(f, "leapfrog_steps must be at least 1")
            }
            ConfigError::NonPositiveStepSize => write!(f, "dt must be positive and finite"),
            ConfigError::NegativeGamma => write!(f, "gamma must be non-negative"),
            ConfigError::NonPositiveSteepness => write!(f, "steepness must be positive and finite"),
        }
    }
}

impl Error for ConfigError {}

/// One step's worth of visualizer notifications, in emission order:
/// a `Proposal` event followed by either `Accept` or `Reject`.
///
/// All payloads are copies; consumers never alias the sampler's working
/// vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent<T> {
    Proposal {
        proposal: Vec<T>,
        trajectory: Vec<Vec<T>>,
        initial_momentum: Vec<T>,
    },
    Accept {
        proposal: Vec<T>,
    },
    Reject {
        proposal: Vec<T>,
    },
}

/// Holds the events of the most recent step only; the queue is cleared at
/// the start of every step. Hosts that animate trajectories inspect or
/// [`drain`](EventQueue::drain) it between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQueue<T> {
    events: Vec<StepEvent<T>>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// The latest step's events, in emission order.
    pub fn events(&self) -> &[StepEvent<T>] {
        &self.events
    }

    /// Removes and returns the latest step's events.
    pub fn drain(&mut self) -> Vec<StepEvent<T>> {
        std::mem::take(&mut self.events)
    }

    fn clear(&mut self) {
        self.events.clear();
    }

    fn push(&mut self, event: StepEvent<T>) {
        self.events.push(event);
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The Metropolis test shared by every chain: accept iff
/// `u < exp(log_accept_ratio)` with `u ~ Uniform(0, 1)`.
///
/// Written in this form so that non-finite ratios resolve as rejection:
/// `exp(-inf) == 0` and any comparison against NaN is false. A target
/// returning `-inf` for a zero-density region therefore rejects the
/// proposal instead of crashing the chain.
pub fn metropolis_accept<T: Float>(log_accept_ratio: T, u: T) -> bool {
    u < log_accept_ratio.exp()
}

/// A single RA-HMC Markov chain: the transition kernel plus its
/// append-only record of accepted states.
///
/// The chain owns its working vectors exclusively; stored states are never
/// aliased by the integrator, so historical entries cannot be mutated
/// retroactively.
#[derive(Debug, Clone)]
pub struct RAHMCMarkovChain<T, D, S, M = GaussianMomentum>
where
    T: Float,
{
    /// The target distribution to sample from.
    pub target: D,
    /// The friction schedule driving the conformal integrator.
    pub schedule: S,
    /// The visualizer event queue for the most recent step.
    pub events: EventQueue<T>,
    /// The chain-specific random seed.
    pub seed: u64,
    integrator: ConformalLeapfrog<T>,
    momentum: M,
    chain: Vec<Vec<T>>,
    rng: SmallRng,
}

impl<T, D, S, M> RAHMCMarkovChain<T, D, S, M>
where
    T: Float,
    D: GradientTarget<T>,
    S: FrictionSchedule<T>,
    M: MomentumSampler<T>,
{
    /// Creates a chain with an explicit momentum source and resets it at
    /// dimension `dim`.
    pub fn with_momentum(target: D, schedule: S, dt: T, momentum: M, dim: usize) -> Self {
        let seed = thread_rng().gen::<u64>();
        let mut chain = Self {
            target,
            schedule,
            events: EventQueue::new(),
            seed,
            integrator: ConformalLeapfrog::new(dt),
            momentum,
            chain: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        };
        chain.reset(dim);
        chain
    }

    /// Re-initializes the chain record to a single sample of dimension
    /// `dim`, drawn from the momentum source's distribution family.
    pub fn reset(&mut self, dim: usize) {
        self.events.clear();
        self.chain = vec![self.momentum.sample(dim)];
    }

    /// The accepted states so far, starting with the reset sample.
    pub fn history(&self) -> &[Vec<T>] {
        &self.chain
    }

    /// Dimensionality of the chain's state space.
    pub fn dim(&self) -> usize {
        self.current().len()
    }

    /// Reseeds the accept-draw RNG and the momentum source.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self.momentum
            .reseed(seed.wrapping_add(MOMENTUM_SEED_OFFSET));
    }

    /// Generates one proposal from `(q0, p0)`: runs all leapfrog sub-steps
    /// under the friction schedule, then flips the momentum.
    ///
    /// Returns the candidate position, the flipped final momentum, and the
    /// trajectory (pre-step position first, one entry per sub-step after).
    pub fn propose(&self, q0: &[T], p0: &[T]) -> (Vec<T>, Vec<T>, Vec<Vec<T>>) {
        assert_eq!(
            q0.len(),
            p0.len(),
            "position and momentum must have equal dimension"
        );
        let mut q = q0.to_vec();
        let mut p = p0.to_vec();
        let mut trajectory = Vec::with_capacity(self.schedule.n_steps() + 1);
        trajectory.push(q.clone());

        for s in 0..self.schedule.n_steps() {
            self.integrator
                .substep(&self.target, &mut q, &mut p, self.schedule.gamma_at(s));
            trajectory.push(q.clone());
        }

        // Momentum flip: makes the proposal its own reversal partner, so
        // the plain H0 - H Metropolis ratio is valid.
        p.scale_assign(-T::one());
        (q, p, trajectory)
    }

    fn current(&self) -> &Vec<T> {
        self.chain
            .last()
            .expect("chain always contains at least the reset sample")
    }
}

impl<T, D, S, M> MarkovChain<T> for RAHMCMarkovChain<T, D, S, M>
where
    T: Float,
    D: GradientTarget<T>,
    S: FrictionSchedule<T>,
    M: MomentumSampler<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
{
    /// Performs one RA-HMC update: fresh momentum, conformal leapfrog
    /// trajectory, momentum flip, Metropolis test, chain append, and the
    /// ordered proposal/accept-or-reject event emission.
    fn step(&mut self) -> &Vec<T> {
        self.events.clear();
        let q0 = self.current().clone();
        let p0 = self.momentum.sample(q0.len());
        assert_eq!(
            p0.len(),
            q0.len(),
            "momentum source dimension does not match chain state dimension"
        );

        let (q, p, trajectory) = self.propose(&q0, &p0);

        self.events.push(StepEvent::Proposal {
            proposal: q.clone(),
            trajectory,
            initial_momentum: p0.clone(),
        });

        let half = T::from(0.5).unwrap();
        let h0 = -self.target.unnorm_logp(&q0) + p0.norm2() * half;
        let h = -self.target.unnorm_logp(&q) + p.norm2() * half;
        let log_accept_ratio = h0 - h;

        let u: T = self.rng.gen();
        if metropolis_accept(log_accept_ratio, u) {
            self.chain.push(q.clone());
            self.events.push(StepEvent::Accept { proposal: q });
        } else {
            self.chain.push(q0);
            self.events.push(StepEvent::Reject { proposal: q });
        }
        self.current()
    }

    fn current_state(&self) -> &Vec<T> {
        self.current()
    }
}

/// The RA-HMC sampler: a set of independent chains over one target.
///
/// Construct with [`RAHMC::split`] or [`RAHMC::sigmoid`] depending on the
/// friction schedule; both validate the configuration up front. The
/// sampler implements [`HasChains`], so
/// [`ChainRunner::run`](crate::core::ChainRunner::run) and
/// [`run_with_progress`](crate::core::ChainRunner::run_with_progress)
/// drive all chains in parallel.
#[derive(Debug, Clone)]
pub struct RAHMC<T, D, S>
where
    T: Float,
{
    /// The target distribution we want to sample from.
    pub target: D,
    /// The validated algorithm parameters.
    pub config: RAHMCConfig<T>,
    /// The vector of independent Markov chains.
    pub chains: Vec<RAHMCMarkovChain<T, D, S>>,
    /// The global random seed.
    pub seed: u64,
}

impl<T, D> RAHMC<T, D, SplitFriction<T>>
where
    T: Float,
    D: GradientTarget<T> + Clone,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
{
    /// Creates an RA-HMC sampler with the two-phase split friction
    /// schedule, `n_chains` chains, each reset at dimension `dim`.
    pub fn split(
        target: D,
        config: RAHMCConfig<T>,
        dim: usize,
        n_chains: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let schedule = SplitFriction::new(config.gamma, config.leapfrog_steps);
        Ok(Self::with_schedule(target, config, schedule, dim, n_chains))
    }
}

impl<T, D> RAHMC<T, D, SigmoidFriction<T>>
where
    T: Float,
    D: GradientTarget<T> + Clone,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
{
    /// Creates an RA-HMC sampler with the smooth sigmoid friction
    /// schedule, `n_chains` chains, each reset at dimension `dim`.
    pub fn sigmoid(
        target: D,
        config: RAHMCConfig<T>,
        dim: usize,
        n_chains: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let schedule = SigmoidFriction::new(config.gamma, config.steepness, config.leapfrog_steps);
        Ok(Self::with_schedule(target, config, schedule, dim, n_chains))
    }
}

impl<T, D, S> RAHMC<T, D, S>
where
    T: Float,
    D: GradientTarget<T> + Clone,
    S: FrictionSchedule<T>,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
{
    fn with_schedule(
        target: D,
        config: RAHMCConfig<T>,
        schedule: S,
        dim: usize,
        n_chains: usize,
    ) -> Self {
        let chains = (0..n_chains)
            .map(|_| {
                RAHMCMarkovChain::with_momentum(
                    target.clone(),
                    schedule.clone(),
                    config.dt,
                    GaussianMomentum::new(),
                    dim,
                )
            })
            .collect();
        let seed = thread_rng().gen::<u64>();
        Self {
            target,
            config,
            chains,
            seed,
        }
    }

    /// Sets a new global seed; chain `i` receives `seed + i`.
    ///
    /// Each chain is reset afterwards so that its initial sample is also
    /// reproducible under the new seed.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        for (i, chain) in self.chains.iter_mut().enumerate() {
            chain.set_seed(seed + i as u64);
            let dim = chain.dim();
            chain.reset(dim);
        }
        self
    }
}

impl<T, D, S> HasChains<T> for RAHMC<T, D, S>
where
    T: Float + Send,
    D: GradientTarget<T> + Clone + Send,
    S: FrictionSchedule<T> + Send,
    rand_distr::Standard: rand_distr::Distribution<T>,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
{
    type Chain = RAHMCMarkovChain<T, D, S>;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
        &mut self.chains
    }
}
