//! Strategies - Progress curves for every runner of a race
//!
//! A strategy turns runner attributes into distance over time. The engine
//! picks one per race and then only talks to it through
//! [`SimulationStrategy`].

pub mod probabilistic;
pub mod real_result;

use serde::{Deserialize, Serialize};

use crate::replay::config::StrategyConfig;
use crate::replay::runner::RunnerSetup;

pub use probabilistic::ProbabilisticStrategy;
pub use real_result::RealResultStrategy;

/// Which strategy drives a race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Simulated from ratings and running styles
    Probabilistic,
    /// Replayed from recorded finish times and splits
    RealResult,
}

impl StrategyKind {
    /// Replay real results as soon as one runner has a usable finish time
    pub fn for_runners(runners: &[RunnerSetup]) -> Self {
        if runners.iter().any(|r| r.entry.finish_seconds().is_some()) {
            StrategyKind::RealResult
        } else {
            StrategyKind::Probabilistic
        }
    }
}

pub trait SimulationStrategy {
    /// Build per-runner state. Called once before the first update.
    fn init(&mut self, runners: &[RunnerSetup], target_distance: f64);

    /// Advance by `dt` simulated seconds; `elapsed` is the clock after the step
    fn update(&mut self, dt: f64, elapsed: f64);

    /// Re-evaluate every curve at an absolute time
    fn seek(&mut self, elapsed: f64);

    /// Meters covered by runner `index`, never above the target distance
    fn progress(&self, index: usize) -> f64;

    /// Current speed of runner `index` (m/s)
    fn speed(&self, index: usize) -> f64;

    /// Time at which the last finishing runner is expected home, when known
    fn expected_duration(&self) -> Option<f64> {
        None
    }

    fn kind(&self) -> StrategyKind;
}

/// Race distance usable by the strategies; garbage becomes an empty course
pub(crate) fn course_distance(distance: f64) -> f64 {
    if distance.is_finite() {
        distance.max(0.0)
    } else {
        0.0
    }
}

/// Build and initialise the strategy suited to `runners`
pub fn select(
    runners: &[RunnerSetup],
    target_distance: f64,
    config: &StrategyConfig,
    seed: Option<u64>,
) -> Box<dyn SimulationStrategy> {
    let kind = StrategyKind::for_runners(runners);
    log::info!(
        "Using {:?} strategy for {} runners over {}m",
        kind,
        runners.len(),
        target_distance
    );

    let mut strategy: Box<dyn SimulationStrategy> = match kind {
        StrategyKind::Probabilistic => Box::new(ProbabilisticStrategy::new(config.clone(), seed)),
        StrategyKind::RealResult => Box::new(RealResultStrategy::new(config.clone(), seed)),
    };
    strategy.init(runners, target_distance);
    strategy
}
