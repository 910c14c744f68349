//! Probabilistic - Pace races that have not been run yet
//!
//! Every runner gets a base speed from its rating and a style factor from
//! its running style. Randomness is only drawn at init; the per-frame step
//! is deterministic, so a seek can replay the integration exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::replay::config::StrategyConfig;
use crate::replay::runner::{RunnerSetup, StyleFactor};
use crate::replay::strategy::{SimulationStrategy, StrategyKind};

/// Integration step used when seeking (s)
const SEEK_STEP: f64 = 1.0 / 60.0;

pub struct ProbabilisticStrategy {
    config: StrategyConfig,
    rng: StdRng,
    target_distance: f64,
    base_speeds: Vec<f64>,
    style_factors: Vec<StyleFactor>,
    progress: Vec<f64>,
}

impl ProbabilisticStrategy {
    /// Create a strategy; `seed` makes the init draws reproducible
    pub fn new(config: StrategyConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            target_distance: 0.0,
            base_speeds: Vec::new(),
            style_factors: Vec::new(),
            progress: Vec::new(),
        }
    }

    pub fn base_speed(&self, index: usize) -> f64 {
        self.base_speeds.get(index).copied().unwrap_or(0.0)
    }

    pub fn style_factor(&self, index: usize) -> Option<StyleFactor> {
        self.style_factors.get(index).copied()
    }

    fn rating(&mut self, runner: &RunnerSetup) -> f64 {
        let c = &self.config;
        let rated = runner
            .analysis
            .as_ref()
            .filter(|a| a.has_history())
            .map(|a| a.stats.speed.filter(|s| s.is_finite()).unwrap_or(c.default_rating));

        let rating = match rated {
            Some(rating) => rating,
            None => {
                log::debug!("Runner {} has no history, drawing a rating", runner.number);
                if c.unrated_max > c.unrated_min {
                    self.rng.gen_range(c.unrated_min..c.unrated_max)
                } else {
                    c.unrated_min
                }
            }
        };
        let noise = (self.rng.gen::<f64>() - 0.5) * self.config.rating_noise;
        rating + noise
    }

    fn is_finished(&self, index: usize) -> bool {
        self.progress[index] >= self.target_distance
    }

    /// Finished runners and runners without pace stay put forever
    fn can_advance(&self, index: usize) -> bool {
        !self.is_finished(index) && self.base_speeds[index] > 0.0
    }

    fn phase_factor(&self, index: usize) -> f64 {
        let ratio = if self.target_distance > 0.0 {
            self.progress[index] / self.target_distance
        } else {
            1.0
        };
        self.style_factors[index].at(ratio, self.config.late_phase_ratio)
    }

    fn step(&mut self, dt: f64) {
        for i in 0..self.progress.len() {
            if self.is_finished(i) {
                continue;
            }
            let advance = self.base_speeds[i] * self.phase_factor(i) * dt;
            self.progress[i] = (self.progress[i] + advance).min(self.target_distance);
        }
    }
}

impl SimulationStrategy for ProbabilisticStrategy {
    fn init(&mut self, runners: &[RunnerSetup], target_distance: f64) {
        self.target_distance = super::course_distance(target_distance);
        self.progress = vec![0.0; runners.len()];

        self.base_speeds = runners
            .iter()
            .map(|runner| {
                let rating = self.rating(runner);
                let speed =
                    self.config.base_speed + (rating - 50.0) * self.config.rating_speed_factor;
                if !speed.is_finite() {
                    log::warn!("Runner {} has an unusable rating, using base pace", runner.number);
                    return self.config.base_speed.max(self.config.min_base_speed);
                }
                if speed < self.config.min_base_speed {
                    log::warn!(
                        "Runner {} pace {:.2}m/s is below the floor, clamping",
                        runner.number,
                        speed
                    );
                }
                speed.max(self.config.min_base_speed)
            })
            .collect();

        self.style_factors = runners
            .iter()
            .map(|runner| runner.style().or_random(&mut self.rng).style_factor())
            .collect();
    }

    fn update(&mut self, dt: f64, _elapsed: f64) {
        if dt > 0.0 {
            self.step(dt);
        }
    }

    fn seek(&mut self, elapsed: f64) {
        self.progress.iter_mut().for_each(|p| *p = 0.0);
        let mut t = 0.0;
        while t < elapsed {
            let dt = SEEK_STEP.min(elapsed - t);
            self.step(dt);
            t += dt;
            if (0..self.progress.len()).all(|i| !self.can_advance(i)) {
                break;
            }
        }
    }

    fn progress(&self, index: usize) -> f64 {
        self.progress.get(index).copied().unwrap_or(0.0)
    }

    fn speed(&self, index: usize) -> f64 {
        if index >= self.progress.len() || self.is_finished(index) {
            return 0.0;
        }
        self.base_speeds[index] * self.phase_factor(index)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Probabilistic
    }
}
