//! Real Result - Replay a race that has already been run
//!
//! Each runner's curve is pinned to a handful of (time, distance) anchors
//! taken from the result table: the start, synthetic corner checkpoints
//! estimated from the passing order, the start of the last-furlong split
//! and the recorded finish. Progress in between is interpolated.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::replay::config::{Interpolation, StrategyConfig};
use crate::replay::runner::RunnerSetup;
use crate::replay::strategy::{SimulationStrategy, StrategyKind};

/// A point a runner's curve must pass through
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Elapsed race time (s)
    pub time: f64,
    /// Distance covered (m)
    pub distance: f64,
}

impl Keyframe {
    pub const fn new(time: f64, distance: f64) -> Self {
        Self { time, distance }
    }
}

impl Interpolation {
    /// Map a bracket ratio in `[0, 1]` to a distance ratio in `[0, 1]`
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Interpolation::Linear => t,
            Interpolation::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

pub struct RealResultStrategy {
    config: StrategyConfig,
    rng: StdRng,
    target_distance: f64,
    winner_time: f64,
    current_time: f64,
    keyframes: Vec<Vec<Keyframe>>,
    /// Bracket each runner was last evaluated in
    cursors: Vec<usize>,
    progress: Vec<f64>,
    speeds: Vec<f64>,
}

impl RealResultStrategy {
    /// Create a strategy; `seed` makes the corner jitter reproducible
    pub fn new(config: StrategyConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            target_distance: 0.0,
            winner_time: 0.0,
            current_time: 0.0,
            keyframes: Vec::new(),
            cursors: Vec::new(),
            progress: Vec::new(),
            speeds: Vec::new(),
        }
    }

    pub fn keyframes(&self, index: usize) -> &[Keyframe] {
        self.keyframes.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fastest recorded finish time in the race
    pub fn winner_time(&self) -> f64 {
        self.winner_time
    }

    fn build_keyframes(&mut self, runner: &RunnerSetup) -> Vec<Keyframe> {
        let target = self.target_distance;

        let Some(finish) = runner.entry.finish_seconds() else {
            log::debug!(
                "Runner {} has no finish time ({}), holding at the start",
                runner.number,
                runner.entry.status
            );
            return vec![Keyframe::new(0.0, 0.0), Keyframe::new(self.config.dnf_horizon, 0.0)];
        };

        let mut frames = vec![Keyframe::new(0.0, 0.0)];

        let split = runner
            .entry
            .last_split()
            .filter(|_| target > self.config.last_split_distance);
        let corner_span = match split {
            Some(_) => target - self.config.last_split_distance,
            None => target,
        };

        let ranks = runner.entry.passing_ranks();
        let checkpoints = ranks.len() + 1;
        for (k, rank) in ranks.iter().enumerate() {
            let distance = corner_span * (k + 1) as f64 / checkpoints as f64;
            let pace_time = if target > 0.0 {
                distance / target * self.winner_time
            } else {
                0.0
            };
            let jitter = if self.config.rank_jitter > 0.0 {
                self.rng.gen_range(0.0..self.config.rank_jitter)
            } else {
                0.0
            };
            let mut time = pace_time + f64::from(rank - 1) * self.config.rank_delay + jitter;

            let prev = frames[frames.len() - 1];
            if time <= prev.time {
                log::debug!(
                    "Runner {} corner {} at {:.2}s is not after {:.2}s, pushing forward",
                    runner.number,
                    k + 1,
                    time,
                    prev.time
                );
                time = prev.time + self.config.corner_push;
            }
            frames.push(Keyframe::new(time, distance));
        }

        if let Some(split) = split {
            let distance = target - self.config.last_split_distance;
            let prev = frames[frames.len() - 1];
            let mut time = finish - split;
            if time <= prev.time {
                log::debug!(
                    "Runner {} split anchor at {:.2}s is not after {:.2}s, moving it",
                    runner.number,
                    time,
                    prev.time
                );
                time = (finish + prev.time) / 2.0;
            }
            frames.push(Keyframe::new(time, distance));
        }

        // The recorded finish wins over every estimate before it
        let before = frames.len();
        frames.retain(|f| f.time < finish);
        if frames.len() < before {
            log::debug!(
                "Runner {}: dropped {} anchors at or after the finish time",
                runner.number,
                before - frames.len()
            );
        }
        frames.push(Keyframe::new(finish, target));

        frames.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut ordered: Vec<Keyframe> = Vec::with_capacity(frames.len());
        for frame in frames {
            match ordered.last() {
                Some(prev) if frame.time <= prev.time || frame.distance < prev.distance => {}
                _ => ordered.push(frame),
            }
        }
        ordered
    }

    fn evaluate(&mut self, index: usize) {
        let t = self.current_time;
        let frames = &self.keyframes[index];
        if frames.is_empty() {
            self.progress[index] = 0.0;
            self.speeds[index] = 0.0;
            return;
        }

        let mut i = self.cursors[index];
        if i >= frames.len() || frames[i].time > t {
            i = 0;
        }
        while i + 1 < frames.len() && frames[i + 1].time < t {
            i += 1;
        }
        self.cursors[index] = i;

        let p0 = frames[i];
        let (progress, speed) = match frames.get(i + 1) {
            None => (p0.distance, 0.0),
            Some(&p1) => {
                let span = p1.time - p0.time;
                let past_end = t >= p1.time && i + 2 >= frames.len();
                if span <= 0.0 || past_end {
                    (p1.distance, 0.0)
                } else {
                    let average = (p1.distance - p0.distance) / span;
                    let ratio = (t - p0.time) / span;
                    let eased = self.config.interpolation.apply(ratio);
                    (p0.distance + (p1.distance - p0.distance) * eased, average)
                }
            }
        };

        self.progress[index] = progress.min(self.target_distance);
        self.speeds[index] = speed;
    }

    fn evaluate_all(&mut self) {
        for i in 0..self.keyframes.len() {
            self.evaluate(i);
        }
    }
}

impl SimulationStrategy for RealResultStrategy {
    fn init(&mut self, runners: &[RunnerSetup], target_distance: f64) {
        self.target_distance = super::course_distance(target_distance);
        self.current_time = 0.0;

        self.winner_time = runners
            .iter()
            .filter_map(|r| r.entry.finish_seconds())
            .min_by(f64::total_cmp)
            .unwrap_or(self.config.fallback_winner_time);

        self.keyframes = runners.iter().map(|r| self.build_keyframes(r)).collect();
        self.cursors = vec![0; runners.len()];
        self.progress = vec![0.0; runners.len()];
        self.speeds = vec![0.0; runners.len()];
        self.evaluate_all();
    }

    fn update(&mut self, _dt: f64, elapsed: f64) {
        self.current_time = elapsed;
        self.evaluate_all();
    }

    fn seek(&mut self, elapsed: f64) {
        // Evaluation resets the cursor on its own when time goes backwards
        self.update(0.0, elapsed);
    }

    fn progress(&self, index: usize) -> f64 {
        self.progress.get(index).copied().unwrap_or(0.0)
    }

    fn speed(&self, index: usize) -> f64 {
        self.speeds.get(index).copied().unwrap_or(0.0)
    }

    fn expected_duration(&self) -> Option<f64> {
        self.keyframes
            .iter()
            .filter_map(|frames| frames.last())
            .filter(|last| last.distance >= self.target_distance && last.time > 0.0)
            .map(|last| last.time)
            .max_by(f64::total_cmp)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::RealResult
    }
}
