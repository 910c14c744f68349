//! Race - Simulation clock, finish detection and transport controls
//!
//! The engine owns the clock and the strategy chosen for the race. The
//! host calls [`SimulationEngine::update`] once per frame with its frame
//! delta; everything else (seek, speed, pause) is driven by the host too.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::replay::config::SimulationConfig;
use crate::replay::runner::RunnerSetup;
use crate::replay::strategy::{self, SimulationStrategy, StrategyKind};

/// A runner crossing the finish line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    pub horse_number: u32,
    /// Elapsed race time of the frame the runner crossed on (s)
    pub time: f64,
}

pub type OnRunnerFinish = Box<dyn FnMut(SimResult)>;
pub type OnAllFinish = Box<dyn FnMut()>;

/// Clock and finish bookkeeping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineState {
    /// Simulated seconds since the start
    pub elapsed_time: f64,
    pub speed_multiplier: f64,
    /// Indices of runners that reached the target distance
    pub finished: HashSet<usize>,
    pub is_playing: bool,
}

pub struct SimulationEngine {
    runners: Vec<RunnerSetup>,
    target_distance: f64,
    refresh_rate: f64,
    strategy: Box<dyn SimulationStrategy>,
    state: EngineState,
    on_runner_finish: Option<OnRunnerFinish>,
    on_all_finish: Option<OnAllFinish>,
}

impl fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("runners", &self.runners.len())
            .field("target_distance", &self.target_distance)
            .field("strategy", &self.strategy.kind())
            .field("state", &self.state)
            .finish()
    }
}

impl SimulationEngine {
    /// Create an engine for one race; the strategy is chosen here and never changes
    pub fn new(runners: Vec<RunnerSetup>, target_distance: f64, config: &SimulationConfig) -> Self {
        Self::with_seed(runners, target_distance, config, None)
    }

    /// Like [`SimulationEngine::new`] with reproducible random draws
    pub fn with_seed(
        runners: Vec<RunnerSetup>,
        target_distance: f64,
        config: &SimulationConfig,
        seed: Option<u64>,
    ) -> Self {
        let strategy = strategy::select(&runners, target_distance, &config.strategy, seed);
        Self::with_strategy(runners, target_distance, config, strategy)
    }

    /// Drive an already initialised strategy
    pub fn with_strategy(
        runners: Vec<RunnerSetup>,
        target_distance: f64,
        config: &SimulationConfig,
        strategy: Box<dyn SimulationStrategy>,
    ) -> Self {
        Self {
            runners,
            target_distance: strategy::course_distance(target_distance),
            refresh_rate: config.fps,
            strategy,
            state: EngineState {
                speed_multiplier: sanitize_speed(config.speed_multiplier),
                ..Default::default()
            },
            on_runner_finish: None,
            on_all_finish: None,
        }
    }

    /// Register the callback fired once per runner crossing the line
    pub fn on_runner_finish(mut self, callback: impl FnMut(SimResult) + 'static) -> Self {
        self.on_runner_finish = Some(Box::new(callback));
        self
    }

    /// Register the callback fired when the last runner is home
    pub fn on_all_finish(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_all_finish = Some(Box::new(callback));
        self
    }

    /// Restart the race from zero and start playing
    pub fn start(&mut self) {
        self.state.elapsed_time = 0.0;
        self.state.finished.clear();
        self.strategy.seek(0.0);
        self.state.is_playing = true;
        log::info!(
            "Race started: {} runners over {}m",
            self.runners.len(),
            self.target_distance
        );
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.state.is_playing = false;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        self.state.is_playing = true;
    }

    /// Jump to an absolute race time.
    ///
    /// Finish membership is recomputed for every runner; no finish
    /// callback fires.
    pub fn set_time(&mut self, time: f64) {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        self.state.elapsed_time = time;
        self.strategy.seek(time);

        let target = self.target_distance;
        self.state.finished = (0..self.runners.len())
            .filter(|&i| self.strategy.progress(i) >= target)
            .collect();
        log::info!(
            "Seeked to {:.2}s, {} of {} runners home",
            time,
            self.state.finished.len(),
            self.runners.len()
        );
    }

    /// Change the playback multiplier for the following ticks
    pub fn set_speed(&mut self, multiplier: f64) {
        self.state.speed_multiplier = sanitize_speed(multiplier);
    }

    /// Advance one host frame.
    ///
    /// `frame_delta` is in frames at the configured refresh rate (1.0 is one
    /// frame at 60 fps by default). Returns the runners that finished on
    /// this frame, in index order.
    pub fn update(&mut self, frame_delta: f64) -> Vec<SimResult> {
        if !self.state.is_playing || !frame_delta.is_finite() || frame_delta < 0.0 {
            return Vec::new();
        }

        let dt = frame_delta / self.refresh_rate * self.state.speed_multiplier;
        self.state.elapsed_time += dt;
        self.strategy.update(dt, self.state.elapsed_time);

        let mut finished_now = Vec::new();
        for (i, runner) in self.runners.iter().enumerate() {
            if self.state.finished.contains(&i)
                || self.strategy.progress(i) < self.target_distance
            {
                continue;
            }
            self.state.finished.insert(i);
            let result = SimResult {
                horse_number: runner.number,
                time: self.state.elapsed_time,
            };
            log::info!("Runner {} finished at {:.2}s", result.horse_number, result.time);
            if let Some(callback) = self.on_runner_finish.as_mut() {
                callback(result);
            }
            finished_now.push(result);
        }

        if self.is_finished() {
            self.state.is_playing = false;
            log::info!("All {} runners finished", self.runners.len());
            if let Some(callback) = self.on_all_finish.as_mut() {
                callback();
            }
        }

        finished_now
    }

    /// Get meters covered by one runner
    pub fn progress(&self, index: usize) -> f64 {
        self.strategy.progress(index)
    }

    /// Get meters covered by every runner, in index order
    pub fn progress_all(&self) -> Vec<f64> {
        (0..self.runners.len()).map(|i| self.strategy.progress(i)).collect()
    }

    /// Get current speed of one runner (m/s)
    pub fn speed(&self, index: usize) -> f64 {
        self.strategy.speed(index)
    }

    /// Runner indices from leader to last; ties keep index order
    pub fn standings(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.runners.len()).collect();
        order.sort_by(|&a, &b| {
            self.strategy
                .progress(b)
                .total_cmp(&self.strategy.progress(a))
                .then(a.cmp(&b))
        });
        order
    }

    /// Get runner setups
    pub fn runners(&self) -> &[RunnerSetup] {
        &self.runners
    }

    /// Get clock and finish state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Get elapsed race time (s)
    pub fn elapsed_time(&self) -> f64 {
        self.state.elapsed_time
    }

    /// Get playback speed
    pub fn speed_multiplier(&self) -> f64 {
        self.state.speed_multiplier
    }

    /// Get race distance (m)
    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    /// Check if the clock is running
    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// Check if a runner has crossed the line
    pub fn is_runner_finished(&self, index: usize) -> bool {
        self.state.finished.contains(&index)
    }

    /// Get number of runners home
    pub fn finished_count(&self) -> usize {
        self.state.finished.len()
    }

    /// True once every runner is home; an empty field never finishes
    pub fn is_finished(&self) -> bool {
        !self.runners.is_empty() && self.state.finished.len() == self.runners.len()
    }

    /// Get time the last finisher is expected home, if known
    pub fn expected_duration(&self) -> Option<f64> {
        self.strategy.expected_duration()
    }

    /// Get the strategy driving this race
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }
}

fn sanitize_speed(multiplier: f64) -> f64 {
    if multiplier.is_finite() {
        multiplier.max(0.0)
    } else {
        0.0
    }
}
