//! Simulation - Replay host
//!
//! Owns the engine of the selected race, turns host controls into engine
//! calls and produces the per-frame render snapshot.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::replay::card::RaceCard;
use crate::replay::config::SimulationConfig;
use crate::replay::race::{SimResult, SimulationEngine};
use crate::replay::strategy::StrategyKind;
use crate::replay::track::TrackGeometry;

/// Number of tick durations kept for the rolling average
const TICK_WINDOW: usize = 60;

/// Host state for the replay viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostState {
    Idle,
    Ready,
    Racing,
    Paused,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f64,
    pub avg_tick_time_ms: f32,
    pub runner_count: u32,
    pub host_state: HostState,
    pub strategy: Option<StrategyKind>,
}

/// Draw state of one runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSnapshot {
    pub index: usize,
    pub number: u32,
    /// Gate bracket, drives the badge colour
    pub bracket_number: Option<u32>,
    /// 1-based live position
    pub rank: u32,
    /// Meters covered since the start
    pub progress: f64,
    /// Meters behind the leader, 0 for the leader
    pub gap: f64,
    pub speed: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub finished: bool,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub race_id: String,
    pub state: HostState,
    pub elapsed_time: f64,
    pub duration: Option<f64>,
    pub speed_multiplier: f64,
    pub runners: Vec<RunnerSnapshot>,
    /// Horse numbers from leader to last
    pub standings: Vec<u32>,
    pub finisher_count: u32,
}

/// Main replay host
pub struct ReplayServer {
    state: HostState,
    config: SimulationConfig,
    track: TrackGeometry,
    race_id: String,
    engine: Option<SimulationEngine>,
    /// Course position the field starts from (m)
    start_offset: f64,
    speed_multiplier: f64,
    seed: Option<u64>,
    results: Vec<SimResult>,
    tick_times: VecDeque<f32>,
}

impl ReplayServer {
    /// Create a new host with no race loaded
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            state: HostState::Idle,
            track: TrackGeometry::new(&config),
            speed_multiplier: config.speed_multiplier,
            config,
            race_id: String::new(),
            engine: None,
            start_offset: 0.0,
            seed: None,
            results: Vec::new(),
            tick_times: VecDeque::with_capacity(TICK_WINDOW),
        }
    }

    /// Seed every race loaded from now on
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Select a race; any previous engine is dropped
    pub fn load_race(&mut self, card: &RaceCard) {
        let runners = card.runner_setups();
        let mut engine =
            SimulationEngine::with_seed(runners, card.distance, &self.config, self.seed);
        engine.set_speed(self.speed_multiplier);

        log::info!(
            "Race {} loaded: {} runners, {}m, {:?} strategy",
            card.race_id,
            card.entries.len(),
            card.distance,
            engine.strategy_kind()
        );

        self.race_id = card.race_id.clone();
        self.start_offset = self.track.start_offset(card.distance);
        self.engine = Some(engine);
        self.results.clear();
        self.tick_times.clear();
        self.state = HostState::Ready;
    }

    /// Start from zero, or resume a paused race
    pub fn play(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match self.state {
            HostState::Ready | HostState::Results => {
                engine.start();
                self.results.clear();
                self.state = HostState::Racing;
            }
            HostState::Paused => {
                engine.resume();
                self.state = HostState::Racing;
            }
            HostState::Idle | HostState::Racing => {}
        }
    }

    /// Pause the race
    pub fn pause(&mut self) {
        if self.state != HostState::Racing {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
            self.state = HostState::Paused;
        }
    }

    /// Play when stopped, pause when racing
    pub fn toggle_play(&mut self) {
        match self.state {
            HostState::Racing => self.pause(),
            _ => self.play(),
        }
    }

    /// Jump to an absolute race time
    pub fn seek(&mut self, time: f64) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.set_time(time);

        let runners = engine.runners();
        self.results.retain(|result| {
            runners
                .iter()
                .find(|r| r.number == result.horse_number)
                .is_some_and(|r| engine.is_runner_finished(r.index))
        });

        self.state = match self.state {
            HostState::Racing => HostState::Racing,
            _ if engine.is_finished() => HostState::Results,
            _ => {
                engine.pause();
                HostState::Paused
            }
        };
    }

    /// Set playback speed, kept across race loads
    pub fn set_speed(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_speed(multiplier);
        }
    }

    /// Perform a single frame and return the resulting snapshot
    pub fn tick(&mut self, frame_delta: f64) -> Option<RaceSnapshot> {
        if self.state != HostState::Racing {
            return self.snapshot();
        }

        let tick_start = Instant::now();

        if let Some(engine) = self.engine.as_mut() {
            let finished = engine.update(frame_delta);
            self.results.extend(finished);

            if engine.is_finished() {
                self.state = HostState::Results;
            }
        }

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push_back(tick_time);
        if self.tick_times.len() > TICK_WINDOW {
            self.tick_times.pop_front();
        }

        self.snapshot()
    }

    /// Current snapshot without advancing the clock
    pub fn snapshot(&self) -> Option<RaceSnapshot> {
        let engine = self.engine.as_ref()?;

        let order = engine.standings();
        let leader = order.first().map_or(0.0, |&i| engine.progress(i));
        let mut ranks = vec![0; order.len()];
        for (position, &index) in order.iter().enumerate() {
            ranks[index] = position as u32 + 1;
        }

        let runners = engine
            .runners()
            .iter()
            .map(|runner| {
                let progress = engine.progress(runner.index);
                let pose = self
                    .track
                    .pose(self.start_offset + progress, self.track.lane_offset(runner.index));
                RunnerSnapshot {
                    index: runner.index,
                    number: runner.number,
                    bracket_number: runner.entry.bracket_number,
                    rank: ranks[runner.index],
                    progress,
                    gap: leader - progress,
                    speed: engine.speed(runner.index),
                    x: pose.x,
                    y: pose.y,
                    heading: pose.heading,
                    finished: engine.is_runner_finished(runner.index),
                }
            })
            .collect::<Vec<_>>();

        let standings = order.into_iter().map(|i| runners[i].number).collect();

        Some(RaceSnapshot {
            race_id: self.race_id.clone(),
            state: self.state,
            elapsed_time: engine.elapsed_time(),
            duration: engine.expected_duration(),
            speed_multiplier: engine.speed_multiplier(),
            runners,
            standings,
            finisher_count: engine.finished_count() as u32,
        })
    }

    /// Finish events collected from ticks, in finish order
    pub fn results(&self) -> &[SimResult] {
        &self.results
    }

    /// Get the engine of the loaded race
    pub fn engine(&self) -> Option<&SimulationEngine> {
        self.engine.as_ref()
    }

    /// Get the track geometry
    pub fn track(&self) -> &TrackGeometry {
        &self.track
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            tick_rate: self.config.fps,
            avg_tick_time_ms: avg_tick_time,
            runner_count: self.engine.as_ref().map_or(0, |e| e.runners().len() as u32),
            host_state: self.state,
            strategy: self.engine.as_ref().map(SimulationEngine::strategy_kind),
        }
    }

    /// Get current host state
    pub fn get_state(&self) -> HostState {
        self.state
    }

    /// Drop the race and go back to idle
    pub fn reset(&mut self) {
        self.state = HostState::Idle;
        self.engine = None;
        self.race_id.clear();
        self.results.clear();
        self.tick_times.clear();
    }
}

impl Default for ReplayServer {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::runner::EntryRecord;

    fn card() -> RaceCard {
        RaceCard {
            race_id: "test".to_string(),
            name: "Test".to_string(),
            distance: 1200.0,
            entries: vec![
                EntryRecord {
                    horse_number: 5,
                    bracket_number: Some(4),
                    finish_time: Some("1:10.0".to_string()),
                    ..Default::default()
                },
                EntryRecord {
                    horse_number: 2,
                    finish_time: Some("1:11.5".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn loaded() -> ReplayServer {
        let mut server = ReplayServer::default().with_seed(3);
        server.load_race(&card());
        server
    }

    #[test]
    fn idle_until_loaded() {
        let mut server = ReplayServer::default();
        assert_eq!(server.get_state(), HostState::Idle);
        server.play();
        assert!(server.tick(1.0).is_none());
    }

    #[test]
    fn runs_to_results() {
        let mut server = loaded();
        assert_eq!(server.get_state(), HostState::Ready);
        server.set_speed(10.0);
        server.play();
        for _ in 0..1000 {
            server.tick(1.0);
        }
        assert_eq!(server.get_state(), HostState::Results);
        let numbers: Vec<u32> = server.results().iter().map(|r| r.horse_number).collect();
        assert_eq!(numbers, vec![5, 2]);
        assert_eq!(server.get_stats().runner_count, 2);
    }

    #[test]
    fn starting_grid_respects_start_offset() {
        let server = loaded();
        let snapshot = server.snapshot().unwrap();
        let track = server.track();
        let offset = track.start_offset(1200.0);
        let expected = track.position(offset, track.lane_offset(1));
        assert!((snapshot.runners[1].x - expected.x).abs() < 1e-9);
        assert!((snapshot.runners[1].y - expected.y).abs() < 1e-9);
    }

    #[test]
    fn finish_lands_on_finish_line() {
        let mut server = loaded();
        server.seek(200.0);
        let snapshot = server.snapshot().unwrap();
        assert_eq!(snapshot.state, HostState::Results);
        let finish = server.track().position(0.0, 0.0);
        assert!((snapshot.runners[0].x - finish.x).abs() < 1e-6);
        assert!((snapshot.runners[0].y - finish.y).abs() < 1e-6);
        assert_eq!(snapshot.finisher_count, 2);
    }

    #[test]
    fn live_ranking_carries_gap_and_bracket() {
        let mut server = loaded();
        server.seek(35.0);
        let snapshot = server.snapshot().unwrap();
        let leader = &snapshot.runners[0];
        let chaser = &snapshot.runners[1];

        assert_eq!(snapshot.standings, vec![5, 2]);
        assert_eq!((leader.rank, chaser.rank), (1, 2));
        assert_eq!(leader.gap, 0.0);
        assert!(chaser.gap > 0.0);
        assert!((chaser.gap - (leader.progress - chaser.progress)).abs() < 1e-9);
        assert_eq!(leader.bracket_number, Some(4));
        assert_eq!(chaser.bracket_number, None);
    }

    #[test]
    fn tick_window_is_bounded() {
        let mut server = loaded();
        server.set_speed(0.01);
        server.play();
        for _ in 0..(TICK_WINDOW * 3) {
            server.tick(1.0);
        }
        assert_eq!(server.tick_times.len(), TICK_WINDOW);
        assert!(server.get_stats().avg_tick_time_ms >= 0.0);
    }

    #[test]
    fn pause_and_toggle() {
        let mut server = loaded();
        server.play();
        server.tick(60.0);
        server.toggle_play();
        assert_eq!(server.get_state(), HostState::Paused);
        let before = server.snapshot().unwrap().elapsed_time;
        server.tick(60.0);
        assert_eq!(server.snapshot().unwrap().elapsed_time, before);
        server.toggle_play();
        assert_eq!(server.get_state(), HostState::Racing);
    }

    #[test]
    fn seek_back_drops_results() {
        let mut server = loaded();
        server.set_speed(20.0);
        server.play();
        while server.get_state() == HostState::Racing {
            server.tick(1.0);
        }
        assert_eq!(server.results().len(), 2);
        server.seek(71.0);
        assert_eq!(server.get_state(), HostState::Paused);
        let numbers: Vec<u32> = server.results().iter().map(|r| r.horse_number).collect();
        assert_eq!(numbers, vec![5]);
        assert_eq!(server.snapshot().unwrap().standings, vec![5, 2]);
    }

    #[test]
    fn reload_discards_previous_race() {
        let mut server = loaded();
        server.play();
        server.tick(600.0);
        server.load_race(&card());
        assert_eq!(server.get_state(), HostState::Ready);
        assert_eq!(server.snapshot().unwrap().elapsed_time, 0.0);
        assert!(server.results().is_empty());
        server.reset();
        assert!(server.snapshot().is_none());
    }
}
