//! Replay Module
//!
//! Turns a race card into time-indexed runner positions on an oval track.
//! The engine is driven by the host's frame callback; nothing here runs on
//! its own.

pub mod card;
pub mod config;
pub mod error;
pub mod race;
pub mod runner;
pub mod simulation;
pub mod strategy;
pub mod track;

pub use card::RaceCard;
pub use config::{Interpolation, SimulationConfig, StrategyConfig};
pub use error::{ReplayError, Result};
pub use race::{EngineState, SimResult, SimulationEngine};
pub use runner::{
    AnalysisRecord, AnalysisStats, EntryRecord, RunnerSetup, RunningStyle, StyleFactor,
};
pub use simulation::{HostState, RaceSnapshot, ReplayServer, RunnerSnapshot, ServerStats};
pub use strategy::{ProbabilisticStrategy, RealResultStrategy, SimulationStrategy, StrategyKind};
pub use track::{TrackGeometry, TrackPoint, TrackPose};
