//! Race Replay - Horse race animation engine
//!
//! Produces a continuous position for every runner of a race, either
//! replayed from the recorded result or simulated from ratings, and maps
//! it onto an oval track for rendering.

pub mod replay;

pub use replay::{
    AnalysisRecord, EntryRecord, HostState, RaceCard, RaceSnapshot, ReplayError, ReplayServer,
    RunnerSetup, RunningStyle, SimResult, SimulationConfig, SimulationEngine, StrategyConfig,
    StrategyKind, TrackGeometry,
};
