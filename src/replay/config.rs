//! Config - Track geometry and pacing parameters
//!
//! Both structs deserialize from partial JSON; missing keys fall back to
//! the defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::replay::error::{ReplayError, Result};

/// Interpolation used between two keyframes of a real-result curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Linear,
    #[default]
    EaseInOut,
}

/// Pacing constants shared by both strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Average cruising speed for a rating of 50 (m/s)
    pub base_speed: f64,
    /// Speed gained per rating point above 50 (m/s)
    pub rating_speed_factor: f64,
    /// Floor for any simulated base speed, so every runner gets home (m/s)
    pub min_base_speed: f64,
    /// Rating assumed when an analysis record carries none
    pub default_rating: f64,
    /// Rating band drawn from when a runner has no history
    pub unrated_min: f64,
    pub unrated_max: f64,
    /// Full width of the uniform noise added to every rating
    pub rating_noise: f64,
    /// Fraction of the distance where the early factor gives way to the late one
    pub late_phase_ratio: f64,
    /// Length of the last-furlong split (m)
    pub last_split_distance: f64,
    /// Corner delay per rank behind the leader (s)
    pub rank_delay: f64,
    /// Upper bound of the random jitter added to each corner time (s)
    pub rank_jitter: f64,
    /// Shift applied to a corner anchor that would not move forward in time (s)
    pub corner_push: f64,
    /// Winner time used when nobody has a parseable finish time (s)
    pub fallback_winner_time: f64,
    /// End of the flat curve given to runners that never finish (s)
    pub dnf_horizon: f64,
    pub interpolation: Interpolation,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_speed: 16.56,
            rating_speed_factor: 0.12,
            min_base_speed: 1.0,
            default_rating: 50.0,
            unrated_min: 40.0,
            unrated_max: 60.0,
            rating_noise: 4.0,
            late_phase_ratio: 0.6,
            last_split_distance: 600.0,
            rank_delay: 0.08,
            rank_jitter: 0.05,
            corner_push: 1.0,
            fallback_winner_time: 90.0,
            dnf_horizon: 999.0,
            interpolation: Interpolation::EaseInOut,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Canvas width (px)
    pub width: f64,
    /// Canvas height (px)
    pub height: f64,
    /// Radius of the two curves (px)
    pub track_radius: f64,
    /// Length of each straight (px)
    pub straight_length: f64,
    /// Real length of one lap (m)
    pub meters_per_lap: f64,
    /// Host frames per simulated second at 1x
    pub fps: f64,
    /// Initial playback speed
    pub speed_multiplier: f64,
    /// Lateral gap between neighbouring runners (px)
    pub lane_spacing: f64,
    pub strategy: StrategyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 500.0,
            track_radius: 150.0,
            straight_length: 400.0,
            meters_per_lap: 1700.0,
            fps: 60.0,
            speed_multiplier: 1.0,
            lane_spacing: 5.0,
            strategy: StrategyConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ReplayError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject geometry the position calculator cannot work with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("track_radius", self.track_radius),
            ("meters_per_lap", self.meters_per_lap),
            ("fps", self.fps),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ReplayError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.straight_length.is_finite() && self.straight_length >= 0.0) {
            return Err(ReplayError::InvalidConfig(format!(
                "straight_length must not be negative, got {}",
                self.straight_length
            )));
        }
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier >= 0.0) {
            return Err(ReplayError::InvalidConfig(format!(
                "speed_multiplier must not be negative, got {}",
                self.speed_multiplier
            )));
        }
        let s = &self.strategy;
        if !(s.min_base_speed.is_finite() && s.min_base_speed > 0.0) {
            return Err(ReplayError::InvalidConfig(format!(
                "min_base_speed must be positive, got {}",
                s.min_base_speed
            )));
        }
        if s.unrated_min > s.unrated_max {
            return Err(ReplayError::InvalidConfig(format!(
                "unrated_min ({}) exceeds unrated_max ({})",
                s.unrated_min, s.unrated_max
            )));
        }
        if !(0.0..=1.0).contains(&s.late_phase_ratio) {
            return Err(ReplayError::InvalidConfig(format!(
                "late_phase_ratio must lie in 0..=1, got {}",
                s.late_phase_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "fps": 30, "strategy": { "rank_delay": 0.1 } }"#).unwrap();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.track_radius, 150.0);
        assert_eq!(config.strategy.rank_delay, 0.1);
        assert_eq!(config.strategy.base_speed, 16.56);
        assert_eq!(config.strategy.interpolation, Interpolation::EaseInOut);
    }

    #[test]
    fn interpolation_parses_snake_case() {
        let config: StrategyConfig =
            serde_json::from_str(r#"{ "interpolation": "linear" }"#).unwrap();
        assert_eq!(config.interpolation, Interpolation::Linear);
    }

    #[test]
    fn rejects_bad_geometry() {
        let config = SimulationConfig {
            track_radius: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ReplayError::InvalidConfig(_))));

        let config = SimulationConfig {
            fps: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_speed_floor() {
        let mut config = SimulationConfig::default();
        config.strategy.min_base_speed = 0.0;
        assert!(matches!(config.validate(), Err(ReplayError::InvalidConfig(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::from_file("/nonexistent/race-replay.json").unwrap_err();
        assert!(matches!(err, ReplayError::Io { .. }));
    }
}
