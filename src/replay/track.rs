//! Track - Oval course geometry
//!
//! Maps "meters traveled" onto canvas coordinates. The course is two
//! straights joined by two semicircles; distance 0 is the finish line in
//! the middle of the bottom straight and runners travel clockwise on
//! screen (leftwards along the finish straight).
//!
//! The loop is split into five arcs, each owning `[start, end)`:
//!
//! 1. bottom straight, left half (finish line to left end)
//! 2. left curve (bottom to top)
//! 3. top straight (left to right)
//! 4. right curve (top to bottom)
//! 5. bottom straight, right half (right end back to the finish line)

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::replay::config::SimulationConfig;

/// Canvas position (px)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
}

/// Position plus travel direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPose {
    pub x: f64,
    pub y: f64,
    /// 0 = right, PI/2 = down, PI = left
    pub heading: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arc {
    FinishLeft,
    LeftCurve,
    FarStraight,
    RightCurve,
    FinishRight,
}

/// Fixed oval geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackGeometry {
    center_x: f64,
    center_y: f64,
    radius: f64,
    straight: f64,
    meters_per_lap: f64,
    lane_spacing: f64,
}

impl TrackGeometry {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            center_x: config.width / 2.0,
            center_y: config.height / 2.0,
            radius: config.track_radius,
            straight: config.straight_length,
            meters_per_lap: config.meters_per_lap,
            lane_spacing: config.lane_spacing,
        }
    }

    /// Path length of one lap (px)
    pub fn perimeter(&self) -> f64 {
        2.0 * self.straight + 2.0 * PI * self.radius
    }

    pub fn meters_per_lap(&self) -> f64 {
        self.meters_per_lap
    }

    pub fn meters_to_pixels(&self) -> f64 {
        self.perimeter() / self.meters_per_lap
    }

    /// Lateral offset that keeps runner `index` off its neighbours
    pub fn lane_offset(&self, index: usize) -> f64 {
        index as f64 * self.lane_spacing
    }

    /// Canvas position at `meters` along the course, pushed `lane_offset` px outward
    pub fn position(&self, meters: f64, lane_offset: f64) -> TrackPoint {
        let (arc, along) = self.locate(meters);
        let half = self.straight / 2.0;
        let r = self.radius + lane_offset;

        match arc {
            Arc::FinishLeft => TrackPoint {
                x: self.center_x - along,
                y: self.center_y + r,
            },
            Arc::LeftCurve => {
                let theta = FRAC_PI_2 + along / self.radius;
                TrackPoint {
                    x: self.center_x - half + theta.cos() * r,
                    y: self.center_y + theta.sin() * r,
                }
            }
            Arc::FarStraight => TrackPoint {
                x: self.center_x - half + along,
                y: self.center_y - r,
            },
            Arc::RightCurve => {
                let theta = -FRAC_PI_2 + along / self.radius;
                TrackPoint {
                    x: self.center_x + half + theta.cos() * r,
                    y: self.center_y + theta.sin() * r,
                }
            }
            Arc::FinishRight => TrackPoint {
                x: self.center_x + half - along,
                y: self.center_y + r,
            },
        }
    }

    /// Tangent direction at `meters` (radians)
    pub fn heading(&self, meters: f64) -> f64 {
        let (arc, along) = self.locate(meters);
        match arc {
            Arc::FinishLeft | Arc::FinishRight => PI,
            Arc::FarStraight => 0.0,
            Arc::LeftCurve => FRAC_PI_2 + along / self.radius + FRAC_PI_2,
            Arc::RightCurve => -FRAC_PI_2 + along / self.radius + FRAC_PI_2,
        }
    }

    pub fn pose(&self, meters: f64, lane_offset: f64) -> TrackPose {
        let TrackPoint { x, y } = self.position(meters, lane_offset);
        TrackPose {
            x,
            y,
            heading: self.heading(meters),
        }
    }

    /// Course position (m) a runner starts from so that covering
    /// `race_distance` ends exactly on the finish line
    pub fn start_offset(&self, race_distance: f64) -> f64 {
        let lap = self.meters_per_lap;
        (lap - race_distance.rem_euclid(lap)).rem_euclid(lap)
    }

    /// Arc containing `meters` and the pixel distance already covered on it
    fn locate(&self, meters: f64) -> (Arc, f64) {
        let perimeter = self.perimeter();
        let d = (meters * self.meters_to_pixels()).rem_euclid(perimeter);

        let half = self.straight / 2.0;
        let curve = PI * self.radius;

        let bounds = [
            (Arc::FinishLeft, half),
            (Arc::LeftCurve, curve),
            (Arc::FarStraight, self.straight),
            (Arc::RightCurve, curve),
        ];

        let mut start = 0.0;
        for (arc, length) in bounds {
            if d < start + length {
                return (arc, d - start);
            }
            start += length;
        }
        // rem_euclid may round up to the perimeter itself, which lands on the
        // finish line at the very end of the last arc
        (Arc::FinishRight, (d - start).min(half))
    }
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}
