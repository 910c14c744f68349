//! Runner - Per-runner input records
//!
//! A race entry carries the real outcome (finish time, splits, passing
//! order) when the race has been run; the optional analysis record carries
//! the ratings used to simulate races that have not.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Categorical pacing tendency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunningStyle {
    /// Front-runner
    Nige,
    /// Stalker
    Senko,
    /// Mid-pack closer
    Sashi,
    /// Far closer
    Oikomi,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunningStyle {
    pub const CLASSIFIED: [RunningStyle; 4] = [
        RunningStyle::Nige,
        RunningStyle::Senko,
        RunningStyle::Sashi,
        RunningStyle::Oikomi,
    ];

    /// Resolve `Unknown` to a uniformly random classified style
    pub fn or_random<R: Rng>(self, rng: &mut R) -> Self {
        match self {
            RunningStyle::Unknown => Self::CLASSIFIED[rng.gen_range(0..Self::CLASSIFIED.len())],
            style => style,
        }
    }

    pub fn style_factor(self) -> StyleFactor {
        match self {
            RunningStyle::Nige => StyleFactor::new(1.2, 0.8),
            RunningStyle::Senko => StyleFactor::new(1.1, 0.9),
            RunningStyle::Sashi => StyleFactor::new(0.9, 1.1),
            RunningStyle::Oikomi => StyleFactor::new(0.8, 1.2),
            RunningStyle::Unknown => StyleFactor::default(),
        }
    }
}

/// Speed multipliers before and after the late-phase mark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleFactor {
    pub early: f64,
    pub late: f64,
}

impl StyleFactor {
    pub const fn new(early: f64, late: f64) -> Self {
        Self { early, late }
    }

    /// Factor for a runner that has covered `ratio` of the distance
    pub fn at(&self, ratio: f64, late_phase_ratio: f64) -> f64 {
        if ratio < late_phase_ratio {
            self.early
        } else {
            self.late
        }
    }
}

impl Default for StyleFactor {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// One row of the race's entry table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryRecord {
    pub horse_number: u32,
    #[serde(default)]
    pub bracket_number: Option<u32>,
    /// `M:SS.s`, plain seconds, or `---` when the runner did not finish
    #[serde(default)]
    pub finish_time: Option<String>,
    /// Rank at each timing checkpoint, e.g. `3-3-2-1`
    #[serde(default)]
    pub passing_order: Option<String>,
    /// Time over the final 600 m (s)
    #[serde(default)]
    pub last_3f: Option<f64>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "result".to_string()
}

impl EntryRecord {
    /// Finish time in seconds, `None` when absent or unparseable
    pub fn finish_seconds(&self) -> Option<f64> {
        self.finish_time.as_deref().and_then(parse_time)
    }

    pub fn passing_ranks(&self) -> Vec<u32> {
        self.passing_order
            .as_deref()
            .map(parse_passing_order)
            .unwrap_or_default()
    }

    /// Last-furlong split, ignoring zero and garbage values
    pub fn last_split(&self) -> Option<f64> {
        self.last_3f.filter(|t| t.is_finite() && *t > 0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub races_count: u32,
}

/// Performance analysis for one horse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub style: RunningStyle,
    #[serde(default)]
    pub stats: AnalysisStats,
}

impl AnalysisRecord {
    pub fn has_history(&self) -> bool {
        self.stats.races_count > 0
    }
}

/// Immutable input for one runner of a race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSetup {
    /// Stable index used to align per-runner arrays
    pub index: usize,
    /// Public number shown to the user
    pub number: u32,
    pub entry: EntryRecord,
    pub analysis: Option<AnalysisRecord>,
}

impl RunnerSetup {
    pub fn new(index: usize, entry: EntryRecord, analysis: Option<AnalysisRecord>) -> Self {
        Self {
            index,
            number: entry.horse_number,
            entry,
            analysis,
        }
    }

    pub fn style(&self) -> RunningStyle {
        self.analysis.as_ref().map(|a| a.style).unwrap_or_default()
    }
}

/// Parse `M:SS.s` or plain seconds.
///
/// Placeholders, garbage and non-positive values are treated as missing.
pub fn parse_time(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "---" {
        return None;
    }

    let seconds = match raw.split_once(':') {
        Some((min, sec)) => {
            let min: u32 = min.trim().parse().ok()?;
            let sec: f64 = sec.trim().parse().ok()?;
            if !(0.0..60.0).contains(&sec) {
                return None;
            }
            f64::from(min) * 60.0 + sec
        }
        None => raw.parse().ok()?,
    };

    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

/// Parse a dash separated rank list, skipping tokens that are not ranks
pub fn parse_passing_order(raw: &str) -> Vec<u32> {
    raw.split('-')
        .filter_map(|token| token.trim().parse().ok())
        .filter(|rank| *rank > 0)
        .collect()
}
