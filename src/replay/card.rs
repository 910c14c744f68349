//! Race card - The race record handed over by the data layer

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::replay::error::{ReplayError, Result};
use crate::replay::runner::{AnalysisRecord, EntryRecord, RunnerSetup};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceCard {
    #[serde(default)]
    pub race_id: String,
    #[serde(default)]
    pub name: String,
    /// Race distance (m)
    pub distance: f64,
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
    /// Analysis records keyed by horse number
    #[serde(default)]
    pub analysis: BTreeMap<u32, AnalysisRecord>,
}

impl RaceCard {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ReplayError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Runner setups in entry order; the position in the list is the runner index
    pub fn runner_setups(&self) -> Vec<RunnerSetup> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let analysis = self.analysis.get(&entry.horse_number).cloned();
                RunnerSetup::new(index, entry.clone(), analysis)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::runner::RunningStyle;

    const CARD: &str = r#"{
        "race_id": "202406050811",
        "name": "Example Stakes",
        "distance": 1600,
        "entries": [
            { "horse_number": 3, "finish_time": "1:33.8", "passing_order": "2-2", "last_3f": 34.1, "status": "result" },
            { "horse_number": 1, "finish_time": "---", "status": "scratched" }
        ],
        "analysis": {
            "3": { "style": "SENKO", "stats": { "speed": 61.5, "races_count": 8 } }
        }
    }"#;

    #[test]
    fn builds_aligned_runner_setups() {
        let card: RaceCard = serde_json::from_str(CARD).unwrap();
        let runners = card.runner_setups();
        assert_eq!(runners.len(), 2);
        assert_eq!(runners[0].index, 0);
        assert_eq!(runners[0].number, 3);
        assert_eq!(runners[0].style(), RunningStyle::Senko);
        assert_eq!(runners[1].index, 1);
        assert_eq!(runners[1].number, 1);
        assert!(runners[1].analysis.is_none());
        assert_eq!(runners[1].entry.finish_seconds(), None);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RaceCard::from_file("/nonexistent/card.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/card.json"));
    }
}
