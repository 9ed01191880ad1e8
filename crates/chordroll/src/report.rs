use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to one corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SongOutcome {
    Extracted { song: String, bars: usize },
    /// Expected corpus content that yields no record, e.g. no key signature.
    Skipped { song: String, reason: String },
    /// Unreadable, undecodable, timed out.
    Failed { song: String, cause: String },
}

/// Summary written to `run_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: String,
    pub output_dir: String,
    /// Hash of the extraction settings used.
    pub fingerprint: String,
    pub vocabulary_size: usize,
    pub distinct_chords: usize,
    pub outcomes: Vec<SongOutcome>,
}

impl RunReport {
    pub fn extracted(&self) -> usize {
        self.count(|o| matches!(o, SongOutcome::Extracted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SongOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SongOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&SongOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_serialize_with_a_tag() {
        let outcome = SongOutcome::Skipped {
            song: "a.mid".into(),
            reason: "no key signature declared".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["song"], "a.mid");
    }
}
