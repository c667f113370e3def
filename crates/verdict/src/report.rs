//! Report - every outcome of a run, keyed by qualified case name

use crate::error::{HarnessError, HarnessResult};
use crate::outcome::Outcome;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one case together with its timing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    /// Qualified case name
    pub name: String,
    pub outcome: Outcome,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl CaseRecord {
    pub fn new(name: impl Into<String>, outcome: Outcome, duration: Duration) -> Self {
        Self {
            name: name.into(),
            outcome,
            duration,
        }
    }
}

/// Results of a run
///
/// Results are kept in the order they were recorded, which is discovery
/// order. Keys are unique: recording the same case twice is rejected.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "total_duration_ms", serialize_with = "serialize_millis")]
    pub total_duration: Duration,
    results: Vec<CaseRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Report {
    /// Start an empty report timestamped now
    pub fn begin() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            total_duration: Duration::ZERO,
            results: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a finished report from records, e.g. to render saved results
    pub fn from_records(records: impl IntoIterator<Item = CaseRecord>) -> HarnessResult<Self> {
        let mut report = Self::begin();
        for record in records {
            report.insert(record)?;
        }
        report.total_duration = report.results.iter().map(|r| r.duration).sum();
        Ok(report)
    }

    /// Record the outcome of one case
    pub fn insert(&mut self, record: CaseRecord) -> HarnessResult<()> {
        if self.index.contains_key(&record.name) {
            return Err(HarnessError::DuplicateEntry {
                suite: "report".to_string(),
                name: record.name,
            });
        }
        self.index.insert(record.name.clone(), self.results.len());
        self.results.push(record);
        Ok(())
    }

    /// Append every record of a shard, keeping the shard's order
    pub fn merge(&mut self, shard: Report) -> HarnessResult<()> {
        for record in shard.results {
            self.insert(record)?;
        }
        Ok(())
    }

    /// Put records in the order of `names`; unlisted records go last
    pub(crate) fn reorder<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        let position: HashMap<&str, usize> =
            names.into_iter().enumerate().map(|(i, name)| (name, i)).collect();
        self.results
            .sort_by_key(|r| position.get(r.name.as_str()).copied().unwrap_or(usize::MAX));
        self.index = self
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
    }

    /// Stamp the finish time and total wall-clock duration
    pub fn finish(&mut self, elapsed: Duration) {
        self.finished_at = Utc::now();
        self.total_duration = elapsed;
    }

    pub fn get(&self, name: &str) -> Option<&CaseRecord> {
        self.index.get(name).map(|&i| &self.results[i])
    }

    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.get(name).map(|record| &record.outcome)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Records in discovery order
    pub fn results(&self) -> &[CaseRecord] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaseRecord> {
        self.results.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}
