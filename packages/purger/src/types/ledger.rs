//! Persisted ledger schema: counters, per-client last success, bounded history.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// First sequence identifier handed out on a fresh ledger.
pub const INITIAL_FLOOR: u64 = 100_001;

/// Maximum number of history events retained.
pub const HISTORY_LIMIT: usize = 200;

/// Last successful purge of a client.
///
/// Overwritten (never merged) each time the client is purged again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    #[serde(rename = "universal_id")]
    pub sequence_id: u64,

    #[serde(rename = "client_name", default)]
    pub display_name: String,

    #[serde(rename = "bytes", default)]
    pub bytes_written: u64,

    /// RFC 3339 completion time
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub operator: String,
}

impl SubjectRecord {
    /// Stored timestamp, or `unknown` when none was recorded.
    pub fn timestamp_or_unknown(&self) -> &str {
        if self.timestamp.is_empty() {
            "unknown"
        } else {
            &self.timestamp
        }
    }
}

/// Append-only audit entry for one purge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    #[serde(rename = "universal_id")]
    pub sequence_id: u64,

    #[serde(rename = "turnpoint_id")]
    pub subject_key: String,

    #[serde(rename = "client_name", default)]
    pub display_name: String,

    #[serde(default)]
    pub success: bool,

    #[serde(rename = "bytes", default)]
    pub bytes_written: u64,

    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub operator: String,
}

impl JobEvent {
    /// The client record this event produces when it is a success.
    pub fn to_subject_record(&self) -> SubjectRecord {
        SubjectRecord {
            sequence_id: self.sequence_id,
            display_name: self.display_name.clone(),
            bytes_written: self.bytes_written,
            timestamp: self.timestamp.clone(),
            operator: self.operator.clone(),
        }
    }
}

/// The singleton ledger document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(alias = "next_universal_id")]
    pub next_sequence_id: u64,

    #[serde(rename = "purged_count")]
    pub completed_count: u64,

    #[serde(rename = "clients")]
    pub subjects: BTreeMap<String, SubjectRecord>,

    pub history: Vec<JobEvent>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            next_sequence_id: INITIAL_FLOOR,
            completed_count: 0,
            subjects: BTreeMap::new(),
            history: Vec::new(),
        }
    }
}

impl LedgerState {
    /// Decode a persisted document field by field.
    ///
    /// Unusable fields fall back to their defaults and malformed client or
    /// history entries are dropped individually, so a partially damaged
    /// ledger keeps whatever is still readable.
    pub fn from_value(raw: Value) -> Self {
        let mut state = Self::default();
        let Value::Object(map) = raw else {
            return state;
        };

        let next = map
            .get("next_sequence_id")
            .or_else(|| map.get("next_universal_id"));
        state.next_sequence_id = coerce_u64(next, INITIAL_FLOOR).max(INITIAL_FLOOR);
        state.completed_count = coerce_u64(map.get("purged_count"), 0);

        if let Some(Value::Object(clients)) = map.get("clients") {
            state.subjects = clients
                .iter()
                .filter_map(|(key, value)| {
                    serde_json::from_value::<SubjectRecord>(value.clone())
                        .ok()
                        .map(|record| (key.clone(), record))
                })
                .collect();
        }

        if let Some(Value::Array(history)) = map.get("history") {
            state.history = history
                .iter()
                .filter_map(|value| serde_json::from_value::<JobEvent>(value.clone()).ok())
                .collect();
            trim_history(&mut state.history);
        }

        state
    }

    /// Apply one recorded outcome.
    ///
    /// The counter only ever moves to `sequence_id + 1` when that is larger,
    /// so replays and out-of-order calls converge on the same value.
    pub fn apply_event(&mut self, event: JobEvent) {
        if event.success {
            let previous = self
                .subjects
                .insert(event.subject_key.clone(), event.to_subject_record());
            if previous.is_none() {
                self.completed_count += 1;
            }
        }

        self.next_sequence_id = self
            .next_sequence_id
            .max(event.sequence_id.saturating_add(1));

        self.history.push(event);
        trim_history(&mut self.history);
    }

    /// Most recent `limit` events, oldest first.
    pub fn recent_history(&self, limit: usize) -> &[JobEvent] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }
}

fn trim_history(history: &mut Vec<JobEvent>) {
    if history.len() > HISTORY_LIMIT {
        let excess = history.len() - HISTORY_LIMIT;
        history.drain(..excess);
    }
}

fn coerce_u64(value: Option<&Value>, default: u64) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}
