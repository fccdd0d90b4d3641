//! Memory records and the session that persists them.
//!
//! A record is built from operator input, handed to a [`MemorySession`] once,
//! and dropped. Sessions store each record as an episode node scoped by a
//! group id.

pub mod session;
pub mod state;

use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{EnumString, IntoStaticStr};

pub use session::{group_id_for, GraphMemory, MemorySession};
pub use state::{MemoryState, STATE_FILE};

/// Session number used for hand-written insights so they sort after real sessions.
pub const MANUAL_SESSION_NUMBER: u32 = 999;

pub const DEFAULT_DISCOVERY_PATH: &str = "manual_injection.py";


#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MemoryKind {
    Insight,
    Pattern,
    Gotcha,
    Discovery,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum GroupIdMode {
    Spec,
    Project,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EpisodeType {
    SessionInsight,
    Pattern,
    Gotcha,
    CodebaseDiscovery,
}

impl EpisodeType {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInsights {
    pub subtasks_completed: Vec<String>,
    pub discoveries: BTreeMap<String, String>,
    pub what_worked: Vec<String>,
    pub what_failed: Vec<String>,
    pub recommendations_for_next_session: Vec<String>,
    pub timestamp: String,
}

impl SessionInsights {

    pub fn manual(content: &str) -> Self {
        Self {
            subtasks_completed: vec!["Manual Memory Injection".to_string()],
            discoveries: BTreeMap::from([("manual_test".to_string(), content.to_string())]),
            what_worked: vec!["Direct API injection via memory-inject".to_string()],
            what_failed: Vec::new(),
            recommendations_for_next_session: vec![
                "Verify this memory appears in the UI under Context > Memories".to_string(),
            ],
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub enum MemoryRecord {
    Insight {
        session_num: u32,
        insights: SessionInsights,
    },
    Pattern(String),
    Gotcha(String),
    Discovery(BTreeMap<String, String>),
}

impl MemoryRecord {
    /// Builds the record an operator asked for. A discovery without a path is
    /// filed under [`DEFAULT_DISCOVERY_PATH`].
    pub fn from_input(kind: MemoryKind, content: &str, file_path: Option<&str>) -> Self {
        match kind {
            MemoryKind::Insight => MemoryRecord::Insight {
                session_num: MANUAL_SESSION_NUMBER,
                insights: SessionInsights::manual(content),
            },
            MemoryKind::Pattern => MemoryRecord::Pattern(content.to_string()),
            MemoryKind::Gotcha => MemoryRecord::Gotcha(content.to_string()),
            MemoryKind::Discovery => {
                let path = file_path
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or(DEFAULT_DISCOVERY_PATH);
                MemoryRecord::Discovery(BTreeMap::from([(path.to_string(), content.to_string())]))
            }
        }
    }


    pub fn kind(&self) -> MemoryKind {
        match self {
            MemoryRecord::Insight { .. } => MemoryKind::Insight,
            MemoryRecord::Pattern(_) => MemoryKind::Pattern,
            MemoryRecord::Gotcha(_) => MemoryKind::Gotcha,
            MemoryRecord::Discovery(_) => MemoryKind::Discovery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_with_path() {
        let record = MemoryRecord::from_input(MemoryKind::Discovery, "X", Some("src/auth.py"));
        assert_eq!(
            record,
            MemoryRecord::Discovery(BTreeMap::from([("src/auth.py".to_string(), "X".to_string())]))
        );
    }

    #[test]
    fn test_discovery_without_path_uses_placeholder() {
        for file_path in [None, Some("")] {
            let record = MemoryRecord::from_input(MemoryKind::Discovery, "handles JWT", file_path);
            let MemoryRecord::Discovery(files) = record else {
                panic!("expected discovery");
            };
            assert_eq!(files.len(), 1);
            assert_eq!(files.get(DEFAULT_DISCOVERY_PATH).map(String::as_str), Some("handles JWT"));
        }
    }

    #[test]
    fn test_file_path_ignored_for_other_kinds() {
        let record = MemoryRecord::from_input(MemoryKind::Gotcha, "close redis", Some("src/worker.py"));
        assert_eq!(record, MemoryRecord::Gotcha("close redis".to_string()));
    }

    #[test]
    fn test_insight_record() {
        let record = MemoryRecord::from_input(MemoryKind::Insight, "JWT auth done", None);
        let MemoryRecord::Insight { session_num, insights } = record else {
            panic!("expected insight");
        };
        assert_eq!(session_num, MANUAL_SESSION_NUMBER);
        assert_eq!(insights.subtasks_completed, vec!["Manual Memory Injection"]);
        assert_eq!(insights.discoveries.get("manual_test").map(String::as_str), Some("JWT auth done"));
        assert!(insights.what_failed.is_empty());
        assert!(chrono::DateTime::parse_from_rfc3339(&insights.timestamp).is_ok());
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in [MemoryKind::Insight, MemoryKind::Pattern, MemoryKind::Gotcha, MemoryKind::Discovery] {
            assert_eq!(kind.as_str().parse::<MemoryKind>().unwrap(), kind);
            assert_eq!(MemoryRecord::from_input(kind, "c", None).kind(), kind);
        }
        assert_eq!(EpisodeType::CodebaseDiscovery.as_str(), "codebase_discovery");
    }
}
