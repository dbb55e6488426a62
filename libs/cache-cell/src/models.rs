use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of subject an appointment list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Patient,
    Doctor,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Patient => write!(f, "patient"),
            SubjectKind::Doctor => write!(f, "doctor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: SubjectKind,
    pub subject_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub invalidation_count: u64,
    pub expiration_count: u64,
    pub total_entries: u64,
    pub hit_rate: f64,
    pub ttl_seconds: u64,
}
