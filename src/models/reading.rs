//! Crowd-submitted temperature readings, the votes cast on them and the raw
//! history series they feed.
//!
//! All temperatures are stored in Celsius; see [`crate::units`] for input
//! conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::facility::FacilityId;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(pub i64);

// =====================
// Readings
// =====================

/// A single temperature observation submitted by a visitor.
///
/// `temperature_c` and `submitted_at` never change after creation; only the
/// vote counters move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub id: ReadingId,
    pub facility_id: FacilityId,
    pub submitted_by: String,
    pub temperature_c: f64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub submitted_at: DateTime<Utc>,
}

impl TemperatureReading {
    pub fn total_votes(&self) -> u64 {
        self.upvotes + self.downvotes
    }
}

/// Reading as handed to a store; the store assigns the id and zeroed counters.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemperatureReading {
    pub facility_id: FacilityId,
    pub submitted_by: String,
    pub temperature_c: f64,
    pub submitted_at: DateTime<Utc>,
}

/// A reading annotated for display: vote-adjusted score and relative age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedReading {
    #[serde(flatten)]
    pub reading: TemperatureReading,
    pub weighted_score: f64,
    pub time_since_submission: String,
}

// =====================
// Votes
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureVote {
    pub id: VoteId,
    pub reading_id: ReadingId,
    pub is_upvote: bool,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemperatureVote {
    pub reading_id: ReadingId,
    pub is_upvote: bool,
    pub cast_at: DateTime<Utc>,
}

// =====================
// Raw history (charting)
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub id: HistoryId,
    pub facility_id: FacilityId,
    pub temperature_c: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryPoint {
    pub facility_id: FacilityId,
    pub temperature_c: f64,
    pub recorded_at: DateTime<Utc>,
}
