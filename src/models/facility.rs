//! Monitored facilities and their acceptable temperature range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub i64);

impl std::fmt::Display for FacilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    /// Last raw temperature reported by the facility itself.
    pub current_temp_c: f64,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub last_update: DateTime<Utc>,
}

impl Facility {
    pub fn range_status(&self, temp_c: f64) -> RangeStatus {
        if temp_c > self.max_temp_c {
            RangeStatus::Above
        } else if temp_c < self.min_temp_c {
            RangeStatus::Below
        } else {
            RangeStatus::Within
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFacility {
    pub name: String,
    pub current_temp_c: f64,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
}

/// Where a temperature sits relative to a facility's `[min, max]` range.
/// Both bounds are inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeStatus {
    Below,
    Within,
    Above,
}
