//! Visitor comfort feedback ("too cold" / "perfect" / "too hot").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::facility::FacilityId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackRating {
    TooCold,
    Perfect,
    TooHot,
}

impl FeedbackRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackRating::TooCold => "too-cold",
            FeedbackRating::Perfect => "perfect",
            FeedbackRating::TooHot => "too-hot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "too-cold" => Some(FeedbackRating::TooCold),
            "perfect" => Some(FeedbackRating::Perfect),
            "too-hot" => Some(FeedbackRating::TooHot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub facility_id: FacilityId,
    pub submitted_by: Option<String>,
    pub rating: FeedbackRating,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub facility_id: FacilityId,
    pub submitted_by: Option<String>,
    pub rating: FeedbackRating,
    pub submitted_at: DateTime<Utc>,
}

/// Per-rating tallies with whole-number percentages of the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCounts {
    pub too_cold: u64,
    pub too_cold_percent: u32,
    pub perfect: u64,
    pub perfect_percent: u32,
    pub too_hot: u64,
    pub too_hot_percent: u32,
}

impl FeedbackCounts {
    pub fn tally<'a>(feedback: impl IntoIterator<Item = &'a Feedback>) -> Self {
        let mut counts = FeedbackCounts::default();
        for f in feedback {
            match f.rating {
                FeedbackRating::TooCold => counts.too_cold += 1,
                FeedbackRating::Perfect => counts.perfect += 1,
                FeedbackRating::TooHot => counts.too_hot += 1,
            }
        }
        let total = counts.total();
        counts.too_cold_percent = rounded_percent(counts.too_cold, total);
        counts.perfect_percent = rounded_percent(counts.perfect, total);
        counts.too_hot_percent = rounded_percent(counts.too_hot, total);
        counts
    }

    pub fn total(&self) -> u64 {
        self.too_cold + self.perfect + self.too_hot
    }
}

// Half-up rounding, matching how percentages are shown on the dashboard.
fn rounded_percent(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}
