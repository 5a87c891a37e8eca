//! Display-ready facility views built on top of the aggregator.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::aggregator::{Aggregator, AggregatorError, TimeWeight, UniformTimeWeight};
use crate::clock::{Clock, SystemClock};
use crate::models::facility::{Facility, FacilityId, RangeStatus};
use crate::models::feedback::{Feedback, FeedbackCounts, FeedbackRating, NewFeedback};
use crate::models::reading::{HistoryPoint, WeightedReading};
use crate::store::{FacilityRepository, FeedbackStore, ReadingStore};

pub const DEFAULT_RECENT_READINGS: usize = 5;
const UNKNOWN_FACILITY: &str = "Unknown";
const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityView {
    #[serde(flatten)]
    pub facility: Facility,
    /// Weighted crowd estimate when readings exist, otherwise the raw value.
    pub display_temp_c: f64,
    pub weighted: bool,
    pub range_status: RangeStatus,
    pub feedback: FeedbackCounts,
    pub total_votes: u64,
    pub satisfaction_percent: u32,
    pub recent_readings: Vec<WeightedReading>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentFeedback {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub facility_name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureAlert {
    pub facility_id: FacilityId,
    pub facility_name: String,
    pub temperature_c: f64,
    pub status: RangeStatus,
    pub message: String,
}

impl TemperatureAlert {
    /// `Some` when `temp_c` falls outside the facility's recommended range.
    pub fn check(facility: &Facility, temp_c: f64) -> Option<Self> {
        let status = facility.range_status(temp_c);
        let (direction, bound) = match status {
            RangeStatus::Within => return None,
            RangeStatus::Above => ("above", facility.max_temp_c),
            RangeStatus::Below => ("below", facility.min_temp_c),
        };
        Some(TemperatureAlert {
            facility_id: facility.id,
            facility_name: facility.name.clone(),
            temperature_c: temp_c,
            status,
            message: format!(
                "{} is currently {} the recommended temperature range ({}°).",
                facility.name, direction, bound
            ),
        })
    }
}

/// Messages pushed to connected viewers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Broadcast {
    FacilitiesUpdate(Vec<FacilityView>),
    RecentFeedbacks(Vec<RecentFeedback>),
    TemperatureAlert(TemperatureAlert),
}

pub struct Dashboard<S, C = SystemClock, W = UniformTimeWeight> {
    aggregator: Aggregator<S, C, W>,
    recent_readings_limit: usize,
}

impl<S, C, W> Dashboard<S, C, W>
where
    S: ReadingStore + FeedbackStore + FacilityRepository,
    C: Clock,
    W: TimeWeight,
{
    pub fn new(aggregator: Aggregator<S, C, W>) -> Self {
        Dashboard {
            aggregator,
            recent_readings_limit: DEFAULT_RECENT_READINGS,
        }
    }

    pub fn with_recent_readings_limit(mut self, limit: usize) -> Self {
        self.recent_readings_limit = limit;
        self
    }

    pub fn aggregator(&self) -> &Aggregator<S, C, W> {
        &self.aggregator
    }

    pub fn store(&self) -> &S {
        self.aggregator.store()
    }

    fn now(&self) -> DateTime<Utc> {
        self.aggregator.clock().now()
    }

    pub fn submit_feedback(
        &self,
        facility_id: FacilityId,
        submitted_by: Option<String>,
        rating: FeedbackRating,
    ) -> Result<Feedback, AggregatorError> {
        let feedback = self.store().insert_feedback(NewFeedback {
            facility_id,
            submitted_by,
            rating,
            submitted_at: self.now(),
        })?;
        Ok(feedback)
    }

    pub fn feedback_counts(&self, facility_id: FacilityId) -> Result<FeedbackCounts, AggregatorError> {
        let rows = self.store().feedback_for(facility_id)?;
        Ok(FeedbackCounts::tally(&rows))
    }

    pub fn facility_view(&self, facility: Facility) -> Result<FacilityView, AggregatorError> {
        let feedback = self.feedback_counts(facility.id)?;
        let total_votes = feedback.total();
        let satisfaction_percent = if total_votes > 0 { feedback.perfect_percent } else { 0 };

        let snapshot = self.aggregator.snapshot(facility.id, self.recent_readings_limit)?;
        let display_temp_c = snapshot.display_temperature(&facility);

        Ok(FacilityView {
            display_temp_c,
            weighted: snapshot.estimate.is_some(),
            range_status: facility.range_status(display_temp_c),
            feedback,
            total_votes,
            satisfaction_percent,
            recent_readings: snapshot.recent,
            facility,
        })
    }

    pub fn facility_views(&self) -> Result<Vec<FacilityView>, AggregatorError> {
        self.store()
            .facilities()?
            .into_iter()
            .map(|f| self.facility_view(f))
            .collect()
    }

    /// Raw series for the last `hours`, oldest first.
    pub fn history(&self, facility_id: FacilityId, hours: u32) -> Result<Vec<HistoryPoint>, AggregatorError> {
        let cutoff = self
            .now()
            .checked_sub_signed(Duration::hours(i64::from(hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(self.store().history_since(facility_id, cutoff)?)
    }

    pub fn recent_feedback(&self, limit: usize) -> Result<Vec<RecentFeedback>, AggregatorError> {
        let rows = self.store().recent_feedback(limit)?;
        rows.into_iter()
            .map(|feedback| -> Result<RecentFeedback, AggregatorError> {
                let facility_name = self
                    .store()
                    .facility(feedback.facility_id)?
                    .map(|f| f.name)
                    .unwrap_or_else(|| UNKNOWN_FACILITY.to_string());
                let username = feedback.submitted_by.clone().unwrap_or_else(|| ANONYMOUS.to_string());
                Ok(RecentFeedback {
                    feedback,
                    facility_name,
                    username,
                })
            })
            .collect()
    }
}
