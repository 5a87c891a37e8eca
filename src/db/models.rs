//! Diesel row structs and their conversions to domain types.
//!
//! Counters are `BIGINT` in the database and `u64` in the domain; the
//! migration's `CHECK (>= 0)` keeps the conversion lossless.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::models::facility::{Facility, FacilityId};
use crate::models::feedback::{Feedback, FeedbackId, FeedbackRating};
use crate::models::reading::{HistoryId, HistoryPoint, ReadingId, TemperatureReading, TemperatureVote, VoteId};
use crate::schema;
use crate::store::StoreError;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::facilities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FacilityRow {
    pub id: i64,
    pub name: String,
    pub current_temp_c: f64,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::facilities)]
pub struct NewFacilityRow<'a> {
    pub name: &'a str,
    pub current_temp_c: f64,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub last_update: DateTime<Utc>,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Facility {
            id: FacilityId(row.id),
            name: row.name,
            current_temp_c: row.current_temp_c,
            min_temp_c: row.min_temp_c,
            max_temp_c: row.max_temp_c,
            last_update: row.last_update,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::temperature_readings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReadingRow {
    pub id: i64,
    pub facility_id: i64,
    pub submitted_by: String,
    pub temperature_c: f64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::temperature_readings)]
pub struct NewReadingRow<'a> {
    pub facility_id: i64,
    pub submitted_by: &'a str,
    pub temperature_c: f64,
    pub submitted_at: DateTime<Utc>,
}

impl From<ReadingRow> for TemperatureReading {
    fn from(row: ReadingRow) -> Self {
        TemperatureReading {
            id: ReadingId(row.id),
            facility_id: FacilityId(row.facility_id),
            submitted_by: row.submitted_by,
            temperature_c: row.temperature_c,
            upvotes: u64::try_from(row.upvotes).unwrap_or(0),
            downvotes: u64::try_from(row.downvotes).unwrap_or(0),
            submitted_at: row.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::temperature_votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoteRow {
    pub id: i64,
    pub reading_id: i64,
    pub is_upvote: bool,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::temperature_votes)]
pub struct NewVoteRow {
    pub reading_id: i64,
    pub is_upvote: bool,
    pub cast_at: DateTime<Utc>,
}

impl From<VoteRow> for TemperatureVote {
    fn from(row: VoteRow) -> Self {
        TemperatureVote {
            id: VoteId(row.id),
            reading_id: ReadingId(row.reading_id),
            is_upvote: row.is_upvote,
            cast_at: row.cast_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::temperature_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    pub id: i64,
    pub facility_id: i64,
    pub temperature_c: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::temperature_history)]
pub struct NewHistoryRow {
    pub facility_id: i64,
    pub temperature_c: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryPoint {
    fn from(row: HistoryRow) -> Self {
        HistoryPoint {
            id: HistoryId(row.id),
            facility_id: FacilityId(row.facility_id),
            temperature_c: row.temperature_c,
            recorded_at: row.recorded_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::feedbacks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FeedbackRow {
    pub id: i64,
    pub facility_id: i64,
    pub submitted_by: Option<String>,
    pub rating: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::feedbacks)]
pub struct NewFeedbackRow<'a> {
    pub facility_id: i64,
    pub submitted_by: Option<&'a str>,
    pub rating: &'static str,
    pub submitted_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for Feedback {
    type Error = StoreError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let rating = FeedbackRating::parse(&row.rating)
            .ok_or_else(|| StoreError::Database(format!("feedback {} has unknown rating {:?}", row.id, row.rating)))?;
        Ok(Feedback {
            id: FeedbackId(row.id),
            facility_id: FacilityId(row.facility_id),
            submitted_by: row.submitted_by,
            rating,
            submitted_at: row.submitted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_feedback_rating_is_a_store_error() {
        let row = FeedbackRow {
            id: 3,
            facility_id: 1,
            submitted_by: None,
            rating: "scalding".into(),
            submitted_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        let err = Feedback::try_from(row).unwrap_err();
        assert!(err.to_string().contains("scalding"));
    }

    #[test]
    fn reading_row_maps_counters() {
        let row = ReadingRow {
            id: 9,
            facility_id: 2,
            submitted_by: "Sarah D.".into(),
            temperature_c: 8.0,
            upvotes: 4,
            downvotes: 1,
            submitted_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        let reading = TemperatureReading::from(row);
        assert_eq!(reading.id, ReadingId(9));
        assert_eq!((reading.upvotes, reading.downvotes), (4, 1));
    }
}
