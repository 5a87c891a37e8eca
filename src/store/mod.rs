//! Storage seams for the dashboard.
//!
//! Every implementation must uphold the same contract:
//! - `record_vote` stores the vote and bumps the reading's counter as one unit;
//!   readers never see one without the other.
//! - Reads return a consistent snapshot of whole records.
//! - Concurrent votes on one reading never lose increments.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::models::facility::{Facility, FacilityId, NewFacility};
use crate::models::feedback::{Feedback, NewFeedback};
use crate::models::reading::{
    HistoryPoint, NewHistoryPoint, NewTemperatureReading, NewTemperatureVote, ReadingId, TemperatureReading,
    TemperatureVote,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum StoreError {
    /// A vote referenced a reading the store does not hold.
    ReadingNotFound(ReadingId),
    /// Backend failure (connection, query, constraint).
    Database(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ReadingNotFound(id) => write!(f, "temperature reading {} not found", id.0),
            StoreError::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        StoreError::Database(value.to_string())
    }
}

pub trait ReadingStore: Send + Sync {
    fn insert_reading(&self, new: NewTemperatureReading) -> Result<TemperatureReading, StoreError>;

    fn reading(&self, id: ReadingId) -> Result<Option<TemperatureReading>, StoreError>;

    /// Up to `limit` readings for the facility, newest `submitted_at` first,
    /// ties broken by higher id first.
    fn recent_readings(&self, facility_id: FacilityId, limit: usize) -> Result<Vec<TemperatureReading>, StoreError>;

    /// Atomically record the vote and increment the matching counter.
    fn record_vote(&self, new: NewTemperatureVote) -> Result<TemperatureVote, StoreError>;

    fn votes_for(&self, reading_id: ReadingId) -> Result<Vec<TemperatureVote>, StoreError>;

    fn append_history(&self, new: NewHistoryPoint) -> Result<HistoryPoint, StoreError>;

    /// Points recorded at or after `cutoff`, oldest first.
    fn history_since(&self, facility_id: FacilityId, cutoff: DateTime<Utc>) -> Result<Vec<HistoryPoint>, StoreError>;
}

pub trait FeedbackStore: Send + Sync {
    fn insert_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError>;

    fn feedback_for(&self, facility_id: FacilityId) -> Result<Vec<Feedback>, StoreError>;

    /// Newest first.
    fn recent_feedback(&self, limit: usize) -> Result<Vec<Feedback>, StoreError>;
}

pub trait FacilityRepository: Send + Sync {
    /// All facilities ordered by id.
    fn facilities(&self) -> Result<Vec<Facility>, StoreError>;

    fn facility(&self, id: FacilityId) -> Result<Option<Facility>, StoreError>;

    fn insert_facility(&self, new: NewFacility, at: DateTime<Utc>) -> Result<Facility, StoreError>;

    /// Overwrite the raw temperature and append it to the history series.
    /// `None` when the facility is unknown.
    fn set_current_temp(&self, id: FacilityId, temp_c: f64, at: DateTime<Utc>)
    -> Result<Option<Facility>, StoreError>;
}

impl<T: ReadingStore + ?Sized> ReadingStore for Arc<T> {
    fn insert_reading(&self, new: NewTemperatureReading) -> Result<TemperatureReading, StoreError> {
        (**self).insert_reading(new)
    }

    fn reading(&self, id: ReadingId) -> Result<Option<TemperatureReading>, StoreError> {
        (**self).reading(id)
    }

    fn recent_readings(&self, facility_id: FacilityId, limit: usize) -> Result<Vec<TemperatureReading>, StoreError> {
        (**self).recent_readings(facility_id, limit)
    }

    fn record_vote(&self, new: NewTemperatureVote) -> Result<TemperatureVote, StoreError> {
        (**self).record_vote(new)
    }

    fn votes_for(&self, reading_id: ReadingId) -> Result<Vec<TemperatureVote>, StoreError> {
        (**self).votes_for(reading_id)
    }

    fn append_history(&self, new: NewHistoryPoint) -> Result<HistoryPoint, StoreError> {
        (**self).append_history(new)
    }

    fn history_since(&self, facility_id: FacilityId, cutoff: DateTime<Utc>) -> Result<Vec<HistoryPoint>, StoreError> {
        (**self).history_since(facility_id, cutoff)
    }
}

impl<T: FeedbackStore + ?Sized> FeedbackStore for Arc<T> {
    fn insert_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError> {
        (**self).insert_feedback(new)
    }

    fn feedback_for(&self, facility_id: FacilityId) -> Result<Vec<Feedback>, StoreError> {
        (**self).feedback_for(facility_id)
    }

    fn recent_feedback(&self, limit: usize) -> Result<Vec<Feedback>, StoreError> {
        (**self).recent_feedback(limit)
    }
}

impl<T: FacilityRepository + ?Sized> FacilityRepository for Arc<T> {
    fn facilities(&self) -> Result<Vec<Facility>, StoreError> {
        (**self).facilities()
    }

    fn facility(&self, id: FacilityId) -> Result<Option<Facility>, StoreError> {
        (**self).facility(id)
    }

    fn insert_facility(&self, new: NewFacility, at: DateTime<Utc>) -> Result<Facility, StoreError> {
        (**self).insert_facility(new, at)
    }

    fn set_current_temp(
        &self,
        id: FacilityId,
        temp_c: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<Facility>, StoreError> {
        (**self).set_current_temp(id, temp_c, at)
    }
}
