//! Weighted crowdsourced temperature aggregation.
//!
//! Visitors submit readings; other visitors up/down-vote them. Two derived
//! values come out of that:
//!
//! - a per-reading *weighted score* shown next to each reading, which scales
//!   the raw value by its vote balance (`temp * (1 + (U - D) / (U + D))`, so
//!   anywhere in `[0, 2 * temp]` and untouched without votes), and
//! - a facility-wide *weighted temperature*, the average of the newest
//!   [`WEIGHTED_WINDOW`] readings with weight `time_weight(age) * (U + 1)`.
//!
//! The aggregator keeps no state of its own besides the injected store, clock
//! and time weight; every read is recomputed from a fresh store snapshot.

use chrono::{DateTime, Duration, Utc};
use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::clock::{Clock, SystemClock};
use crate::models::facility::{Facility, FacilityId};
use crate::models::reading::{
    NewHistoryPoint, NewTemperatureReading, NewTemperatureVote, ReadingId, TemperatureReading, TemperatureVote,
    WeightedReading,
};
use crate::store::{ReadingStore, StoreError};
use crate::units::TemperatureUnit;

/// Number of newest readings that feed [`Aggregator::weighted_temperature`].
pub const WEIGHTED_WINDOW: usize = 10;

#[derive(Debug)]
pub enum AggregatorError {
    /// Temperature was NaN or infinite.
    InvalidArgument(String),
    /// Vote cast against a reading that does not exist.
    NotFound(ReadingId),
    /// Backend failure from a database-backed store.
    Store(StoreError),
}

impl Display for AggregatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorError::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
            AggregatorError::NotFound(id) => write!(f, "temperature reading {} not found", id.0),
            AggregatorError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl Error for AggregatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AggregatorError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for AggregatorError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::ReadingNotFound(id) => AggregatorError::NotFound(id),
            other => AggregatorError::Store(other),
        }
    }
}

/// Recency factor applied to each reading's vote weight.
pub trait TimeWeight: Send + Sync {
    fn weight(&self, age: Duration) -> f64;
}

/// Every reading counts the same regardless of age.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformTimeWeight;

impl TimeWeight for UniformTimeWeight {
    fn weight(&self, _age: Duration) -> f64 {
        1.0
    }
}

/// Adapts a plain function or closure into a [`TimeWeight`].
#[derive(Debug, Clone, Copy)]
pub struct FnTimeWeight<F>(pub F);

impl<F> TimeWeight for FnTimeWeight<F>
where
    F: Fn(Duration) -> f64 + Send + Sync,
{
    fn weight(&self, age: Duration) -> f64 {
        (self.0)(age)
    }
}

/// Vote-adjusted score of a single reading. Not clamped.
pub fn weighted_score(reading: &TemperatureReading) -> f64 {
    let total = reading.total_votes();
    if total == 0 {
        return reading.temperature_c;
    }
    let balance = (reading.upvotes as f64 - reading.downvotes as f64) / total as f64;
    reading.temperature_c * (1.0 + balance)
}

/// Relative age label: "just now", "{n}m ago", "{n}h ago" or "{n}d ago".
/// Each unit is floored; timestamps ahead of `now` read as "just now".
pub fn time_since_label(submitted_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - submitted_at).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Lazily annotates a snapshot of readings as they are pulled.
#[derive(Debug)]
pub struct RecentReadings {
    rows: std::vec::IntoIter<TemperatureReading>,
    now: DateTime<Utc>,
}

impl Iterator for RecentReadings {
    type Item = WeightedReading;

    fn next(&mut self) -> Option<Self::Item> {
        let reading = self.rows.next()?;
        Some(WeightedReading {
            weighted_score: weighted_score(&reading),
            time_since_submission: time_since_label(reading.submitted_at, self.now),
            reading,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RecentReadings {}

pub struct Aggregator<S, C = SystemClock, W = UniformTimeWeight> {
    store: S,
    clock: C,
    time_weight: W,
}

impl<S: ReadingStore> Aggregator<S> {
    pub fn new(store: S) -> Self {
        Aggregator {
            store,
            clock: SystemClock,
            time_weight: UniformTimeWeight,
        }
    }
}

impl<S, C, W> Aggregator<S, C, W>
where
    S: ReadingStore,
    C: Clock,
    W: TimeWeight,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Aggregator<S, C2, W> {
        Aggregator {
            store: self.store,
            clock,
            time_weight: self.time_weight,
        }
    }

    pub fn with_time_weight<W2: TimeWeight>(self, time_weight: W2) -> Aggregator<S, C, W2> {
        Aggregator {
            store: self.store,
            clock: self.clock,
            time_weight,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Store a new reading (zero votes, stamped now) and append the value to
    /// the facility's raw history series.
    pub fn submit_reading(
        &self,
        facility_id: FacilityId,
        submitted_by: impl Into<String>,
        temperature_c: f64,
    ) -> Result<TemperatureReading, AggregatorError> {
        if !temperature_c.is_finite() {
            return Err(AggregatorError::InvalidArgument(format!(
                "temperature must be a finite number, got {}",
                temperature_c
            )));
        }
        let now = self.clock.now();
        let reading = self.store.insert_reading(NewTemperatureReading {
            facility_id,
            submitted_by: submitted_by.into(),
            temperature_c,
            submitted_at: now,
        })?;
        self.store.append_history(NewHistoryPoint {
            facility_id,
            temperature_c,
            recorded_at: now,
        })?;
        Ok(reading)
    }

    /// Same as [`Self::submit_reading`] for a value given in `unit`.
    pub fn submit_reading_in(
        &self,
        facility_id: FacilityId,
        submitted_by: impl Into<String>,
        value: f64,
        unit: TemperatureUnit,
    ) -> Result<TemperatureReading, AggregatorError> {
        let temperature_c = unit.to_celsius(value);
        if !value.is_finite() || !temperature_c.is_finite() {
            return Err(AggregatorError::InvalidArgument(format!(
                "temperature must be a finite number in {}, got {}",
                unit.symbol(),
                value
            )));
        }
        self.submit_reading(facility_id, submitted_by, temperature_c)
    }

    /// Record a vote and bump the reading's counter in one step.
    pub fn cast_vote(&self, reading_id: ReadingId, is_upvote: bool) -> Result<TemperatureVote, AggregatorError> {
        let vote = self.store.record_vote(NewTemperatureVote {
            reading_id,
            is_upvote,
            cast_at: self.clock.now(),
        })?;
        Ok(vote)
    }

    /// Up to `limit` newest readings for the facility, annotated on iteration.
    pub fn recent_readings(&self, facility_id: FacilityId, limit: usize) -> Result<RecentReadings, AggregatorError> {
        let rows = self.store.recent_readings(facility_id, limit)?;
        Ok(RecentReadings {
            rows: rows.into_iter(),
            now: self.clock.now(),
        })
    }

    /// Best single estimate of the facility's temperature, `None` without readings.
    pub fn weighted_temperature(&self, facility_id: FacilityId) -> Result<Option<f64>, AggregatorError> {
        let readings = self.store.recent_readings(facility_id, WEIGHTED_WINDOW)?;
        Ok(self.estimate(&readings, self.clock.now()))
    }

    /// Newest readings and the weighted estimate, both taken from one store read.
    /// At least [`WEIGHTED_WINDOW`] rows are fetched so the estimate never
    /// depends on `limit`.
    pub fn snapshot(&self, facility_id: FacilityId, limit: usize) -> Result<FacilitySnapshot, AggregatorError> {
        let mut rows = self.store.recent_readings(facility_id, limit.max(WEIGHTED_WINDOW))?;
        let now = self.clock.now();
        let estimate = self.estimate(&rows[..rows.len().min(WEIGHTED_WINDOW)], now);
        rows.truncate(limit);
        let recent = RecentReadings {
            rows: rows.into_iter(),
            now,
        }
        .collect();
        Ok(FacilitySnapshot { recent, estimate })
    }

    fn estimate(&self, readings: &[TemperatureReading], now: DateTime<Utc>) -> Option<f64> {
        if readings.is_empty() {
            return None;
        }

        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;
        for reading in readings {
            let vote_weight = reading.upvotes as f64 + 1.0;
            let weight = self.time_weight.weight(now - reading.submitted_at) * vote_weight;
            total_weight += weight;
            weighted_sum += reading.temperature_c * weight;
        }

        if total_weight > 0.0 {
            Some(weighted_sum / total_weight)
        } else {
            None
        }
    }
}

/// A facility's newest annotated readings together with the estimate computed
/// from the same rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilitySnapshot {
    pub recent: Vec<WeightedReading>,
    pub estimate: Option<f64>,
}

impl FacilitySnapshot {
    /// The temperature to show for a facility: the weighted estimate when one
    /// exists, otherwise the facility's own raw value.
    pub fn display_temperature(&self, facility: &Facility) -> f64 {
        self.estimate.unwrap_or(facility.current_temp_c)
    }
}
