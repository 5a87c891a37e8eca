//! In-process store guarded by a single `RwLock`.
//!
//! Every mutation happens inside one write section, so a vote and its counter
//! increment are always observed together.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{FacilityRepository, FeedbackStore, ReadingStore, StoreError};
use crate::clock::{IdGenerator, SequentialIds};
use crate::models::facility::{Facility, FacilityId, NewFacility};
use crate::models::feedback::{Feedback, FeedbackId, NewFeedback};
use crate::models::reading::{
    HistoryId, HistoryPoint, NewHistoryPoint, NewTemperatureReading, NewTemperatureVote, ReadingId, TemperatureReading,
    TemperatureVote, VoteId,
};

#[derive(Debug, Default)]
struct State {
    facilities: BTreeMap<FacilityId, Facility>,
    readings: Vec<TemperatureReading>,
    reading_index: HashMap<ReadingId, usize>,
    readings_by_facility: HashMap<FacilityId, Vec<usize>>,
    votes: Vec<TemperatureVote>,
    history: Vec<HistoryPoint>,
    feedback: Vec<Feedback>,
}

impl State {
    fn push_history(&mut self, id: HistoryId, new: NewHistoryPoint) -> HistoryPoint {
        let point = HistoryPoint {
            id,
            facility_id: new.facility_id,
            temperature_c: new.temperature_c,
            recorded_at: new.recorded_at,
        };
        self.history.push(point.clone());
        point
    }
}

#[derive(Debug)]
struct Sequences<G> {
    facility: G,
    reading: G,
    vote: G,
    history: G,
    feedback: G,
}

#[derive(Debug)]
pub struct MemoryStore<G: IdGenerator = SequentialIds> {
    state: RwLock<State>,
    ids: Sequences<G>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::with_id_generators(SequentialIds::default)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl<G: IdGenerator> MemoryStore<G> {
    /// Build a store whose per-entity id sequences come from `make`.
    pub fn with_id_generators(mut make: impl FnMut() -> G) -> Self {
        MemoryStore {
            state: RwLock::new(State::default()),
            ids: Sequences {
                facility: make(),
                reading: make(),
                vote: make(),
                history: make(),
                feedback: make(),
            },
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: IdGenerator> ReadingStore for MemoryStore<G> {
    fn insert_reading(&self, new: NewTemperatureReading) -> Result<TemperatureReading, StoreError> {
        let mut state = self.write();
        let reading = TemperatureReading {
            id: ReadingId(self.ids.reading.next_id()),
            facility_id: new.facility_id,
            submitted_by: new.submitted_by,
            temperature_c: new.temperature_c,
            upvotes: 0,
            downvotes: 0,
            submitted_at: new.submitted_at,
        };
        let index = state.readings.len();
        state.readings.push(reading.clone());
        state.reading_index.insert(reading.id, index);
        state.readings_by_facility.entry(reading.facility_id).or_default().push(index);
        Ok(reading)
    }

    fn reading(&self, id: ReadingId) -> Result<Option<TemperatureReading>, StoreError> {
        let state = self.read();
        Ok(state.reading_index.get(&id).map(|&i| state.readings[i].clone()))
    }

    fn recent_readings(&self, facility_id: FacilityId, limit: usize) -> Result<Vec<TemperatureReading>, StoreError> {
        let state = self.read();
        let Some(indices) = state.readings_by_facility.get(&facility_id) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<&TemperatureReading> = indices.iter().map(|&i| &state.readings[i]).collect();
        rows.sort_by(|a, b| (b.submitted_at, b.id).cmp(&(a.submitted_at, a.id)));
        Ok(rows.into_iter().take(limit).cloned().collect())
    }

    fn record_vote(&self, new: NewTemperatureVote) -> Result<TemperatureVote, StoreError> {
        let mut state = self.write();
        let index = *state
            .reading_index
            .get(&new.reading_id)
            .ok_or(StoreError::ReadingNotFound(new.reading_id))?;

        let vote = TemperatureVote {
            id: VoteId(self.ids.vote.next_id()),
            reading_id: new.reading_id,
            is_upvote: new.is_upvote,
            cast_at: new.cast_at,
        };
        let reading = &mut state.readings[index];
        if vote.is_upvote {
            reading.upvotes += 1;
        } else {
            reading.downvotes += 1;
        }
        state.votes.push(vote.clone());
        Ok(vote)
    }

    fn votes_for(&self, reading_id: ReadingId) -> Result<Vec<TemperatureVote>, StoreError> {
        let state = self.read();
        Ok(state.votes.iter().filter(|v| v.reading_id == reading_id).cloned().collect())
    }

    fn append_history(&self, new: NewHistoryPoint) -> Result<HistoryPoint, StoreError> {
        let id = HistoryId(self.ids.history.next_id());
        Ok(self.write().push_history(id, new))
    }

    fn history_since(&self, facility_id: FacilityId, cutoff: DateTime<Utc>) -> Result<Vec<HistoryPoint>, StoreError> {
        let state = self.read();
        let mut points: Vec<HistoryPoint> = state
            .history
            .iter()
            .filter(|p| p.facility_id == facility_id && p.recorded_at >= cutoff)
            .cloned()
            .collect();
        points.sort_by_key(|p| (p.recorded_at, p.id));
        Ok(points)
    }
}

impl<G: IdGenerator> FeedbackStore for MemoryStore<G> {
    fn insert_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError> {
        let feedback = Feedback {
            id: FeedbackId(self.ids.feedback.next_id()),
            facility_id: new.facility_id,
            submitted_by: new.submitted_by,
            rating: new.rating,
            submitted_at: new.submitted_at,
        };
        self.write().feedback.push(feedback.clone());
        Ok(feedback)
    }

    fn feedback_for(&self, facility_id: FacilityId) -> Result<Vec<Feedback>, StoreError> {
        let state = self.read();
        Ok(state.feedback.iter().filter(|f| f.facility_id == facility_id).cloned().collect())
    }

    fn recent_feedback(&self, limit: usize) -> Result<Vec<Feedback>, StoreError> {
        let state = self.read();
        let mut rows: Vec<&Feedback> = state.feedback.iter().collect();
        rows.sort_by(|a, b| (b.submitted_at, b.id).cmp(&(a.submitted_at, a.id)));
        Ok(rows.into_iter().take(limit).cloned().collect())
    }
}

impl<G: IdGenerator> FacilityRepository for MemoryStore<G> {
    fn facilities(&self) -> Result<Vec<Facility>, StoreError> {
        Ok(self.read().facilities.values().cloned().collect())
    }

    fn facility(&self, id: FacilityId) -> Result<Option<Facility>, StoreError> {
        Ok(self.read().facilities.get(&id).cloned())
    }

    fn insert_facility(&self, new: NewFacility, at: DateTime<Utc>) -> Result<Facility, StoreError> {
        let facility = Facility {
            id: FacilityId(self.ids.facility.next_id()),
            name: new.name,
            current_temp_c: new.current_temp_c,
            min_temp_c: new.min_temp_c,
            max_temp_c: new.max_temp_c,
            last_update: at,
        };
        self.write().facilities.insert(facility.id, facility.clone());
        Ok(facility)
    }

    fn set_current_temp(
        &self,
        id: FacilityId,
        temp_c: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<Facility>, StoreError> {
        let mut state = self.write();
        let Some(facility) = state.facilities.get_mut(&id) else {
            return Ok(None);
        };
        facility.current_temp_c = temp_c;
        facility.last_update = at;
        let updated = facility.clone();

        let history_id = HistoryId(self.ids.history.next_id());
        state.push_history(
            history_id,
            NewHistoryPoint {
                facility_id: id,
                temperature_c: temp_c,
                recorded_at: at,
            },
        );
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 14, 18, 0, 0).unwrap()
    }

    fn new_reading(facility: i64, temp: f64, at: DateTime<Utc>) -> NewTemperatureReading {
        NewTemperatureReading {
            facility_id: FacilityId(facility),
            submitted_by: "Mike T.".into(),
            temperature_c: temp,
            submitted_at: at,
        }
    }

    #[test]
    fn readings_start_with_zero_votes_and_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_reading(new_reading(1, 94.0, t0())).unwrap();
        let b = store.insert_reading(new_reading(1, 96.0, t0())).unwrap();
        assert_eq!(a.id, ReadingId(1));
        assert_eq!(b.id, ReadingId(2));
        assert_eq!((b.upvotes, b.downvotes), (0, 0));
    }

    #[test]
    fn recent_readings_sort_by_time_then_id() {
        let store = MemoryStore::new();
        // inserted out of time order on purpose
        store.insert_reading(new_reading(1, 1.0, t0() + Duration::minutes(5))).unwrap();
        store.insert_reading(new_reading(1, 2.0, t0())).unwrap();
        store.insert_reading(new_reading(1, 3.0, t0() + Duration::minutes(5))).unwrap();
        store.insert_reading(new_reading(2, 4.0, t0() + Duration::hours(1))).unwrap();

        let temps: Vec<f64> = store
            .recent_readings(FacilityId(1), 10)
            .unwrap()
            .iter()
            .map(|r| r.temperature_c)
            .collect();
        assert_eq!(temps, vec![3.0, 1.0, 2.0]);
        assert!(store.recent_readings(FacilityId(3), 10).unwrap().is_empty());
        assert_eq!(store.recent_readings(FacilityId(1), 0).unwrap().len(), 0);
    }

    #[test]
    fn vote_updates_counter_and_log_together() {
        let store = MemoryStore::new();
        let r = store.insert_reading(new_reading(1, 90.0, t0())).unwrap();
        store
            .record_vote(NewTemperatureVote {
                reading_id: r.id,
                is_upvote: false,
                cast_at: t0(),
            })
            .unwrap();
        let stored = store.reading(r.id).unwrap().unwrap();
        assert_eq!((stored.upvotes, stored.downvotes), (0, 1));
        assert_eq!(store.votes_for(r.id).unwrap().len(), 1);
    }

    #[test]
    fn vote_on_unknown_reading_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .record_vote(NewTemperatureVote {
                reading_id: ReadingId(999),
                is_upvote: true,
                cast_at: t0(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::ReadingNotFound(ReadingId(999))));
        assert!(store.votes_for(ReadingId(999)).unwrap().is_empty());
    }

    #[test]
    fn set_current_temp_appends_history() {
        let store = MemoryStore::new();
        let f = store
            .insert_facility(
                NewFacility {
                    name: "Steam Room".into(),
                    current_temp_c: 45.0,
                    min_temp_c: 40.0,
                    max_temp_c: 50.0,
                },
                t0(),
            )
            .unwrap();
        let later = t0() + Duration::minutes(1);
        let updated = store.set_current_temp(f.id, 46.0, later).unwrap().unwrap();
        assert_eq!(updated.current_temp_c, 46.0);
        assert_eq!(updated.last_update, later);

        let history = store.history_since(f.id, t0()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].temperature_c, 46.0);
        assert!(store.set_current_temp(FacilityId(42), 1.0, later).unwrap().is_none());
    }

    #[test]
    fn history_window_is_inclusive_and_ascending() {
        let store = MemoryStore::new();
        for (offset, temp) in [(2, 92.0), (0, 90.0), (1, 91.0)] {
            store
                .append_history(NewHistoryPoint {
                    facility_id: FacilityId(1),
                    temperature_c: temp,
                    recorded_at: t0() + Duration::hours(offset),
                })
                .unwrap();
        }
        let points = store.history_since(FacilityId(1), t0() + Duration::hours(1)).unwrap();
        let temps: Vec<f64> = points.iter().map(|p| p.temperature_c).collect();
        assert_eq!(temps, vec![91.0, 92.0]);
    }
}
