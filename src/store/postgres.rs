//! PostgreSQL-backed store using diesel.
//!
//! A single connection behind a `Mutex`; votes run in a transaction whose
//! `UPDATE ... SET upvotes = upvotes + 1` takes the row lock, so concurrent
//! voters on the same reading serialize in the database as well.

use chrono::{DateTime, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{debug, info};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{FacilityRepository, FeedbackStore, ReadingStore, StoreError};
use crate::db::models::{
    FacilityRow, FeedbackRow, HistoryRow, NewFacilityRow, NewFeedbackRow, NewHistoryRow, NewReadingRow, NewVoteRow,
    ReadingRow, VoteRow,
};
use crate::models::facility::{Facility, FacilityId, NewFacility};
use crate::models::feedback::{Feedback, NewFeedback};
use crate::models::reading::{
    HistoryPoint, NewHistoryPoint, NewTemperatureReading, NewTemperatureVote, ReadingId, TemperatureReading,
    TemperatureVote,
};
use crate::schema;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct PgStore {
    conn: Mutex<PgConnection>,
}

impl PgStore {
    /// Connect and bring the schema up to date.
    pub fn connect(database_url: &str) -> Result<Self, String> {
        let mut conn = PgConnection::establish(database_url).map_err(|e| format!("DB connection failed: {}", e))?;
        info!("Connected to database");
        apply_database_migrations(&mut conn)?;
        Ok(PgStore { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, PgConnection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl ReadingStore for PgStore {
    fn insert_reading(&self, new: NewTemperatureReading) -> Result<TemperatureReading, StoreError> {
        use schema::temperature_readings::dsl as R;

        let row = NewReadingRow {
            facility_id: new.facility_id.0,
            submitted_by: &new.submitted_by,
            temperature_c: new.temperature_c,
            submitted_at: new.submitted_at,
        };
        let inserted: ReadingRow = diesel::insert_into(R::temperature_readings)
            .values(&row)
            .returning(ReadingRow::as_returning())
            .get_result(&mut *self.conn())?;
        debug!("Stored reading {} for facility {}", inserted.id, inserted.facility_id);
        Ok(inserted.into())
    }

    fn reading(&self, id: ReadingId) -> Result<Option<TemperatureReading>, StoreError> {
        use schema::temperature_readings::dsl as R;

        let row: Option<ReadingRow> = R::temperature_readings
            .find(id.0)
            .select(ReadingRow::as_select())
            .first(&mut *self.conn())
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn recent_readings(&self, facility_id: FacilityId, limit: usize) -> Result<Vec<TemperatureReading>, StoreError> {
        use schema::temperature_readings::dsl as R;

        let rows: Vec<ReadingRow> = R::temperature_readings
            .filter(R::facility_id.eq(facility_id.0))
            .order((R::submitted_at.desc(), R::id.desc()))
            .limit(sql_limit(limit))
            .select(ReadingRow::as_select())
            .load(&mut *self.conn())?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn record_vote(&self, new: NewTemperatureVote) -> Result<TemperatureVote, StoreError> {
        use schema::temperature_readings::dsl as R;
        use schema::temperature_votes::dsl as V;

        let mut conn = self.conn();
        conn.transaction::<_, StoreError, _>(|conn| {
            let target = R::temperature_readings.find(new.reading_id.0);
            let updated = if new.is_upvote {
                diesel::update(target).set(R::upvotes.eq(R::upvotes + 1_i64)).execute(conn)?
            } else {
                diesel::update(target)
                    .set(R::downvotes.eq(R::downvotes + 1_i64))
                    .execute(conn)?
            };
            if updated == 0 {
                return Err(StoreError::ReadingNotFound(new.reading_id));
            }

            let row: VoteRow = diesel::insert_into(V::temperature_votes)
                .values(&NewVoteRow {
                    reading_id: new.reading_id.0,
                    is_upvote: new.is_upvote,
                    cast_at: new.cast_at,
                })
                .returning(VoteRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
    }

    fn votes_for(&self, reading_id: ReadingId) -> Result<Vec<TemperatureVote>, StoreError> {
        use schema::temperature_votes::dsl as V;

        let rows: Vec<VoteRow> = V::temperature_votes
            .filter(V::reading_id.eq(reading_id.0))
            .order(V::id.asc())
            .select(VoteRow::as_select())
            .load(&mut *self.conn())?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn append_history(&self, new: NewHistoryPoint) -> Result<HistoryPoint, StoreError> {
        use schema::temperature_history::dsl as H;

        let row: HistoryRow = diesel::insert_into(H::temperature_history)
            .values(&NewHistoryRow {
                facility_id: new.facility_id.0,
                temperature_c: new.temperature_c,
                recorded_at: new.recorded_at,
            })
            .returning(HistoryRow::as_returning())
            .get_result(&mut *self.conn())?;
        Ok(row.into())
    }

    fn history_since(&self, facility_id: FacilityId, cutoff: DateTime<Utc>) -> Result<Vec<HistoryPoint>, StoreError> {
        use schema::temperature_history::dsl as H;

        let rows: Vec<HistoryRow> = H::temperature_history
            .filter(H::facility_id.eq(facility_id.0).and(H::recorded_at.ge(cutoff)))
            .order((H::recorded_at.asc(), H::id.asc()))
            .select(HistoryRow::as_select())
            .load(&mut *self.conn())?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

impl FeedbackStore for PgStore {
    fn insert_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError> {
        use schema::feedbacks::dsl as F;

        let row: FeedbackRow = diesel::insert_into(F::feedbacks)
            .values(&NewFeedbackRow {
                facility_id: new.facility_id.0,
                submitted_by: new.submitted_by.as_deref(),
                rating: new.rating.as_str(),
                submitted_at: new.submitted_at,
            })
            .returning(FeedbackRow::as_returning())
            .get_result(&mut *self.conn())?;
        Feedback::try_from(row)
    }

    fn feedback_for(&self, facility_id: FacilityId) -> Result<Vec<Feedback>, StoreError> {
        use schema::feedbacks::dsl as F;

        let rows: Vec<FeedbackRow> = F::feedbacks
            .filter(F::facility_id.eq(facility_id.0))
            .order(F::id.asc())
            .select(FeedbackRow::as_select())
            .load(&mut *self.conn())?;
        rows.into_iter().map(Feedback::try_from).collect()
    }

    fn recent_feedback(&self, limit: usize) -> Result<Vec<Feedback>, StoreError> {
        use schema::feedbacks::dsl as F;

        let rows: Vec<FeedbackRow> = F::feedbacks
            .order((F::submitted_at.desc(), F::id.desc()))
            .limit(sql_limit(limit))
            .select(FeedbackRow::as_select())
            .load(&mut *self.conn())?;
        rows.into_iter().map(Feedback::try_from).collect()
    }
}

impl FacilityRepository for PgStore {
    fn facilities(&self) -> Result<Vec<Facility>, StoreError> {
        use schema::facilities::dsl as F;

        let rows: Vec<FacilityRow> = F::facilities
            .order(F::id.asc())
            .select(FacilityRow::as_select())
            .load(&mut *self.conn())?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn facility(&self, id: FacilityId) -> Result<Option<Facility>, StoreError> {
        use schema::facilities::dsl as F;

        let row: Option<FacilityRow> = F::facilities
            .find(id.0)
            .select(FacilityRow::as_select())
            .first(&mut *self.conn())
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_facility(&self, new: NewFacility, at: DateTime<Utc>) -> Result<Facility, StoreError> {
        use schema::facilities::dsl as F;

        let row: FacilityRow = diesel::insert_into(F::facilities)
            .values(&NewFacilityRow {
                name: &new.name,
                current_temp_c: new.current_temp_c,
                min_temp_c: new.min_temp_c,
                max_temp_c: new.max_temp_c,
                last_update: at,
            })
            .returning(FacilityRow::as_returning())
            .get_result(&mut *self.conn())?;
        Ok(row.into())
    }

    fn set_current_temp(
        &self,
        id: FacilityId,
        temp_c: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<Facility>, StoreError> {
        use schema::facilities::dsl as F;
        use schema::temperature_history::dsl as H;

        let mut conn = self.conn();
        conn.transaction::<_, StoreError, _>(|conn| {
            let updated: Option<FacilityRow> = diesel::update(F::facilities.find(id.0))
                .set((F::current_temp_c.eq(temp_c), F::last_update.eq(at)))
                .returning(FacilityRow::as_returning())
                .get_result(conn)
                .optional()?;
            let Some(row) = updated else {
                return Ok(None);
            };
            diesel::insert_into(H::temperature_history)
                .values(&NewHistoryRow {
                    facility_id: id.0,
                    temperature_c: temp_c,
                    recorded_at: at,
                })
                .execute(conn)?;
            Ok(Some(row.into()))
        })
    }
}
