//! Default facilities and sample activity for a fresh store.

use chrono::Duration;
use log::info;

use crate::aggregator::TimeWeight;
use crate::clock::Clock;
use crate::models::facility::{Facility, NewFacility};
use crate::models::feedback::FeedbackRating;
use crate::models::reading::NewHistoryPoint;
use crate::services::dashboard::Dashboard;
use crate::store::{FacilityRepository, FeedbackStore, ReadingStore};

struct FacilitySeed {
    name: &'static str,
    current: f64,
    min: f64,
    max: f64,
    // hourly, oldest first, ending at the current hour
    last_day: [f64; 24],
}

const FACILITIES: [FacilitySeed; 4] = [
    FacilitySeed {
        name: "Sauna 1",
        current: 95.0,
        min: 80.0,
        max: 100.0,
        last_day: [
            92.0, 93.0, 90.0, 91.0, 92.0, 94.0, 95.0, 94.0, 93.0, 92.0, 91.0, 92.0, 94.0, 94.0, 93.0, 92.0, 93.0,
            94.0, 95.0, 96.0, 95.0, 94.0, 93.0, 95.0,
        ],
    },
    FacilitySeed {
        name: "Sauna 2",
        current: 85.0,
        min: 75.0,
        max: 95.0,
        last_day: [
            82.0, 83.0, 84.0, 84.0, 85.0, 86.0, 87.0, 87.0, 88.0, 88.0, 87.0, 86.0, 85.0, 85.0, 85.0, 84.0, 84.0,
            83.0, 84.0, 85.0, 86.0, 87.0, 88.0, 85.0,
        ],
    },
    FacilitySeed {
        name: "Steam Room",
        current: 45.0,
        min: 40.0,
        max: 50.0,
        last_day: [
            42.0, 42.0, 43.0, 43.0, 44.0, 44.0, 44.0, 45.0, 45.0, 45.0, 46.0, 46.0, 46.0, 45.0, 45.0, 44.0, 44.0,
            43.0, 43.0, 44.0, 44.0, 45.0, 45.0, 45.0,
        ],
    },
    FacilitySeed {
        name: "Cold Plunge",
        current: 7.0,
        min: 5.0,
        max: 10.0,
        last_day: [
            8.0, 8.0, 8.0, 9.0, 9.0, 9.0, 9.0, 8.0, 8.0, 8.0, 7.0, 7.0, 7.0, 7.0, 7.0, 6.0, 6.0, 6.0, 7.0, 7.0, 7.0,
            8.0, 8.0, 7.0,
        ],
    },
];

// (facility index, visitor, rating)
const FEEDBACK: [(usize, &str, FeedbackRating); 12] = [
    (0, "Mike T.", FeedbackRating::TooHot),
    (0, "Jenny S.", FeedbackRating::Perfect),
    (0, "Sarah D.", FeedbackRating::Perfect),
    (1, "Mike T.", FeedbackRating::Perfect),
    (1, "Jenny S.", FeedbackRating::Perfect),
    (1, "Sarah D.", FeedbackRating::TooCold),
    (2, "Mike T.", FeedbackRating::Perfect),
    (2, "Jenny S.", FeedbackRating::Perfect),
    (2, "Sarah D.", FeedbackRating::TooHot),
    (3, "Mike T.", FeedbackRating::Perfect),
    (3, "Jenny S.", FeedbackRating::Perfect),
    (3, "Sarah D.", FeedbackRating::TooCold),
];

// (facility index, visitor, temperature in Celsius)
const READINGS: [(usize, &str, f64); 3] = [(0, "Mike T.", 94.0), (0, "Jenny S.", 96.0), (3, "Sarah D.", 8.0)];

/// Populate an empty store. Returns `false` without touching anything when
/// facilities already exist.
pub fn run<S, C, W>(dashboard: &Dashboard<S, C, W>) -> Result<bool, String>
where
    S: ReadingStore + FeedbackStore + FacilityRepository,
    C: Clock,
    W: TimeWeight,
{
    let store = dashboard.store();
    let existing = store
        .facilities()
        .map_err(|e| format!("listing facilities failed: {}", e))?;
    if !existing.is_empty() {
        info!("Seed: {} facilities already present; skipping", existing.len());
        return Ok(false);
    }

    let now = dashboard.aggregator().clock().now();
    let mut created: Vec<Facility> = Vec::with_capacity(FACILITIES.len());
    for seed in &FACILITIES {
        let facility = store
            .insert_facility(
                NewFacility {
                    name: seed.name.to_string(),
                    current_temp_c: seed.current,
                    min_temp_c: seed.min,
                    max_temp_c: seed.max,
                },
                now,
            )
            .map_err(|e| format!("creating facility {} failed: {}", seed.name, e))?;

        for (hour, temp) in seed.last_day.iter().enumerate() {
            let hours_ago = (seed.last_day.len() - 1 - hour) as i64;
            store
                .append_history(NewHistoryPoint {
                    facility_id: facility.id,
                    temperature_c: *temp,
                    recorded_at: now - Duration::hours(hours_ago),
                })
                .map_err(|e| format!("seeding history for {} failed: {}", seed.name, e))?;
        }
        created.push(facility);
    }

    for (index, visitor, rating) in FEEDBACK {
        dashboard
            .submit_feedback(created[index].id, Some(visitor.to_string()), rating)
            .map_err(|e| format!("seeding feedback failed: {}", e))?;
    }

    for (index, visitor, temp) in READINGS {
        dashboard
            .aggregator()
            .submit_reading(created[index].id, visitor, temp)
            .map_err(|e| format!("seeding reading failed: {}", e))?;
    }

    info!(
        "Seed: created {} facilities, {} feedback entries, {} readings",
        created.len(),
        FEEDBACK.len(),
        READINGS.len()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    #[test]
    fn seeds_once() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 14, 18, 0, 0).unwrap());
        let dashboard = Dashboard::new(Aggregator::new(MemoryStore::new()).with_clock(clock));

        assert!(run(&dashboard).unwrap());
        assert!(!run(&dashboard).unwrap());

        let views = dashboard.facility_views().unwrap();
        let names: Vec<&str> = views.iter().map(|v| v.facility.name.as_str()).collect();
        assert_eq!(names, vec!["Sauna 1", "Sauna 2", "Steam Room", "Cold Plunge"]);

        // two unvoted readings: (94 + 96) / 2
        assert_eq!(views[0].display_temp_c, 95.0);
        assert!(views[0].weighted);
        assert_eq!(views[0].satisfaction_percent, 67);
        assert_eq!(views[1].display_temp_c, 85.0);
        assert!(!views[1].weighted);
        assert_eq!(views[3].display_temp_c, 8.0);

        // 24 hourly points plus both submitted readings
        let history = dashboard.history(views[0].facility.id, 24).unwrap();
        assert_eq!(history.len(), 26);
        assert_eq!(dashboard.history(views[1].facility.id, 24).unwrap().len(), 24);
    }
}
