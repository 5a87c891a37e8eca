//! Temperature drift simulation for facilities without live sensors.
//!
//! Each tick nudges one random facility's raw temperature by -1, 0 or +1
//! degree and reports whether it left the recommended range.

use log::{info, warn};
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

use crate::aggregator::TimeWeight;
use crate::clock::Clock;
use crate::models::facility::Facility;
use crate::services::dashboard::{Broadcast, Dashboard, TemperatureAlert};
use crate::store::{FacilityRepository, FeedbackStore, ReadingStore};

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub facility: Facility,
    pub alert: Option<TemperatureAlert>,
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Drift one facility. `Ok(None)` when there are no facilities.
pub fn tick<R, C, G>(repo: &R, clock: &C, rng: &mut G) -> Result<Option<Tick>, String>
where
    R: FacilityRepository + ?Sized,
    C: Clock + ?Sized,
    G: Rng,
{
    let facilities = repo.facilities().map_err(|e| format!("listing facilities failed: {}", e))?;
    if facilities.is_empty() {
        return Ok(None);
    }
    let picked = &facilities[rng.random_range(0..facilities.len())];
    let change: i32 = rng.random_range(-1..=1);
    let new_temp = round_to_tenth(picked.current_temp_c + f64::from(change));

    let updated = repo
        .set_current_temp(picked.id, new_temp, clock.now())
        .map_err(|e| format!("updating facility {} failed: {}", picked.id, e))?;
    let Some(facility) = updated else {
        // removed between listing and update
        return Ok(None);
    };
    let alert = TemperatureAlert::check(&facility, new_temp);
    Ok(Some(Tick { facility, alert }))
}

/// Tick forever at a steady cadence, handing every update to `emit`.
pub fn run_loop<S, C, W, G, E>(
    dashboard: &Dashboard<S, C, W>,
    interval: Duration,
    rng: &mut G,
    mut emit: E,
) -> Result<(), String>
where
    S: ReadingStore + FeedbackStore + FacilityRepository,
    C: Clock,
    W: TimeWeight,
    G: Rng,
    E: FnMut(&Broadcast) -> Result<(), String>,
{
    loop {
        let tick_start = Instant::now();

        match tick(dashboard.store(), dashboard.aggregator().clock(), rng) {
            Ok(Some(t)) => {
                let views = dashboard
                    .facility_views()
                    .map_err(|e| format!("building facility views failed: {}", e))?;
                emit(&Broadcast::FacilitiesUpdate(views))?;
                if let Some(alert) = t.alert {
                    info!("Simulation: {}", alert.message);
                    emit(&Broadcast::TemperatureAlert(alert))?;
                }
            }
            Ok(None) => warn!("Simulation: no facilities to update"),
            Err(e) => warn!("Simulation tick failed: {}", e),
        }

        // Maintain steady cadence
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::facility::NewFacility;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 14, 18, 0, 0).unwrap())
    }

    #[test]
    fn empty_store_is_a_no_op() {
        let store = MemoryStore::new();
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(tick(&store, &clock(), &mut rng).unwrap(), None);
    }

    #[test]
    fn drift_stays_within_one_degree_and_is_recorded() {
        let store = MemoryStore::new();
        let clock = clock();
        let plunge = store
            .insert_facility(
                NewFacility {
                    name: "Cold Plunge".into(),
                    current_temp_c: 7.0,
                    min_temp_c: 5.0,
                    max_temp_c: 10.0,
                },
                clock.now(),
            )
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(0x5A0A);

        let mut previous = plunge.current_temp_c;
        for _ in 0..50 {
            let t = tick(&store, &clock, &mut rng).unwrap().unwrap();
            assert!((t.facility.current_temp_c - previous).abs() <= 1.0);
            assert_eq!(t.alert.is_some(), !(5.0..=10.0).contains(&t.facility.current_temp_c));
            previous = t.facility.current_temp_c;
        }
        assert_eq!(store.history_since(plunge.id, clock.now()).unwrap().len(), 50);
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round_to_tenth(95.04), 95.0);
        assert_eq!(round_to_tenth(7.25), 7.3);
    }
}
