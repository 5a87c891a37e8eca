use chrono::{DateTime, Duration, TimeZone, Utc};
use crowdtemp::aggregator::{Aggregator, AggregatorError};
use crowdtemp::clock::ManualClock;
use crowdtemp::models::facility::FacilityId;
use crowdtemp::models::reading::ReadingId;
use crowdtemp::store::{MemoryStore, ReadingStore};
use std::sync::Arc;
use std::thread;

const F: FacilityId = FacilityId(1);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 14, 18, 0, 0).unwrap()
}

fn setup() -> (Aggregator<Arc<MemoryStore>, Arc<ManualClock>>, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let agg = Aggregator::new(store.clone()).with_clock(clock.clone());
    (agg, store, clock)
}

#[test]
fn end_to_end_weighting_example() {
    let (agg, _, clock) = setup();
    let r1 = agg.submit_reading(F, "Mike T.", 90.0).unwrap();
    clock.advance(Duration::seconds(30));
    let r2 = agg.submit_reading(F, "Jenny S.", 96.0).unwrap();

    agg.cast_vote(r1.id, true).unwrap();
    agg.cast_vote(r1.id, true).unwrap();
    agg.cast_vote(r2.id, false).unwrap();

    // (90*3 + 96*1) / (3 + 1)
    assert_eq!(agg.weighted_temperature(F).unwrap(), Some(91.5));

    let recent: Vec<_> = agg.recent_readings(F, 2).unwrap().collect();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].reading.id, r2.id);
    assert_eq!(recent[0].weighted_score, 0.0);
    assert_eq!(recent[1].reading.id, r1.id);
    assert_eq!(recent[1].weighted_score, 180.0);
    assert_eq!(recent[1].reading.temperature_c, 90.0);
}

#[test]
fn recent_readings_are_newest_first() {
    let (agg, _, clock) = setup();
    let mut ids = Vec::new();
    for temp in [80.0, 81.0, 82.0] {
        ids.push(agg.submit_reading(F, "visitor", temp).unwrap().id);
        clock.advance(Duration::minutes(1));
    }

    let recent: Vec<_> = agg.recent_readings(F, 2).unwrap().collect();
    let got: Vec<ReadingId> = recent.iter().map(|r| r.reading.id).collect();
    assert_eq!(got, vec![ids[2], ids[1]]);
    assert_eq!(recent[0].time_since_submission, "1m ago");
    assert_eq!(recent[1].time_since_submission, "2m ago");
}

#[test]
fn age_labels_at_bucket_edges() {
    let (agg, _, clock) = setup();
    agg.submit_reading(F, "visitor", 90.0).unwrap();

    let label = |agg: &Aggregator<Arc<MemoryStore>, Arc<ManualClock>>| {
        agg.recent_readings(F, 1).unwrap().next().unwrap().time_since_submission
    };
    clock.set(t0() + Duration::seconds(59));
    assert_eq!(label(&agg), "just now");
    clock.set(t0() + Duration::seconds(61));
    assert_eq!(label(&agg), "1m ago");
    clock.set(t0() + Duration::seconds(3661));
    assert_eq!(label(&agg), "1h ago");
}

#[test]
fn vote_on_missing_reading_changes_nothing() {
    let (agg, store, _) = setup();
    let r = agg.submit_reading(F, "visitor", 90.0).unwrap();
    agg.cast_vote(r.id, true).unwrap();
    let before = store.recent_readings(F, 10).unwrap();

    let err = agg.cast_vote(ReadingId(999), true).unwrap_err();
    assert!(matches!(err, AggregatorError::NotFound(ReadingId(999))));
    assert_eq!(err.to_string(), "temperature reading 999 not found");

    assert_eq!(store.recent_readings(F, 10).unwrap(), before);
    assert!(store.votes_for(ReadingId(999)).unwrap().is_empty());
    assert_eq!(store.votes_for(r.id).unwrap().len(), 1);
}

#[test]
fn concurrent_votes_are_not_lost() {
    let (agg, store, _) = setup();
    let r = agg.submit_reading(F, "visitor", 95.0).unwrap();
    let (ups_per_thread, downs_per_thread, threads) = (250u64, 100u64, 8u64);

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for i in 0..(ups_per_thread + downs_per_thread) {
                    agg.cast_vote(r.id, i < ups_per_thread).unwrap();
                }
            });
            // a vote and its counter land together, so the log read afterwards
            // can never be shorter than the counters read before it
            s.spawn(|| {
                let mut last_total = 0;
                for _ in 0..200 {
                    let reading = store.reading(r.id).unwrap().unwrap();
                    let logged = store.votes_for(r.id).unwrap().len() as u64;
                    assert!(logged >= reading.total_votes());
                    assert!(reading.total_votes() >= last_total);
                    last_total = reading.total_votes();
                    let estimate = agg.weighted_temperature(F).unwrap();
                    assert_eq!(estimate, Some(95.0));
                }
            });
        }
    });

    let reading = store.reading(r.id).unwrap().unwrap();
    assert_eq!(reading.upvotes, ups_per_thread * threads);
    assert_eq!(reading.downvotes, downs_per_thread * threads);
    assert_eq!(store.votes_for(r.id).unwrap().len() as u64, (ups_per_thread + downs_per_thread) * threads);
}

#[test]
fn estimate_tracks_only_its_facility() {
    let (agg, _, _) = setup();
    agg.submit_reading(F, "visitor", 90.0).unwrap();
    agg.submit_reading(FacilityId(2), "visitor", 7.0).unwrap();
    assert_eq!(agg.weighted_temperature(F).unwrap(), Some(90.0));
    assert_eq!(agg.weighted_temperature(FacilityId(2)).unwrap(), Some(7.0));
    assert_eq!(agg.weighted_temperature(FacilityId(3)).unwrap(), None);
}
