//! Deterministic schedule synthesis.
//!
//! The dataset records when an event historically took place but nothing
//! about registration windows, so the importer fabricates a plausible
//! schedule. The generator is seeded from the event identity: re-running the
//! importer on the same day reproduces identical dates instead of drifting
//! on every invocation.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aggregate::AggregatedEvent;
use crate::types::EventStatus;

/// Synthesized schedule for one aggregated event.
///
/// Invariants: `registration_deadline < start_date` and
/// `registration_open_date < registration_deadline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSchedule {
    pub start_date: NaiveDate,
    /// Absent for single-day events.
    pub end_date: Option<NaiveDate>,
    pub registration_open_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub status: EventStatus,
}

impl DerivedSchedule {
    /// End of the event for status purposes; single-day events end on
    /// their start date.
    pub fn effective_end(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }
}

/// Seed the generator from year, lowercased name, and country code so the
/// draw sequence is a pure function of the event identity.
fn seeded_rng(event: &AggregatedEvent) -> StdRng {
    let seed_value = format!(
        "{}-{}-{}",
        event.year,
        event.base_name.to_lowercase(),
        event.country_code.as_deref().unwrap_or("")
    );
    let digest = Sha256::digest(seed_value.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

/// Derive start/end dates and a registration window for an event, and
/// classify its status relative to `today`.
pub fn synthesize_schedule(event: &AggregatedEvent, today: NaiveDate) -> DerivedSchedule {
    let mut rng = seeded_rng(event);

    // One phase draw picks the scheduling branch; all subsequent draws come
    // from the same stream in a fixed order.
    let phase: f64 = rng.gen();

    let (start_date, end_date, registration_open, registration_deadline) = if phase < 0.45 {
        // Future event with an open (or nearly closed) registration window.
        let start = today + Duration::days(rng.gen_range(35..=180));
        let duration_days: i64 = rng.gen_range(0..=2);
        let end = (duration_days > 0).then(|| start + Duration::days(duration_days));
        let mut deadline = start - Duration::days(rng.gen_range(7..=20));
        if deadline <= today {
            deadline = today + Duration::days(rng.gen_range(5..=20));
            if deadline >= start {
                deadline = start - Duration::days(5);
            }
        }
        let open = deadline - Duration::days(rng.gen_range(30..=120));
        (start, end, open, deadline)
    } else if phase < 0.6 {
        // Event running right now: started today or yesterday.
        let start = today - Duration::days(rng.gen_range(0..=1));
        let end = start + Duration::days(rng.gen_range(1..=3));
        let deadline = start - Duration::days(rng.gen_range(2..=6));
        let open = deadline - Duration::days(rng.gen_range(30..=90));
        (start, Some(end), open, deadline)
    } else {
        // Past event.
        let start = today - Duration::days(rng.gen_range(40..=320));
        let duration_days: i64 = rng.gen_range(0..=2);
        let end = (duration_days > 0).then(|| start + Duration::days(duration_days));
        let deadline = start - Duration::days(rng.gen_range(5..=20));
        let open = deadline - Duration::days(rng.gen_range(30..=160));
        (start, end, open, deadline)
    };

    DerivedSchedule {
        start_date,
        end_date,
        registration_open_date: registration_open,
        registration_deadline,
        status: classify_status(start_date, end_date, today),
    }
}

/// Status is a pure function of the generated dates and today.
pub fn classify_status(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> EventStatus {
    let event_end = end_date.unwrap_or(start_date);
    if start_date > today {
        EventStatus::Upcoming
    } else if event_end >= today {
        EventStatus::Ongoing
    } else {
        EventStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn event(year: i32, name: &str, country: Option<&str>) -> AggregatedEvent {
        AggregatedEvent {
            year,
            base_name: name.to_string(),
            country_code: country.map(str::to_string),
            country: "Sweden".to_string(),
            original_name: name.to_string(),
            original_start_date: NaiveDate::from_ymd_opt(year, 1, 6).unwrap(),
            original_end_date: None,
            finishers: 100,
            distance_labels: BTreeSet::new(),
            rows: 1,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let event = event(2018, "Winter Classic", Some("SWE"));
        let first = synthesize_schedule(&event, today());
        let second = synthesize_schedule(&event, today());
        assert_eq!(first, second);
    }

    #[test]
    fn test_identity_drives_the_schedule() {
        let starts: std::collections::HashSet<NaiveDate> = (2000..2020)
            .map(|year| {
                synthesize_schedule(&event(year, "Winter Classic", Some("SWE")), today()).start_date
            })
            .collect();
        assert!(starts.len() > 1, "all identities drew the same start date");
    }

    #[test]
    fn test_registration_window_invariants_hold_across_seeds() {
        // Sweep enough identities to hit all three phase branches.
        for year in 2000..2100 {
            for name in ["Winter Classic", "Gobi March", "Fell Race"] {
                let schedule = synthesize_schedule(&event(year, name, Some("SWE")), today());
                assert!(
                    schedule.registration_deadline < schedule.start_date,
                    "deadline on/after start for {name} {year}: {schedule:?}"
                );
                assert!(
                    schedule.registration_open_date < schedule.registration_deadline,
                    "open on/after deadline for {name} {year}: {schedule:?}"
                );
                if let Some(end) = schedule.end_date {
                    assert!(end > schedule.start_date);
                }
                assert_eq!(
                    schedule.status,
                    classify_status(schedule.start_date, schedule.end_date, today())
                );
            }
        }
    }

    #[test]
    fn test_classify_status_boundaries() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let day = Duration::days(1);

        assert_eq!(classify_status(start, None, start - day), EventStatus::Upcoming);
        assert_eq!(classify_status(start, None, start), EventStatus::Ongoing);
        assert_eq!(
            classify_status(start, Some(start + day), start + day),
            EventStatus::Ongoing
        );
        assert_eq!(classify_status(start, None, start + day), EventStatus::Completed);
        assert_eq!(
            classify_status(start, Some(start + day), start + day + day),
            EventStatus::Completed
        );
    }
}
