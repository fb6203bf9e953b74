//! Merges parsed rows that describe the same logical event.
//!
//! The dataset carries one row per race distance per event, so a single
//! event usually spans several rows. Rows sharing a key merge into one
//! `AggregatedEvent`; first-seen key order is preserved so re-runs and
//! `--limit` cutoffs are reproducible.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::schedule::DerivedSchedule;
use crate::types::EventFact;

/// Identity of a logical event within one import run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub year: i32,
    /// Lowercased base name.
    pub name: String,
    /// Empty string when the row carried no country code.
    pub country_code: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl EventKey {
    fn for_fact(fact: &EventFact) -> Self {
        Self {
            year: fact.year,
            name: fact.base_name.to_lowercase(),
            country_code: fact.country_code.clone().unwrap_or_default(),
            start_date: fact.original_start_date,
            end_date: fact.original_end_date,
        }
    }
}

/// All facts sharing one `EventKey`, merged.
#[derive(Debug, Clone)]
pub struct AggregatedEvent {
    pub year: i32,
    pub base_name: String,
    pub country_code: Option<String>,
    pub country: String,
    pub original_name: String,
    pub original_start_date: NaiveDate,
    pub original_end_date: Option<NaiveDate>,
    /// Maximum finisher count across contributing rows.
    pub finishers: u32,
    /// Distinct distance labels, lexicographically ordered.
    pub distance_labels: BTreeSet<String>,
    /// Number of contributing rows.
    pub rows: u32,
}

impl AggregatedEvent {
    fn from_fact(fact: &EventFact) -> Self {
        Self {
            year: fact.year,
            base_name: fact.base_name.clone(),
            country_code: fact.country_code.clone(),
            country: fact.country.clone(),
            original_name: fact.original_name.clone(),
            original_start_date: fact.original_start_date,
            original_end_date: fact.original_end_date,
            finishers: fact.finishers,
            distance_labels: BTreeSet::new(),
            rows: 0,
        }
    }

    fn add_distance(&mut self, label: Option<&str>) {
        if let Some(label) = label {
            let trimmed = label.trim();
            if !trimmed.is_empty() {
                self.distance_labels.insert(trimmed.to_string());
            }
        }
    }

    fn increase_finishers(&mut self, value: u32) {
        self.finishers = self.finishers.max(value);
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.base_name, self.year)
    }

    pub fn city(&self) -> &str {
        &self.base_name
    }

    pub fn venue(&self) -> &str {
        &self.base_name
    }

    /// Assemble the templated event description from the aggregate and its
    /// synthesized schedule.
    pub fn build_description(&self, schedule: &DerivedSchedule) -> String {
        let mut location_bits: Vec<&str> = Vec::new();
        if !self.base_name.is_empty() {
            location_bits.push(&self.base_name);
        }
        if !self.country.is_empty() && self.country != "Unknown" {
            location_bits.push(&self.country);
        }
        let location_text = if location_bits.is_empty() {
            "this destination".to_string()
        } else {
            location_bits.join(", ")
        };

        let mut lines: Vec<String> = Vec::new();
        lines.push(format!(
            "{} welcomes endurance athletes to {}.",
            self.original_name, location_text
        ));

        let start_text = schedule.start_date.format("%B %d, %Y").to_string();
        match schedule.end_date {
            Some(end) if end != schedule.start_date => lines.push(format!(
                "The {} edition runs from {} to {}, delivering multi-day racing energy.",
                self.year,
                start_text,
                end.format("%B %d, %Y")
            )),
            _ => lines.push(format!(
                "The {} edition takes place on {}, perfect for a focused race weekend.",
                self.year, start_text
            )),
        }

        // Shortest labels first, ties broken case-insensitively.
        let mut sorted_distances: Vec<&String> = self.distance_labels.iter().collect();
        sorted_distances.sort_by_key(|label| (label.len(), label.to_lowercase()));
        if sorted_distances.is_empty() {
            lines.push(
                "Look forward to a curated set of race categories tailored for diverse running goals."
                    .to_string(),
            );
        } else {
            lines.push(format!(
                "Choose from {} challenges crafted for both seasoned ultra runners and ambitious newcomers.",
                join_with_and(&sorted_distances)
            ));
        }

        if self.finishers > 0 {
            lines.push(format!(
                "Historical results highlight {} recorded finishers, underscoring supportive crews and dependable race logistics.",
                self.finishers
            ));
        } else {
            lines.push(
                "Historic records highlight a tight-knit community of trail athletes backing every stride."
                    .to_string(),
            );
        }

        lines.push(format!(
            "Registration opens {} and remains available until {}, giving you ample time to plan travel and training.",
            schedule.registration_open_date.format("%B %d, %Y"),
            schedule.registration_deadline.format("%B %d, %Y")
        ));

        lines.push(
            "Expect attentive aid support, scenic sections worthy of a run-cation, and camaraderie that turns every kilometer into a shared adventure."
                .to_string(),
        );

        lines.join("\n\n")
    }
}

/// "X", "X and Y", or "X, Y, and Z".
fn join_with_and(labels: &[&String]) -> String {
    match labels {
        [] => String::new(),
        [only] => (*only).clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
            format!("{}, and {}", head.join(", "), last)
        }
    }
}

/// Insertion-ordered aggregation of facts into logical events, with an
/// optional cap on distinct events.
pub struct Aggregator {
    limit: Option<usize>,
    index: HashMap<EventKey, usize>,
    events: Vec<AggregatedEvent>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            index: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Merge one fact. Returns false when the distinct-event cap dropped a
    /// fact that would have introduced a new event; facts for already
    /// admitted events always merge.
    pub fn add(&mut self, fact: &EventFact) -> bool {
        let key = EventKey::for_fact(fact);
        let idx = match self.index.get(&key) {
            Some(&idx) => {
                self.events[idx].increase_finishers(fact.finishers);
                idx
            }
            None => {
                if let Some(limit) = self.limit {
                    if self.events.len() >= limit {
                        return false;
                    }
                }
                let idx = self.events.len();
                self.events.push(AggregatedEvent::from_fact(fact));
                self.index.insert(key, idx);
                idx
            }
        };

        let event = &mut self.events[idx];
        event.add_distance(fact.distance_label.as_deref());
        event.rows += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hand the aggregated events off in first-seen order.
    pub fn into_events(self) -> Vec<AggregatedEvent> {
        self.events
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
