use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One raw record from the UM races CSV. Columns beyond these are ignored.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRow {
    #[serde(rename = "Year of event")]
    pub year: Option<String>,
    #[serde(rename = "Event name")]
    pub event_name: Option<String>,
    #[serde(rename = "Event dates")]
    pub event_dates: Option<String>,
    #[serde(rename = "Event number of finishers")]
    pub finishers: Option<String>,
    #[serde(rename = "Event distance/length")]
    pub distance: Option<String>,
}

/// One successfully parsed CSV row describing an event occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFact {
    pub year: i32,
    /// Event name with the trailing parenthesized country code stripped.
    pub base_name: String,
    pub country_code: Option<String>,
    pub country: String,
    pub original_name: String,
    pub date_label: String,
    pub original_start_date: NaiveDate,
    pub original_end_date: Option<NaiveDate>,
    pub finishers: u32,
    pub distance_label: Option<String>,
}

/// Lifecycle status of an event relative to the current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field values applied to an event on every import, whether the event is
/// created or updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventArgs {
    pub description: String,
    pub city: String,
    pub country: String,
    pub venue: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub registration_open_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub status: EventStatus,
    pub popularity_score: u32,
    pub participant_limit: u32,
    pub registered_count: u32,
    pub featured: bool,
    pub banner_image: String,
}

/// A marathon event in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub city: String,
    pub country: String,
    pub venue: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub registration_open_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub status: EventStatus,
    pub popularity_score: u32,
    pub participant_limit: u32,
    pub registered_count: u32,
    pub featured: bool,
    pub banner_image: String,
    pub category_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create a new event from import field values
    pub fn new(title: String, args: EventArgs) -> Self {
        Self {
            id: None,
            title,
            description: args.description,
            city: args.city,
            country: args.country,
            venue: args.venue,
            start_date: args.start_date,
            end_date: args.end_date,
            registration_open_date: args.registration_open_date,
            registration_deadline: args.registration_deadline,
            status: args.status,
            popularity_score: args.popularity_score,
            participant_limit: args.participant_limit,
            registered_count: args.registered_count,
            featured: args.featured,
            banner_image: args.banner_image,
            category_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Overwrite every import-managed field with new values
    pub fn apply(&mut self, args: &EventArgs) {
        self.description = args.description.clone();
        self.city = args.city.clone();
        self.country = args.country.clone();
        self.venue = args.venue.clone();
        self.start_date = args.start_date;
        self.end_date = args.end_date;
        self.registration_open_date = args.registration_open_date;
        self.registration_deadline = args.registration_deadline;
        self.status = args.status;
        self.popularity_score = args.popularity_score;
        self.participant_limit = args.participant_limit;
        self.registered_count = args.registered_count;
        self.featured = args.featured;
        self.banner_image = args.banner_image.clone();
    }
}

/// A race distance/format linked to one or more events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<Uuid>,
    /// Unique label as it appears in the dataset, e.g. "42km".
    pub display_name: String,
    /// Slug-safe short name derived from the label.
    pub name: String,
    pub distance_km: Decimal,
    pub created_at: DateTime<Utc>,
}

/// What persisting one aggregated event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}
