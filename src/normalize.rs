//! Row normalization: one raw CSV record in, one structured event fact out.
//!
//! The dataset encodes event dates in several shorthand formats and embeds
//! country codes in the event name, so most of the parsing rules live here.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::country_display_name;
use crate::types::{EventFact, RawRow};

/// Turn one CSV row into an `EventFact`. Rows without a usable year, name,
/// or start date yield `None` and are skipped by the pipeline.
pub fn normalize_row(row: &RawRow) -> Option<EventFact> {
    let year = parse_year(row.year.as_deref())?;
    let raw_name = row.event_name.as_deref().unwrap_or("").trim().to_string();
    let date_label = row.event_dates.as_deref().unwrap_or("").trim().to_string();

    if raw_name.is_empty() || date_label.is_empty() {
        return None;
    }

    let (base_name, country_code) = split_event_name(&raw_name);
    let country = country_display_name(country_code.as_deref());

    let (original_start, original_end) = parse_event_dates(&date_label, year);
    let original_start_date = original_start?;

    let finishers = parse_count(row.finishers.as_deref()).unwrap_or(0).max(0) as u32;

    let distance_label = row
        .distance
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string);

    Some(EventFact {
        year,
        base_name,
        country_code,
        country,
        original_name: raw_name,
        date_label,
        original_start_date,
        original_end_date: original_end,
        finishers,
        distance_label,
    })
}

/// Parse a year cell. Some rows store years as floats ("2018.0").
fn parse_year(value: Option<&str>) -> Option<i32> {
    parse_numeric(value).map(|v| v as i32)
}

/// Parse a count cell with the same float tolerance as years. Garbage input
/// is a zero count at the call site, never a row failure.
fn parse_count(value: Option<&str>) -> Option<i64> {
    parse_numeric(value).map(|v| v as i64)
}

fn parse_numeric(value: Option<&str>) -> Option<f64> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Split a trailing parenthesized country code off an event name, e.g.
/// "Vasaloppet Ultra (SWE)" -> ("Vasaloppet Ultra", Some("SWE")).
pub fn split_event_name(raw_name: &str) -> (String, Option<String>) {
    let name = raw_name.trim();
    if name.ends_with(')') {
        if let Some(open) = name.rfind('(') {
            let candidate = name[open + 1..name.len() - 1].trim();
            let letters = candidate.chars().count();
            if (2..=3).contains(&letters) && candidate.chars().all(|c| c.is_alphabetic()) {
                return (name[..open].trim().to_string(), Some(candidate.to_uppercase()));
            }
        }
    }
    (name.to_string(), None)
}

/// Parse event dates expressed in the dataset's shorthand formats:
///
/// - `06.01.2018` (single day)
/// - `05.-06.01.2018` (same-month range)
/// - `23.03.-08.04.2018` (cross-month range)
/// - `28.12.-02.01.2019` (range crossing the year boundary)
pub fn parse_event_dates(
    label: &str,
    fallback_year: i32,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    let cleaned = trimmed
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "-")
        .replace(' ', "")
        .replace('/', ".");

    let parts: Vec<&str> = cleaned.split('-').collect();
    if parts.len() == 1 {
        let single = parse_date_fragment(parts[0], fallback_year, None);
        return (single, single);
    }

    let start_fragment = parts[0];
    let end_fragment = parts[parts.len() - 1];

    // The end fragment is most likely to carry the full day.month.year, so
    // parse it first and let the start fragment inherit from it.
    let end_date = parse_date_fragment(end_fragment, fallback_year, None);
    let start_date = parse_date_fragment(
        start_fragment,
        end_date.map(|d| d.year()).unwrap_or(fallback_year),
        end_date.map(|d| d.month()),
    );

    let start_date = match (start_date, end_date) {
        (Some(start), Some(end)) if start > end => {
            // Ranges like 28.12.-02.01.2019 cross the year boundary. If the
            // rewound date is not a valid calendar date, leave it as-is.
            Some(start.with_year(start.year() - 1).unwrap_or(start))
        }
        (start, _) => start,
    };

    match (start_date, end_date) {
        (Some(start), None) => (Some(start), Some(start)),
        (None, Some(end)) => (Some(end), Some(end)),
        other => other,
    }
}

/// Parse one `day[.month[.year]]` fragment. Missing parts inherit from the
/// paired fragment's month and the fallback year.
fn parse_date_fragment(
    fragment: &str,
    fallback_year: i32,
    inherit_month: Option<u32>,
) -> Option<NaiveDate> {
    let token = fragment.trim_matches('.');
    if token.is_empty() {
        return None;
    }

    let bits: Vec<&str> = token.split('.').filter(|part| !part.is_empty()).collect();

    let (day_txt, month_txt, year_txt) = match bits.len() {
        3 => (bits[0].to_string(), bits[1].to_string(), bits[2].to_string()),
        2 => (bits[0].to_string(), bits[1].to_string(), fallback_year.to_string()),
        1 => (
            bits[0].to_string(),
            inherit_month.unwrap_or(1).to_string(),
            fallback_year.to_string(),
        ),
        _ => return None,
    };

    let day = day_txt.parse::<u32>().ok()?;
    let month = month_txt.parse::<u32>().ok()?;
    let year = year_txt.parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

static DISTANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>\d+(?:\.\d+)?)(?P<unit>km|mi|h)$").unwrap());

/// Convert a distance label such as `42km`, `26.2mi`, or `6h` into
/// kilometers. Hour-based events keep their label for display but count as
/// zero kilometers. Returns `None` when the label is not a recognizable
/// distance at all.
pub fn parse_distance_km(label: &str) -> Option<Decimal> {
    let text = label.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let Some(captures) = DISTANCE_RE.captures(&text) else {
        // Labels like "24 hours" still mark a time-boxed event.
        if text.contains('h') {
            return Some(Decimal::ZERO);
        }
        return None;
    };

    let value: Decimal = captures["value"].parse().ok()?;
    match &captures["unit"] {
        "km" => Some(value),
        "mi" => Some(
            (value * Decimal::new(160_934, 5))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        ),
        _ => Some(Decimal::ZERO),
    }
}
