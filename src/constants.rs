/// Shared names and lookup tables used across the importer.
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Default dataset filename, resolved relative to the working directory.
pub const DEFAULT_CSV_FILE: &str = "TWO_CENTURIES_OF_UM_RACES.csv";

/// Optional configuration file read at startup.
pub const CONFIG_FILE: &str = "config.toml";

/// Display names for the country codes that appear in the dataset. Codes
/// missing from this table pass through uppercased.
static COUNTRY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ARG", "Argentina"),
        ("AUS", "Australia"),
        ("AUT", "Austria"),
        ("BEL", "Belgium"),
        ("BRA", "Brazil"),
        ("CAN", "Canada"),
        ("CHE", "Switzerland"),
        ("CHI", "Chile"),
        ("CHN", "China"),
        ("CZE", "Czech Republic"),
        ("DEU", "Germany"),
        ("DNK", "Denmark"),
        ("ESP", "Spain"),
        ("EST", "Estonia"),
        ("FIN", "Finland"),
        ("FRA", "France"),
        ("GBR", "United Kingdom"),
        ("HUN", "Hungary"),
        ("IRL", "Ireland"),
        ("ITA", "Italy"),
        ("JPN", "Japan"),
        ("MEX", "Mexico"),
        ("NED", "Netherlands"),
        ("NOR", "Norway"),
        ("NZL", "New Zealand"),
        ("POL", "Poland"),
        ("PRT", "Portugal"),
        ("ROU", "Romania"),
        ("SWE", "Sweden"),
        ("USA", "United States"),
    ])
});

/// Resolve a country code to its display name. A missing code maps to the
/// literal "Unknown".
pub fn country_display_name(code: Option<&str>) -> String {
    match code {
        Some(raw) => {
            let normalized = raw.trim().to_uppercase();
            COUNTRY_NAMES
                .get(normalized.as_str())
                .map(|name| name.to_string())
                .unwrap_or(normalized)
        }
        None => "Unknown".to_string(),
    }
}
