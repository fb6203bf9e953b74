//! Distance label to category resolution.
//!
//! Each distinct label ("42km", "6h", "50mi") maps to one category record.
//! The resolver caches lookups for the duration of a run and heals
//! categories whose distance was recorded as zero before their label became
//! parseable.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ImportError, Result};
use crate::normalize::parse_distance_km;
use crate::storage::Storage;
use crate::types::Category;

const MAX_SLUG_LEN: usize = 100;

/// Resolves distance labels to category records, caching results for the
/// duration of one import run.
pub struct CategoryResolver {
    cache: HashMap<String, Category>,
}

impl CategoryResolver {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Resolve every label to a category, creating missing ones. Labels are
    /// processed in lexicographic order so creation order is stable.
    pub async fn resolve(
        &mut self,
        labels: &BTreeSet<String>,
        storage: &dyn Storage,
    ) -> Result<Vec<Category>> {
        let mut categories = Vec::with_capacity(labels.len());
        for label in labels {
            if let Some(cached) = self.cache.get(label) {
                categories.push(cached.clone());
                continue;
            }

            let category = self.resolve_label(label, storage).await?;
            self.cache.insert(label.clone(), category.clone());
            categories.push(category);
        }
        Ok(categories)
    }

    async fn resolve_label(&self, label: &str, storage: &dyn Storage) -> Result<Category> {
        let distance_km = parse_distance_km(label);
        let distance_value = distance_km
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        if let Some(mut existing) = storage.get_category_by_label(label).await? {
            // Heal categories stored before their label had a parseable
            // distance. A non-zero stored distance is never overwritten.
            if distance_km.is_some() && existing.distance_km == Decimal::ZERO {
                let category_id = existing_id(&existing)?;
                storage
                    .update_category_distance(category_id, distance_value)
                    .await?;
                existing.distance_km = distance_value;
                debug!("Healed category {} distance to {}", label, distance_value);
            }
            return Ok(existing);
        }

        let mut category = Category {
            id: None,
            display_name: label.to_string(),
            name: slugify_label(label),
            distance_km: distance_value,
            created_at: Utc::now(),
        };
        storage.create_category(&mut category).await?;
        info!("Created category: {}", label);
        Ok(category)
    }
}

impl Default for CategoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn existing_id(category: &Category) -> Result<Uuid> {
    category.id.ok_or_else(|| ImportError::Storage {
        message: format!("Category '{}' has no ID", category.display_name),
    })
}

/// Slug-safe short name for a category. Labels that sanitize to nothing
/// fall back to a digest-based synthetic name.
fn slugify_label(label: &str) -> String {
    let slug = slugify(label);
    if !slug.is_empty() {
        return truncate(slug);
    }

    let slug = slugify(&label.replace(':', "-"));
    if !slug.is_empty() {
        return truncate(slug);
    }

    let digest = Sha256::digest(label.as_bytes());
    format!("distance-{}", &hex::encode(digest)[..12])
}

fn slugify(value: &str) -> String {
    let kept: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .trim_matches('-')
        .to_string()
}

fn truncate(slug: String) -> String {
    slug.chars().take(MAX_SLUG_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn labels(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_slugify_label() {
        assert_eq!(slugify_label("42km"), "42km");
        assert_eq!(slugify_label("24 Hour Track"), "24-hour-track");
        assert!(slugify_label("???").starts_with("distance-"));
    }

    #[tokio::test]
    async fn test_resolver_creates_then_caches() {
        let storage = InMemoryStorage::new();
        let mut resolver = CategoryResolver::new();

        let first = resolver.resolve(&labels(&["42km"]), &storage).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].distance_km, Decimal::new(42, 0));

        // Second resolution returns the same record without a new create.
        let second = resolver.resolve(&labels(&["42km"]), &storage).await.unwrap();
        assert_eq!(second[0].id, first[0].id);
    }

    #[tokio::test]
    async fn test_resolution_order_is_lexicographic() {
        let storage = InMemoryStorage::new();
        let mut resolver = CategoryResolver::new();

        let resolved = resolver
            .resolve(&labels(&["50mi", "100km", "42km"]), &storage)
            .await
            .unwrap();
        let names: Vec<&str> = resolved.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, ["100km", "42km", "50mi"]);
    }

    #[tokio::test]
    async fn test_zero_distance_category_heals() {
        let storage = InMemoryStorage::new();

        let mut placeholder = Category {
            id: None,
            display_name: "50km".to_string(),
            name: "50km".to_string(),
            distance_km: Decimal::ZERO,
            created_at: Utc::now(),
        };
        storage.create_category(&mut placeholder).await.unwrap();

        let mut resolver = CategoryResolver::new();
        let resolved = resolver.resolve(&labels(&["50km"]), &storage).await.unwrap();
        assert_eq!(resolved[0].id, placeholder.id);
        assert_eq!(resolved[0].distance_km, Decimal::new(50, 0));

        let stored = storage.get_category_by_label("50km").await.unwrap().unwrap();
        assert_eq!(stored.distance_km, Decimal::new(50, 0));
    }

    #[tokio::test]
    async fn test_nonzero_distance_is_never_overwritten() {
        let storage = InMemoryStorage::new();

        let mut existing = Category {
            id: None,
            display_name: "42km".to_string(),
            name: "42km".to_string(),
            distance_km: Decimal::new(4219, 2),
            created_at: Utc::now(),
        };
        storage.create_category(&mut existing).await.unwrap();

        let mut resolver = CategoryResolver::new();
        let resolved = resolver.resolve(&labels(&["42km"]), &storage).await.unwrap();
        assert_eq!(resolved[0].distance_km, Decimal::new(4219, 2));
    }

    #[tokio::test]
    async fn test_unparseable_label_defaults_to_zero_distance() {
        let storage = InMemoryStorage::new();
        let mut resolver = CategoryResolver::new();

        let resolved = resolver
            .resolve(&labels(&["vertical mile"]), &storage)
            .await
            .unwrap();
        assert_eq!(resolved[0].distance_km, Decimal::ZERO);
    }
}
