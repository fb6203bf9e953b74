use crate::error::{ImportError, Result};
use crate::types::{Category, Event, EventStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Storage abstraction the importer writes through.
///
/// Implementations own transactional behavior: one event's field update and
/// its category links are expected to be applied atomically, so a failure
/// partway through one event's write never leaves it linked to a partial
/// category set.
#[async_trait]
pub trait Storage: Send + Sync {
    // Event operations
    async fn create_event(&self, event: &mut Event) -> Result<()>;
    /// All events sharing a title, oldest first. Imports key on title, so
    /// duplicates can exist from earlier manual edits; the first entry is
    /// the canonical one.
    async fn get_events_by_title(&self, title: &str) -> Result<Vec<Event>>;
    async fn update_event(&self, event: &Event) -> Result<()>;
    async fn set_event_categories(&self, event_id: Uuid, category_ids: &[Uuid]) -> Result<()>;

    // Category operations
    async fn create_category(&self, category: &mut Category) -> Result<()>;
    async fn get_category_by_label(&self, label: &str) -> Result<Option<Category>>;
    async fn update_category_distance(&self, category_id: Uuid, distance_km: Decimal) -> Result<()>;

    /// The event a category belongs to, when that is unambiguous. A category
    /// can be linked from many events; this returns Some only when exactly
    /// one non-completed event references it, and None otherwise.
    async fn active_event_for_category(&self, category_id: Uuid) -> Result<Option<Event>>;
}

/// In-memory storage implementation for development/testing
pub struct InMemoryStorage {
    events: Arc<Mutex<HashMap<Uuid, Event>>>,
    categories: Arc<Mutex<HashMap<Uuid, Category>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(HashMap::new())),
            categories: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_event(&self, event: &mut Event) -> Result<()> {
        let id = Uuid::new_v4();
        event.id = Some(id);

        let mut events = self.events.lock().unwrap();
        events.insert(id, event.clone());

        debug!("Created event: {} with id {}", event.title, id);
        Ok(())
    }

    async fn get_events_by_title(&self, title: &str) -> Result<Vec<Event>> {
        let events = self.events.lock().unwrap();
        let mut matches: Vec<Event> = events
            .values()
            .filter(|e| e.title == title)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let event_id = event.id.ok_or_else(|| ImportError::Storage {
            message: "Cannot update event without ID".to_string(),
        })?;

        let mut events = self.events.lock().unwrap();
        events.insert(event_id, event.clone());

        debug!("Updated event: {} with id {}", event.title, event_id);
        Ok(())
    }

    async fn set_event_categories(&self, event_id: Uuid, category_ids: &[Uuid]) -> Result<()> {
        let mut events = self.events.lock().unwrap();
        let event = events.get_mut(&event_id).ok_or_else(|| ImportError::Storage {
            message: format!("Cannot link categories to unknown event {event_id}"),
        })?;
        event.category_ids = category_ids.to_vec();

        debug!("Linked {} categories to event {}", category_ids.len(), event_id);
        Ok(())
    }

    async fn create_category(&self, category: &mut Category) -> Result<()> {
        let id = Uuid::new_v4();
        category.id = Some(id);

        let mut categories = self.categories.lock().unwrap();
        categories.insert(id, category.clone());

        debug!("Created category: {} with id {}", category.display_name, id);
        Ok(())
    }

    async fn get_category_by_label(&self, label: &str) -> Result<Option<Category>> {
        let categories = self.categories.lock().unwrap();
        let category = categories
            .values()
            .find(|c| c.display_name == label)
            .cloned();
        Ok(category)
    }

    async fn update_category_distance(
        &self,
        category_id: Uuid,
        distance_km: Decimal,
    ) -> Result<()> {
        let mut categories = self.categories.lock().unwrap();
        let category = categories
            .get_mut(&category_id)
            .ok_or_else(|| ImportError::Storage {
                message: format!("Cannot update unknown category {category_id}"),
            })?;
        category.distance_km = distance_km;

        debug!("Updated category {} distance to {}", category_id, distance_km);
        Ok(())
    }

    async fn active_event_for_category(&self, category_id: Uuid) -> Result<Option<Event>> {
        let events = self.events.lock().unwrap();
        let mut active: Vec<&Event> = events
            .values()
            .filter(|e| {
                e.status != EventStatus::Completed && e.category_ids.contains(&category_id)
            })
            .collect();

        // More than one active event sharing the category is ambiguous;
        // callers get None rather than an arbitrary winner.
        if active.len() == 1 {
            Ok(active.pop().cloned())
        } else {
            Ok(None)
        }
    }
}
