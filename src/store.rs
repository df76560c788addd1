//! # Resource Collection Store
//!
//! In-memory, process-lifetime collection backing the `/items` routes. The
//! store is an owned value injected into the dispatcher; the Worker entry point
//! keeps one instance per isolate. Contents are lost when the isolate is
//! recycled.
//!
//! A single mutex guards the map so mutations never interleave.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::errors::{AppError, AppResult};
use crate::models::{NewResource, Resource, ResourcePatch};

#[derive(Default)]
struct StoreState {
    items: HashMap<String, Resource>,
    last_id: i64,
}

impl StoreState {
    /// Millisecond timestamp, bumped past the last issued id so two creates
    /// in the same millisecond still get distinct ids.
    fn next_id(&mut self, now_ms: i64) -> String {
        self.last_id = now_ms.max(self.last_id + 1);
        self.last_id.to_string()
    }
}

#[derive(Default)]
pub struct ResourceStore {
    state: Mutex<StoreState>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All resources, ordered by id.
    pub fn list(&self) -> AppResult<Vec<Resource>> {
        let state = self.lock()?;
        let mut items: Vec<Resource> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.len().cmp(&b.id.len()).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    pub fn get(&self, id: &str) -> AppResult<Resource> {
        self.lock()?.items.get(id).cloned().ok_or_else(item_not_found)
    }

    /// Creates a resource. `name` and `price` are required; `description`
    /// defaults to empty and `tax` to absent.
    pub fn create(&self, fields: NewResource) -> AppResult<Resource> {
        self.create_at(fields, Utc::now().timestamp_millis())
    }

    fn create_at(&self, fields: NewResource, now_ms: i64) -> AppResult<Resource> {
        let missing: Vec<&str> = [
            ("name", fields.name.is_none()),
            ("price", fields.price.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        let (Some(name), Some(price)) = (fields.name, fields.price) else {
            return Err(AppError::BadRequest(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        };

        let mut state = self.lock()?;
        let resource = Resource {
            id: state.next_id(now_ms),
            name,
            description: fields.description.unwrap_or_default(),
            price,
            tax: fields.tax,
        };
        state.items.insert(resource.id.clone(), resource.clone());
        Ok(resource)
    }

    /// Merges the supplied fields into an existing resource.
    pub fn update(&self, id: &str, patch: ResourcePatch) -> AppResult<Resource> {
        let mut state = self.lock()?;
        let resource = state.items.get_mut(id).ok_or_else(item_not_found)?;
        resource.apply(patch);
        Ok(resource.clone())
    }

    pub fn delete(&self, id: &str) -> AppResult<()> {
        self.lock()?
            .items
            .remove(id)
            .map(|_| ())
            .ok_or_else(item_not_found)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("item store lock poisoned".to_string()))
    }
}

fn item_not_found() -> AppError {
    AppError::NotFound("item not found".to_string())
}
