//! Widget fixtures and a live in-memory store for decorator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_core::{CacheEntity, EntityStore};
use strata_domain::{ChangeKind, QueryDescription, QueryResult, Result};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
}

impl Widget {
    pub fn named(name: &str) -> Self {
        Self { id: Uuid::new_v4(), name: name.to_string() }
    }
}

impl CacheEntity for Widget {
    const ENTITY_TYPE: &'static str = "Widget";

    fn cache_id(&self) -> String {
        self.id.to_string()
    }
}

/// Store over a vec of widgets, so saved rows show up in later queries the
/// way a real database would.
#[derive(Default)]
pub struct WidgetStore {
    rows: Mutex<Vec<Widget>>,
    query_count: AtomicUsize,
}

impl WidgetStore {
    pub fn seeded(count: usize) -> Self {
        let rows = (1..=count).map(|n| Widget::named(&format!("widget-{n}"))).collect();
        Self { rows: Mutex::new(rows), query_count: AtomicUsize::new(0) }
    }

    /// Number of queries that reached the store.
    pub fn queries(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore<Widget> for WidgetStore {
    async fn query(&self, query: &QueryDescription) -> Result<QueryResult<Widget>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        let mut page = rows.clone();
        if query.sort_field.as_deref() == Some("Name") {
            page.sort_by(|a, b| a.name.cmp(&b.name));
        }
        page.truncate(query.page_size as usize);
        let mut result = QueryResult::new(page, rows.len() as u64);
        result.is_sorted = query.sort_field.is_some();
        Ok(result)
    }

    async fn save(&self, entity: &Widget, change: ChangeKind) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match change {
            ChangeKind::Added => rows.push(entity.clone()),
            ChangeKind::Updated => {
                if let Some(existing) = rows.iter_mut().find(|row| row.id == entity.id) {
                    *existing = entity.clone();
                }
            }
        }
        Ok(true)
    }

    async fn delete(&self, entities: &[Widget]) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|row| !entities.iter().any(|gone| gone.id == row.id));
        Ok(true)
    }

    async fn reset_session(&self) {}
}
