//! In-memory relation source for tests.
//!
//! Names are registered through the builder methods and get sequential ids.
//! Call counters let tests assert how much of the graph was actually fetched.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{EntityId, RelatedEntity, RelationSource};

#[derive(Default)]
pub struct MockRelations {
    ids: HashMap<String, EntityId>,
    names: HashMap<EntityId, String>,
    related: HashMap<EntityId, Vec<RelatedEntity>>,
    delays: HashMap<EntityId, Duration>,
    default_delay: Option<Duration>,
    resolve_calls: AtomicUsize,
    related_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MockRelations {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_for(&mut self, name: &str) -> EntityId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = EntityId(self.ids.len() as u64 + 1);
        self.ids.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        id
    }

    /// Register `name` with `related` as its ranked related list.
    pub fn with_related(mut self, name: &str, related: &[&str]) -> Self {
        let id = self.id_for(name);
        let entries = related
            .iter()
            .map(|r| RelatedEntity {
                name: r.to_string(),
                id: self.id_for(r),
                popularity: Some(1_000),
            })
            .collect();
        self.related.insert(id, entries);
        self
    }

    /// Register a tree with `branching` unique children per node, `depth` levels
    /// below `root`. Child names are `"{parent}/{index}"`.
    pub fn with_tree(mut self, root: &str, branching: usize, depth: usize) -> Self {
        let mut frontier = vec![root.to_string()];
        for _ in 0..depth {
            let mut next = Vec::new();
            for parent in &frontier {
                let children: Vec<String> =
                    (0..branching).map(|i| format!("{}/{}", parent, i)).collect();
                let refs: Vec<&str> = children.iter().map(String::as_str).collect();
                self = self.with_related(parent, &refs);
                next.extend(children);
            }
            frontier = next;
        }
        self
    }

    /// Delay every related lookup for `name`.
    pub fn with_delay_for(mut self, name: &str, delay: Duration) -> Self {
        let id = self.id_for(name);
        self.delays.insert(id, delay);
        self
    }

    /// Delay every related lookup.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn related_calls(&self) -> usize {
        self.related_calls.load(Ordering::SeqCst)
    }

    /// Names whose related list was requested, in request order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationSource for MockRelations {
    async fn resolve(&self, name: &str) -> Option<EntityId> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.ids.get(name).copied()
    }

    async fn related(&self, id: EntityId) -> Vec<RelatedEntity> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(name) = self.names.get(&id) {
            self.fetched.lock().unwrap().push(name.clone());
        }
        if let Some(delay) = self.delays.get(&id).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.related.get(&id).cloned().unwrap_or_default()
    }
}
