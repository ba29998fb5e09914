//! Bounded concurrent crawl of the relation API.
//!
//! A build resolves the root, then explores outward: every explored node
//! fetches its related list, merges it into the shared working set in one
//! critical section, and explores the children it admitted concurrently,
//! awaiting all of them before returning. Children are plain futures joined
//! inside the parent, so dropping the build future cancels the whole tree.
//!
//! Merge rules, applied under the working-set lock:
//! - the first admission of a name fixes its depth; later sightings only add an edge
//! - no node is admitted once `max_nodes` is reached; the rest of that list is skipped
//! - nodes at `max_depth` are recorded but never fetched (no outgoing edges)

use futures_util::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{assemble, Entity, GraphDocument, Relation};
use crate::cache::{normalize_key, GraphCacheStore};
use crate::error::{DigfyError, Result};
use crate::relations::{EntityId, RelatedEntity, RelationSource};

/// Number of top-ranked related entities followed per node
pub const DEFAULT_RELATED_LIMIT: usize = 5;

/// Depth and size bounds for one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    /// Deepest level that is recorded; nodes here are not expanded.
    pub max_depth: usize,
    /// Hard cap on distinct nodes in the document.
    pub max_nodes: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_nodes: 60,
        }
    }
}

impl CrawlLimits {
    /// Limits with defaults for whatever is not given
    pub fn new(max_depth: Option<usize>, max_nodes: Option<usize>) -> Self {
        let defaults = Self::default();
        Self {
            max_depth: max_depth.unwrap_or(defaults.max_depth),
            max_nodes: max_nodes.unwrap_or(defaults.max_nodes),
        }
    }
}

/// Lifecycle of a single build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    ResolvingRoot,
    Exploring,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::ResolvingRoot => "resolving-root",
            BuildPhase::Exploring => "exploring",
            BuildPhase::Finalizing => "finalizing",
            BuildPhase::Done => "done",
            BuildPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs phase transitions of one build
struct PhaseTracker<'a> {
    root: &'a str,
    phase: BuildPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(root: &'a str) -> Self {
        Self {
            root,
            phase: BuildPhase::Idle,
        }
    }

    fn advance(&mut self, next: BuildPhase) {
        log::debug!("Build '{}': {} -> {}", self.root, self.phase, next);
        self.phase = next;
    }
}

/// A child admitted during a merge, still to be explored
struct Admitted {
    name: String,
    id: EntityId,
}

/// Working set shared by all branches of one build
#[derive(Default)]
struct CrawlState {
    nodes: Vec<Entity>,
    index: HashMap<String, usize>,
    links: Vec<Relation>,
}

/// Per-build crawl context. Never shared across builds.
struct Crawl {
    limits: CrawlLimits,
    related_limit: usize,
    state: Mutex<CrawlState>,
}

impl Crawl {
    fn new(limits: CrawlLimits, related_limit: usize) -> Self {
        Self {
            limits,
            related_limit,
            state: Mutex::new(CrawlState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn admit_root(&self, name: &str, id: EntityId) {
        let mut state = self.lock();
        let slot = state.nodes.len();
        state.index.insert(name.to_string(), slot);
        state.nodes.push(Entity {
            name: name.to_string(),
            external_id: Some(id),
            depth: 0,
            popularity: None,
        });
    }

    /// Merge `parent`'s related list into the working set.
    ///
    /// Returns the children admitted here that still need their own lookup.
    fn merge(&self, parent: &str, depth: usize, related: Vec<RelatedEntity>) -> Vec<Admitted> {
        let child_depth = depth + 1;
        let mut admitted = Vec::new();
        let mut skipped = 0usize;
        let mut state = self.lock();

        for candidate in related.into_iter().take(self.related_limit) {
            if state.index.contains_key(&candidate.name) {
                state.links.push(Relation::new(parent, candidate.name));
                continue;
            }
            // Budget spent: drop the newcomer, but keep scanning for known nodes
            if state.nodes.len() >= self.limits.max_nodes {
                skipped += 1;
                continue;
            }

            log::debug!(
                "Admitting '{}' at depth {} (fans: {})",
                candidate.name,
                child_depth,
                candidate
                    .popularity
                    .map_or_else(|| "unknown".to_string(), |p| p.to_string())
            );
            let slot = state.nodes.len();
            state.index.insert(candidate.name.clone(), slot);
            state.nodes.push(Entity {
                name: candidate.name.clone(),
                external_id: Some(candidate.id),
                depth: child_depth,
                popularity: candidate.popularity,
            });
            state
                .links
                .push(Relation::new(parent, candidate.name.clone()));

            if child_depth < self.limits.max_depth {
                admitted.push(Admitted {
                    name: candidate.name,
                    id: candidate.id,
                });
            }
        }

        if skipped > 0 {
            log::debug!(
                "Node budget of {} reached while expanding '{}'; {} candidates dropped",
                self.limits.max_nodes,
                parent,
                skipped
            );
        }

        admitted
    }

    fn into_parts(self) -> (Vec<Entity>, Vec<Relation>) {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        (state.nodes, state.links)
    }
}

/// Builds related-entity graphs, serving repeat roots from the cache
pub struct GraphBuilder {
    relations: Arc<dyn RelationSource>,
    cache: Arc<dyn GraphCacheStore>,
    related_limit: usize,
}

impl GraphBuilder {
    /// Create a builder over a relation source and a cache store
    pub fn new(relations: Arc<dyn RelationSource>, cache: Arc<dyn GraphCacheStore>) -> Self {
        Self {
            relations,
            cache,
            related_limit: DEFAULT_RELATED_LIMIT,
        }
    }

    /// Follow the top `limit` related entities per node instead of the default
    pub fn with_related_limit(mut self, limit: usize) -> Self {
        self.related_limit = limit.max(1);
        self
    }

    /// Build (or fetch from cache) the graph rooted at `root_name`.
    ///
    /// Only an unresolvable root fails the build; upstream failures below the
    /// root just make the graph sparser. The cache key is the normalized root
    /// name alone, so a hit is returned whatever `limits` are requested.
    pub async fn build_graph(&self, root_name: &str, limits: CrawlLimits) -> Result<GraphDocument> {
        let root_name = root_name.trim();
        if root_name.is_empty() {
            return Err(DigfyError::InvalidInput("root name must not be empty".to_string()));
        }
        if limits.max_nodes == 0 {
            return Err(DigfyError::InvalidInput("max_nodes must be at least 1".to_string()));
        }

        let key = normalize_key(root_name);
        if let Some(document) = self.cache.get(&key).await {
            log::info!("Serving '{}' from cache ({} nodes)", root_name, document.nodes.len());
            return Ok(document);
        }

        let mut phase = PhaseTracker::new(root_name);
        phase.advance(BuildPhase::ResolvingRoot);
        let root_id = match self.relations.resolve(root_name).await {
            Some(id) => id,
            None => {
                phase.advance(BuildPhase::Failed);
                return Err(DigfyError::EntityNotFound(root_name.to_string()));
            }
        };

        phase.advance(BuildPhase::Exploring);
        let start = std::time::Instant::now();
        let crawl = Crawl::new(limits, self.related_limit);
        crawl.admit_root(root_name, root_id);
        if limits.max_depth > 0 {
            self.explore(&crawl, root_name.to_string(), root_id, 0).await;
        }

        phase.advance(BuildPhase::Finalizing);
        let (nodes, links) = crawl.into_parts();
        let document = assemble(&nodes, &links, limits.max_depth);
        log::info!(
            "Built graph for '{}': {} nodes, {} links in {:?}",
            root_name,
            document.nodes.len(),
            document.links.len(),
            start.elapsed()
        );

        if let Err(e) = self.cache.put(&key, &document).await {
            log::warn!("Failed to cache graph for '{}': {}", root_name, e);
        }

        phase.advance(BuildPhase::Done);
        Ok(document)
    }

    /// [`build_graph`](Self::build_graph) with a deadline.
    ///
    /// On expiry every in-flight lookup is dropped and nothing is cached.
    pub async fn build_graph_within(
        &self,
        root_name: &str,
        limits: CrawlLimits,
        timeout: Duration,
    ) -> Result<GraphDocument> {
        match tokio::time::timeout(timeout, self.build_graph(root_name, limits)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Build for '{}' cancelled after {:?}", root_name.trim(), timeout);
                Err(DigfyError::BuildTimedOut(timeout))
            }
        }
    }

    /// Expand one node and, concurrently, every child it admitted
    fn explore<'a>(
        &'a self,
        crawl: &'a Crawl,
        name: String,
        id: EntityId,
        depth: usize,
    ) -> BoxFuture<'a, ()> {
        async move {
            let related = self.relations.related(id).await;
            let children = crawl.merge(&name, depth, related);

            join_all(
                children
                    .into_iter()
                    .map(|child| self.explore(crawl, child.name, child.id, depth + 1)),
            )
            .await;
        }
        .boxed()
    }
}
