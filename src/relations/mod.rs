//! Remote relation API: name resolution and related-entity lookup.
//!
//! [`RelationSource`] is the seam the graph builder crawls through. Both calls
//! are infallible by contract: every upstream failure collapses to "not found"
//! or "no related entities" inside the implementation.

mod deezer;
#[cfg(test)]
pub(crate) mod mock;

pub use deezer::DeezerClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the relation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a related-entities list, in the API's ranking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedEntity {
    pub name: String,
    pub id: EntityId,
    pub popularity: Option<u64>,
}

#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Resolve a name to the first matching identifier.
    async fn resolve(&self, name: &str) -> Option<EntityId>;

    /// Ranked related entities for `id`; empty on any failure.
    async fn related(&self, id: EntityId) -> Vec<RelatedEntity>;
}
