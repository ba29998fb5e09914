//! Related-entity graph: data model, crawl engine and document assembly.
//!
//! The builder explores the relation API outward from a root entity and keeps
//! a working set of [`Entity`] and [`Relation`] values; the assembler turns that
//! working set into the [`GraphDocument`] that is cached and returned.

mod assembler;
mod builder;

pub use assembler::{assemble, size_for_depth};
pub use builder::{BuildPhase, CrawlLimits, GraphBuilder, DEFAULT_RELATED_LIMIT};

use serde::{Deserialize, Serialize};

use crate::relations::EntityId;

/// A node in the working set of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Display name as returned by the API; the dedup key.
    pub name: String,
    /// Identifier resolved from the relation API. `None` for endpoints that
    /// were only ever seen on an edge.
    pub external_id: Option<EntityId>,
    /// First-discovery depth from the root (root = 0). Never lowered.
    pub depth: usize,
    /// Fan count reported by the API, when known.
    pub popularity: Option<u64>,
}

/// A discovery edge (parent --> child). Rendered undirected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
}

impl Relation {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A node as emitted in the graph document.
///
/// `group` and `level` both carry the depth; consumers read either one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    pub group: usize,
    pub level: usize,
    pub size: u32,
}

/// Finished graph, in discovery order. This is what the cache stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<DocumentNode>,
    pub links: Vec<Relation>,
}

impl GraphDocument {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&DocumentNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Links whose source is `id`.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.links.iter().filter(move |l| l.source == id)
    }

    /// Nodes recorded at the given level.
    pub fn nodes_at_level(&self, level: usize) -> impl Iterator<Item = &DocumentNode> + '_ {
        self.nodes.iter().filter(move |n| n.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphDocument {
        GraphDocument {
            nodes: vec![
                DocumentNode {
                    id: "Daft Punk".into(),
                    group: 0,
                    level: 0,
                    size: 28,
                },
                DocumentNode {
                    id: "Justice".into(),
                    group: 1,
                    level: 1,
                    size: 22,
                },
            ],
            links: vec![Relation::new("Daft Punk", "Justice")],
        }
    }

    #[test]
    fn test_document_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nodes": [
                    {"id": "Daft Punk", "group": 0, "level": 0, "size": 28},
                    {"id": "Justice", "group": 1, "level": 1, "size": 22}
                ],
                "links": [{"source": "Daft Punk", "target": "Justice"}]
            })
        );
    }

    #[test]
    fn test_document_lookups() {
        let doc = sample();
        assert_eq!(doc.node("Justice").map(|n| n.size), Some(22));
        assert!(doc.node("Air").is_none());
        assert_eq!(doc.outgoing("Daft Punk").count(), 1);
        assert_eq!(doc.outgoing("Justice").count(), 0);
        assert_eq!(doc.nodes_at_level(1).count(), 1);
    }
}
