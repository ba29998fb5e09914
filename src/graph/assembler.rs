//! Working set -> graph document. Pure, no I/O.

use std::collections::HashSet;

use super::{DocumentNode, Entity, GraphDocument, Relation};

/// Display size for a node at `depth`. Nodes near the root render larger.
pub fn size_for_depth(depth: usize) -> u32 {
    match depth {
        0 => 28,
        1 => 22,
        2 => 16,
        _ => 12,
    }
}

/// Assemble the graph document from a build's working set.
///
/// Node and link order follow the input order. Any link endpoint missing from
/// `nodes` is appended at level `max_depth + 1` (saturating), in the order the links first
/// reference it, so every link resolves to a node.
pub fn assemble(nodes: &[Entity], links: &[Relation], max_depth: usize) -> GraphDocument {
    let mut known: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    let mut out: Vec<DocumentNode> = nodes
        .iter()
        .map(|n| document_node(&n.name, n.depth))
        .collect();

    let unclassified = max_depth.saturating_add(1);
    for link in links {
        for endpoint in [link.source.as_str(), link.target.as_str()] {
            if known.insert(endpoint) {
                log::debug!("Backfilling edge-only node '{}' at level {}", endpoint, unclassified);
                out.push(document_node(endpoint, unclassified));
            }
        }
    }

    GraphDocument {
        nodes: out,
        links: links.to_vec(),
    }
}

fn document_node(name: &str, depth: usize) -> DocumentNode {
    DocumentNode {
        id: name.to_string(),
        group: depth,
        level: depth,
        size: size_for_depth(depth),
    }
}
