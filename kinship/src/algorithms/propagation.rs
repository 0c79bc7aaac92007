//! Derivation of the edges a new parent-child link implies.
//!
//! Rules are plain functions listed in a fixed-order table. Each one reads the
//! graph as left by the previous rule and proposes `(parent, child)` pairs;
//! [`propagate`] validates and inserts them.

use crate::algorithms::validate::validate;
use crate::config::ValidationConfig;
use crate::graph::FamilyGraph;
use crate::model::{PersonId, Relationship, RelationshipKind};
use std::collections::BTreeSet;

/// A parent-child link oriented by generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentChildEdit {
    pub parent: PersonId,
    pub child: PersonId,
}

pub type Rule = fn(&FamilyGraph, &ParentChildEdit) -> Vec<(PersonId, PersonId)>;

pub struct NamedRule {
    pub name: &'static str,
    pub apply: Rule,
}

pub const ON_PARENT_CHILD_ADDED: &[NamedRule] = &[
    NamedRule {
        name: "spouse_as_parent",
        apply: propagate_spouse_as_parent,
    },
    NamedRule {
        name: "siblings_to_new_parent",
        apply: propagate_siblings_to_new_parent,
    },
];

/// Decide which of two people is the parent: the lower generation.
pub fn orient(graph: &FamilyGraph, a: PersonId, b: PersonId) -> Option<ParentChildEdit> {
    let (pa, pb) = (graph.person(a)?, graph.person(b)?);
    if pa.generation < pb.generation {
        Some(ParentChildEdit {
            parent: a,
            child: b,
        })
    } else if pb.generation < pa.generation {
        Some(ParentChildEdit {
            parent: b,
            child: a,
        })
    } else {
        None
    }
}

/// The parent's spouse becomes a parent of the child too.
pub fn propagate_spouse_as_parent(
    graph: &FamilyGraph,
    edit: &ParentChildEdit,
) -> Vec<(PersonId, PersonId)> {
    let adj = graph.adjacency();
    match adj.spouse_of(edit.parent) {
        Some(spouse) if !adj.has_parent(edit.child, spouse) => vec![(spouse, edit.child)],
        _ => Vec::new(),
    }
}

/// Every existing sibling of the child gets the new parent (and that
/// parent's spouse) as well.
pub fn propagate_siblings_to_new_parent(
    graph: &FamilyGraph,
    edit: &ParentChildEdit,
) -> Vec<(PersonId, PersonId)> {
    let adj = graph.adjacency();
    let spouse = adj.spouse_of(edit.parent);
    let mut out = Vec::new();
    for sib in sibling_set(graph, edit) {
        if !adj.has_parent(sib, edit.parent) {
            out.push((edit.parent, sib));
        }
        if let Some(s) = spouse {
            if !adj.has_parent(sib, s) {
                out.push((s, sib));
            }
        }
    }
    out
}

/// People sharing a parent with the child, explicit sibling links, and the
/// children of the parent's spouse. Sorted for a stable derivation order.
pub fn sibling_set(graph: &FamilyGraph, edit: &ParentChildEdit) -> BTreeSet<PersonId> {
    let adj = graph.adjacency();
    let mut set: BTreeSet<PersonId> = BTreeSet::new();
    for p in adj.parents_of(edit.child) {
        set.extend(adj.children_of(*p).iter().copied());
    }
    set.extend(adj.siblings_of(edit.child).iter().copied());
    if let Some(s) = adj.spouse_of(edit.parent) {
        set.extend(adj.children_of(s).iter().copied());
    }
    set.remove(&edit.child);
    set
}

/// Run the rule table against `graph`, which already holds the primary edge.
/// Returns the derived relationships in insertion order.
pub fn propagate(
    graph: &mut FamilyGraph,
    edit: ParentChildEdit,
    cfg: &ValidationConfig,
) -> Vec<Relationship> {
    let mut added = Vec::new();
    for rule in ON_PARENT_CHILD_ADDED {
        for (from, to) in (rule.apply)(graph, &edit) {
            let v = validate(graph, from, to, RelationshipKind::ParentChild, cfg);
            if !v.is_ok() {
                tracing::debug!(rule = rule.name, from = from.0, to = to.0, reason = %v, "skipped derived edge");
                continue;
            }
            let rel = Relationship {
                id: graph.alloc_relationship_id(),
                kind: RelationshipKind::ParentChild,
                from,
                to,
            };
            graph.insert_relationship(rel);
            tracing::debug!(rule = rule.name, from = from.0, to = to.0, "derived edge");
            added.push(rel);
        }
    }
    added
}
