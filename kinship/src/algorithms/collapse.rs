use crate::error::{EditError, Entity};
use crate::graph::FamilyGraph;
use crate::model::{PersonId, RelationshipId};
use std::collections::{BTreeMap, BTreeSet};

/// The collapse root, its spouse, and every descendant with their spouses.
pub fn subtree(graph: &FamilyGraph, root: PersonId) -> BTreeSet<PersonId> {
    let adj = graph.adjacency();
    let mut hidden = BTreeSet::new();
    // A spouse can also be a descendant, so membership in `hidden` does not
    // mean the node's children were walked.
    let mut visited = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        hidden.insert(id);
        if let Some(s) = adj.spouse_of(id) {
            hidden.insert(s);
        }
        stack.extend(adj.children_of(id).iter().copied());
    }
    hidden
}

/// Hidden sets keyed by collapse root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollapseIndex {
    hidden: BTreeMap<PersonId, BTreeSet<PersonId>>,
}

impl CollapseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collapse(
        &mut self,
        graph: &FamilyGraph,
        root: PersonId,
    ) -> Result<&BTreeSet<PersonId>, EditError> {
        if graph.person(root).is_none() {
            tracing::warn!(person = root.0, "collapse requested for a missing person");
            return Err(EditError::NotFound(Entity::Person(root)));
        }
        let slot = self.hidden.entry(root).or_default();
        *slot = subtree(graph, root);
        Ok(slot)
    }

    /// Forget the hidden set of `root`. False when it was not collapsed.
    pub fn expand(&mut self, root: PersonId) -> bool {
        self.hidden.remove(&root).is_some()
    }

    pub fn is_collapsed(&self, root: PersonId) -> bool {
        self.hidden.contains_key(&root)
    }

    pub fn roots(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.hidden.keys().copied()
    }

    pub fn hidden_by(&self, root: PersonId) -> Option<&BTreeSet<PersonId>> {
        self.hidden.get(&root)
    }

    /// Union of every active hidden set.
    pub fn hidden(&self) -> BTreeSet<PersonId> {
        self.hidden.values().flatten().copied().collect()
    }

    pub fn is_hidden(&self, id: PersonId) -> bool {
        self.hidden.values().any(|s| s.contains(&id))
    }

    pub fn visible_persons(&self, graph: &FamilyGraph) -> Vec<PersonId> {
        let hidden = self.hidden();
        graph
            .persons()
            .map(|p| p.id)
            .filter(|id| !hidden.contains(id))
            .collect()
    }

    /// Relationships with at least one hidden endpoint; drawn greyed out.
    pub fn dimmed_relationships(&self, graph: &FamilyGraph) -> Vec<RelationshipId> {
        let hidden = self.hidden();
        graph
            .relationships()
            .filter(|r| hidden.contains(&r.from) || hidden.contains(&r.to))
            .map(|r| r.id)
            .collect()
    }

    /// Recompute every hidden set against a new graph version; roots that
    /// no longer exist are dropped.
    pub fn refresh(&mut self, graph: &FamilyGraph) {
        self.hidden.retain(|root, _| graph.person(*root).is_some());
        for (root, set) in self.hidden.iter_mut() {
            *set = subtree(graph, *root);
        }
    }

    pub fn clear(&mut self) {
        self.hidden.clear();
    }
}
