use crate::error::{EditError, Entity};
use crate::graph::{FamilyGraph, SlotChange};
use crate::model::{Person, PersonId, Profile, Relationship};
use serde::Serialize;
use std::collections::VecDeque;

/// One undoable graph mutation, carrying enough data to replay or revert it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    AddPerson {
        person: Person,
    },
    /// Holds every relationship that touched the person.
    DeletePerson {
        person: Person,
        relationships: Vec<Relationship>,
    },
    MovePerson {
        changes: Vec<SlotChange>,
    },
    MoveSpousePair {
        changes: [SlotChange; 2],
    },
    /// The explicit edge, the edges propagated from it and any slot changes
    /// made to seat a new couple. Undone as one unit.
    AddRelationship {
        primary: Relationship,
        propagated: Vec<Relationship>,
        moves: Vec<SlotChange>,
    },
    DeleteRelationship {
        relationship: Relationship,
    },
    UpdateProfile {
        person: PersonId,
        before: Profile,
        after: Profile,
    },
    Batch {
        actions: Vec<Action>,
    },
}

fn missing_person(id: PersonId) -> EditError {
    tracing::warn!(person = id.0, "history references a missing person");
    EditError::NotFound(Entity::Person(id))
}

fn apply_changes(graph: &mut FamilyGraph, changes: &[SlotChange]) -> Result<(), EditError> {
    for c in changes {
        if !graph.apply_slot_change(c) {
            return Err(missing_person(c.person));
        }
    }
    Ok(())
}

fn revert_changes(graph: &mut FamilyGraph, changes: &[SlotChange]) -> Result<(), EditError> {
    for c in changes.iter().rev() {
        if !graph.apply_slot_change(&c.inverse()) {
            return Err(missing_person(c.person));
        }
    }
    Ok(())
}

impl Action {
    /// Re-apply the mutation.
    pub fn apply(&self, graph: &mut FamilyGraph) -> Result<(), EditError> {
        match self {
            Action::AddPerson { person } => {
                graph.insert_person(person.clone());
            }
            Action::DeletePerson { person, .. } => {
                graph
                    .remove_person(person.id)
                    .ok_or_else(|| missing_person(person.id))?;
            }
            Action::MovePerson { changes } => apply_changes(graph, changes)?,
            Action::MoveSpousePair { changes } => apply_changes(graph, changes)?,
            Action::AddRelationship {
                primary,
                propagated,
                moves,
            } => {
                apply_changes(graph, moves)?;
                graph.insert_relationship(*primary);
                for r in propagated {
                    graph.insert_relationship(*r);
                }
            }
            Action::DeleteRelationship { relationship } => {
                graph
                    .remove_relationship(relationship.id)
                    .ok_or(EditError::NotFound(Entity::Relationship(relationship.id)))?;
            }
            Action::UpdateProfile { person, after, .. } => {
                graph
                    .set_profile(*person, after.clone())
                    .ok_or_else(|| missing_person(*person))?;
            }
            Action::Batch { actions } => {
                for a in actions {
                    a.apply(graph)?;
                }
            }
        }
        Ok(())
    }

    /// Apply the inverse. Id counters are rewound so the graph compares
    /// equal to the version before the action.
    pub fn revert(&self, graph: &mut FamilyGraph) -> Result<(), EditError> {
        match self {
            Action::AddPerson { person } => {
                graph
                    .remove_person(person.id)
                    .ok_or_else(|| missing_person(person.id))?;
                graph.rewind_person_ids(person.id.0);
            }
            Action::DeletePerson {
                person,
                relationships,
            } => {
                graph.insert_person(person.clone());
                for r in relationships {
                    graph.insert_relationship(*r);
                }
            }
            Action::MovePerson { changes } => revert_changes(graph, changes)?,
            Action::MoveSpousePair { changes } => revert_changes(graph, changes)?,
            Action::AddRelationship {
                primary,
                propagated,
                moves,
            } => {
                for r in propagated.iter().rev() {
                    graph.remove_relationship(r.id);
                }
                graph
                    .remove_relationship(primary.id)
                    .ok_or(EditError::NotFound(Entity::Relationship(primary.id)))?;
                revert_changes(graph, moves)?;
                graph.rewind_relationship_ids(primary.id.0);
            }
            Action::DeleteRelationship { relationship } => {
                graph.insert_relationship(*relationship);
            }
            Action::UpdateProfile { person, before, .. } => {
                graph
                    .set_profile(*person, before.clone())
                    .ok_or_else(|| missing_person(*person))?;
            }
            Action::Batch { actions } => {
                for a in actions.iter().rev() {
                    a.revert(graph)?;
                }
            }
        }
        Ok(())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::AddPerson { .. } => "add person",
            Action::DeletePerson { .. } => "delete person",
            Action::MovePerson { .. } => "move person",
            Action::MoveSpousePair { .. } => "move couple",
            Action::AddRelationship { .. } => "add relationship",
            Action::DeleteRelationship { .. } => "delete relationship",
            Action::UpdateProfile { .. } => "edit profile",
            Action::Batch { .. } => "add relative",
        }
    }
}

/// Bounded linear undo/redo log.
#[derive(Clone, Debug)]
pub struct History {
    undo: VecDeque<Action>,
    redo: Vec<Action>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a freshly applied action. Any redo branch is discarded.
    pub fn record(&mut self, action: Action) {
        self.redo.clear();
        self.undo.push_back(action);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn peek_undo(&self) -> Option<&Action> {
        self.undo.back()
    }

    pub fn peek_redo(&self) -> Option<&Action> {
        self.redo.last()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Revert the newest action on `graph`. On error the log is unchanged.
    pub fn undo(&mut self, graph: &mut FamilyGraph) -> Result<Option<&Action>, EditError> {
        let Some(action) = self.undo.pop_back() else {
            return Ok(None);
        };
        if let Err(e) = action.revert(graph) {
            self.undo.push_back(action);
            return Err(e);
        }
        self.redo.push(action);
        Ok(self.redo.last())
    }

    /// Re-apply the most recently undone action. On error the log is unchanged.
    pub fn redo(&mut self, graph: &mut FamilyGraph) -> Result<Option<&Action>, EditError> {
        let Some(action) = self.redo.pop() else {
            return Ok(None);
        };
        if let Err(e) = action.apply(graph) {
            self.redo.push(action);
            return Err(e);
        }
        self.undo.push_back(action);
        Ok(self.undo.back())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, Generation, Position};

    fn person(id: u32) -> Person {
        Person {
            id: PersonId(id),
            profile: Profile::new("P", id.to_string(), Gender::Male),
            generation: Generation::OWNER,
            grid_slot: id,
            position: Position::default(),
            is_root: false,
        }
    }

    #[test]
    fn record_after_undo_drops_redo_branch() {
        let mut h = History::new(10);
        let mut g = FamilyGraph::empty("u".to_string(), Default::default());
        let a = Action::AddPerson { person: person(0) };
        a.apply(&mut g).unwrap();
        h.record(a);
        h.undo(&mut g).unwrap();
        assert!(h.can_redo());
        h.record(Action::AddPerson { person: person(0) });
        assert!(!h.can_redo());
        assert_eq!(h.undo_len(), 1);
    }

    #[test]
    fn limit_drops_oldest() {
        let mut h = History::new(2);
        for i in 0..3 {
            h.record(Action::AddPerson { person: person(i) });
        }
        assert_eq!(h.undo_len(), 2);
        match h.peek_undo() {
            Some(Action::AddPerson { person }) => assert_eq!(person.id, PersonId(2)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn undo_on_empty_log_is_noop() {
        let mut h = History::new(4);
        let mut g = FamilyGraph::empty("u".to_string(), Default::default());
        assert!(h.undo(&mut g).unwrap().is_none());
        assert!(h.redo(&mut g).unwrap().is_none());
    }
}
