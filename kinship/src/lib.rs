pub mod config;
pub mod error;
pub mod graph;
pub mod history;
pub mod json;
pub mod limits;
pub mod model;
pub mod store;
pub mod algorithms {
    pub mod collapse;
    pub mod placement;
    pub mod propagation;
    pub mod validate;
}

pub use algorithms::collapse::CollapseIndex;
pub use algorithms::placement::MovePlan;
pub use algorithms::validate::{Issue, IssueCode, Severity, Validation};
pub use config::{CapacityLimits, EngineConfig, GridConfig, ValidationConfig};
pub use error::{EditError, Entity, LoadError, OpenError, PersistenceError, PlacementError};
pub use graph::{Adjacency, FamilyGraph, SlotChange};
pub use history::{Action, History};
pub use model::{
    Direction, Gender, Generation, GenerationCapacity, LifeStatus, NewPerson, OwnerIdentity,
    Person, PersonId, Position, Profile, Relationship, RelationshipId, RelationshipKind,
    RelativeKind,
};
pub use store::{GraphStore, MemoryStore};

use algorithms::{placement, propagation, validate};
use std::collections::BTreeSet;

/// An editing session over one family tree.
///
/// Every mutation is built on a scratch copy of the current graph and only
/// replaces it once all of its steps succeeded, so a rejected call leaves the
/// session exactly as it was. Successful mutations are recorded in the
/// history log and handed to the store, if one is attached.
pub struct FamilyTree {
    family_id: String,
    graph: FamilyGraph,
    history: History,
    collapsed: CollapseIndex,
    config: EngineConfig,
    version: u64,
    store: Option<Box<dyn GraphStore>>,
    save_warnings: Vec<PersistenceError>,
}

impl FamilyTree {
    /// Fresh tree with the owner as root.
    pub fn new(
        family_id: impl Into<String>,
        owner: &OwnerIdentity,
        config: EngineConfig,
    ) -> Result<Self, OpenError> {
        config.check().map_err(OpenError::Config)?;
        let graph = FamilyGraph::with_root(owner, config.capacity.clone(), &config.grid);
        Ok(Self::assemble(family_id.into(), graph, config))
    }

    pub fn from_graph(
        family_id: impl Into<String>,
        graph: FamilyGraph,
        config: EngineConfig,
    ) -> Result<Self, OpenError> {
        config.check().map_err(OpenError::Config)?;
        graph
            .check_invariants(&config.grid)
            .map_err(|m| OpenError::Document(LoadError::new("invariant", m)))?;
        Ok(Self::assemble(family_id.into(), graph, config))
    }

    /// Load the family from `store`, or seed a new tree for `owner` when the
    /// store has nothing yet. The store stays attached for saving.
    pub fn open(
        family_id: impl Into<String>,
        owner: &OwnerIdentity,
        config: EngineConfig,
        store: Box<dyn GraphStore>,
    ) -> Result<Self, OpenError> {
        let family_id = family_id.into();
        config.check().map_err(OpenError::Config)?;
        let mut tree = match store.load(&family_id, &config)? {
            Some(graph) => {
                tracing::info!(family = %family_id, persons = graph.person_count(), "loaded family graph");
                Self::from_graph(family_id, graph, config)?
            }
            None => {
                tracing::info!(family = %family_id, "no stored graph; seeding root");
                Self::new(family_id, owner, config)?
            }
        };
        tree.store = Some(store);
        Ok(tree)
    }

    fn assemble(family_id: String, graph: FamilyGraph, config: EngineConfig) -> Self {
        FamilyTree {
            family_id,
            graph,
            history: History::new(config.history_limit),
            collapsed: CollapseIndex::new(),
            config,
            version: 1,
            store: None,
            save_warnings: Vec::new(),
        }
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    /// Read-only snapshot for rendering.
    pub fn graph(&self) -> &FamilyGraph {
        &self.graph
    }

    /// Monotonic; increments on every applied mutation, undo and redo.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn collapsed(&self) -> &CollapseIndex {
        &self.collapsed
    }

    pub fn set_store(&mut self, store: Box<dyn GraphStore>) {
        self.store = Some(store);
    }

    /// Save failures since the last call. Local state may be ahead of the store.
    pub fn take_save_warnings(&mut self) -> Vec<PersistenceError> {
        std::mem::take(&mut self.save_warnings)
    }

    /// Replace the whole graph with a stored document. History and collapse
    /// state are reset.
    pub fn load_document(&mut self, doc: serde_json::Value) -> Result<(), LoadError> {
        let graph = json::from_json(doc, &self.config.capacity, &self.config.grid)?;
        self.graph = graph;
        self.history.clear();
        self.collapsed.clear();
        self.version += 1;
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json::to_json(&self.graph)
    }

    // Queries

    pub fn validate(&self, from: PersonId, to: PersonId, kind: RelationshipKind) -> Validation {
        validate::validate(&self.graph, from, to, kind, &self.config.validation)
    }

    pub fn next_free_slot(&self, generation: Generation, preferred: Option<u32>) -> u32 {
        placement::next_free_slot(&self.graph, generation, preferred, &self.config.grid)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn hidden(&self) -> BTreeSet<PersonId> {
        self.collapsed.hidden()
    }

    // Mutations

    pub fn add_person(&mut self, new: NewPerson) -> Result<PersonId, EditError> {
        check_profile(&new.profile)?;
        self.check_capacity(new.generation)?;
        let mut next = self.graph.clone();
        let person = insert_new_person(&mut next, new, &self.config.grid)?;
        let id = person.id;
        self.commit(next, Action::AddPerson { person });
        Ok(id)
    }

    /// Add a person already linked to `anchor`. The person and the link are
    /// one history entry.
    pub fn add_relative(
        &mut self,
        anchor: PersonId,
        kind: RelativeKind,
        profile: Profile,
    ) -> Result<PersonId, EditError> {
        check_profile(&profile)?;
        let a = self.person_or_not_found(anchor)?;
        let generation = a.generation.offset(kind.generation_delta()).ok_or_else(|| {
            EditError::InvalidInput(format!(
                "no generation {} of generation {}",
                match kind {
                    RelativeKind::Parent => "above",
                    _ => "below",
                },
                a.generation
            ))
        })?;
        let preferred = match kind {
            RelativeKind::Parent | RelativeKind::Child => Some(a.grid_slot),
            RelativeKind::Spouse => Some(a.grid_slot + 2),
            RelativeKind::Sibling => a.grid_slot.checked_sub(2),
        };
        self.check_capacity(generation)?;

        let mut next = self.graph.clone();
        let person = insert_new_person(
            &mut next,
            NewPerson {
                profile,
                generation,
                preferred_slot: preferred,
            },
            &self.config.grid,
        )?;
        let id = person.id;
        let (from, to, rel_kind) = match kind {
            RelativeKind::Parent => (id, anchor, RelationshipKind::ParentChild),
            RelativeKind::Child => (anchor, id, RelationshipKind::ParentChild),
            RelativeKind::Spouse => (anchor, id, RelationshipKind::Spouse),
            RelativeKind::Sibling => (anchor, id, RelationshipKind::Sibling),
        };
        let (_, linked) = link(&mut next, from, to, rel_kind, &self.config)?;
        self.commit(
            next,
            Action::Batch {
                actions: vec![Action::AddPerson { person }, linked],
            },
        );
        Ok(id)
    }

    pub fn update_profile(&mut self, id: PersonId, profile: Profile) -> Result<(), EditError> {
        check_profile(&profile)?;
        let before = self.person_or_not_found(id)?.profile.clone();
        let mut next = self.graph.clone();
        next.set_profile(id, profile.clone());
        self.commit(
            next,
            Action::UpdateProfile {
                person: id,
                before,
                after: profile,
            },
        );
        Ok(())
    }

    /// Move one step left or right. Spouses travel together.
    pub fn move_person(&mut self, id: PersonId, direction: Direction) -> Result<MovePlan, EditError> {
        let plan = placement::plan_move(&self.graph, id, direction, &self.config.grid)?;
        let mut next = self.graph.clone();
        for c in plan.changes() {
            next.apply_slot_change(&c);
        }
        let action = match &plan {
            MovePlan::Pair { changes, .. } => Action::MoveSpousePair { changes: *changes },
            _ => Action::MovePerson {
                changes: plan.changes(),
            },
        };
        self.commit(next, action);
        Ok(plan)
    }

    /// Remove a person and every relationship touching them.
    pub fn delete_person(&mut self, id: PersonId) -> Result<(), EditError> {
        if self.person_or_not_found(id)?.is_root {
            return Err(EditError::RootProtected);
        }
        let mut next = self.graph.clone();
        let (person, relationships) = next
            .remove_person(id)
            .ok_or(EditError::NotFound(Entity::Person(id)))?;
        self.commit(
            next,
            Action::DeletePerson {
                person,
                relationships,
            },
        );
        Ok(())
    }

    /// Create a relationship plus every edge it implies. A `parent-child`
    /// pair may be given in either order; the lower generation is the parent.
    pub fn create_relationship(
        &mut self,
        from: PersonId,
        to: PersonId,
        kind: RelationshipKind,
    ) -> Result<RelationshipId, EditError> {
        self.person_or_not_found(from)?;
        self.person_or_not_found(to)?;
        let mut next = self.graph.clone();
        let (id, action) = link(&mut next, from, to, kind, &self.config)?;
        self.commit(next, action);
        Ok(id)
    }

    pub fn delete_relationship(&mut self, id: RelationshipId) -> Result<(), EditError> {
        let mut next = self.graph.clone();
        let relationship = next.remove_relationship(id).ok_or_else(|| {
            tracing::warn!(relationship = id.0, "delete requested for a missing relationship");
            EditError::NotFound(Entity::Relationship(id))
        })?;
        self.commit(next, Action::DeleteRelationship { relationship });
        Ok(())
    }

    /// False when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        let mut next = self.graph.clone();
        let undone = self.history.undo(&mut next)?.is_some();
        if undone {
            self.graph = next;
            self.after_change();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        let mut next = self.graph.clone();
        let redone = self.history.redo(&mut next)?.is_some();
        if redone {
            self.graph = next;
            self.after_change();
        }
        Ok(redone)
    }

    /// Hide `root` with its spouse and descendants. Returns the hidden ids.
    pub fn collapse(&mut self, root: PersonId) -> Result<Vec<PersonId>, EditError> {
        let set = self.collapsed.collapse(&self.graph, root)?;
        Ok(set.iter().copied().collect())
    }

    pub fn expand(&mut self, root: PersonId) -> bool {
        self.collapsed.expand(root)
    }

    // Internals

    fn person_or_not_found(&self, id: PersonId) -> Result<&Person, EditError> {
        self.graph.person(id).ok_or_else(|| {
            tracing::warn!(person = id.0, "operation references a missing person");
            EditError::NotFound(Entity::Person(id))
        })
    }

    fn check_capacity(&self, generation: Generation) -> Result<(), EditError> {
        let ceiling = self.graph.ceiling();
        if self.graph.person_count() as u32 >= ceiling {
            return Err(EditError::TreeFull { ceiling });
        }
        let cap = self.graph.capacity(generation);
        if cap.is_full() {
            return Err(EditError::CapacityReached {
                generation,
                max: cap.max,
            });
        }
        Ok(())
    }

    fn commit(&mut self, next: FamilyGraph, action: Action) {
        debug_assert_eq!(next.check_invariants(&self.config.grid), Ok(()));
        tracing::debug!(action = action.label(), version = self.version + 1, "applied");
        self.graph = next;
        self.history.record(action);
        self.after_change();
    }

    fn after_change(&mut self) {
        self.version += 1;
        self.collapsed.refresh(&self.graph);
        self.persist();
    }

    fn persist(&mut self) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store.save(&self.family_id, &self.graph) {
            tracing::warn!(error = %e, version = self.version, "save failed; keeping local graph");
            self.save_warnings.push(e);
        }
    }
}

fn check_profile(p: &Profile) -> Result<(), EditError> {
    if p.first_name.trim().is_empty() {
        return Err(EditError::InvalidInput("first name is required".to_string()));
    }
    if !limits::valid_name(&p.first_name)
        || !limits::valid_name(&p.last_name)
        || !limits::valid_optional_name(&p.middle_name)
        || !limits::valid_optional_name(&p.maiden_name)
    {
        return Err(EditError::InvalidInput(format!(
            "names must be at most {} characters without control characters",
            limits::MAX_NAME_LEN
        )));
    }
    if let (Some(b), Some(d)) = (p.birth_date, p.death_date) {
        if d < b {
            return Err(EditError::InvalidInput("death date precedes birth date".to_string()));
        }
    }
    Ok(())
}

fn insert_new_person(
    graph: &mut FamilyGraph,
    new: NewPerson,
    grid: &GridConfig,
) -> Result<Person, EditError> {
    let generation = new.generation;
    let slot = placement::next_free_slot(graph, generation, new.preferred_slot, grid);
    if graph.occupant(generation, slot).is_some() {
        return Err(PlacementError {
            generation,
            reason: "every slot in the row is taken".to_string(),
        }
        .into());
    }
    let person = Person {
        id: graph.alloc_person_id(),
        profile: new.profile,
        generation,
        grid_slot: slot,
        position: grid.position(generation, slot),
        is_root: false,
    };
    graph.insert_person(person.clone());
    Ok(person)
}

/// Validate, seat and insert one relationship on `graph`, then propagate.
fn link(
    graph: &mut FamilyGraph,
    from: PersonId,
    to: PersonId,
    kind: RelationshipKind,
    config: &EngineConfig,
) -> Result<(RelationshipId, Action), EditError> {
    let (from, to) = match kind {
        RelationshipKind::ParentChild => propagation::orient(graph, from, to)
            .map(|e| (e.parent, e.child))
            .unwrap_or((from, to)),
        _ => (from, to),
    };
    let v = validate::validate(graph, from, to, kind, &config.validation);
    if !v.is_ok() {
        return Err(EditError::Validation(v));
    }
    for w in v.warnings() {
        tracing::info!(code = ?w.code, "{}", w.message);
    }

    let moves = match kind {
        RelationshipKind::Spouse => placement::plan_spouse_alignment(graph, from, to, &config.grid)?,
        _ => Vec::new(),
    };
    for m in &moves {
        graph.apply_slot_change(m);
    }
    let primary = Relationship {
        id: graph.alloc_relationship_id(),
        kind,
        from,
        to,
    };
    graph.insert_relationship(primary);
    let propagated = match kind {
        RelationshipKind::ParentChild => propagation::propagate(
            graph,
            propagation::ParentChildEdit {
                parent: from,
                child: to,
            },
            &config.validation,
        ),
        _ => Vec::new(),
    };
    Ok((
        primary.id,
        Action::AddRelationship {
            primary,
            propagated,
            moves,
        },
    ))
}
