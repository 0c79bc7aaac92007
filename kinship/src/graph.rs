use crate::config::{CapacityLimits, GridConfig};
use crate::model::{
    Generation, GenerationCapacity, OwnerIdentity, Person, PersonId, Profile, Relationship,
    RelationshipId, RelationshipKind,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// The family aggregate: people, relationships and capacity bookkeeping.
///
/// Mutation primitives are crate-private; outside callers go through
/// [`crate::FamilyTree`], which validates before touching a graph version.
#[derive(Clone, Debug)]
pub struct FamilyGraph {
    pub(crate) owner: String,
    pub(crate) persons: BTreeMap<PersonId, Person>,
    pub(crate) relationships: BTreeMap<RelationshipId, Relationship>,
    pub(crate) next_person_id: u32,
    pub(crate) next_relationship_id: u32,
    pub(crate) limits: CapacityLimits,
    // Bumped by every primitive edit; keys the adjacency cache.
    pub(crate) rev: u64,
    pub(crate) adjacency: RefCell<Option<(u64, Rc<Adjacency>)>>,
}

impl PartialEq for FamilyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.persons == other.persons
            && self.relationships == other.relationships
            && self.next_person_id == other.next_person_id
            && self.next_relationship_id == other.next_relationship_id
            && self.limits == other.limits
    }
}

/// One slot/x change applied to a person.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlotChange {
    pub person: PersonId,
    pub from_slot: u32,
    pub to_slot: u32,
    pub from_x: f32,
    pub to_x: f32,
}

impl SlotChange {
    pub fn inverse(&self) -> SlotChange {
        SlotChange {
            person: self.person,
            from_slot: self.to_slot,
            to_slot: self.from_slot,
            from_x: self.to_x,
            to_x: self.from_x,
        }
    }
}

impl FamilyGraph {
    /// Empty graph with no root. Used by the document loader.
    pub(crate) fn empty(owner: String, limits: CapacityLimits) -> Self {
        FamilyGraph {
            owner,
            persons: BTreeMap::new(),
            relationships: BTreeMap::new(),
            next_person_id: 0,
            next_relationship_id: 0,
            limits,
            rev: 1,
            adjacency: RefCell::new(None),
        }
    }

    /// New tree holding only the owner as root, at the centre of generation 0.
    pub fn with_root(owner: &OwnerIdentity, limits: CapacityLimits, grid: &GridConfig) -> Self {
        let mut g = FamilyGraph::empty(owner.user_id.clone(), limits);
        let id = g.alloc_person_id();
        let slot = grid.center_slot();
        g.insert_person(Person {
            id,
            profile: owner.profile.clone(),
            generation: Generation::OWNER,
            grid_slot: slot,
            position: grid.position(Generation::OWNER, slot),
            is_root: true,
        });
        g
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn root(&self) -> Option<&Person> {
        self.persons.values().find(|p| p.is_root)
    }

    pub fn persons_in(&self, generation: Generation) -> impl Iterator<Item = &Person> {
        self.persons
            .values()
            .filter(move |p| p.generation == generation)
    }

    pub fn occupant(&self, generation: Generation, slot: u32) -> Option<PersonId> {
        self.persons_in(generation)
            .find(|p| p.grid_slot == slot)
            .map(|p| p.id)
    }

    pub fn relationship_between(&self, a: PersonId, b: PersonId) -> Option<&Relationship> {
        let id = self.adjacency().between(a, b)?;
        self.relationships.get(&id)
    }

    pub fn incident_relationships(&self, id: PersonId) -> Vec<Relationship> {
        self.relationships
            .values()
            .filter(|r| r.touches(id))
            .copied()
            .collect()
    }

    pub fn limits(&self) -> &CapacityLimits {
        &self.limits
    }

    pub fn capacity(&self, generation: Generation) -> GenerationCapacity {
        GenerationCapacity {
            current: self.persons_in(generation).count() as u32,
            max: self.limits.max_for(generation),
        }
    }

    pub fn capacities(&self) -> Vec<(Generation, GenerationCapacity)> {
        Generation::all().map(|g| (g, self.capacity(g))).collect()
    }

    pub fn ceiling(&self) -> u32 {
        self.limits.ceiling()
    }

    /// Id-indexed adjacency for the current revision, built on first use.
    pub fn adjacency(&self) -> Rc<Adjacency> {
        let mut cache = self.adjacency.borrow_mut();
        if let Some((rev, adj)) = cache.as_ref() {
            if *rev == self.rev {
                return Rc::clone(adj);
            }
        }
        let adj = Rc::new(Adjacency::build(self));
        *cache = Some((self.rev, Rc::clone(&adj)));
        adj
    }

    pub fn spouse_of(&self, id: PersonId) -> Option<PersonId> {
        self.adjacency().spouse_of(id)
    }

    pub fn is_ancestor(&self, ancestor: PersonId, person: PersonId) -> bool {
        self.adjacency().is_ancestor(ancestor, person)
    }

    // Primitives

    fn touch(&mut self) {
        self.rev = self.rev.wrapping_add(1);
    }

    pub(crate) fn alloc_person_id(&mut self) -> PersonId {
        let id = PersonId(self.next_person_id);
        self.next_person_id += 1;
        id
    }

    pub(crate) fn alloc_relationship_id(&mut self) -> RelationshipId {
        let id = RelationshipId(self.next_relationship_id);
        self.next_relationship_id += 1;
        id
    }

    pub(crate) fn insert_person(&mut self, person: Person) {
        self.next_person_id = self.next_person_id.max(person.id.0.saturating_add(1));
        self.persons.insert(person.id, person);
        self.touch();
    }

    pub(crate) fn remove_person(&mut self, id: PersonId) -> Option<(Person, Vec<Relationship>)> {
        let person = self.persons.remove(&id)?;
        let incident = self.incident_relationships(id);
        for r in &incident {
            self.relationships.remove(&r.id);
        }
        self.touch();
        Some((person, incident))
    }

    pub(crate) fn insert_relationship(&mut self, rel: Relationship) {
        self.next_relationship_id = self.next_relationship_id.max(rel.id.0.saturating_add(1));
        self.relationships.insert(rel.id, rel);
        self.touch();
    }

    pub(crate) fn remove_relationship(&mut self, id: RelationshipId) -> Option<Relationship> {
        let rel = self.relationships.remove(&id)?;
        self.touch();
        Some(rel)
    }

    pub(crate) fn apply_slot_change(&mut self, change: &SlotChange) -> bool {
        match self.persons.get_mut(&change.person) {
            Some(p) => {
                p.grid_slot = change.to_slot;
                p.position.x = change.to_x;
                self.touch();
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_profile(&mut self, id: PersonId, profile: Profile) -> Option<Profile> {
        let p = self.persons.get_mut(&id)?;
        let before = std::mem::replace(&mut p.profile, profile);
        self.touch();
        Some(before)
    }

    /// Rewind id counters after an undone allocation. Ids are handed out
    /// sequentially, so undoing in LIFO order restores the prior counters.
    pub(crate) fn rewind_person_ids(&mut self, to: u32) {
        self.next_person_id = to;
    }

    pub(crate) fn rewind_relationship_ids(&mut self, to: u32) {
        self.next_relationship_id = to;
    }

    /// Full structural check. Returns a description of the first violation.
    pub fn check_invariants(&self, grid: &GridConfig) -> Result<(), String> {
        let roots: Vec<&Person> = self.persons.values().filter(|p| p.is_root).collect();
        if roots.len() != 1 {
            return Err(format!("expected exactly one root, found {}", roots.len()));
        }
        if roots[0].generation != Generation::OWNER {
            return Err("root must be in generation 0".to_string());
        }

        let mut slots: HashSet<(Generation, u32)> = HashSet::new();
        for p in self.persons.values() {
            if p.id.0 >= self.next_person_id {
                return Err(format!("{} not below the id counter", p.id));
            }
            if p.grid_slot >= grid.slots_per_row {
                return Err(format!("{} slot {} outside the grid", p.id, p.grid_slot));
            }
            if !slots.insert((p.generation, p.grid_slot)) {
                return Err(format!(
                    "slot {} used twice in generation {}",
                    p.grid_slot, p.generation
                ));
            }
            if p.position != grid.position(p.generation, p.grid_slot) {
                return Err(format!("{} position does not match its slot", p.id));
            }
        }
        for g in Generation::all() {
            let cap = self.capacity(g);
            if cap.current > cap.max {
                return Err(format!("generation {} over capacity", g));
            }
        }

        let mut pairs: HashSet<(PersonId, PersonId)> = HashSet::new();
        let mut spouses: HashMap<PersonId, u32> = HashMap::new();
        let mut parents: HashMap<PersonId, u32> = HashMap::new();
        for r in self.relationships.values() {
            if r.id.0 >= self.next_relationship_id {
                return Err(format!("{} not below the id counter", r.id));
            }
            let (Some(a), Some(b)) = (self.persons.get(&r.from), self.persons.get(&r.to)) else {
                return Err(format!("{} references a missing person", r.id));
            };
            if r.from == r.to {
                return Err(format!("{} links a person to itself", r.id));
            }
            if !pairs.insert(pair_key(r.from, r.to)) {
                return Err(format!("more than one relationship between {} and {}", r.from, r.to));
            }
            match r.kind {
                RelationshipKind::Spouse => {
                    for id in [r.from, r.to] {
                        let n = spouses.entry(id).or_insert(0);
                        *n += 1;
                        if *n > 1 {
                            return Err(format!("{} has more than one spouse", id));
                        }
                    }
                    if a.generation != b.generation {
                        return Err(format!("{} spouses in different generations", r.id));
                    }
                    let (l, rt) = (a.grid_slot.min(b.grid_slot), a.grid_slot.max(b.grid_slot));
                    if rt - l != 2 {
                        return Err(format!("{} spouses are not two slots apart", r.id));
                    }
                    if self.occupant(a.generation, l + 1).is_some() {
                        return Err(format!("{} connector slot is occupied", r.id));
                    }
                }
                RelationshipKind::ParentChild => {
                    if a.generation.value() + 1 != b.generation.value() {
                        return Err(format!("{} parent is not one generation above", r.id));
                    }
                    let n = parents.entry(r.to).or_insert(0);
                    *n += 1;
                    if *n > 2 {
                        return Err(format!("{} has more than two parents", r.to));
                    }
                }
                RelationshipKind::Sibling => {
                    if a.generation != b.generation {
                        return Err(format!("{} siblings in different generations", r.id));
                    }
                }
            }
        }

        let adj = self.adjacency();
        for id in self.persons.keys() {
            if adj.is_ancestor(*id, *id) {
                return Err(format!("{} is its own ancestor", id));
            }
        }
        Ok(())
    }
}

pub(crate) fn pair_key(a: PersonId, b: PersonId) -> (PersonId, PersonId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Adjacency lists over one graph revision.
#[derive(Debug, Default)]
pub struct Adjacency {
    parents: HashMap<PersonId, Vec<PersonId>>,
    children: HashMap<PersonId, Vec<PersonId>>,
    spouse: HashMap<PersonId, PersonId>,
    siblings: HashMap<PersonId, Vec<PersonId>>,
    pairs: HashMap<(PersonId, PersonId), RelationshipId>,
}

impl Adjacency {
    pub fn build(g: &FamilyGraph) -> Self {
        let mut adj = Adjacency::default();
        for r in g.relationships.values() {
            adj.pairs.insert(pair_key(r.from, r.to), r.id);
            match r.kind {
                RelationshipKind::Spouse => {
                    adj.spouse.insert(r.from, r.to);
                    adj.spouse.insert(r.to, r.from);
                }
                RelationshipKind::ParentChild => {
                    adj.parents.entry(r.to).or_default().push(r.from);
                    adj.children.entry(r.from).or_default().push(r.to);
                }
                RelationshipKind::Sibling => {
                    adj.siblings.entry(r.from).or_default().push(r.to);
                    adj.siblings.entry(r.to).or_default().push(r.from);
                }
            }
        }
        adj
    }

    pub fn parents_of(&self, id: PersonId) -> &[PersonId] {
        self.parents.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn children_of(&self, id: PersonId) -> &[PersonId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Explicit `sibling` neighbours only.
    pub fn siblings_of(&self, id: PersonId) -> &[PersonId] {
        self.siblings.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn spouse_of(&self, id: PersonId) -> Option<PersonId> {
        self.spouse.get(&id).copied()
    }

    pub fn between(&self, a: PersonId, b: PersonId) -> Option<RelationshipId> {
        self.pairs.get(&pair_key(a, b)).copied()
    }

    pub fn has_parent(&self, child: PersonId, parent: PersonId) -> bool {
        self.parents_of(child).contains(&parent)
    }

    /// True when `ancestor` is reachable by walking parent links up from
    /// `person`. `is_ancestor(x, x)` is true only if the graph has a cycle.
    pub fn is_ancestor(&self, ancestor: PersonId, person: PersonId) -> bool {
        let mut seen: HashSet<PersonId> = HashSet::new();
        let mut stack: Vec<PersonId> = self.parents_of(person).to_vec();
        while let Some(p) = stack.pop() {
            if p == ancestor {
                return true;
            }
            if seen.insert(p) {
                stack.extend_from_slice(self.parents_of(p));
            }
        }
        false
    }
}
