use crate::config::{CapacityLimits, GridConfig};
use crate::error::LoadError;
use crate::graph::FamilyGraph;
use crate::limits;
use crate::model::{
    Generation, Person, PersonId, Profile, Relationship, RelationshipId, RelationshipKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Document snapshot for display and export. Falls back to `null` (and logs)
/// when serialization fails; stores go through [`try_to_json`] instead.
pub fn to_json(g: &FamilyGraph) -> Value {
    try_to_json(g).unwrap_or_else(|e| {
        tracing::error!(error = %e, "family document failed to serialize");
        debug_assert!(false, "family document failed to serialize: {e}");
        Value::Null
    })
}

pub fn try_to_json(g: &FamilyGraph) -> Result<Value, serde_json::Error> {
    #[derive(Serialize)]
    struct CapacitySer {
        generation: Generation,
        current: u32,
        max: u32,
    }
    #[derive(Serialize)]
    struct Doc<'a> {
        version: u32,
        owner: &'a str,
        next_person_id: u32,
        next_relationship_id: u32,
        persons: Vec<&'a Person>,
        relationships: Vec<&'a Relationship>,
        capacity: Vec<CapacitySer>,
    }
    let capacity = g
        .capacities()
        .into_iter()
        .map(|(generation, c)| CapacitySer {
            generation,
            current: c.current,
            max: c.max,
        })
        .collect();
    let doc = Doc {
        version: limits::DOC_VERSION,
        owner: g.owner(),
        next_person_id: g.next_person_id,
        next_relationship_id: g.next_relationship_id,
        persons: g.persons().collect(),
        relationships: g.relationships().collect(),
        capacity,
    };
    serde_json::to_value(&doc)
}

/// Strict document ingestion. Positions are recomputed from the slots, every
/// graph invariant is checked, and nothing is returned unless all pass.
pub fn from_json(
    v: Value,
    caps: &CapacityLimits,
    grid: &GridConfig,
) -> Result<FamilyGraph, LoadError> {
    #[derive(Deserialize)]
    struct PersonDe {
        id: u32,
        #[serde(flatten)]
        profile: Profile,
        generation: i8,
        grid_slot: u32,
        #[serde(default)]
        is_root: bool,
    }
    #[derive(Deserialize)]
    struct RelationshipDe {
        id: u32,
        kind: String,
        from: u32,
        to: u32,
    }
    #[derive(Deserialize)]
    struct CapacityDe {
        generation: i8,
        current: u32,
    }
    #[derive(Deserialize)]
    struct DocDe {
        version: Option<u32>,
        owner: String,
        next_person_id: Option<u32>,
        next_relationship_id: Option<u32>,
        persons: Vec<PersonDe>,
        relationships: Vec<RelationshipDe>,
        capacity: Option<Vec<CapacityDe>>,
    }
    let doc: DocDe =
        serde_json::from_value(v).map_err(|e| LoadError::new("json_parse", e.to_string()))?;
    if let Some(ver) = doc.version {
        if ver != limits::DOC_VERSION {
            return Err(LoadError::new(
                "unsupported_version",
                format!("version {} (expected {})", ver, limits::DOC_VERSION),
            ));
        }
    }
    if doc.persons.len() > limits::MAX_PERSONS {
        return Err(LoadError::new("caps_exceeded", format!("persons>{}", limits::MAX_PERSONS)));
    }
    if doc.relationships.len() > limits::MAX_RELATIONSHIPS {
        return Err(LoadError::new(
            "caps_exceeded",
            format!("relationships>{}", limits::MAX_RELATIONSHIPS),
        ));
    }

    let mut g = FamilyGraph::empty(doc.owner, caps.clone());
    let mut ids: HashSet<u32> = HashSet::new();
    for p in doc.persons {
        let pr = &p.profile;
        if !limits::valid_name(&pr.first_name)
            || !limits::valid_name(&pr.last_name)
            || !limits::valid_optional_name(&pr.middle_name)
            || !limits::valid_optional_name(&pr.maiden_name)
        {
            return Err(LoadError::new("invalid_name", format!("person {}", p.id)));
        }
        let generation = Generation::new(p.generation).ok_or_else(|| {
            LoadError::new("invalid_generation", format!("person {}: {}", p.id, p.generation))
        })?;
        if !ids.insert(p.id) {
            return Err(LoadError::new("duplicate_id", format!("person {}", p.id)));
        }
        g.insert_person(Person {
            id: PersonId(p.id),
            profile: p.profile,
            generation,
            grid_slot: p.grid_slot,
            position: grid.position(generation, p.grid_slot),
            is_root: p.is_root,
        });
    }

    let mut rel_ids: HashSet<u32> = HashSet::new();
    for r in doc.relationships {
        let kind = RelationshipKind::parse(&r.kind)
            .ok_or_else(|| LoadError::new("json_parse", format!("relationship kind '{}'", r.kind)))?;
        if !rel_ids.insert(r.id) {
            return Err(LoadError::new("duplicate_id", format!("relationship {}", r.id)));
        }
        let (from, to) = (PersonId(r.from), PersonId(r.to));
        if g.person(from).is_none() || g.person(to).is_none() {
            return Err(LoadError::new("dangling_ref", format!("relationship {}", r.id)));
        }
        g.insert_relationship(Relationship {
            id: RelationshipId(r.id),
            kind,
            from,
            to,
        });
    }

    if let Some(n) = doc.next_person_id {
        g.next_person_id = g.next_person_id.max(n);
    }
    if let Some(n) = doc.next_relationship_id {
        g.next_relationship_id = g.next_relationship_id.max(n);
    }

    if let Some(capacity) = doc.capacity {
        for c in capacity {
            let generation = Generation::new(c.generation).ok_or_else(|| {
                LoadError::new("invalid_generation", format!("capacity row {}", c.generation))
            })?;
            let live = g.capacity(generation).current;
            if live != c.current {
                return Err(LoadError::new(
                    "capacity_mismatch",
                    format!("generation {}: recorded {}, found {}", generation, c.current, live),
                ));
            }
        }
    }

    g.check_invariants(grid)
        .map_err(|m| LoadError::new("invariant", m))?;
    Ok(g)
}
