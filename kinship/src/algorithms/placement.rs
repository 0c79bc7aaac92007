// Grid placement: slot allocation and relocation inside one generation row.
//
// Rules:
// - A slot holds at most one person.
// - Spouses sit exactly two slots apart; the slot between them is the
//   connector and stays empty.
// - Spouses move together as one rigid unit.
// - Every search is bounded; running past the bound is a rejection, never a
//   silent wrap-around.
// - x is recomputed from the slot on every change.
//
// Planning is pure: functions here return the slot changes to apply and the
// session commits them.

use crate::config::GridConfig;
use crate::error::{EditError, Entity, PlacementError};
use crate::graph::{FamilyGraph, SlotChange};
use crate::model::{Direction, Generation, Person, PersonId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on probe steps for a move, in slots.
pub const MAX_SEARCH_STEPS: i64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpousePair {
    pub left: u32,
    pub right: u32,
    pub left_person: PersonId,
    pub right_person: PersonId,
}

impl SpousePair {
    /// Strictly between the two spouses.
    pub fn protects(&self, slot: u32) -> bool {
        self.left < slot && slot < self.right
    }

    pub fn covers(&self, slot: u32) -> bool {
        self.left <= slot && slot <= self.right
    }

    pub fn includes(&self, id: PersonId) -> bool {
        self.left_person == id || self.right_person == id
    }
}

/// Occupancy of one generation row.
#[derive(Clone, Debug)]
pub struct Row {
    pub generation: Generation,
    occupants: BTreeMap<u32, PersonId>,
    pairs: Vec<SpousePair>,
}

impl Row {
    pub fn build(graph: &FamilyGraph, generation: Generation) -> Row {
        let adj = graph.adjacency();
        let mut occupants = BTreeMap::new();
        let mut pairs = Vec::new();
        for p in graph.persons_in(generation) {
            occupants.insert(p.grid_slot, p.id);
            let Some(sid) = adj.spouse_of(p.id) else { continue };
            if sid < p.id {
                continue;
            }
            let Some(s) = graph.person(sid) else { continue };
            if s.generation != generation {
                continue;
            }
            let (l, r) = if p.grid_slot <= s.grid_slot { (p, s) } else { (s, p) };
            pairs.push(SpousePair {
                left: l.grid_slot,
                right: r.grid_slot,
                left_person: l.id,
                right_person: r.id,
            });
        }
        Row {
            generation,
            occupants,
            pairs,
        }
    }

    pub fn occupant(&self, slot: u32) -> Option<PersonId> {
        self.occupants.get(&slot).copied()
    }

    pub fn pairs(&self) -> &[SpousePair] {
        &self.pairs
    }

    pub fn pair_of(&self, id: PersonId) -> Option<&SpousePair> {
        self.pairs.iter().find(|p| p.includes(id))
    }

    pub fn pair_protecting(&self, slot: u32) -> Option<&SpousePair> {
        self.pairs.iter().find(|p| p.protects(slot))
    }

    pub fn is_protected(&self, slot: u32) -> bool {
        self.pair_protecting(slot).is_some()
    }

    pub fn protected_slots(&self) -> BTreeSet<u32> {
        self.pairs
            .iter()
            .flat_map(|p| (p.left + 1)..p.right)
            .collect()
    }

    /// A slot `moving` may land on: empty apart from the movers themselves
    /// and outside the whole span of every other pair.
    fn clear_for(&self, slot: u32, moving: &[PersonId]) -> bool {
        if let Some(occ) = self.occupant(slot) {
            if !moving.contains(&occ) {
                return false;
            }
        }
        !self
            .pairs
            .iter()
            .any(|p| !moving.contains(&p.left_person) && p.covers(slot))
    }
}

/// Slots in search order: centre, centre+1, centre-1, centre+2, ...
fn outward(grid: &GridConfig) -> impl Iterator<Item = u32> + '_ {
    let c = grid.center_slot() as i64;
    (0..grid.slots_per_row as i64)
        .flat_map(move |k| {
            if k == 0 {
                vec![c]
            } else {
                vec![c + k, c - k]
            }
        })
        .filter(move |s| grid.contains(*s))
        .map(|s| s as u32)
}

/// Pick a slot for a new person in `generation`.
///
/// When every slot is taken the first occupied, unprotected slot is returned;
/// callers needing an empty slot check occupancy themselves.
pub fn next_free_slot(
    graph: &FamilyGraph,
    generation: Generation,
    preferred: Option<u32>,
    grid: &GridConfig,
) -> u32 {
    let row = Row::build(graph, generation);
    if let Some(p) = preferred {
        if grid.contains(p as i64) && row.occupant(p).is_none() && !row.is_protected(p) {
            return p;
        }
    }
    if let Some(s) = outward(grid).find(|s| row.occupant(*s).is_none() && !row.is_protected(*s)) {
        return s;
    }
    outward(grid)
        .find(|s| !row.is_protected(*s))
        .unwrap_or_else(|| grid.center_slot())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MovePlan {
    /// Both spouses shifted by `offset` slots.
    Pair { changes: [SlotChange; 2], offset: u32 },
    /// A single person landed `offset` slots away.
    Jump { change: SlotChange, offset: u32 },
    /// A single person traded places with the adjacent single occupant.
    Swap { changes: [SlotChange; 2] },
}

impl MovePlan {
    pub fn changes(&self) -> Vec<SlotChange> {
        match self {
            MovePlan::Pair { changes, .. } | MovePlan::Swap { changes } => changes.to_vec(),
            MovePlan::Jump { change, .. } => vec![*change],
        }
    }

    /// More than one slot travelled, i.e. something was leapt over.
    pub fn jumped(&self) -> bool {
        match self {
            MovePlan::Pair { offset, .. } | MovePlan::Jump { offset, .. } => *offset > 1,
            MovePlan::Swap { .. } => false,
        }
    }
}

fn change(p: &Person, to_slot: u32, grid: &GridConfig) -> SlotChange {
    SlotChange {
        person: p.id,
        from_slot: p.grid_slot,
        to_slot,
        from_x: p.position.x,
        to_x: grid.position(p.generation, to_slot).x,
    }
}

/// Plan moving `id` one step in `direction`, carrying its spouse along.
pub fn plan_move(
    graph: &FamilyGraph,
    id: PersonId,
    direction: Direction,
    grid: &GridConfig,
) -> Result<MovePlan, EditError> {
    let person = graph.person(id).ok_or(EditError::NotFound(Entity::Person(id)))?;
    let row = Row::build(graph, person.generation);
    let plan = match row.pair_of(id) {
        Some(pair) => plan_pair_move(graph, &row, *pair, direction, grid)?,
        None => plan_single_move(graph, &row, person, direction, grid)?,
    };
    tracing::debug!(person = id.0, ?direction, ?plan, "planned move");
    Ok(plan)
}

fn plan_pair_move(
    graph: &FamilyGraph,
    row: &Row,
    pair: SpousePair,
    direction: Direction,
    grid: &GridConfig,
) -> Result<MovePlan, PlacementError> {
    let step = direction.step();
    let movers = [pair.left_person, pair.right_person];
    let (Some(lp), Some(rp)) = (graph.person(pair.left_person), graph.person(pair.right_person))
    else {
        return Err(PlacementError {
            generation: row.generation,
            reason: "spouse pair is incomplete".to_string(),
        });
    };
    for k in 1..=MAX_SEARCH_STEPS {
        let nl = pair.left as i64 + step * k;
        let nr = pair.right as i64 + step * k;
        if !grid.contains(nl) || !grid.contains(nr) {
            return Err(PlacementError {
                generation: row.generation,
                reason: "the couple is already at the edge of the tree".to_string(),
            });
        }
        if (nl..=nr).all(|s| row.clear_for(s as u32, &movers)) {
            return Ok(MovePlan::Pair {
                changes: [change(lp, nl as u32, grid), change(rp, nr as u32, grid)],
                offset: k as u32,
            });
        }
    }
    Err(PlacementError {
        generation: row.generation,
        reason: format!("no room for the couple within {} slots", MAX_SEARCH_STEPS),
    })
}

fn plan_single_move(
    graph: &FamilyGraph,
    row: &Row,
    person: &Person,
    direction: Direction,
    grid: &GridConfig,
) -> Result<MovePlan, PlacementError> {
    let step = direction.step();
    let start = person.grid_slot as i64;
    let mut cand = start + step;
    let mut probes = 0;
    while grid.contains(cand) && probes < MAX_SEARCH_STEPS {
        probes += 1;
        let s = cand as u32;
        if let Some(pair) = row.pair_protecting(s) {
            // Leap the whole couple instead of landing on its connector.
            cand = if step > 0 {
                pair.right as i64 + 1
            } else {
                pair.left as i64 - 1
            };
            continue;
        }
        if row.occupant(s).is_none() {
            return Ok(MovePlan::Jump {
                change: change(person, s, grid),
                offset: (cand - start).unsigned_abs() as u32,
            });
        }
        cand += step;
    }

    // Fallback: trade places with a single neighbour.
    let next = start + step;
    if grid.contains(next) && !row.is_protected(next as u32) {
        if let Some(other) = row.occupant(next as u32) {
            if row.pair_of(other).is_none() {
                if let Some(op) = graph.person(other) {
                    return Ok(MovePlan::Swap {
                        changes: [
                            change(person, next as u32, grid),
                            change(op, person.grid_slot, grid),
                        ],
                    });
                }
            }
        }
    }
    Err(PlacementError {
        generation: row.generation,
        reason: format!("no free slot to the {}", direction_name(direction)),
    })
}

fn direction_name(d: Direction) -> &'static str {
    match d {
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Slot changes that seat two about-to-be spouses two slots apart with an
/// empty connector. Empty when they already are.
pub fn plan_spouse_alignment(
    graph: &FamilyGraph,
    a: PersonId,
    b: PersonId,
    grid: &GridConfig,
) -> Result<Vec<SlotChange>, EditError> {
    let pa = graph.person(a).ok_or(EditError::NotFound(Entity::Person(a)))?;
    let pb = graph.person(b).ok_or(EditError::NotFound(Entity::Person(b)))?;
    let row = Row::build(graph, pa.generation);
    let (sa, sb) = (pa.grid_slot as i64, pb.grid_slot as i64);
    if (sa - sb).abs() == 2 && row.clear_for(((sa + sb) / 2) as u32, &[]) {
        return Ok(Vec::new());
    }
    // (mover, anchor slot, target)
    let candidates = [
        (pb, sa, sa + 2),
        (pb, sa, sa - 2),
        (pa, sb, sb + 2),
        (pa, sb, sb - 2),
    ];
    for (mover, anchor, target) in candidates {
        if !grid.contains(target) {
            continue;
        }
        let connector = (anchor + target) / 2;
        if row.clear_for(target as u32, &[mover.id]) && row.clear_for(connector as u32, &[mover.id])
        {
            return Ok(vec![change(mover, target as u32, grid)]);
        }
    }
    Err(PlacementError {
        generation: pa.generation,
        reason: "no room to seat the couple side by side".to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outward_alternates_from_centre() {
        let grid = GridConfig {
            slots_per_row: 6,
            ..GridConfig::default()
        };
        let order: Vec<u32> = outward(&grid).collect();
        assert_eq!(order, vec![3, 4, 2, 5, 1, 0]);
    }

    #[test]
    fn pair_interior_is_protected() {
        let p = SpousePair {
            left: 4,
            right: 6,
            left_person: PersonId(1),
            right_person: PersonId(2),
        };
        assert!(p.protects(5));
        assert!(!p.protects(4));
        assert!(!p.protects(6));
        assert!(p.covers(6));
    }
}
