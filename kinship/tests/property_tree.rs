use kinship::{
    Direction, EngineConfig, FamilyTree, Gender, Generation, NewPerson, OwnerIdentity, PersonId,
    Profile, RelationshipId, RelationshipKind, RelativeKind,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    AddPerson { generation: u8, slot: Option<u8> },
    AddRelative { idx: u16, kind: u8 },
    Link { a: u16, b: u16, kind: u8 },
    Move { idx: u16, left: bool },
    Rename { idx: u16 },
    RemovePerson { idx: u16 },
    RemoveRelationship { idx: u16 },
    Collapse { idx: u16 },
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => ((0u8..5), prop::option::of(0u8..32))
            .prop_map(|(generation, slot)| Op::AddPerson { generation, slot }),
        3 => (any::<u16>(), (0u8..4)).prop_map(|(idx, kind)| Op::AddRelative { idx, kind }),
        3 => (any::<u16>(), any::<u16>(), (0u8..3)).prop_map(|(a, b, kind)| Op::Link { a, b, kind }),
        3 => (any::<u16>(), any::<bool>()).prop_map(|(idx, left)| Op::Move { idx, left }),
        1 => any::<u16>().prop_map(|idx| Op::Rename { idx }),
        1 => any::<u16>().prop_map(|idx| Op::RemovePerson { idx }),
        1 => any::<u16>().prop_map(|idx| Op::RemoveRelationship { idx }),
        1 => any::<u16>().prop_map(|idx| Op::Collapse { idx }),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn pick_person(t: &FamilyTree, idx: u16) -> PersonId {
    let ids: Vec<PersonId> = t.graph().persons().map(|p| p.id).collect();
    ids[idx as usize % ids.len()]
}

fn pick_relationship(t: &FamilyTree, idx: u16) -> Option<RelationshipId> {
    let ids: Vec<RelationshipId> = t.graph().relationships().map(|r| r.id).collect();
    if ids.is_empty() {
        return None;
    }
    Some(ids[idx as usize % ids.len()])
}

const RELATIVES: [RelativeKind; 4] = [
    RelativeKind::Parent,
    RelativeKind::Child,
    RelativeKind::Spouse,
    RelativeKind::Sibling,
];

const KINDS: [RelationshipKind; 3] = [
    RelationshipKind::Spouse,
    RelationshipKind::ParentChild,
    RelationshipKind::Sibling,
];

/// Apply one op. Returns true when the op was rejected.
fn apply_op(t: &mut FamilyTree, op: Op, n: usize) -> bool {
    let name = format!("P{}", n);
    match op {
        Op::AddPerson { generation, slot } => t
            .add_person(NewPerson {
                profile: Profile::new(name, "Test", Gender::Female),
                generation: Generation::new(generation as i8 - 2).unwrap(),
                preferred_slot: slot.map(u32::from),
            })
            .is_err(),
        Op::AddRelative { idx, kind } => {
            let anchor = pick_person(t, idx);
            t.add_relative(
                anchor,
                RELATIVES[kind as usize],
                Profile::new(name, "Test", Gender::Male),
            )
            .is_err()
        }
        Op::Link { a, b, kind } => {
            let (a, b) = (pick_person(t, a), pick_person(t, b));
            t.create_relationship(a, b, KINDS[kind as usize]).is_err()
        }
        Op::Move { idx, left } => {
            let id = pick_person(t, idx);
            let dir = if left { Direction::Left } else { Direction::Right };
            t.move_person(id, dir).is_err()
        }
        Op::Rename { idx } => {
            let id = pick_person(t, idx);
            t.update_profile(id, Profile::new(name, "Renamed", Gender::Male))
                .is_err()
        }
        Op::RemovePerson { idx } => {
            let id = pick_person(t, idx);
            t.delete_person(id).is_err()
        }
        Op::RemoveRelationship { idx } => match pick_relationship(t, idx) {
            Some(id) => t.delete_relationship(id).is_err(),
            None => true,
        },
        Op::Collapse { idx } => {
            let id = pick_person(t, idx);
            if t.collapsed().is_collapsed(id) {
                t.expand(id);
            } else {
                t.collapse(id).unwrap();
            }
            false
        }
        Op::Undo => {
            t.undo().unwrap();
            false
        }
        Op::Redo => {
            t.redo().unwrap();
            false
        }
    }
}

fn sequence_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 5..40)
}

fn fresh() -> FamilyTree {
    let owner = OwnerIdentity {
        user_id: "prop".to_string(),
        profile: Profile::new("Root", "Test", Gender::Male),
    };
    FamilyTree::new("prop", &owner, EngineConfig::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 2_000, .. ProptestConfig::default() })]
    #[test]
    fn tree_edit_invariants(seq in sequence_strategy()) {
        let mut t = fresh();
        let initial = t.graph().clone();
        for (n, op) in seq.into_iter().enumerate() {
            let before = t.graph().clone();
            let version = t.version();
            let rejected = apply_op(&mut t, op.clone(), n);
            if rejected {
                prop_assert_eq!(t.graph(), &before, "rejected {:?} mutated the graph", op);
                prop_assert_eq!(t.version(), version);
            }
            if let Err(msg) = t.graph().check_invariants(&t.config().grid) {
                panic!("after {:?}: {}", op, msg);
            }
            let hidden = t.hidden();
            prop_assert!(hidden.iter().all(|id| t.graph().person(*id).is_some()));
        }

        // The whole log unwinds to the starting graph and replays forward.
        let end = t.graph().clone();
        while t.undo().unwrap() {
            t.graph().check_invariants(&t.config().grid).unwrap();
        }
        prop_assert_eq!(t.graph(), &initial);
        while t.redo().unwrap() {}
        prop_assert_eq!(t.graph(), &end);
    }
}
