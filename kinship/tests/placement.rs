use kinship::{
    Direction, EditError, EngineConfig, FamilyTree, Gender, Generation, MovePlan, NewPerson,
    OwnerIdentity, PersonId, Profile, RelationshipKind, RelativeKind,
};

fn owner() -> OwnerIdentity {
    OwnerIdentity {
        user_id: "u".to_string(),
        profile: Profile::new("Rut", "Berg", Gender::Female),
    }
}

fn tree_with(cfg: EngineConfig) -> (FamilyTree, PersonId) {
    let t = FamilyTree::new("fam", &owner(), cfg).unwrap();
    let root = t.graph().root().unwrap().id;
    (t, root)
}

fn add_at(t: &mut FamilyTree, generation: i8, slot: Option<u32>) -> PersonId {
    t.add_person(NewPerson {
        profile: Profile::new("P", "Berg", Gender::Male),
        generation: Generation::new(generation).unwrap(),
        preferred_slot: slot,
    })
    .unwrap()
}

fn slot(t: &FamilyTree, id: PersonId) -> u32 {
    t.graph().person(id).unwrap().grid_slot
}

fn assert_layout(t: &FamilyTree) {
    t.graph().check_invariants(&t.config().grid).unwrap();
}

#[test]
fn root_starts_at_centre() {
    let (t, root) = tree_with(EngineConfig::default());
    let r = t.graph().person(root).unwrap();
    assert_eq!(r.grid_slot, 16);
    assert_eq!(r.generation, Generation::OWNER);
    assert!(r.is_root);
    assert_eq!(r.position.x, 16.0 * 120.0);
}

#[test]
fn new_people_fill_outward_from_centre() {
    let (mut t, _) = tree_with(EngineConfig::default());
    let a = add_at(&mut t, 0, None);
    let b = add_at(&mut t, 0, None);
    let c = add_at(&mut t, 0, None);
    assert_eq!((slot(&t, a), slot(&t, b), slot(&t, c)), (17, 15, 18));
    // A free preferred slot wins.
    let d = add_at(&mut t, 0, Some(3));
    assert_eq!(slot(&t, d), 3);
    // An occupied one falls back to the outward search.
    let e = add_at(&mut t, 0, Some(3));
    assert_eq!(slot(&t, e), 14);
    assert_layout(&t);
}

#[test]
fn connector_slot_is_never_handed_out() {
    let (mut t, root) = tree_with(EngineConfig::default());
    let s = t
        .add_relative(root, RelativeKind::Spouse, Profile::new("Sten", "Berg", Gender::Male))
        .unwrap();
    assert_eq!(slot(&t, s), 18);
    assert_eq!(t.next_free_slot(Generation::OWNER, Some(17)), 15);
    let x = add_at(&mut t, 0, Some(17));
    assert_ne!(slot(&t, x), 17);
    assert_layout(&t);
}

#[test]
fn marrying_seats_spouses_two_apart() {
    let (mut t, root) = tree_with(EngineConfig::default());
    let a = add_at(&mut t, 0, None);
    assert_eq!(slot(&t, a), 17);
    t.create_relationship(root, a, RelationshipKind::Spouse)
        .unwrap();
    assert_eq!(slot(&t, a), 18);
    assert_eq!(t.graph().occupant(Generation::OWNER, 17), None);
    assert_layout(&t);
}

#[test]
fn marrying_without_room_is_rejected() {
    let mut cfg = EngineConfig::default();
    cfg.grid.slots_per_row = 3;
    let (mut t, _) = tree_with(cfg);
    // Slots: 0 = b, 1 = root, 2 = a.
    let a = add_at(&mut t, 0, None);
    let b = add_at(&mut t, 0, None);
    let before = t.graph().clone();
    let err = t
        .create_relationship(a, b, RelationshipKind::Spouse)
        .unwrap_err();
    assert_eq!(err.code(), "placement_exhausted");
    assert_eq!(t.graph(), &before);
}

#[test]
fn single_moves_one_slot() {
    let (mut t, root) = tree_with(EngineConfig::default());
    let plan = t.move_person(root, Direction::Left).unwrap();
    assert!(matches!(plan, MovePlan::Jump { offset: 1, .. }));
    assert!(!plan.jumped());
    assert_eq!(slot(&t, root), 15);
    let p = t.graph().person(root).unwrap();
    assert_eq!(p.position, t.config().grid.position(p.generation, 15));
}

#[test]
fn single_skips_occupied_slots() {
    let (mut t, root) = tree_with(EngineConfig::default());
    let a = add_at(&mut t, 0, Some(17));
    add_at(&mut t, 0, Some(18));
    let plan = t.move_person(root, Direction::Right).unwrap();
    assert!(plan.jumped());
    assert_eq!(slot(&t, root), 19);
    assert_eq!(slot(&t, a), 17);
}

#[test]
fn single_leaps_over_a_couple() {
    let (mut t, root) = tree_with(EngineConfig::default());
    t.add_relative(root, RelativeKind::Spouse, Profile::new("Sten", "Berg", Gender::Male))
        .unwrap();
    let x = add_at(&mut t, 0, Some(19));
    // 18 is the spouse, 17 the connector: x lands left of the couple.
    let plan = t.move_person(x, Direction::Left).unwrap();
    assert_eq!(slot(&t, x), 15);
    assert!(matches!(plan, MovePlan::Jump { offset: 4, .. }));
    assert_layout(&t);
}

#[test]
fn couple_moves_as_a_unit() {
    let (mut t, root) = tree_with(EngineConfig::default());
    let s = t
        .add_relative(root, RelativeKind::Spouse, Profile::new("Sten", "Berg", Gender::Male))
        .unwrap();
    let x = add_at(&mut t, 0, Some(20));

    let plan = t.move_person(root, Direction::Right).unwrap();
    assert!(matches!(plan, MovePlan::Pair { offset: 1, .. }));
    assert_eq!((slot(&t, root), slot(&t, s)), (17, 19));

    // x at 20 blocks every offset until the whole span clears it.
    let plan = t.move_person(s, Direction::Right).unwrap();
    assert!(matches!(plan, MovePlan::Pair { offset: 4, .. }));
    assert_eq!((slot(&t, root), slot(&t, s)), (21, 23));
    assert_eq!(slot(&t, x), 20);
    assert_layout(&t);
}

#[test]
fn couple_at_the_edge_cannot_move() {
    let (mut t, root) = tree_with(EngineConfig::default());
    let s = t
        .add_relative(root, RelativeKind::Spouse, Profile::new("Sten", "Berg", Gender::Male))
        .unwrap();
    for _ in 0..13 {
        t.move_person(root, Direction::Right).unwrap();
    }
    assert_eq!((slot(&t, root), slot(&t, s)), (29, 31));
    let before = t.graph().clone();
    let err = t.move_person(s, Direction::Right).unwrap_err();
    assert!(matches!(err, EditError::PlacementExhausted { .. }));
    assert_eq!(t.graph(), &before);
}

#[test]
fn full_row_falls_back_to_swap() {
    let mut cfg = EngineConfig::default();
    cfg.grid.slots_per_row = 5;
    let (mut t, root) = tree_with(cfg);
    let ids: Vec<PersonId> = (0..4).map(|_| add_at(&mut t, 0, None)).collect();
    // Centre 2 is the root; the rest fill 3, 1, 4, 0.
    assert_eq!(slot(&t, ids[0]), 3);

    let plan = t.move_person(root, Direction::Right).unwrap();
    assert!(matches!(plan, MovePlan::Swap { .. }));
    assert_eq!(slot(&t, root), 3);
    assert_eq!(slot(&t, ids[0]), 2);

    let edge = ids[2];
    assert_eq!(slot(&t, edge), 4);
    let err = t.move_person(edge, Direction::Right).unwrap_err();
    assert_eq!(err.code(), "placement_exhausted");
    assert_layout(&t);
}

#[test]
fn full_row_rejects_new_person() {
    let mut cfg = EngineConfig::default();
    cfg.grid.slots_per_row = 3;
    let (mut t, _) = tree_with(cfg);
    add_at(&mut t, 0, None);
    add_at(&mut t, 0, None);
    let err = t
        .add_person(NewPerson {
            profile: Profile::new("Q", "Berg", Gender::Male),
            generation: Generation::OWNER,
            preferred_slot: None,
        })
        .unwrap_err();
    assert_eq!(err.code(), "placement_exhausted");
    assert_eq!(t.graph().person_count(), 3);
}

#[test]
fn moving_a_missing_person_is_not_found() {
    let (mut t, _) = tree_with(EngineConfig::default());
    let err = t.move_person(PersonId(77), Direction::Left).unwrap_err();
    assert_eq!(err.code(), "not_found");
}
