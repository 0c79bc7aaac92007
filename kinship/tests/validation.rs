use chrono::NaiveDate;
use kinship::{
    EditError, EngineConfig, FamilyTree, Gender, Generation, IssueCode, NewPerson, OwnerIdentity,
    PersonId, Profile, RelationshipKind, RelativeKind, Severity,
};

fn tree() -> (FamilyTree, PersonId) {
    let owner = OwnerIdentity {
        user_id: "owner-1".to_string(),
        profile: Profile::new("Rosa", "Lind", Gender::Female),
    };
    let t = FamilyTree::new("fam", &owner, EngineConfig::default()).unwrap();
    let root = t.graph().root().unwrap().id;
    (t, root)
}

fn add(t: &mut FamilyTree, name: &str, generation: i8) -> PersonId {
    t.add_person(NewPerson {
        profile: Profile::new(name, "Lind", Gender::Male),
        generation: Generation::new(generation).unwrap(),
        preferred_slot: None,
    })
    .unwrap()
}

fn date(y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, 6, 1).unwrap()
}

#[test]
fn self_spouse_is_rejected_and_graph_unchanged() {
    let (mut t, root) = tree();
    let before = t.graph().clone();
    let ver = t.version();
    let err = t
        .create_relationship(root, root, RelationshipKind::Spouse)
        .unwrap_err();
    match err {
        EditError::Validation(v) => assert!(v.has(IssueCode::SelfRelationship)),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(t.graph(), &before);
    assert_eq!(t.version(), ver, "state mutated on error");
    assert!(!t.can_undo());
}

#[test]
fn spouse_requires_same_generation() {
    let (t, root) = tree();
    let mut t = t;
    let p = add(&mut t, "Per", -1);
    let v = t.validate(root, p, RelationshipKind::Spouse);
    assert!(!v.is_ok());
    assert!(v.has(IssueCode::GenerationMismatch));
}

#[test]
fn second_spouse_is_rejected() {
    let (mut t, root) = tree();
    let a = add(&mut t, "Anton", 0);
    let b = add(&mut t, "Bert", 0);
    t.create_relationship(root, a, RelationshipKind::Spouse).unwrap();
    let v = t.validate(root, b, RelationshipKind::Spouse);
    assert!(v.has(IssueCode::AlreadyMarried));
    let v = t.validate(b, a, RelationshipKind::Spouse);
    assert!(v.has(IssueCode::AlreadyMarried));
}

#[test]
fn duplicate_pair_is_rejected_for_any_kind() {
    let (mut t, root) = tree();
    let sib = add(&mut t, "Sam", 0);
    t.create_relationship(root, sib, RelationshipKind::Sibling).unwrap();
    let v = t.validate(sib, root, RelationshipKind::Spouse);
    assert_eq!(v.blocking().unwrap().code, IssueCode::Duplicate);
}

#[test]
fn parent_child_needs_adjacent_generations() {
    let (mut t, root) = tree();
    let gp = add(&mut t, "Gustav", -2);
    let v = t.validate(gp, root, RelationshipKind::ParentChild);
    assert!(v.has(IssueCode::GenerationGap));

    let kid = add(&mut t, "Kim", 1);
    // The validator is strict about direction; the session orients pairs.
    let v = t.validate(kid, root, RelationshipKind::ParentChild);
    assert!(v.has(IssueCode::ParentOrder));
    t.create_relationship(kid, root, RelationshipKind::ParentChild)
        .unwrap();
    let rel = t.graph().relationships().next().unwrap();
    assert_eq!((rel.from, rel.to), (root, kid));
}

#[test]
fn third_parent_is_rejected() {
    let (mut t, root) = tree();
    let p1 = add(&mut t, "Pia", -1);
    let p2 = add(&mut t, "Pål", -1);
    let p3 = add(&mut t, "Putte", -1);
    t.create_relationship(p1, root, RelationshipKind::ParentChild).unwrap();
    t.create_relationship(p2, root, RelationshipKind::ParentChild).unwrap();
    let err = t
        .create_relationship(p3, root, RelationshipKind::ParentChild)
        .unwrap_err();
    assert_eq!(err.code(), "validation");
    let parents = t.graph().adjacency().parents_of(root).len();
    assert_eq!(parents, 2);
}

#[test]
fn parent_must_be_old_enough() {
    let (mut t, root) = tree();
    let mut profile = t.graph().person(root).unwrap().profile.clone();
    profile.birth_date = Some(date(1990));
    t.update_profile(root, profile).unwrap();

    let young = t
        .add_person(NewPerson {
            profile: Profile::new("Yngve", "Lind", Gender::Male).born(date(1980)),
            generation: Generation::new(-1).unwrap(),
            preferred_slot: None,
        })
        .unwrap();
    let v = t.validate(young, root, RelationshipKind::ParentChild);
    assert!(v.has(IssueCode::ParentTooYoung));

    let old = t
        .add_person(NewPerson {
            profile: Profile::new("Olof", "Lind", Gender::Male).born(date(1900)),
            generation: Generation::new(-1).unwrap(),
            preferred_slot: None,
        })
        .unwrap();
    let v = t.validate(old, root, RelationshipKind::ParentChild);
    assert!(v.is_ok(), "large gaps only warn");
    let w: Vec<_> = v.warnings().collect();
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].code, IssueCode::LargeAgeGap);
    assert_eq!(w[0].severity, Severity::Warning);
    t.create_relationship(old, root, RelationshipKind::ParentChild)
        .unwrap();
}

#[test]
fn custom_minimum_parent_age_applies() {
    let owner = OwnerIdentity {
        user_id: "o".to_string(),
        profile: Profile::new("Rosa", "Lind", Gender::Female).born(date(2000)),
    };
    let mut cfg = EngineConfig::default();
    cfg.validation.min_parent_age_years = 25;
    let mut t = FamilyTree::new("fam", &owner, cfg).unwrap();
    let root = t.graph().root().unwrap().id;
    let p = t
        .add_relative(root, RelativeKind::Sibling, Profile::new("Sven", "Lind", Gender::Male))
        .unwrap();
    let parent = t
        .add_person(NewPerson {
            profile: Profile::new("Per", "Lind", Gender::Male).born(date(1980)),
            generation: Generation::new(-1).unwrap(),
            preferred_slot: None,
        })
        .unwrap();
    assert!(t
        .validate(parent, root, RelationshipKind::ParentChild)
        .has(IssueCode::ParentTooYoung));
    // No birth date on the sibling: the age rule does not apply.
    assert!(t.validate(parent, p, RelationshipKind::ParentChild).is_ok());
}

#[test]
fn ancestor_checks_never_report_self() {
    let (mut t, root) = tree();
    let p = t
        .add_relative(root, RelativeKind::Parent, Profile::new("Per", "Lind", Gender::Male))
        .unwrap();
    let gp = t
        .add_relative(p, RelativeKind::Parent, Profile::new("Gun", "Lind", Gender::Female))
        .unwrap();
    let g = t.graph();
    assert!(g.is_ancestor(gp, root));
    assert!(g.is_ancestor(p, root));
    for person in g.persons() {
        assert!(!g.is_ancestor(person.id, person.id));
    }
    // The grandparent cannot also become the root's child.
    let v = t.validate(root, gp, RelationshipKind::ParentChild);
    assert!(!v.is_ok());
}

#[test]
fn siblings_share_a_generation() {
    let (mut t, root) = tree();
    let k = add(&mut t, "Kid", 1);
    let v = t.validate(root, k, RelationshipKind::Sibling);
    assert!(v.has(IssueCode::GenerationMismatch));
}

#[test]
fn missing_person_is_not_found() {
    let (mut t, root) = tree();
    let err = t
        .create_relationship(root, PersonId(999), RelationshipKind::Sibling)
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
    let v = t.validate(root, PersonId(999), RelationshipKind::Sibling);
    assert!(v.has(IssueCode::NotFound));
}
