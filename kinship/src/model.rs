use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(pub u32);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "person#{}", self.0)
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relationship#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeStatus {
    #[default]
    Alive,
    Deceased,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    #[serde(rename = "spouse")]
    Spouse,
    /// `from` is the parent, `to` the child.
    #[serde(rename = "parent-child")]
    ParentChild,
    /// Informational only; has no connector and no layout meaning.
    #[serde(rename = "sibling")]
    Sibling,
}

impl RelationshipKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::Spouse => "spouse",
            RelationshipKind::ParentChild => "parent-child",
            RelationshipKind::Sibling => "sibling",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spouse" => Some(RelationshipKind::Spouse),
            "parent-child" => Some(RelationshipKind::ParentChild),
            "sibling" => Some(RelationshipKind::Sibling),
            _ => None,
        }
    }
}

/// Generation band relative to the tree owner: 0 is the owner's row,
/// negative rows are ancestors, positive rows descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct Generation(i8);

impl Generation {
    pub const MIN: i8 = -2;
    pub const MAX: i8 = 2;
    pub const OWNER: Generation = Generation(0);

    pub fn new(value: i8) -> Option<Generation> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Generation(value))
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// Row index 0..5 used for per-generation tables.
    pub fn index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }

    pub fn offset(self, delta: i8) -> Option<Generation> {
        Generation::new(self.0.checked_add(delta)?)
    }

    pub fn all() -> impl Iterator<Item = Generation> {
        (Self::MIN..=Self::MAX).map(Generation)
    }
}

impl TryFrom<i8> for Generation {
    type Error = String;
    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Generation::new(value).ok_or_else(|| format!("generation {} outside -2..=2", value))
    }
}

impl From<Generation> for i8 {
    fn from(g: Generation) -> i8 {
        g.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maiden_name: Option<String>,
    pub gender: Gender,
    #[serde(default)]
    pub status: LifeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
}

impl Profile {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, gender: Gender) -> Self {
        Profile {
            first_name: first_name.into(),
            last_name: last_name.into(),
            middle_name: None,
            maiden_name: None,
            gender,
            status: LifeStatus::Alive,
            birth_date: None,
            death_date: None,
        }
    }

    pub fn born(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn display_name(&self) -> String {
        match &self.middle_name {
            Some(m) if !m.is_empty() => format!("{} {} {}", self.first_name, m, self.last_name),
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(flatten)]
    pub profile: Profile,
    pub generation: Generation,
    pub grid_slot: u32,
    pub position: Position,
    #[serde(default)]
    pub is_root: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub kind: RelationshipKind,
    pub from: PersonId,
    pub to: PersonId,
}

impl Relationship {
    pub fn touches(&self, id: PersonId) -> bool {
        self.from == id || self.to == id
    }

    pub fn other(&self, id: PersonId) -> Option<PersonId> {
        if self.from == id {
            Some(self.to)
        } else if self.to == id {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Input for adding a person; the slot is allocated by the placement engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    #[serde(flatten)]
    pub profile: Profile,
    pub generation: Generation,
    #[serde(default)]
    pub preferred_slot: Option<u32>,
}

/// Identity of the tree owner, used only to seed the root person.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    pub user_id: String,
    pub profile: Profile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCapacity {
    pub current: u32,
    pub max: u32,
}

impl GenerationCapacity {
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn step(self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Which kind of relative `add_relative` creates, seen from the anchor person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeKind {
    Parent,
    Child,
    Spouse,
    Sibling,
}

impl RelativeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "parent" => Some(RelativeKind::Parent),
            "child" => Some(RelativeKind::Child),
            "spouse" => Some(RelativeKind::Spouse),
            "sibling" => Some(RelativeKind::Sibling),
            _ => None,
        }
    }

    pub fn generation_delta(self) -> i8 {
        match self {
            RelativeKind::Parent => -1,
            RelativeKind::Child => 1,
            RelativeKind::Spouse | RelativeKind::Sibling => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_bounds() {
        assert!(Generation::new(-3).is_none());
        assert!(Generation::new(3).is_none());
        assert_eq!(Generation::new(-2).unwrap().index(), 0);
        assert_eq!(Generation::new(2).unwrap().index(), 4);
        assert_eq!(Generation::OWNER.offset(1), Generation::new(1));
        assert_eq!(Generation::new(2).unwrap().offset(1), None);
    }

    #[test]
    fn kind_serializes_with_hyphen() {
        let s = serde_json::to_string(&RelationshipKind::ParentChild).unwrap();
        assert_eq!(s, "\"parent-child\"");
        assert_eq!(RelationshipKind::parse("parent-child"), Some(RelationshipKind::ParentChild));
    }

    #[test]
    fn generation_rejects_out_of_range_json() {
        let r: Result<Generation, _> = serde_json::from_str("5");
        assert!(r.is_err());
    }
}
