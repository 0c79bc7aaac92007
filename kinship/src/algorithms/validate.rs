//! Relationship rule engine.
//!
//! `validate` answers "can this relationship be created between these two
//! people?" against one graph snapshot. It never mutates anything, so callers
//! may run it speculatively, e.g. to grey out invalid drop targets.

use crate::config::ValidationConfig;
use crate::graph::FamilyGraph;
use crate::model::{Person, PersonId, RelationshipKind};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    NotFound,
    SelfRelationship,
    Duplicate,
    GenerationMismatch,
    AlreadyMarried,
    GenerationGap,
    ParentOrder,
    TooManyParents,
    ParentTooYoung,
    LargeAgeGap,
    Cycle,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Validation {
    pub issues: Vec<Issue>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// The first blocking issue, if any.
    pub fn blocking(&self) -> Option<&Issue> {
        self.issues.iter().find(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    fn reject(mut self, code: IssueCode, message: String) -> Self {
        self.issues.push(Issue {
            code,
            severity: Severity::Error,
            message,
        });
        self
    }

    fn warn(&mut self, code: IssueCode, message: String) {
        self.issues.push(Issue {
            code,
            severity: Severity::Warning,
            message,
        });
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.blocking() {
            Some(issue) => f.write_str(&issue.message),
            None => f.write_str("ok"),
        }
    }
}

/// Rules run in a fixed order; evaluation stops at the first blocking issue.
pub fn validate(
    graph: &FamilyGraph,
    from: PersonId,
    to: PersonId,
    kind: RelationshipKind,
    cfg: &ValidationConfig,
) -> Validation {
    let mut v = Validation::default();
    let (a, b) = match (graph.person(from), graph.person(to)) {
        (Some(a), Some(b)) => (a, b),
        (None, _) => return v.reject(IssueCode::NotFound, format!("{} does not exist", from)),
        (_, None) => return v.reject(IssueCode::NotFound, format!("{} does not exist", to)),
    };
    if from == to {
        return v.reject(
            IssueCode::SelfRelationship,
            "a person cannot be related to themselves".to_string(),
        );
    }
    let adj = graph.adjacency();
    if let Some(existing) = adj.between(from, to).and_then(|id| graph.relationship(id)) {
        return v.reject(
            IssueCode::Duplicate,
            format!(
                "{} and {} are already linked ({})",
                name(a),
                name(b),
                existing.kind.as_str()
            ),
        );
    }

    match kind {
        RelationshipKind::Spouse => {
            if a.generation != b.generation {
                return v.reject(
                    IssueCode::GenerationMismatch,
                    "spouses must be in the same generation".to_string(),
                );
            }
            for p in [a, b] {
                if adj.spouse_of(p.id).is_some() {
                    return v.reject(
                        IssueCode::AlreadyMarried,
                        format!("{} already has a spouse", name(p)),
                    );
                }
            }
        }
        RelationshipKind::ParentChild => {
            let gap = b.generation.value() - a.generation.value();
            if gap.abs() != 1 {
                return v.reject(
                    IssueCode::GenerationGap,
                    "parent and child must be exactly one generation apart".to_string(),
                );
            }
            if gap != 1 {
                return v.reject(
                    IssueCode::ParentOrder,
                    format!("{} is in a younger generation than {}", name(a), name(b)),
                );
            }
            if adj.parents_of(to).len() >= 2 {
                return v.reject(
                    IssueCode::TooManyParents,
                    format!("{} already has two parents", name(b)),
                );
            }
            if let (Some(pb), Some(cb)) = (a.profile.birth_date, b.profile.birth_date) {
                let years = whole_years_between(pb, cb);
                if years < cfg.min_parent_age_years as i32 {
                    return v.reject(
                        IssueCode::ParentTooYoung,
                        format!(
                            "{} must be at least {} years older than {}",
                            name(a),
                            cfg.min_parent_age_years,
                            name(b)
                        ),
                    );
                }
                if years > cfg.max_parent_age_gap_years as i32 {
                    v.warn(
                        IssueCode::LargeAgeGap,
                        format!("{} is {} years older than {}", name(a), years, name(b)),
                    );
                }
            }
        }
        RelationshipKind::Sibling => {
            if a.generation != b.generation {
                return v.reject(
                    IssueCode::GenerationMismatch,
                    "siblings must be in the same generation".to_string(),
                );
            }
        }
    }

    if would_create_cycle(graph, from, to, kind) {
        return v.reject(
            IssueCode::Cycle,
            format!("{} cannot be their own ancestor", name(b)),
        );
    }
    v
}

/// A new `parent-child` edge closes a cycle when the child already is an
/// ancestor of the parent. Spouse and sibling links between an ancestor and
/// its descendant fold back onto the same line and are refused as well.
pub fn would_create_cycle(
    graph: &FamilyGraph,
    from: PersonId,
    to: PersonId,
    kind: RelationshipKind,
) -> bool {
    let adj = graph.adjacency();
    match kind {
        RelationshipKind::ParentChild => from == to || adj.is_ancestor(to, from),
        RelationshipKind::Spouse | RelationshipKind::Sibling => {
            adj.is_ancestor(from, to) || adj.is_ancestor(to, from)
        }
    }
}

fn name(p: &Person) -> String {
    p.profile.display_name()
}

/// Completed years from `earlier` to `later`; negative when `later` precedes it.
fn whole_years_between(earlier: NaiveDate, later: NaiveDate) -> i32 {
    let mut years = later.year() - earlier.year();
    if (later.month(), later.day()) < (earlier.month(), earlier.day()) {
        years -= 1;
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn whole_years_counts_birthdays() {
        assert_eq!(whole_years_between(d(1960, 5, 10), d(1976, 5, 10)), 16);
        assert_eq!(whole_years_between(d(1960, 5, 10), d(1976, 5, 9)), 15);
        assert_eq!(whole_years_between(d(1980, 1, 1), d(1970, 1, 1)), -10);
    }

    #[test]
    fn display_uses_first_blocking_issue() {
        let mut v = Validation::default();
        v.warn(IssueCode::LargeAgeGap, "gap".to_string());
        assert!(v.is_ok());
        let v = v.reject(IssueCode::Cycle, "loop".to_string());
        assert!(!v.is_ok());
        assert_eq!(v.to_string(), "loop");
    }
}
