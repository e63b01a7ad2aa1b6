//! Rule runnability resolution
//!
//! Pure functions: no side effects, no I/O. Requirement tokens are
//! normalized once at catalog load (`Rule::normalize_requirements`); both
//! sides of the membership check use [`shared::normalize_kind_name`].

use std::collections::{BTreeMap, HashSet};

use shared::Rule;

/// Partition of a rule set into runnable / not-runnable, preserving the
/// input order in both halves
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub runnable: Vec<Rule>,
    pub not_runnable: Vec<Rule>,
}

/// A rule is runnable when every normalized requirement token is a member
/// of the validated set. A rule with no tokens after filtering has no
/// prerequisite and is always runnable.
pub fn is_runnable(rule: &Rule, validated_kind_names: &HashSet<String>) -> bool {
    rule.required_kinds
        .iter()
        .all(|kind| validated_kind_names.contains(kind))
}

/// Split rules by current runnability. Deterministic: identical inputs
/// always yield identical partitions.
pub fn resolve(rules: &[Rule], validated_kind_names: &HashSet<String>) -> Partition {
    let mut partition = Partition::default();
    for rule in rules {
        if is_runnable(rule, validated_kind_names) {
            partition.runnable.push(rule.clone());
        } else {
            partition.not_runnable.push(rule.clone());
        }
    }
    partition
}

/// Group rules by category, preserving catalog order within each group
pub fn rules_by_category(rules: &[Rule]) -> BTreeMap<String, Vec<Rule>> {
    let mut groups: BTreeMap<String, Vec<Rule>> = BTreeMap::new();
    for rule in rules {
        groups.entry(rule.category.clone()).or_default().push(rule.clone());
    }
    groups
}

/// Derived, never stored: true when the category has runnable rules and
/// every one of them is selected
pub fn all_runnable_selected(runnable_ids: &[String], selected: &HashSet<String>) -> bool {
    !runnable_ids.is_empty() && runnable_ids.iter().all(|id| selected.contains(id))
}

/// Toggle a single rule id in the caller-owned selection set
pub fn toggle_rule(selected: &mut HashSet<String>, rule_id: &str) {
    if !selected.remove(rule_id) {
        selected.insert(rule_id.to_string());
    }
}

/// Toggle a category: only the currently-runnable members move. Selection
/// state of non-runnable members is left untouched, so it survives them
/// becoming runnable later.
pub fn toggle_category(selected: &mut HashSet<String>, runnable_ids: &[String]) {
    if all_runnable_selected(runnable_ids, selected) {
        for id in runnable_ids {
            selected.remove(id);
        }
    } else {
        for id in runnable_ids {
            selected.insert(id.clone());
        }
    }
}
