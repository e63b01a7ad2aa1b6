//! Run outcome aggregation
//!
//! Each rule execution is an independent unit of work whose failure is
//! captured, never unwinding the run. Results are merged only after all
//! per-rule calls complete.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use shared::{Finding, FindingId, RawFindingRow, Rule};

/// Outcome of one rule's execution against the query executor
#[derive(Debug, Clone)]
pub enum RuleExecution {
    /// Rule ran; zero or more raw rows came back
    Completed { rule: Rule, rows: Vec<RawFindingRow> },
    /// Rule ran and failed (query error or timeout); absorbed, not a run
    /// failure and not a skip
    Failed { rule: Rule, message: String },
}

/// Merged result of all per-rule executions in one run
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    pub findings: Vec<Finding>,
    /// Rules that executed without a per-rule error
    pub executed_count: usize,
    /// (rule id, cause) for rules that ran and failed
    pub failed_rules: Vec<(String, String)>,
}

/// Build a finding from a raw executor row, applying the boundary
/// defaults: missing description becomes the rule-id template, missing
/// details an empty map. Domain and severity come from the owning rule.
pub fn finding_from_row(rule: &Rule, row: RawFindingRow) -> Finding {
    Finding {
        id: FindingId::new(),
        rule_id: rule.id.clone(),
        description: row
            .description
            .unwrap_or_else(|| format!("Bulgu, {} kuralı tarafından tespit edildi", rule.id)),
        domain: rule.domain,
        severity: rule.severity,
        date: row.date,
        amount: row.amount,
        details: row.details.unwrap_or_default(),
        case_id: None,
    }
}

/// Content fingerprint over rule id, description, date, amount and sorted
/// details; identical rows collapse to one finding within a batch
pub fn fingerprint(finding: &Finding) -> String {
    let mut hasher = Sha256::new();
    hasher.update(finding.rule_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(finding.description.as_bytes());
    hasher.update([0x1f]);
    hasher.update(finding.date.to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(finding.amount.to_le_bytes());
    let mut entries: Vec<_> = finding.details.iter().collect();
    entries.sort();
    for (key, value) in entries {
        hasher.update([0x1f]);
        hasher.update(key.as_bytes());
        hasher.update([0x1e]);
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Merge per-rule outcomes: findings from completed rules (deduplicated by
/// fingerprint within the batch), the executed count, and the failures for
/// the caller to log
pub fn aggregate(outcomes: Vec<RuleExecution>) -> Aggregated {
    let mut aggregated = Aggregated::default();
    let mut seen = HashSet::new();
    for outcome in outcomes {
        match outcome {
            RuleExecution::Completed { rule, rows } => {
                aggregated.executed_count += 1;
                for row in rows {
                    let finding = finding_from_row(&rule, row);
                    if seen.insert(fingerprint(&finding)) {
                        aggregated.findings.push(finding);
                    }
                }
            }
            RuleExecution::Failed { rule, message } => {
                aggregated.failed_rules.push((rule.id, message));
            }
        }
    }
    aggregated
}
