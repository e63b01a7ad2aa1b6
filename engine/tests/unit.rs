//! Unit tests for individual engine components
//!
//! These tests verify the resolver, aggregation, and selection logic
//! against the fixture catalog, plus workspace-level derived state.

mod common;

use std::collections::HashSet;

use common::{TestFixtures, TestHelpers, WorkspaceBuilder};
use engine::core::run::{self, RuleExecution};
use engine::core::runnability;

fn validated(names: &[&str]) -> HashSet<String> {
    names
        .iter()
        .map(|name| shared::normalize_kind_name(name))
        .collect()
}

/// Scenario: nothing validated; only the prerequisite-free rule may run
#[test]
fn test_empty_validated_set_leaves_only_free_rule_runnable() {
    // Arrange
    let rules = TestFixtures::rules();

    // Act
    let partition = runnability::resolve(&rules, &HashSet::new());

    // Assert
    let runnable: Vec<_> = partition.runnable.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(runnable, [TestFixtures::RULE_FREE]);
    assert_eq!(partition.not_runnable.len(), rules.len() - 1);
}

/// Scenario: a two-kind requirement flips with each validated kind
#[test]
fn test_two_kind_requirement_needs_both_kinds() {
    // Arrange
    let rule = TestFixtures::rule(TestFixtures::RULE_RECON);

    // Act & Assert
    let both = validated(&["Fatura Listesi (GİB)", "Yevmiye Defteri"]);
    assert!(runnability::is_runnable(&rule, &both));

    let only_invoices = validated(&["Fatura Listesi (GİB)"]);
    assert!(!runnability::is_runnable(&rule, &only_invoices));

    let only_journal = validated(&["Yevmiye Defteri"]);
    assert!(!runnability::is_runnable(&rule, &only_journal));
}

/// Resolution is a pure function: identical inputs, identical partitions
#[test]
fn test_resolution_is_idempotent_over_fixture_catalog() {
    // Arrange
    let rules = TestFixtures::rules();
    let names = validated(&["Banka Ekstreleri", "KDV1 Beyannamesi"]);

    // Act
    let first = runnability::resolve(&rules, &names);
    let second = runnability::resolve(&rules, &names);

    // Assert
    let ids = |rules: &[shared::Rule]| rules.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first.runnable), ids(&second.runnable));
    assert_eq!(ids(&first.not_runnable), ids(&second.not_runnable));
    assert_eq!(
        first.runnable.len() + first.not_runnable.len(),
        rules.len()
    );
}

/// One failed rule is excluded from findings without failing the others
#[test]
fn test_aggregation_isolates_per_rule_failures() {
    // Arrange
    let outcomes = vec![
        RuleExecution::Failed {
            rule: TestFixtures::rule(TestFixtures::RULE_INVOICE),
            message: "relation does not exist".to_string(),
        },
        RuleExecution::Completed {
            rule: TestFixtures::rule(TestFixtures::RULE_RECON),
            rows: vec![
                TestFixtures::raw_row("Mutabakat farkı", 1250.0),
                TestFixtures::raw_row("Mutabakat farkı", 990.5),
            ],
        },
    ];

    // Act
    let aggregated = run::aggregate(outcomes);

    // Assert
    assert_eq!(aggregated.executed_count, 1);
    assert_eq!(aggregated.findings.len(), 2);
    assert_eq!(aggregated.failed_rules.len(), 1);
    assert!(aggregated
        .findings
        .iter()
        .all(|f| f.rule_id == TestFixtures::RULE_RECON));
}

/// Boundary defaults: missing description templates the rule id, missing
/// details become an empty map
#[test]
fn test_row_defaults_applied_during_aggregation() {
    // Arrange
    let outcomes = vec![RuleExecution::Completed {
        rule: TestFixtures::rule(TestFixtures::RULE_BANK),
        rows: vec![TestFixtures::bare_row(40_000.0)],
    }];

    // Act
    let aggregated = run::aggregate(outcomes);

    // Assert
    let finding = &aggregated.findings[0];
    assert!(finding.description.contains(TestFixtures::RULE_BANK));
    assert!(finding.details.is_empty());
    assert_eq!(finding.amount, 40_000.0);
}

/// Category toggling touches only currently-runnable members
#[test]
fn test_category_toggle_respects_runnability() {
    // Arrange: only the invoice list is validated, so within KDV/Beyan the
    // invoice rule is runnable and the VAT/journal rule is not
    let rules = TestFixtures::rules();
    let names = validated(&["Fatura Listesi (GİB)"]);
    let partition = runnability::resolve(&rules, &names);
    let runnable_ids: Vec<String> = partition
        .runnable
        .iter()
        .filter(|r| r.category == "KDV/Beyan")
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(runnable_ids, [TestFixtures::RULE_INVOICE]);

    let mut selected = HashSet::new();

    // Act & Assert
    runnability::toggle_category(&mut selected, &runnable_ids);
    assert!(selected.contains(TestFixtures::RULE_INVOICE));
    assert!(!selected.contains(TestFixtures::RULE_VAT_JOURNAL));

    runnability::toggle_category(&mut selected, &runnable_ids);
    assert!(selected.is_empty());
}

/// The derived validated set is normalized and recomputed per consult
#[tokio::test]
async fn test_workspace_validated_names_are_normalized() {
    // Arrange
    let workspace = WorkspaceBuilder::new().build().await;
    assert!(workspace.validated_kind_names().await.is_empty());

    // Act
    TestHelpers::validate_kinds(&workspace, &["Fatura Listesi (GİB)"]).await;

    // Assert: parenthetical suffix stripped in the derived set
    let names = workspace.validated_kind_names().await;
    assert!(names.contains("Fatura Listesi"));
    assert_eq!(names.len(), 1);
}

/// Validation progress weights Uploaded at half and Validated at full
#[tokio::test]
async fn test_validation_progress_over_workspace() {
    // Arrange
    let workspace = WorkspaceBuilder::new().build().await;
    let before = workspace.validation_progress().await;
    assert_eq!(before.percentage, 0);
    assert_eq!(before.total_count, 5);

    // Act
    TestHelpers::validate_kinds(&workspace, &["Banka Ekstreleri", "Yevmiye Defteri"]).await;

    // Assert: 2 of 5 validated → 200/5 = 40%
    let after = workspace.validation_progress().await;
    assert_eq!(after.validated_count, 2);
    assert_eq!(after.percentage, 40);
}
