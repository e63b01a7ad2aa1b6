//! Test fixtures and data for engine tests
//!
//! This module provides consistent test data used across all test suites:
//! the dataset kind catalog and rule catalog of a typical audit.

use chrono::NaiveDate;
use shared::{Audit, AuditStatus, DatasetKind, Domain, RawFindingRow, Rule, Severity};
use std::collections::HashMap;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const AUDIT_ID: &'static str = "AUD-2024-001";

    /// Rule requiring only the invoice list
    pub const RULE_INVOICE: &'static str = "VT-001";
    /// Rule requiring the VAT return and the journal
    pub const RULE_VAT_JOURNAL: &'static str = "VT-004";
    /// Rule requiring the invoice list and the journal
    pub const RULE_RECON: &'static str = "MA-002";
    /// Rule requiring bank statements
    pub const RULE_BANK: &'static str = "BA-003";
    /// Rule with no prerequisite at all
    pub const RULE_FREE: &'static str = "GN-005";

    pub fn audit() -> Audit {
        Audit {
            id: Self::AUDIT_ID.to_string(),
            company: "Örnek Ticaret A.Ş.".to_string(),
            title: "2024 KDV Denetimi".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            status: AuditStatus::Active,
        }
    }

    /// Required dataset kinds for the test audit
    pub fn dataset_kinds() -> Vec<DatasetKind> {
        let kinds = [
            ("Fatura Listesi (GİB)", "e-Fatura, e-Arşiv, e-İrsaliye kayıtları."),
            ("Yevmiye Defteri", "Muhasebe fişlerini içeren yevmiye kayıtları."),
            ("Defter-i Kebir", "Büyük defter hesap hareketleri."),
            ("Banka Ekstreleri", "Tüm banka hesap hareketlerini içeren ekstreler."),
            ("KDV1 Beyannamesi", "Aylık Katma Değer Vergisi beyannameleri."),
        ];
        kinds
            .iter()
            .map(|(name, description)| DatasetKind {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect()
    }

    /// Rule catalog with varied prerequisites, normalized and in catalog order
    pub fn rules() -> Vec<Rule> {
        let specs: [(&str, &str, &str, Domain, Severity, &str); 5] = [
            (
                Self::RULE_INVOICE,
                "Negatif tutarlı fatura kontrolü",
                "KDV/Beyan",
                Domain::Vat,
                Severity::Medium,
                "Fatura Listesi (GİB)",
            ),
            (
                Self::RULE_VAT_JOURNAL,
                "KDV beyanı ile yevmiye tutarlılığı",
                "KDV/Beyan",
                Domain::Vat,
                Severity::High,
                "KDV1 Beyannamesi, Yevmiye Defteri",
            ),
            (
                Self::RULE_RECON,
                "Fatura ve yevmiye mutabakatı",
                "Muhasebe/Anomali",
                Domain::Invoice,
                Severity::Medium,
                "Fatura Listesi (GİB), Yevmiye Defteri",
            ),
            (
                Self::RULE_BANK,
                "Mükerrer banka transferi tespiti",
                "Karşı Taraf",
                Domain::Bank,
                Severity::High,
                "Banka Ekstreleri",
            ),
            (
                Self::RULE_FREE,
                "Mükellef genel risk profili",
                "Genel",
                Domain::Invoice,
                Severity::Low,
                "",
            ),
        ];
        specs
            .iter()
            .map(|(id, description, category, domain, severity, required)| {
                let mut rule = Rule {
                    id: id.to_string(),
                    description: description.to_string(),
                    category: category.to_string(),
                    domain: *domain,
                    severity: *severity,
                    required_data: required.to_string(),
                    required_kinds: Vec::new(),
                    logic: format!(
                        "select * from bulgular where audit_id = ?audit_id and kural = '{id}'"
                    ),
                    parameters: Vec::new(),
                };
                rule.normalize_requirements();
                rule
            })
            .collect()
    }

    pub fn rule(id: &str) -> Rule {
        Self::rules()
            .into_iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("unknown fixture rule {id}"))
    }

    /// A raw executor row with every optional field present
    pub fn raw_row(description: &str, amount: f64) -> RawFindingRow {
        RawFindingRow {
            description: Some(description.to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            amount,
            details: Some(HashMap::from([(
                "fatura_no".to_string(),
                "F-2024-0042".to_string(),
            )])),
        }
    }

    /// A raw executor row with all optional fields missing
    pub fn bare_row(amount: f64) -> RawFindingRow {
        RawFindingRow {
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            amount,
            details: None,
        }
    }
}
