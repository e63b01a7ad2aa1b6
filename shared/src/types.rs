//! Core domain types for the audit engine
//!
//! Wire values follow the relational store's Turkish display strings, so
//! every enum serializes to the value the store already holds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::errors::SharedError;

/// Unique identifier for a dataset record inside an audit workspace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one orchestrated run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a finding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingId(Uuid);

impl FindingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Finding severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "Yüksek")]
    High,
    #[serde(rename = "Orta")]
    Medium,
    #[serde(rename = "Düşük")]
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "Yüksek",
            Severity::Medium => "Orta",
            Severity::Low => "Düşük",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yüksek" => Ok(Severity::High),
            "Orta" => Ok(Severity::Medium),
            "Düşük" => Ok(Severity::Low),
            other => Err(SharedError::InvalidSeverity {
                input: other.to_string(),
            }),
        }
    }
}

/// Business domain a rule or finding belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "KDV")]
    Vat,
    #[serde(rename = "Fatura")]
    Invoice,
    #[serde(rename = "Bordro")]
    Payroll,
    #[serde(rename = "Banka")]
    Bank,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Vat => "KDV",
            Domain::Invoice => "Fatura",
            Domain::Payroll => "Bordro",
            Domain::Bank => "Banka",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KDV" => Ok(Domain::Vat),
            "Fatura" => Ok(Domain::Invoice),
            "Bordro" => Ok(Domain::Payroll),
            "Banka" => Ok(Domain::Bank),
            other => Err(SharedError::InvalidDomain {
                input: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of an audit engagement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    #[serde(rename = "Aktif")]
    Active,
    #[serde(rename = "Tamamlandı")]
    Completed,
    #[serde(rename = "Planlandı")]
    Planned,
}

/// An audit engagement the workspace is opened for
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,
    pub company: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: AuditStatus,
}

/// Named category of required source data, e.g. "Yevmiye Defteri"
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetKind {
    /// Unique within an audit's required set; the join key rules reference
    pub name: String,
    pub description: String,
}

/// Upload/validation lifecycle state of a dataset record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetStatus {
    #[serde(rename = "Bekleniyor")]
    Waiting,
    #[serde(rename = "Yükleniyor")]
    Uploading,
    #[serde(rename = "Yüklendi")]
    Uploaded,
    #[serde(rename = "Doğrulandı")]
    Validated,
    #[serde(rename = "Hatalı")]
    Error,
}

impl DatasetStatus {
    /// Terminal per attempt: Validated succeeds, Error awaits retry
    pub fn is_terminal(&self) -> bool {
        matches!(self, DatasetStatus::Validated | DatasetStatus::Error)
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatasetStatus::Waiting => "Bekleniyor",
            DatasetStatus::Uploading => "Yükleniyor",
            DatasetStatus::Uploaded => "Yüklendi",
            DatasetStatus::Validated => "Doğrulandı",
            DatasetStatus::Error => "Hatalı",
        };
        write!(f, "{s}")
    }
}

/// Per-audit instance tracking one dataset kind's lifecycle
///
/// Owned exclusively by the workspace session; created at audit open and
/// discarded when the session ends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: RecordId,
    pub kind: DatasetKind,
    pub status: DatasetStatus,
    pub error_message: Option<String>,
    pub source_file_name: Option<String>,
    /// Advisory transfer fraction in [0, 1]; observability only
    pub upload_progress: f32,
}

impl DatasetRecord {
    /// Fresh record in the initial Waiting state
    pub fn waiting(kind: DatasetKind) -> Self {
        Self {
            id: RecordId::new(),
            kind,
            status: DatasetStatus::Waiting,
            error_message: None,
            source_file_name: None,
            upload_progress: 0.0,
        }
    }
}

/// Input widget type of a tunable rule parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Number,
    Text,
    Date,
    Select,
}

/// Tunable parameter attached to a rule; opaque to the run engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleParameter {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A detection check with a prerequisite set of dataset kinds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub description: String,
    pub category: String,
    pub domain: Domain,
    pub severity: Severity,
    /// Raw comma-separated requirement string as maintained in the catalog
    pub required_data: String,
    /// Normalized requirement tokens. Catalog loaders fill this once via
    /// [`Rule::normalize_requirements`]; the resolver consults it instead of
    /// re-parsing `required_data` on every call.
    #[serde(skip)]
    pub required_kinds: Vec<String>,
    /// Opaque executable query fragment, scoped to an audit at run time
    pub logic: String,
    #[serde(default)]
    pub parameters: Vec<RuleParameter>,
}

impl Rule {
    /// Compute the normalized requirement token set from `required_data`
    pub fn normalize_requirements(&mut self) {
        self.required_kinds = parse_required_data(&self.required_data);
    }
}

/// Normalize one dataset kind name for requirement matching: trim, then
/// drop a trailing parenthetical suffix ("Fatura Listesi (GİB)" matches by
/// its pre-parenthesis name), then trim again. Comparison stays
/// case-sensitive.
pub fn normalize_kind_name(name: &str) -> String {
    let trimmed = name.trim();
    let base = match trimmed.find('(') {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    };
    base.to_string()
}

/// Split a comma-separated requirement string into normalized tokens.
/// Empty tokens (trailing or doubled commas) are discarded, not treated as
/// an unmet requirement.
pub fn parse_required_data(required_data: &str) -> Vec<String> {
    required_data
        .split(',')
        .map(normalize_kind_name)
        .filter(|token| !token.is_empty())
        .collect()
}

/// One row returned by the query executor for a rule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawFindingRow {
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default)]
    pub details: Option<HashMap<String, String>>,
}

/// One detected irregularity produced by running a rule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub rule_id: String,
    pub description: String,
    pub domain: Domain,
    pub severity: Severity,
    pub date: NaiveDate,
    /// Decimal currency value; the core performs no rounding
    pub amount: f64,
    pub details: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
}

impl Finding {
    /// Attach a case id; the only mutation findings allow after creation
    pub fn attach_case(&mut self, case_id: String) {
        self.case_id = Some(case_id);
    }
}

/// Outcome of one orchestrated run over a chosen rule subset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub found_findings: Vec<Finding>,
    /// Chosen but not runnable, in resolver output order
    pub skipped_rules: Vec<Rule>,
    /// Runnable rules that executed without a per-rule error
    pub run_rule_count: usize,
}
