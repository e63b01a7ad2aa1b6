//! JSON file catalog
//!
//! Offline catalog source: dataset kinds and rules load from two JSON
//! files. Requirement strings normalize into typed token sets once, at
//! load, so the resolver never re-parses them.

use std::path::Path;

use tokio::fs;

use shared::{DatasetKind, Rule};

use crate::error::{EngineError, EngineResult};
use crate::traits::CatalogSource;

/// In-memory catalog loaded from JSON files
#[derive(Debug)]
pub struct JsonCatalog {
    kinds: Vec<DatasetKind>,
    rules: Vec<Rule>,
}

impl JsonCatalog {
    /// Load and normalize both catalog files
    pub async fn load(kinds_path: &Path, rules_path: &Path) -> EngineResult<Self> {
        let kinds_raw = fs::read_to_string(kinds_path).await.map_err(|e| {
            EngineError::catalog(format!("{}: {e}", kinds_path.display()))
        })?;
        let kinds: Vec<DatasetKind> = serde_json::from_str(&kinds_raw)
            .map_err(|e| EngineError::catalog(format!("{}: {e}", kinds_path.display())))?;

        let rules_raw = fs::read_to_string(rules_path).await.map_err(|e| {
            EngineError::catalog(format!("{}: {e}", rules_path.display()))
        })?;
        let mut rules: Vec<Rule> = serde_json::from_str(&rules_raw)
            .map_err(|e| EngineError::catalog(format!("{}: {e}", rules_path.display())))?;
        for rule in &mut rules {
            rule.normalize_requirements();
        }

        Ok(Self { kinds, rules })
    }

    pub fn from_parts(kinds: Vec<DatasetKind>, mut rules: Vec<Rule>) -> Self {
        for rule in &mut rules {
            rule.normalize_requirements();
        }
        Self { kinds, rules }
    }
}

#[async_trait::async_trait]
impl CatalogSource for JsonCatalog {
    async fn dataset_kinds(&self, _audit_id: &str) -> EngineResult<Vec<DatasetKind>> {
        // A file catalog carries one audit's required set
        Ok(self.kinds.clone())
    }

    async fn list_rules(&self) -> EngineResult<Vec<Rule>> {
        Ok(self.rules.clone())
    }

    async fn rules_by_ids(&self, ids: &[String]) -> EngineResult<Vec<Rule>> {
        Ok(self
            .rules
            .iter()
            .filter(|rule| ids.contains(&rule.id))
            .cloned()
            .collect())
    }
}
