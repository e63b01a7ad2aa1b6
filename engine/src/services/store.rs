//! REST store client
//!
//! Reaches the opaque relational store over its REST/RPC surface: rule and
//! dataset catalog reads, dynamic rule-query execution, and batch finding
//! inserts. Credentials load from the environment (`.env` supported).
//!
//! Failure mapping follows the run contract: a request that never reaches
//! the store is transport-level (`RunExecution`, fails the whole run); an
//! error response to a rule query is query-level (`QueryFailed`, absorbed
//! per rule).

use reqwest::Client;
use serde_json::json;

use shared::{DatasetKind, Finding, RawFindingRow, Rule, RunId};

use crate::error::{EngineError, EngineResult};
use crate::traits::{CatalogSource, FindingStore, QueryExecutor};

/// REST client for the relational store
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// Environment variable holding the store's base URL
    pub const URL_VAR: &'static str = "AUDIT_STORE_URL";
    /// Environment variable holding the store's API key
    pub const KEY_VAR: &'static str = "AUDIT_STORE_KEY";

    /// Build a client from environment variables, loading `.env` if present
    pub fn from_env() -> EngineResult<Self> {
        let _ = dotenv::dotenv();
        let base_url = std::env::var(Self::URL_VAR).map_err(|_| {
            EngineError::storage("configure", format!("{} is not set", Self::URL_VAR))
        })?;
        let api_key = std::env::var(Self::KEY_VAR).map_err(|_| {
            EngineError::storage("configure", format!("{} is not set", Self::KEY_VAR))
        })?;
        Ok(Self::new(base_url, api_key))
    }

    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait::async_trait]
impl QueryExecutor for RestStore {
    async fn execute(&self, logic: &str, audit_id: &str) -> EngineResult<Vec<RawFindingRow>> {
        // Scope the opaque fragment to the audit before dispatch
        let prepared = logic.replace("?audit_id", &format!("'{audit_id}'"));

        let response = self
            .authorized(self.client.post(self.endpoint("rest/v1/rpc/execute_dynamic_sql")))
            .json(&json!({ "p_sql": prepared }))
            .send()
            .await
            .map_err(|e| EngineError::run_execution(format!("query executor unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::query_failed(format!("{status}: {body}")));
        }

        response
            .json::<Vec<RawFindingRow>>()
            .await
            .map_err(|e| EngineError::query_failed(format!("malformed result set: {e}")))
    }
}

#[async_trait::async_trait]
impl FindingStore for RestStore {
    async fn insert_findings(
        &self,
        audit_id: &str,
        run_id: RunId,
        findings: &[Finding],
    ) -> EngineResult<()> {
        if findings.is_empty() {
            return Ok(());
        }

        let rows: Vec<serde_json::Value> = findings
            .iter()
            .map(|f| {
                json!({
                    "audit_id": audit_id,
                    "run_id": run_id.to_string(),
                    "rule_id": f.rule_id,
                    "description": f.description,
                    "domain": f.domain,
                    "severity": f.severity,
                    "date": f.date,
                    "amount": f.amount,
                    "details": f.details,
                })
            })
            .collect();

        let response = self
            .authorized(self.client.post(self.endpoint("rest/v1/anomalies")))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(|e| EngineError::storage("insert_findings", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::storage(
                "insert_findings",
                format!("{status}: {body}"),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogSource for RestStore {
    async fn dataset_kinds(&self, audit_id: &str) -> EngineResult<Vec<DatasetKind>> {
        let response = self
            .authorized(self.client.get(self.endpoint("rest/v1/audit_dataset_kinds")))
            .query(&[("audit_id", format!("eq.{audit_id}")), ("select", "name,description".to_string())])
            .send()
            .await
            .map_err(|e| EngineError::catalog(format!("dataset kinds fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::catalog(format!(
                "dataset kinds fetch failed: {}",
                response.status()
            )));
        }
        response
            .json::<Vec<DatasetKind>>()
            .await
            .map_err(|e| EngineError::catalog(format!("malformed dataset kinds: {e}")))
    }

    async fn list_rules(&self) -> EngineResult<Vec<Rule>> {
        let response = self
            .authorized(self.client.get(self.endpoint("rest/v1/rules")))
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| EngineError::catalog(format!("rule fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::catalog(format!(
                "rule fetch failed: {}",
                response.status()
            )));
        }
        let mut rules = response
            .json::<Vec<Rule>>()
            .await
            .map_err(|e| EngineError::catalog(format!("malformed rules: {e}")))?;
        for rule in &mut rules {
            rule.normalize_requirements();
        }
        Ok(rules)
    }

    async fn rules_by_ids(&self, ids: &[String]) -> EngineResult<Vec<Rule>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_list = format!("in.({})", ids.join(","));
        let response = self
            .authorized(self.client.get(self.endpoint("rest/v1/rules")))
            .query(&[("id", id_list), ("select", "*".to_string())])
            .send()
            .await
            .map_err(|e| EngineError::catalog(format!("rule fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::catalog(format!(
                "rule fetch failed: {}",
                response.status()
            )));
        }
        // Ids that no longer exist simply do not come back
        let mut rules = response
            .json::<Vec<Rule>>()
            .await
            .map_err(|e| EngineError::catalog(format!("malformed rules: {e}")))?;
        for rule in &mut rules {
            rule.normalize_requirements();
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let store = RestStore::new("https://store.example.com/".to_string(), "key".to_string());
        assert_eq!(
            store.endpoint("rest/v1/rules"),
            "https://store.example.com/rest/v1/rules"
        );
    }

    #[test]
    fn audit_scope_substitution_quotes_the_id() {
        let logic = "select * from faturalar where audit_id = ?audit_id and tutar < 0";
        let prepared = logic.replace("?audit_id", &format!("'{}'", "AUD-7"));
        assert!(prepared.contains("audit_id = 'AUD-7'"));
    }
}
