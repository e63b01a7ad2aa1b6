//! Narrative finding analysis
//!
//! Single request/response collaborator: a finding goes in, a structured
//! Turkish analyst report comes back from a Gemini-style generateContent
//! endpoint. The API key loads from the environment (`.env` supported).

use reqwest::Client;
use serde_json::json;

use shared::Finding;

use crate::error::{EngineError, EngineResult};
use crate::traits::FindingAnalyst;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini-backed analyst
pub struct GeminiAnalyst {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiAnalyst {
    /// Environment variable holding the analyst API key
    pub const API_KEY_VAR: &'static str = "ANALYST_API_KEY";

    pub fn from_env() -> EngineResult<Self> {
        let _ = dotenv::dotenv();
        let api_key = std::env::var(Self::API_KEY_VAR).map_err(|_| {
            EngineError::analyst(format!("{} is not set", Self::API_KEY_VAR))
        })?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// The structured auditor prompt: explanation, likely causes, and
    /// recommended next steps, reported in Turkish
    fn build_prompt(finding: &Finding) -> String {
        format!(
            "You are an expert financial auditor assistant. Analyze the following tax \
             finding and provide a structured report.\n\n\
             Bulgu Detayları:\n\
             - Description: {}\n\
             - Domain: {}\n\
             - Severity: {}\n\
             - Date: {}\n\
             - Amount: {:.2} TRY\n\
             - Associated Data: {}\n\n\
             Your report must be in Turkish and have the following sections, formatted in Markdown:\n\n\
             ### Açıklama\n\
             Explain what this finding means in simple, practical terms for a tax inspector.\n\n\
             ### Olası Nedenler\n\
             List potential root causes for this finding, ranging from simple errors to \
             fraudulent activity. Use a numbered list.\n\n\
             ### Önerilen Adımlar\n\
             Provide a list of concrete, actionable next steps for the auditor to investigate \
             this finding further. Use a numbered list.",
            finding.description,
            finding.domain,
            finding.severity,
            finding.date,
            finding.amount,
            serde_json::to_string(&finding.details).unwrap_or_else(|_| "{}".to_string()),
        )
    }
}

#[async_trait::async_trait]
impl FindingAnalyst for GeminiAnalyst {
    async fn analyze(&self, finding: &Finding) -> EngineResult<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": Self::build_prompt(finding) }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::analyst(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::analyst(format!(
                "analysis service returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::analyst(format!("malformed response: {e}")))?;

        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineError::analyst("response carried no analysis text"))
    }
}
