//! Structural content validation
//!
//! Schema/structure checks on uploaded payloads: the file must exist and
//! be non-empty, XML ledger kinds must open like an XML document, and
//! tabular kinds must carry their expected header columns. Error messages
//! use the auditor-facing Turkish vocabulary the store already holds.

use std::path::Path;

use tokio::fs;

use shared::DatasetRecord;

use crate::error::EngineResult;
use crate::traits::{ContentValidator, ValidationOutcome};

/// Deterministic structural validator
pub struct StructuralValidator;

impl StructuralValidator {
    /// Kinds delivered as XML documents rather than tabular files
    const XML_KINDS: &'static [&'static str] = &["Yevmiye Defteri", "e-İrsaliye Listesi"];

    /// Expected header columns per tabular kind; kinds not listed here are
    /// accepted on the existence/non-empty checks alone
    fn expected_columns(kind_name: &str) -> &'static [&'static str] {
        match kind_name {
            "Fatura Listesi (GİB)" => &["tarih", "tutar", "fatura_no"],
            "Defter-i Kebir" => &["hesap_kodu", "bakiye"],
            "Banka Ekstreleri" => &["IBAN", "aciklama", "bakiye"],
            "KDV1 Beyannamesi" => &["donem", "matrah", "hesaplanan_kdv"],
            "Bordro Kayıtları (MUHSGK)" => &["sicil_no", "brut_ucret"],
            _ => &[],
        }
    }

    fn is_xml_kind(kind_name: &str) -> bool {
        Self::XML_KINDS.contains(&kind_name)
    }
}

#[async_trait::async_trait]
impl ContentValidator for StructuralValidator {
    async fn validate(
        &self,
        record: &DatasetRecord,
        staged_path: &Path,
    ) -> EngineResult<ValidationOutcome> {
        let bytes = match fs::read(staged_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(ValidationOutcome::reject(format!(
                    "Yüklenen dosya okunamadı: {e}"
                )))
            }
        };
        if bytes.is_empty() {
            return Ok(ValidationOutcome::reject("Yüklenen dosya boş."));
        }

        let kind_name = record.kind.name.as_str();
        let text = String::from_utf8_lossy(&bytes);

        if Self::is_xml_kind(kind_name) {
            let head = text.trim_start();
            if !head.starts_with("<?xml") && !head.starts_with('<') {
                return Ok(ValidationOutcome::reject(
                    "Geçersiz XML: belge bir XML bildirimi veya kök öğe ile başlamıyor.",
                ));
            }
            return Ok(ValidationOutcome::accept());
        }

        let expected = Self::expected_columns(kind_name);
        if !expected.is_empty() {
            let header = text.lines().next().unwrap_or("");
            for column in expected {
                if !header.contains(column) {
                    return Ok(ValidationOutcome::reject(format!(
                        "'{column}' sütunu başlık satırında bulunamadı."
                    )));
                }
            }
        }

        Ok(ValidationOutcome::accept())
    }
}
