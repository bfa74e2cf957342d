use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{FerrtextError, JsonSnafu};

/// Reconstructed text of one physical page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub page_number: usize,
    pub text: String,
    pub has_columns: bool,
}

/// Outcome of extracting a whole document.
///
/// `success` is false only when the document could not be ingested at all;
/// pages without text are still a successful, possibly empty, result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    pub success: bool,
    pub pages: Vec<PageResult>,
    pub full_text: String,
    pub error: Option<String>,
}

impl DocumentResult {
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            pages: Vec::new(),
            full_text: String::new(),
            error: Some(error.to_string()),
        }
    }

    /// Pretty JSON with non-ASCII text kept as is.
    pub fn to_json(&self) -> Result<String, FerrtextError> {
        serde_json::to_string_pretty(self).context(JsonSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_result_wire_format() {
        let result = DocumentResult {
            success: true,
            pages: vec![PageResult {
                page_number: 1,
                text: "Hello world".to_string(),
                has_columns: false,
            }],
            full_text: "Hello world".to_string(),
            error: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "pages": [{"pageNumber": 1, "text": "Hello world", "hasColumns": false}],
                "fullText": "Hello world",
                "error": null
            })
        );
    }

    #[test]
    fn test_to_json_keeps_unicode() {
        let result = DocumentResult {
            success: true,
            pages: Vec::new(),
            full_text: "Žluťoučký kůň".to_string(),
            error: None,
        };
        let json = result.to_json().unwrap();
        assert!(json.contains("\"fullText\": \"Žluťoučký kůň\""));
    }

    #[test]
    fn test_failure_result() {
        let result = DocumentResult::failure("cannot open file");
        assert!(!result.success);
        assert!(result.pages.is_empty());
        assert_eq!(result.full_text, "");
        assert_eq!(result.error.as_deref(), Some("cannot open file"));
    }
}
