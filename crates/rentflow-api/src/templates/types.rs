// Wire types for the template REST endpoints.
//
// Field names follow the backend's German column names via serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A template record as returned by `GET/POST/PUT /api/templates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub id: String,
    #[serde(rename = "titel")]
    pub title: String,
    #[serde(rename = "inhalt", default)]
    pub content: String,
    #[serde(rename = "kategorie", default)]
    pub category: Option<String>,
    #[serde(rename = "kontext_anforderungen", default)]
    pub context_requirements: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "erstellungsdatum", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "aktualisiert_am", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for create (`POST`) and update (`PUT`).
///
/// Every field is optional so the same shape serves partial updates;
/// absent fields are omitted from the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRequest {
    #[serde(rename = "titel", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "inhalt", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "kategorie", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        rename = "kontext_anforderungen",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub context_requirements: Option<Vec<String>>,
}

/// List responses arrive either as a bare array or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TemplateList {
    Bare(Vec<TemplateResponse>),
    Wrapped {
        #[serde(alias = "data")]
        templates: Vec<TemplateResponse>,
    },
}

impl From<TemplateList> for Vec<TemplateResponse> {
    fn from(list: TemplateList) -> Self {
        match list {
            TemplateList::Bare(items) | TemplateList::Wrapped { templates: items } => items,
        }
    }
}

/// Single-record responses, bare or wrapped in `{ "template": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TemplateEnvelope {
    Wrapped {
        #[serde(alias = "data")]
        template: TemplateResponse,
    },
    Bare(TemplateResponse),
}

impl From<TemplateEnvelope> for TemplateResponse {
    fn from(envelope: TemplateEnvelope) -> Self {
        match envelope {
            TemplateEnvelope::Wrapped { template } | TemplateEnvelope::Bare(template) => template,
        }
    }
}

/// Error body shape: `{code, error, details?}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "message")]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

// ── Batch operations ─────────────────────────────────────────────────

/// Per-item failure reported by a batch endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
}

/// Batch endpoint response:
/// `{success, updatedCount, failedIds[], errors[{id, message, code}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub updated_count: u64,
    #[serde(default)]
    pub failed_ids: Vec<String>,
    #[serde(default)]
    pub errors: Vec<BatchItemError>,
}

impl BatchResponse {
    /// Lenient extraction from arbitrary JSON.
    ///
    /// Missing or wrongly-typed fields become their empty/zero value;
    /// array entries of the wrong shape are skipped.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let success = value
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let updated_count = value
            .get("updatedCount")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        let failed_ids = value
            .get("failedIds")
            .and_then(serde_json::Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| match id {
                        serde_json::Value::String(s) => Some(s.clone()),
                        serde_json::Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let errors = value
            .get("errors")
            .and_then(serde_json::Value::as_array)
            .map(|errs| {
                errs.iter()
                    .filter(|e| e.is_object())
                    .map(|e| {
                        let field = |name: &str| match e.get(name) {
                            Some(serde_json::Value::String(s)) => s.clone(),
                            Some(serde_json::Value::Number(n)) => n.to_string(),
                            _ => String::new(),
                        };
                        BatchItemError {
                            id: field("id"),
                            message: field("message"),
                            code: field("code"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            success,
            updated_count,
            failed_ids,
            errors,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn template_uses_german_wire_names() {
        let raw = json!({
            "id": "6f1c",
            "titel": "Mieterhöhung",
            "inhalt": "<p>Sehr geehrte</p>",
            "kategorie": "Mietvertrag",
            "kontext_anforderungen": ["mieter", "wohnung"],
            "erstellungsdatum": "2024-05-01T10:00:00Z"
        });
        let t: TemplateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(t.title, "Mieterhöhung");
        assert_eq!(t.category.as_deref(), Some("Mietvertrag"));
        assert_eq!(t.context_requirements, vec!["mieter", "wohnung"]);
        assert!(t.updated_at.is_none());
    }

    #[test]
    fn partial_request_omits_absent_fields() {
        let req = TemplateRequest {
            title: Some("Neu".into()),
            ..TemplateRequest::default()
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "titel": "Neu" }));
    }

    #[test]
    fn list_accepts_bare_and_wrapped() {
        let bare: TemplateList =
            serde_json::from_value(json!([{ "id": "1", "titel": "a" }])).unwrap();
        let wrapped: TemplateList =
            serde_json::from_value(json!({ "templates": [{ "id": "2", "titel": "b" }] }))
                .unwrap();
        assert_eq!(Vec::from(bare)[0].id, "1");
        assert_eq!(Vec::from(wrapped)[0].id, "2");
    }

    #[test]
    fn batch_response_from_value_tolerates_garbage() {
        let parsed = BatchResponse::from_value(&json!({
            "success": false,
            "updatedCount": 2,
            "failedIds": "not-an-array",
            "errors": [{ "id": 7, "code": "SERVER_ERROR" }, "junk"]
        }));
        assert_eq!(parsed.updated_count, 2);
        assert!(parsed.failed_ids.is_empty());
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].id, "7");
        assert_eq!(parsed.errors[0].code, "SERVER_ERROR");
        assert_eq!(parsed.errors[0].message, "");
    }

    #[test]
    fn batch_response_from_non_object() {
        assert_eq!(BatchResponse::from_value(&json!(null)), BatchResponse::default());
    }
}
