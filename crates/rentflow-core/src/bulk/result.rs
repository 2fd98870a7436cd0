use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;

use rentflow_api::{ApiErrorCode, BatchItemError, BatchResponse};

const UNKNOWN_ITEM_ERROR: &str = "Unbekannter Fehler";

/// Aggregate of one batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResult {
    pub updated_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub total_count: usize,
    pub can_retry: bool,
    /// Failed ids worth re-submitting, in `failed_ids` order.
    pub retryable_ids: Vec<String>,
    pub summary: String,
    /// One `id: message` line per failed id.
    pub detailed_message: String,
}

impl BulkOperationResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0 && self.skipped_count == 0
    }
}

/// Aggregate a batch response. Never fails.
///
/// Retryability is decided by the error code of the entry matching each
/// failed id. Unknown codes and failed ids without an entry count as not
/// retryable.
pub fn process(response: &BatchResponse, total: usize, skipped: usize) -> BulkOperationResult {
    let updated_count = usize::try_from(response.updated_count).unwrap_or(usize::MAX);
    let failed_count = response.failed_ids.len();

    let entry_for = |id: &str| response.errors.iter().find(|e| e.id == id);

    let retryable_ids: Vec<String> = response
        .failed_ids
        .iter()
        .filter(|id| entry_for(id).and_then(known_code).is_some_and(ApiErrorCode::is_retryable))
        .cloned()
        .collect();

    let mut summary = if failed_count == 0 && skipped == 0 {
        format!("{updated_count} Einträge erfolgreich aktualisiert")
    } else {
        format!("{updated_count} Einträge erfolgreich aktualisiert, {failed_count} fehlgeschlagen")
    };
    if skipped > 0 {
        let _ = write!(summary, ", {skipped} übersprungen");
    }

    let detailed_message = response
        .failed_ids
        .iter()
        .map(|id| format!("{id}: {}", item_message(entry_for(id))))
        .collect::<Vec<_>>()
        .join("\n");

    BulkOperationResult {
        updated_count,
        failed_count,
        skipped_count: skipped,
        total_count: total,
        can_retry: !retryable_ids.is_empty(),
        retryable_ids,
        summary,
        detailed_message,
    }
}

fn known_code(entry: &BatchItemError) -> Option<ApiErrorCode> {
    ApiErrorCode::from_str(&entry.code).ok()
}

fn item_message(entry: Option<&BatchItemError>) -> String {
    match entry {
        Some(e) => match known_code(e) {
            Some(code) => code.localized_message().to_owned(),
            None if !e.message.is_empty() => e.message.clone(),
            None => UNKNOWN_ITEM_ERROR.to_owned(),
        },
        None => UNKNOWN_ITEM_ERROR.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item(id: &str, code: &str) -> BatchItemError {
        BatchItemError {
            id: id.into(),
            message: format!("{id} failed"),
            code: code.into(),
        }
    }

    fn response(updated: u64, failed: &[&str], errors: Vec<BatchItemError>) -> BatchResponse {
        BatchResponse {
            success: failed.is_empty(),
            updated_count: updated,
            failed_ids: failed.iter().map(|s| (*s).to_owned()).collect(),
            errors,
        }
    }

    #[test]
    fn mixed_batch() {
        let resp = response(
            3,
            &["4", "5"],
            vec![item("4", "NETWORK_ERROR"), item("5", "NOT_FOUND")],
        );
        let r = process(&resp, 5, 0);
        assert_eq!(r.updated_count, 3);
        assert_eq!(r.failed_count, 2);
        assert!(r.can_retry);
        assert_eq!(r.retryable_ids, vec!["4".to_owned()]);
        assert_eq!(r.summary, "3 Einträge erfolgreich aktualisiert, 2 fehlgeschlagen");
        assert_eq!(
            r.detailed_message,
            "4: Netzwerkfehler. Bitte überprüfen Sie Ihre Internetverbindung.\n\
             5: Template nicht gefunden."
        );
    }

    #[test]
    fn all_success() {
        let r = process(&response(4, &[], vec![]), 4, 0);
        assert_eq!(r.summary, "4 Einträge erfolgreich aktualisiert");
        assert!(!r.can_retry);
        assert!(r.is_complete_success());
        assert!(r.detailed_message.is_empty());
    }

    #[test]
    fn skipped_clause_only_when_nonzero() {
        let r = process(&response(2, &["9"], vec![item("9", "SERVER_ERROR")]), 4, 1);
        assert_eq!(
            r.summary,
            "2 Einträge erfolgreich aktualisiert, 1 fehlgeschlagen, 1 übersprungen"
        );
        assert_eq!(r.skipped_count, 1);
        assert_eq!(r.total_count, 4);
    }

    #[test]
    fn only_skipped_uses_failure_template() {
        let r = process(&response(3, &[], vec![]), 5, 2);
        assert_eq!(
            r.summary,
            "3 Einträge erfolgreich aktualisiert, 0 fehlgeschlagen, 2 übersprungen"
        );
    }

    #[test]
    fn retryable_ids_keep_failed_order() {
        let resp = response(
            0,
            &["c", "a", "b"],
            vec![
                item("a", "SERVER_ERROR"),
                item("b", "MODEL_OVERLOADED"),
                item("c", "NETWORK_ERROR"),
            ],
        );
        let r = process(&resp, 3, 0);
        assert_eq!(r.retryable_ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn unknown_codes_and_missing_entries_are_not_retryable() {
        let resp = response(0, &["1", "2"], vec![item("1", "SOMETHING_NEW")]);
        let r = process(&resp, 2, 0);
        assert!(r.retryable_ids.is_empty());
        assert!(!r.can_retry);
        assert_eq!(r.detailed_message, "1: 1 failed\n2: Unbekannter Fehler");
    }

    #[test]
    fn retryable_subset_of_failed() {
        // Error entry for an id that is not listed as failed must not leak.
        let resp = response(1, &["1"], vec![item("2", "SERVER_ERROR"), item("1", "PERMISSION_DENIED")]);
        let r = process(&resp, 2, 0);
        assert!(r.retryable_ids.iter().all(|id| resp.failed_ids.contains(id)));
        assert!(r.retryable_ids.is_empty());
    }

    #[test]
    fn malformed_input_is_empty() {
        let resp = BatchResponse::from_value(&json!({ "failedIds": 3, "errors": {} }));
        let r = process(&resp, 0, 0);
        assert_eq!(r.failed_count, 0);
        assert_eq!(r.summary, "0 Einträge erfolgreich aktualisiert");
    }
}
