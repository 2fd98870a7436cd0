use serde::Serialize;

use super::BulkOperationResult;

/// Title/description pair shown after a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub title: String,
    pub description: String,
    /// Whether a retry affordance should be offered.
    pub actionable: bool,
}

/// Compose the user-facing message for a batch result.
pub fn compose(result: &BulkOperationResult) -> UserMessage {
    if result.is_complete_success() {
        return UserMessage {
            title: "Erfolgreich abgeschlossen".into(),
            description: format!(
                "{} Einträge wurden erfolgreich aktualisiert.",
                result.updated_count
            ),
            actionable: false,
        };
    }

    if result.updated_count == 0 {
        let mut description = format!(
            "{} Einträge konnten nicht aktualisiert werden.",
            result.failed_count
        );
        if result.can_retry {
            description.push_str(" Sie können den Vorgang erneut versuchen.");
        }
        return UserMessage {
            title: "Vorgang fehlgeschlagen".into(),
            description,
            actionable: result.can_retry,
        };
    }

    let clauses: Vec<String> = [
        (result.updated_count, "erfolgreich aktualisiert"),
        (result.failed_count, "fehlgeschlagen"),
        (result.skipped_count, "übersprungen"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{count} {label}"))
    .collect();

    UserMessage {
        title: "Teilweise erfolgreich".into(),
        description: format!("{}.", clauses.join(", ")),
        actionable: result.can_retry,
    }
}
