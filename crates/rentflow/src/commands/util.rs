//! Shared helpers for command handlers.

use std::io::{IsTerminal, Read};
use std::path::Path;

use rentflow_core::TemplatePatch;

use crate::cli::TemplateFields;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Read JSON from a file path, or from stdin when `input` is `-`.
pub fn read_json_input(input: &str) -> Result<serde_json::Value, CliError> {
    if input != "-" {
        return read_json_file(Path::new(input));
    }
    let mut contents = String::new();
    std::io::stdin().read_to_string(&mut contents)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Collect template fields from flags or a `--from-file` JSON document.
pub fn patch_from_fields(fields: TemplateFields) -> Result<TemplatePatch, CliError> {
    let patch = match fields.from_file {
        Some(ref path) => serde_json::from_value(read_json_file(path)?)?,
        None => TemplatePatch {
            title: fields.title,
            content: fields.content,
            category: fields.category,
            context_requirements: (!fields.requirements.is_empty())
                .then_some(fields.requirements),
        },
    };
    if patch.is_empty() {
        return Err(CliError::Validation {
            field: "template".into(),
            reason: "no fields given; pass --title, --content, --category, \
                     --requirement or --from-file"
                .into(),
        });
    }
    Ok(patch)
}
