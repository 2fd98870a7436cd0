//! Batch response summaries.

use serde::Serialize;

use rentflow_core::{BatchResponse, BulkOperationResult, UserMessage, compose, process};

use crate::cli::{BulkArgs, BulkCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSummary {
    #[serde(flatten)]
    result: BulkOperationResult,
    message: UserMessage,
}

fn detail(s: &BulkSummary) -> String {
    let mut pairs = vec![
        ("Title", s.message.title.clone()),
        ("Message", s.message.description.clone()),
        ("Summary", s.result.summary.clone()),
        ("Retry", s.result.can_retry.to_string()),
    ];
    if !s.result.retryable_ids.is_empty() {
        pairs.push(("Retryable IDs", s.result.retryable_ids.join(", ")));
    }
    let mut out = output::detail_lines(&pairs);
    if !s.result.detailed_message.is_empty() {
        out.push_str("\n\n");
        out.push_str(&s.result.detailed_message);
    }
    out
}

pub fn handle(args: BulkArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        BulkCommand::Summarize {
            input,
            total,
            skipped,
        } => {
            let response = BatchResponse::from_value(&util::read_json_input(&input)?);
            let total = total.unwrap_or_else(|| {
                usize::try_from(response.updated_count)
                    .unwrap_or(usize::MAX)
                    .saturating_add(response.failed_ids.len())
                    .saturating_add(skipped)
            });

            let result = process(&response, total, skipped);
            let summary = BulkSummary {
                message: compose(&result),
                result,
            };
            let out = output::render_single(&global.output, &summary, detail, |s| {
                s.result.summary.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
