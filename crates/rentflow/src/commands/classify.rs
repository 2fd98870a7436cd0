//! Error classification command.

use rentflow_core::{ClassifiedError, ErrorInput, classify};

use crate::cli::{ClassifyArgs, GlobalOpts};
use crate::output;

fn detail(c: &ClassifiedError) -> String {
    output::detail_lines(&[
        ("Type", c.error_type.to_string()),
        ("Code", c.error_code.to_owned()),
        ("HTTP status", c.http_status.to_string()),
        ("Retryable", c.retryable.to_string()),
        ("Stage", c.failure_stage.to_string()),
    ])
}

pub fn handle(args: &ClassifyArgs, global: &GlobalOpts) {
    let input = if args.transport {
        ErrorInput::transport(args.message.as_str())
    } else {
        ErrorInput::message(args.message.as_str())
    };
    let classified = classify(input, args.status);

    let out = output::render_single(&global.output, &classified, detail, |c| {
        c.error_code.to_owned()
    });
    output::print_output(&out, global.quiet);
}
