//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod bulk;
pub mod classify;
pub mod config_cmd;
pub mod health;
pub mod sync;
pub mod templates;
pub mod util;

use rentflow_core::PipelineConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    pipeline: &PipelineConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Templates(args) => templates::handle(pipeline, args, global).await,
        Command::Health => health::handle(pipeline, global).await,
        Command::Sync(args) => sync::handle(pipeline, args, global).await,
        // Local commands are handled before dispatch
        Command::Config(_) | Command::Classify(_) | Command::Bulk(_) | Command::Completions(_) => {
            Ok(())
        }
    }
}
