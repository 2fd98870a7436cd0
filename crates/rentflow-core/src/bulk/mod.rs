// ── Batch outcome handling ──
//
// Aggregates batch endpoint responses into counts and a retry subset,
// then turns the aggregate into a title/description pair for display.

mod message;
mod result;

pub use message::{UserMessage, compose};
pub use result::{BulkOperationResult, process};
