// ── Template store ──
//
// Ordered entity storage plus the observer that mutation outcomes are
// published through.

mod collection;
mod subject;
mod template_store;

pub use collection::Snapshot;
pub use subject::{Subject, Subscription};
pub use template_store::TemplateStore;

pub(crate) use collection::Removed;
