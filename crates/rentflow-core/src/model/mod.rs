// ── Domain model ──

pub mod entity_id;
pub mod template;

pub use entity_id::EntityId;
pub use template::{Template, TemplatePatch};
