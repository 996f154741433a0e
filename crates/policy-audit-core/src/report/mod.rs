//! Rendering of audit findings.
//!
//! Renderers are pure: they return strings and never print.

pub mod console;
pub mod json;
pub mod summary;

pub use console::render_text;
pub use json::render_json;
pub use summary::AuditSummary;
