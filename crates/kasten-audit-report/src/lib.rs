//! kasten-audit-report: audit pipeline and text report
//!
//! [`Auditor`] fetches each section's resources through `kasten-rs`, hands
//! them to `kasten-audit-core`, and writes the findings with [`render`].

pub mod audit;
pub mod error;
pub mod render;

pub use audit::{AuditSummary, Auditor};
pub use error::AuditError;
