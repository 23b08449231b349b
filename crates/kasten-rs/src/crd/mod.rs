//! Kasten K10 custom resources read by the audit
//!
//! These are consumed as-is from the API server, so schema generation is
//! disabled and every nested field falls back to its default when absent.

mod backup_action;
mod profile;

pub use backup_action::*;
pub use profile::*;
