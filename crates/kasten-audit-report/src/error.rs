//! Error types for the audit pipeline

use kasten_rs::KastenError;
use thiserror::Error;

/// Fatal audit failures; domain findings are printed, never returned
#[derive(Error, Debug)]
pub enum AuditError {
    /// A cluster call needed by a report section failed
    #[error(transparent)]
    Kasten(#[from] KastenError),

    /// The add-on namespace does not exist
    #[error("{0} namespace not found, kasten is maybe installed in another namespace")]
    NamespaceNotFound(String),

    /// Writing the report failed
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
