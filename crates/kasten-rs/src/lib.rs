//! kasten-rs: read-only Kubernetes access to a Kasten K10 installation
//!
//! Wraps `kube` with the listings the audit needs, the K10 custom resource
//! types, and Helm release decoding.

pub mod client;
pub mod crd;
pub mod error;
pub mod helm;

pub use client::{ConfigSource, ConnectOptions, KastenClient};
pub use error::KastenError;
pub use helm::HelmRelease;
