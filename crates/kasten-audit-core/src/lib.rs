//! kasten-audit-core: audit logic for kasten-audit
//!
//! Pure functions over resources already fetched from the cluster. Nothing in
//! here talks to the API server.

pub mod cluster;
pub mod config;
pub mod install;
pub mod partition;
pub mod profiles;
pub mod rpo;

pub use cluster::{ClusterInfo, NodeHealth, UnreadyNode, assess_nodes};
pub use config::{ActionOrder, AuditConfig};
pub use install::{CrashingPod, find_crashlooping_pods};
pub use partition::{NamespacePartition, NamespacePvcIndex};
pub use profiles::{ProfileAudit, ProfileVerdict, audit_profiles};
pub use rpo::{Rpo, RpoOutcome, evaluate_rpo, order_actions};
