//! Cluster version and node readiness

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::ResourceExt;

/// Version information reported by the API server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterInfo {
    pub major: String,
    pub minor: String,
    pub platform: String,
}

impl ClusterInfo {
    /// "major.minor", e.g. "1.29"
    pub fn version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl From<&Info> for ClusterInfo {
    fn from(info: &Info) -> Self {
        Self {
            major: info.major.clone(),
            minor: info.minor.clone(),
            platform: info.platform.clone(),
        }
    }
}

/// A node whose Ready condition is not "True"
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadyNode {
    pub name: String,
    pub condition_type: String,
    pub status: String,
}

/// Outcome of the node readiness scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeHealth {
    pub total: usize,
    pub unready: Vec<UnreadyNode>,
}

impl NodeHealth {
    pub fn is_healthy(&self) -> bool {
        self.unready.is_empty()
    }
}

/// Flag every node carrying a `Ready` condition whose status is not "True".
///
/// Nodes without a Ready condition are not flagged.
pub fn assess_nodes(nodes: &[Node]) -> NodeHealth {
    let unready = nodes
        .iter()
        .flat_map(|node| {
            let name = node.name_any();
            node.status
                .as_ref()
                .and_then(|s| s.conditions.as_ref())
                .into_iter()
                .flatten()
                .filter(|c| c.type_ == "Ready" && c.status != "True")
                .map(move |c| UnreadyNode {
                    name: name.clone(),
                    condition_type: c.type_.clone(),
                    status: c.status.clone(),
                })
        })
        .collect();

    NodeHealth {
        total: nodes.len(),
        unready,
    }
}
