//! Add-on pod health

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

/// Waiting reason of a container that keeps crashing after start
pub const CRASH_LOOP_REASON: &str = "CrashLoopBackOff";

/// A container stuck in CrashLoopBackOff
#[derive(Debug, Clone, PartialEq)]
pub struct CrashingPod {
    pub name: String,
    pub container: String,
    /// Pod phase (Running, Pending, etc.)
    pub phase: String,
}

/// Find every container waiting with reason exactly `CrashLoopBackOff`.
///
/// A pod with several crashing containers is reported once per container.
pub fn find_crashlooping_pods(pods: &[Pod]) -> Vec<CrashingPod> {
    let mut crashing = Vec::new();

    for pod in pods {
        let status = pod.status.as_ref();
        let phase = status
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let containers = status
            .and_then(|s| s.container_statuses.as_ref())
            .into_iter()
            .flatten();

        for container in containers {
            let reason = container
                .state
                .as_ref()
                .and_then(|s| s.waiting.as_ref())
                .and_then(|w| w.reason.as_deref());

            if reason == Some(CRASH_LOOP_REASON) {
                crashing.push(CrashingPod {
                    name: pod.name_any(),
                    container: container.name.clone(),
                    phase: phase.clone(),
                });
            }
        }
    }

    crashing
}
