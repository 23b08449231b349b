//! Text rendering of report sections
//!
//! Every function writes one piece of the report to any `Write`, so the
//! output can be checked without a cluster.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use kasten_audit_core::{
    ClusterInfo, CrashingPod, NodeHealth, ProfileAudit, ProfileVerdict, RpoOutcome,
};
use kasten_rs::ConfigSource;
use kasten_rs::crd::BackupAction;
use kube::ResourceExt;

const WARNING: &str = "  --> WARNING !!";

/// Section title framed by `=` lines of the same width
pub fn banner<W: Write>(w: &mut W, title: &str) -> io::Result<()> {
    let rule = "=".repeat(title.chars().count());
    writeln!(w)?;
    writeln!(w, "{}", rule)?;
    writeln!(w, "{}", title)?;
    writeln!(w, "{}", rule)
}

pub fn runtime<W: Write>(w: &mut W, source: ConfigSource) -> io::Result<()> {
    banner(w, "Runtime for audit tool")?;
    match source {
        ConfigSource::InCluster => writeln!(w, "Audit tool is executing in pod"),
        ConfigSource::Kubeconfig => writeln!(w, "Audit tool is not executing in pod"),
    }
}

pub fn cluster<W: Write>(w: &mut W, info: &ClusterInfo, nodes: &NodeHealth) -> io::Result<()> {
    banner(w, "Information about the cluster")?;
    writeln!(w, "  Kubernetes version : {}", info.version())?;
    writeln!(w, "  Platform : {}", info.platform)?;
    writeln!(
        w,
        "  There are {} nodes in this cluster, looking for nodes in error",
        nodes.total
    )?;
    for node in &nodes.unready {
        writeln!(
            w,
            "  NodeName: {}, Condition type: {} {}",
            node.name, node.condition_type, node.status
        )?;
    }
    if nodes.is_healthy() {
        writeln!(w, "  --> No nodes are in error")
    } else {
        writeln!(w, "  --> Some nodes are in error")
    }
}

pub fn install_header<W: Write>(w: &mut W, namespace: &str, release: &str) -> io::Result<()> {
    banner(w, "Checking Kasten install")?;
    writeln!(
        w,
        "  checking if Kasten is installed in namespace {} under the release {}",
        namespace, release
    )
}

pub fn namespace_missing<W: Write>(w: &mut W, namespace: &str) -> io::Result<()> {
    writeln!(
        w,
        "{} {} namespace not found, kasten is maybe installed in another namespace",
        WARNING, namespace
    )
}

pub fn kasten_version<W: Write>(w: &mut W, app_version: &str) -> io::Result<()> {
    writeln!(w, "  The version of kasten is {}", app_version)
}

pub fn pod_health<W: Write>(w: &mut W, namespace: &str, crashing: &[CrashingPod]) -> io::Result<()> {
    for pod in crashing {
        writeln!(
            w,
            "  pod {} is in error: {} (container {} in CrashLoopBackOff)",
            pod.name, pod.phase, pod.container
        )?;
    }
    if crashing.is_empty() {
        writeln!(w, "  --> No pods in the kasten namespace {} are on error", namespace)
    } else {
        writeln!(
            w,
            "{} some pods in the kasten namespace {} are on error",
            WARNING, namespace
        )
    }
}

pub fn profiles<W: Write>(w: &mut W, audit: &ProfileAudit) -> io::Result<()> {
    banner(w, "Auditing profiles")?;
    if audit.verdict() == ProfileVerdict::NoProfile {
        return writeln!(
            w,
            "{} there is no profile at all, you don't have real backup",
            WARNING
        );
    }

    for name in &audit.invalid_profiles {
        writeln!(w, "{} found profile {} which is not valid", WARNING, name)?;
    }

    if audit.found_location_profile {
        writeln!(w, "  At least one location profile was found")?;
    } else {
        writeln!(
            w,
            "{} there is no location profile at all, you don't have real backup",
            WARNING
        )?;
    }
    if audit.verdict() == ProfileVerdict::NotImmutable {
        writeln!(
            w,
            "{} there is no immutable profile your are not protected against Ransomware",
            WARNING
        )?;
    }
    Ok(())
}

pub fn namespace_with_pvc<W: Write>(w: &mut W, namespace: &str, count: usize) -> io::Result<()> {
    writeln!(w, "{} has {} PVCs", namespace, count)
}

pub fn namespace_without_pvc<W: Write>(w: &mut W, namespace: &str) -> io::Result<()> {
    writeln!(w, "{} has no PVC", namespace)
}

fn timestamp(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

fn action_row<W: Write>(w: &mut W, name: &str, state: &str, start: &str, stop: &str) -> io::Result<()> {
    writeln!(w, "  {:<30} {:<10} {:<30} {:<30}", name, state, start, stop)
}

/// Backup action table followed by the RPO line for one namespace
pub fn rpo<W: Write>(
    w: &mut W,
    namespace: &str,
    actions: &[BackupAction],
    outcome: &RpoOutcome,
) -> io::Result<()> {
    if let RpoOutcome::NoBackupActions = outcome {
        return writeln!(w, "  --> No backupactions in namespace {}", namespace);
    }

    action_row(w, "BACKUPACTION", "STATE", "START", "STOP")?;
    for action in actions {
        action_row(
            w,
            &action.name_any(),
            action.state(),
            &timestamp(action.created_at()),
            &timestamp(action.end_time()),
        )?;
    }

    match outcome {
        RpoOutcome::NoBackupActions => Ok(()),
        RpoOutcome::NoSuccessfulAction => writeln!(
            w,
            "{} It seems that no backupaction were successful",
            WARNING
        ),
        RpoOutcome::MissingEndTime { action } => writeln!(
            w,
            "{} backupaction {} is complete but has no end time, RPO unknown",
            WARNING, action
        ),
        RpoOutcome::Measured { rpo, .. } => writeln!(w, "  --> The last RPO is {}", rpo),
    }
}

/// Listing backup actions failed for a namespace; the pass continues
pub fn rpo_unavailable<W: Write>(
    w: &mut W,
    namespace: &str,
    error: &dyn std::fmt::Display,
) -> io::Result<()> {
    writeln!(
        w,
        "{} could not list backupactions in namespace {}: {}",
        WARNING, namespace, error
    )
}
