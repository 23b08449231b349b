//! Kasten `BackupAction` custom resource (`actions.kio.kasten.io/v1alpha1`)

use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// State of a backup action that finished successfully
pub const STATE_COMPLETE: &str = "Complete";

/// One execution of a backup policy against an application
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[kube(
    group = "actions.kio.kasten.io",
    version = "v1alpha1",
    kind = "BackupAction",
    plural = "backupactions",
    status = "BackupActionStatus",
    schema = "disabled",
    derive = "PartialEq",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupActionSpec {
    pub ignore_exceptions: bool,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub subject: BackupActionSubject,
}

/// Application the action backed up
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupActionSubject {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupActionStatus {
    /// "Pending", "Running", "Complete", "Failed", ...
    pub state: String,
    pub end_time: Option<DateTime<Utc>>,
}

impl BackupAction {
    /// State string, empty when the action has no status yet
    pub fn state(&self) -> &str {
        self.status.as_ref().map(|s| s.state.as_str()).unwrap_or("")
    }

    pub fn is_complete(&self) -> bool {
        self.state() == STATE_COMPLETE
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.status.as_ref().and_then(|s| s.end_time)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_timestamp().map(|t| t.0)
    }
}
