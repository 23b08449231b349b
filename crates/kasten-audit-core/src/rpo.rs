//! Recovery point objective
//!
//! The RPO of a namespace is the time since the end of its last successful
//! backup. "Last" means the first `Complete` action in the order the actions
//! are given; [`order_actions`] is what makes that order meaningful.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use kasten_rs::crd::BackupAction;
use kube::ResourceExt;

use crate::config::ActionOrder;

/// Elapsed time split into whole days and remaining whole hours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rpo {
    pub days: i64,
    pub hours: i64,
}

impl Rpo {
    /// Split `now - end`; both parts are truncated toward zero, never rounded
    pub fn between(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let total_hours = (now - end).num_hours();
        Self {
            days: total_hours / 24,
            hours: total_hours % 24,
        }
    }
}

impl std::fmt::Display for Rpo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} days and {} hours", self.days, self.hours)
    }
}

/// What the backup actions of one namespace say about its RPO
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpoOutcome {
    /// The namespace has never been backed up
    NoBackupActions,
    /// Actions exist but none completed
    NoSuccessfulAction,
    /// The first complete action has no end time recorded
    MissingEndTime { action: String },
    /// RPO measured from the first complete action
    Measured { action: String, rpo: Rpo },
}

/// Put actions in the order the RPO scan and the report table use.
///
/// `NewestFirst` sorts by end time descending, then creation timestamp
/// descending, then name. Missing timestamps sort after present ones, so the
/// first `Complete` action is the one that finished last.
pub fn order_actions(actions: &mut [BackupAction], order: ActionOrder) {
    match order {
        ActionOrder::AsListed => {}
        ActionOrder::NewestFirst => {
            actions.sort_by_key(|a| (Reverse(a.end_time()), Reverse(a.created_at()), a.name_any()));
        }
    }
}

/// Evaluate the RPO from actions already in scan order.
///
/// Only the first `Complete` action counts; later ones never replace it, even
/// when they ended more recently.
pub fn evaluate_rpo(actions: &[BackupAction], now: DateTime<Utc>) -> RpoOutcome {
    if actions.is_empty() {
        return RpoOutcome::NoBackupActions;
    }

    match actions.iter().find(|a| a.is_complete()) {
        None => RpoOutcome::NoSuccessfulAction,
        Some(action) => match action.end_time() {
            Some(end) => RpoOutcome::Measured {
                action: action.name_any(),
                rpo: Rpo::between(end, now),
            },
            None => RpoOutcome::MissingEndTime {
                action: action.name_any(),
            },
        },
    }
}
