use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Closed set of work statuses. Adding a variant is a schema change for
/// both the summary table and the dump format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    /// No output artifact yet, the run was configured but never produced.
    Pending,
    /// The run finished and its convergence criterion holds.
    Done,
    /// The run produced output that does not (yet) satisfy the criterion,
    /// or output that could not be interpreted.
    NotConverged,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 3] = [Self::Pending, Self::Done, Self::NotConverged];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Done => "DONE",
            Self::NotConverged => "NOT_CONVERGED",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one working directory.
///
/// `status` is the only field the engine interprets; `reason` and the
/// `extra` map are policy-defined and ride along untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: WorkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl StatusRecord {
    pub fn new(status: WorkStatus) -> Self {
        Self {
            status,
            reason: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_reason(status: WorkStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: Some(reason.into()),
            extra: BTreeMap::new(),
        }
    }

    /// Attach a policy-defined value, passed through uninterpreted.
    pub fn insert_extra(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.extra.insert(key.into(), value);
    }
}
