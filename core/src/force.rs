use crate::{
    classify::{Classify, ClassifyError},
    status::{StatusRecord, WorkStatus},
    workdir::Workdir,
};
use std::fs;
use thiserror::Error;

pub const DEFAULT_ATOL: f64 = 1e-6;

#[derive(Error, Debug)]
pub(crate) enum ForceParseError {
    #[error("malformed force value '{value}' at line {line}")]
    BadNumber { value: String, line: usize },
    #[error("truncated force row at line {line}")]
    ShortRow { line: usize },
}

/// Convergence policy over the final force block of an OUTCAR-style
/// artifact.
///
/// An iterative relaxation appends one `POSITION / TOTAL-FORCE` block per
/// ionic step; only the last block decides. The run counts as done when
/// the euclidean norm of the summed per-atom forces is strictly below the
/// absolute tolerance.
#[derive(Debug, Clone)]
pub struct ForceConvergence {
    artifact: String,
    atol: f64,
}

impl Default for ForceConvergence {
    fn default() -> Self {
        Self {
            artifact: "OUTCAR".to_owned(),
            atol: DEFAULT_ATOL,
        }
    }
}

impl ForceConvergence {
    pub fn new(atol: f64) -> Self {
        Self {
            atol,
            ..Self::default()
        }
    }

    /// Run the same policy against a differently named artifact.
    pub fn with_artifact(artifact: impl Into<String>, atol: f64) -> Self {
        Self {
            artifact: artifact.into(),
            atol,
        }
    }
}

impl Classify for ForceConvergence {
    /// Never fails: every domain condition, including unreadable or
    /// malformed artifacts, maps onto a record so that one bad directory
    /// cannot abort a batch of thousands.
    fn classify(&self, workdir: &Workdir) -> Result<StatusRecord, ClassifyError> {
        let artifact = workdir.path().join(&self.artifact);
        if !artifact.exists() {
            return Ok(StatusRecord::with_reason(
                WorkStatus::Pending,
                format!("{} missing", self.artifact),
            ));
        }
        let text = match fs::read_to_string(&artifact) {
            Ok(text) => text,
            Err(e) => {
                return Ok(StatusRecord::with_reason(
                    WorkStatus::NotConverged,
                    format!("failed to read {}: {e}", self.artifact),
                ));
            }
        };
        let record = match last_force_sum(&text) {
            Ok(None) => {
                StatusRecord::with_reason(WorkStatus::NotConverged, "no force block found")
            }
            Ok(Some(forces_sum)) => {
                let norm = forces_sum
                    .iter()
                    .map(|force| force * force)
                    .sum::<f64>()
                    .sqrt();
                let mut record = if norm < self.atol {
                    StatusRecord::with_reason(WorkStatus::Done, "forces converged")
                } else {
                    StatusRecord::with_reason(
                        WorkStatus::NotConverged,
                        format!("force sum norm {norm:.3e} >= atol {:e}", self.atol),
                    )
                };
                record.insert_extra(
                    "forces_sum",
                    serde_yaml::Value::Sequence(
                        forces_sum
                            .iter()
                            .map(|force| serde_yaml::Value::from(*force))
                            .collect(),
                    ),
                );
                record
            }
            Err(e) => StatusRecord::with_reason(WorkStatus::NotConverged, e.to_string()),
        };
        Ok(record)
    }
}

/// Locate the last `POSITION / TOTAL-FORCE` block in the artifact text and
/// sum its per-atom force columns. `Ok(None)` when no block exists at all.
///
/// Block layout: a header line containing both markers, a dashed separator,
/// data rows of six columns (position, then force), terminated by the
/// `total drift` line. Blank and dashed rows inside the block are skipped.
pub(crate) fn last_force_sum(text: &str) -> Result<Option<[f64; 3]>, ForceParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut last = None;
    let mut i = 0;
    while i < lines.len() {
        if !(lines[i].contains("POSITION") && lines[i].contains("TOTAL-FORCE")) {
            i += 1;
            continue;
        }
        // skip the header and the dashed separator
        let start = (i + 2).min(lines.len());
        let mut end = start;
        while end < lines.len() && !lines[end].contains("total drift") {
            end += 1;
        }
        let mut sum = [0.0f64; 3];
        for (offset, line) in lines[start..end].iter().enumerate() {
            if line.trim().is_empty() || line.contains("---") {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return Err(ForceParseError::ShortRow {
                    line: start + offset + 1,
                });
            }
            for (axis, part) in parts[3..6].iter().enumerate() {
                let value: f64 = part.parse().map_err(|_| ForceParseError::BadNumber {
                    value: (*part).to_owned(),
                    line: start + offset + 1,
                })?;
                sum[axis] += value;
            }
        }
        last = Some(sum);
        i = end + 1;
    }
    Ok(last)
}
