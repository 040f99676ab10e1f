//! Per-item outcomes and the final accounting of an import run.

use crate::error::ErrorCode;
use crate::model::{ItemLevel, RemoteId};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::fmt;

/// Why an item was never attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    ParentFailed,
}

impl fmt::Display for SkipCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParentFailed => f.write_str("parent creation failed"),
        }
    }
}

/// Terminal state reached by one catalog item.
///
/// Serializes as a flat map tagged by `result`; failed and skipped items
/// also carry their `code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeResult {
    Created {
        remote: RemoteId,
    },
    Failed {
        status: Option<u16>,
        reason: String,
    },
    Skipped {
        cause: SkipCause,
    },
}

impl OutcomeResult {
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Error code for failed and skipped items.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Created { .. } => None,
            Self::Failed { status: None, .. } => Some(ErrorCode::TransportFailed),
            Self::Failed {
                status: Some(429 | 503),
                ..
            } => Some(ErrorCode::RateLimited),
            Self::Failed { .. } => Some(ErrorCode::RemoteRejected),
            Self::Skipped { .. } => Some(ErrorCode::ParentFailed),
        }
    }
}

impl Serialize for OutcomeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Created { remote } => {
                map.serialize_entry("result", "created")?;
                map.serialize_entry("remote", remote)?;
            }
            Self::Failed { status, reason } => {
                map.serialize_entry("result", "failed")?;
                if let Some(status) = status {
                    map.serialize_entry("status", status)?;
                }
                map.serialize_entry("reason", reason)?;
            }
            Self::Skipped { cause } => {
                map.serialize_entry("result", "skipped")?;
                map.serialize_entry("cause", cause)?;
            }
        }
        if let Some(code) = self.code() {
            map.serialize_entry("code", code.code())?;
        }
        map.end()
    }
}

/// One entry in the run's outcome log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub level: ItemLevel,
    /// 0-based index of the parent in the catalog.
    pub parent_index: usize,
    /// 0-based index of the child within its parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_index: Option<usize>,
    pub summary: String,
    /// Points carried by a child; always 0 for parents.
    pub weight: u32,
    /// Remote calls spent on this item.
    pub attempts: u32,
    #[serde(flatten)]
    pub result: OutcomeResult,
}

impl ImportOutcome {
    #[must_use]
    pub const fn remote(&self) -> Option<&RemoteId> {
        match &self.result {
            OutcomeResult::Created { remote } => Some(remote),
            _ => None,
        }
    }
}

/// Created/failed/skipped counts for one level of the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelTally {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl LevelTally {
    fn record(&mut self, result: &OutcomeResult) {
        self.total += 1;
        match result {
            OutcomeResult::Created { .. } => self.created += 1,
            OutcomeResult::Failed { .. } => self.failed += 1,
            OutcomeResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Final accounting of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub parents: LevelTally,
    pub children: LevelTally,
    /// Sum of weights over children that were actually created.
    pub points_created: u64,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    /// Compute tallies and the point total from an outcome log.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<ImportOutcome>) -> Self {
        let mut parents = LevelTally::default();
        let mut children = LevelTally::default();
        let mut points_created = 0_u64;

        for outcome in &outcomes {
            match outcome.level {
                ItemLevel::Parent => parents.record(&outcome.result),
                ItemLevel::Child => {
                    children.record(&outcome.result);
                    if outcome.result.is_created() {
                        points_created += u64::from(outcome.weight);
                    }
                }
            }
        }

        Self {
            parents,
            children,
            points_created,
            outcomes,
        }
    }

    /// Items whose creation call failed, in run order.
    pub fn failed_items(&self) -> impl Iterator<Item = &ImportOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_failed())
    }

    /// Items never attempted because their parent failed, in run order.
    pub fn skipped_items(&self) -> impl Iterator<Item = &ImportOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_skipped())
    }

    /// Remote identifiers of everything created, in run order.
    pub fn created_ids(&self) -> impl Iterator<Item = &RemoteId> {
        self.outcomes.iter().filter_map(ImportOutcome::remote)
    }

    /// True when every item in the catalog was created.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.parents.failed == 0 && self.children.failed == 0 && self.children.skipped == 0
    }
}
