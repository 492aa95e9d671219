//! Error types for the scheduling core.

use thiserror::Error;
use uuid::Uuid;

/// Why a proposed dependency edge was refused.
///
/// Refusals are reported to the caller as warnings; they never abort an
/// interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkRejection {
    /// Predecessor and successor are the same task.
    #[error("a task cannot depend on itself")]
    SelfLink,
    /// One of the endpoints does not resolve to a known task.
    #[error("task {0} does not exist")]
    UnknownTask(Uuid),
    /// An edge between the same two tasks already exists.
    #[error("these tasks are already linked")]
    Duplicate,
    /// The edge would close a directed cycle.
    #[error("the dependency would create a cycle")]
    WouldCycle,
}

/// Errors raised by graph mutations, backends and settings persistence.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Task already exists: {0}")]
    DuplicateTask(Uuid),

    #[error("Dependency not found: {0}")]
    DependencyNotFound(Uuid),

    #[error("Milestone not found: {0}")]
    MilestoneNotFound(Uuid),

    #[error("Baseline not found: {0}")]
    BaselineNotFound(Uuid),

    /// A date range whose end precedes its start.
    #[error("Invalid date range: {start} .. {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Dependency rejected: {0}")]
    LinkRejected(#[from] LinkRejection),

    #[error("Settings I/O error: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("Settings format error: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejection_reads_as_warning_text() {
        assert_eq!(
            LinkRejection::WouldCycle.to_string(),
            "the dependency would create a cycle"
        );
        let err = ScheduleError::from(LinkRejection::Duplicate);
        assert_eq!(
            err.to_string(),
            "Dependency rejected: these tasks are already linked"
        );
        assert!(matches!(
            err,
            ScheduleError::LinkRejected(LinkRejection::Duplicate)
        ));
    }
}
