use chrono::NaiveDate;

use crate::error::LinkRejection;
use crate::model::TaskId;

/// Notifications emitted by the drag controller. All methods default to
/// doing nothing.
pub trait InteractionCallbacks {
    fn on_task_dates_previewed(&mut self, _task_id: TaskId, _start: NaiveDate, _end: NaiveDate) {}

    fn on_task_dates_committed(&mut self, _task_id: TaskId, _start: NaiveDate, _end: NaiveDate) {}

    /// The caller must answer with a dependency type before anything is
    /// created.
    fn on_dependency_link_requested(&mut self, _predecessor: TaskId, _successor: TaskId) {}

    fn on_dependency_create_rejected(&mut self, _reason: LinkRejection) {}
}

/// Ignores every notification.
impl InteractionCallbacks for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    Previewed {
        task_id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },
    Committed {
        task_id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },
    LinkRequested {
        predecessor: TaskId,
        successor: TaskId,
    },
    LinkRejected(LinkRejection),
}

/// Queues every notification for the caller to drain.
#[derive(Debug, Clone, Default)]
pub struct RecordingCallbacks {
    pub events: Vec<InteractionEvent>,
}

impl RecordingCallbacks {
    pub fn drain(&mut self) -> std::vec::Drain<'_, InteractionEvent> {
        self.events.drain(..)
    }
}

impl InteractionCallbacks for RecordingCallbacks {
    fn on_task_dates_previewed(&mut self, task_id: TaskId, start: NaiveDate, end: NaiveDate) {
        self.events
            .push(InteractionEvent::Previewed { task_id, start, end });
    }

    fn on_task_dates_committed(&mut self, task_id: TaskId, start: NaiveDate, end: NaiveDate) {
        self.events
            .push(InteractionEvent::Committed { task_id, start, end });
    }

    fn on_dependency_link_requested(&mut self, predecessor: TaskId, successor: TaskId) {
        self.events.push(InteractionEvent::LinkRequested {
            predecessor,
            successor,
        });
    }

    fn on_dependency_create_rejected(&mut self, reason: LinkRejection) {
        self.events.push(InteractionEvent::LinkRejected(reason));
    }
}
