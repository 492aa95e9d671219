pub mod baseline;
pub mod graph;
pub mod milestone;
pub mod task;
pub mod timeline;

pub use baseline::{Baseline, BaselineEntry, BaselineStore};
pub use graph::ScheduleGraph;
pub use milestone::{Milestone, MilestonePatch};
pub use task::{
    Dependency, DependencyKind, Segment, Task, TaskDraft, TaskId, TaskPatch, TaskStatus,
};
pub use timeline::{HeaderCell, TimelineProjector, ViewGranularity};
