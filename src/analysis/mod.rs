//! Pure derived views over the schedule. Safe to recompute on every read.

pub mod baseline_diff;
pub mod critical_path;
pub mod workload;

pub use baseline_diff::{BaselineDiff, Variance};
pub use critical_path::{CriticalPathAnalyzer, CriticalPathReport, ScheduleStats, TaskSchedule};
pub use workload::{detect_overload, OverloadWindow};
