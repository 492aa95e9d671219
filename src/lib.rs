//! Scheduling core for an interactive Gantt chart.
//!
//! The [`model::ScheduleGraph`] holds tasks, dependencies and milestones.
//! Everything derived from it is a pure function of its inputs:
//!
//! - [`analysis::CriticalPathAnalyzer`] runs the forward/backward passes and
//!   reports float and the critical set.
//! - [`model::TimelineProjector`] maps dates to pixels and builds the axis
//!   header.
//! - [`analysis::BaselineDiff`] looks up frozen dates for ghost bars.
//! - [`render::ChartLayout`] and [`render::connector_paths`] turn all of the
//!   above into geometry.
//!
//! [`interaction::DragController`] is the one stateful piece. It turns
//! pointer input into previews and, on release, into
//! [`backend::MutationRequest`]s for whatever [`backend::ScheduleBackend`]
//! owns the records.

pub mod analysis;
pub mod backend;
pub mod config;
pub mod error;
pub mod interaction;
pub mod model;
pub mod render;

pub use backend::{InMemoryBackend, MutationRequest, ScheduleBackend};
pub use config::ChartSettings;
pub use error::{LinkRejection, ScheduleError};
