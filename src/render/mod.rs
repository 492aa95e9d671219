//! Pixel geometry handed to the presentation layer.

pub mod connectors;
pub mod geometry;

pub use connectors::{connector_paths, ConnectorPath};
pub use geometry::{ChartLayout, MilestoneGeometry, TaskGeometry};
