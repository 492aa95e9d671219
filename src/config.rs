//! Chart settings persisted in the OS config directory.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::model::{ScheduleGraph, Task, TimelineProjector, ViewGranularity};

/// Layout and interaction settings. Every field has a default so a partial
/// JSON file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub granularity: ViewGranularity,
    /// First day of the week for week headers and domain alignment.
    pub week_start: Weekday,
    pub day_pixels_per_day: f32,
    pub week_pixels_per_day: f32,
    pub month_pixels_per_day: f32,
    pub row_height: f32,
    pub row_gap: f32,
    /// Vertical inset so bars don't touch row edges.
    pub bar_inset: f32,
    /// Width of the resize handle at either end of a bar.
    pub handle_width: f32,
    /// Radius of the link connector hotspot.
    pub connector_radius: f32,
    /// Distance of the connector centre outside the bar edge.
    pub connector_offset: f32,
    /// More concurrent tasks than this per owner and day is an overload.
    pub overload_threshold: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            granularity: ViewGranularity::Week,
            week_start: Weekday::Mon,
            day_pixels_per_day: ViewGranularity::Day.default_pixels_per_day(),
            week_pixels_per_day: ViewGranularity::Week.default_pixels_per_day(),
            month_pixels_per_day: ViewGranularity::Month.default_pixels_per_day(),
            row_height: 30.0,
            row_gap: 2.0,
            bar_inset: 5.0,
            handle_width: 7.0,
            connector_radius: 5.0,
            connector_offset: 9.0,
            overload_threshold: 1,
        }
    }
}

impl ChartSettings {
    pub fn pixels_per_day(&self, granularity: ViewGranularity) -> f32 {
        match granularity {
            ViewGranularity::Day => self.day_pixels_per_day,
            ViewGranularity::Week => self.week_pixels_per_day,
            ViewGranularity::Month => self.month_pixels_per_day,
        }
    }

    /// Vertical pitch of one row.
    pub fn row_pitch(&self) -> f32 {
        self.row_height + self.row_gap
    }

    /// Projector fitted to `tasks` and the graph's milestones at the
    /// configured granularity.
    pub fn projector<'a>(
        &self,
        graph: &'a ScheduleGraph,
        tasks: impl IntoIterator<Item = &'a Task>,
        today: NaiveDate,
    ) -> TimelineProjector {
        TimelineProjector::fit(
            tasks,
            graph.milestones(),
            self.granularity,
            self.week_start,
            today,
        )
        .with_pixels_per_day(self.pixels_per_day(self.granularity))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "failed to read chart settings");
            Self::default()
        })
    }

    pub fn save(&self) -> Result<(), ScheduleError> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ScheduleError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ScheduleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "GanttScheduler")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = ChartSettings {
            granularity: ViewGranularity::Month,
            week_start: Weekday::Sun,
            overload_threshold: 3,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(ChartSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "granularity": "day" }"#).unwrap();
        let loaded = ChartSettings::load_from(&path).unwrap();
        assert_eq!(loaded.granularity, ViewGranularity::Day);
        assert_eq!(loaded.handle_width, ChartSettings::default().handle_width);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ChartSettings::load_from(&path),
            Err(ScheduleError::SettingsFormat(_))
        ));
    }
}
