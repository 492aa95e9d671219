use chrono::NaiveDate;
use egui::Color32;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Represents the type of dependency between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        Self::FinishToStart,
        Self::StartToStart,
        Self::FinishToFinish,
        Self::StartToFinish,
    ];

    /// Short label as shown in the type picker.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FinishToStart => "Finish to start",
            Self::StartToStart => "Start to start",
            Self::FinishToFinish => "Finish to finish",
            Self::StartToFinish => "Start to finish",
        }
    }

    /// Whether the constraint hangs off the predecessor's finish.
    pub fn from_finish(self) -> bool {
        matches!(self, Self::FinishToStart | Self::FinishToFinish)
    }

    /// Whether the constraint lands on the successor's start.
    pub fn to_start(self) -> bool {
        matches!(self, Self::FinishToStart | Self::StartToStart)
    }
}

/// A dependency link between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Uuid,
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(predecessor_id: TaskId, successor_id: TaskId, kind: DependencyKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            predecessor_id,
            successor_id,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// A sub-range of a task's span, used to draw split work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Segment {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }
}

/// A single scheduled unit of work.
///
/// `start_date..=end_date` is inclusive at day granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TaskStatus,
    /// Percent complete, 0..=100.
    pub progress: u8,
    pub owner: Option<String>,
    #[serde(default, with = "color_serde")]
    pub color: Option<Color32>,
    pub category: Option<String>,
    pub sort_order: i64,
}

impl Task {
    /// Create a new task with sensible defaults.
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_date,
            end_date,
            status: TaskStatus::NotStarted,
            progress: 0,
            owner: None,
            color: None,
            category: None,
            sort_order: 0,
        }
    }

    /// Inclusive length in days. Never less than one.
    pub fn duration_days(&self) -> i64 {
        ((self.end_date - self.start_date).num_days() + 1).max(1)
    }

    /// Whether the task covers `date`.
    pub fn spans(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Fields accepted when creating a task through a backend.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub progress: u8,
    pub owner: Option<String>,
    pub color: Option<Color32>,
    pub category: Option<String>,
}

/// A partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub owner: Option<Option<String>>,
    pub color: Option<Option<Color32>>,
    pub category: Option<Option<String>>,
}

impl TaskPatch {
    pub fn dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Default::default()
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply to a copy of `task`; leaves the original untouched.
    pub fn applied_to(&self, task: &Task) -> Task {
        let mut out = task.clone();
        if let Some(name) = &self.name {
            out.name = name.clone();
        }
        if let Some(start) = self.start_date {
            out.start_date = start;
        }
        if let Some(end) = self.end_date {
            out.end_date = end;
        }
        if let Some(status) = self.status {
            out.status = status;
        }
        if let Some(progress) = self.progress {
            out.progress = progress.min(100);
        }
        if let Some(owner) = &self.owner {
            out.owner = owner.clone();
        }
        if let Some(color) = self.color {
            out.color = color;
        }
        if let Some(category) = &self.category {
            out.category = category.clone();
        }
        out
    }
}

/// Serde helper for an optional `Color32` stored as `#rrggbbaa`.
pub(crate) mod color_serde {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(color: &Option<Color32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match color {
            Some(c) => {
                let [r, g, b, a] = c.to_srgba_unmultiplied();
                serializer.serialize_some(&format!("#{r:02x}{g:02x}{b:02x}{a:02x}"))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Color32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub fn parse_hex(s: &str) -> Result<Color32, String> {
        let hex = s.trim_start_matches('#');
        let byte = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| format!("invalid hex colour '{s}'"))
        };
        match hex.len() {
            6 => Ok(Color32::from_rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color32::from_rgba_unmultiplied(
                byte(0)?,
                byte(2)?,
                byte(4)?,
                byte(6)?,
            )),
            _ => Err(format!("invalid hex colour '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn duration_is_inclusive() {
        let t = Task::new("A", d(1, 1), d(1, 3));
        assert_eq!(t.duration_days(), 3);
        let single = Task::new("B", d(1, 1), d(1, 1));
        assert_eq!(single.duration_days(), 1);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut t = Task::new("A", d(1, 1), d(1, 3));
        t.owner = Some("ana".into());
        let patch = TaskPatch {
            progress: Some(250),
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        let out = patch.applied_to(&t);
        assert_eq!(out.progress, 100);
        assert_eq!(out.status, TaskStatus::InProgress);
        assert_eq!(out.owner.as_deref(), Some("ana"));
        assert_eq!(out.start_date, d(1, 1));
    }

    #[test]
    fn color_round_trips_through_json() {
        let mut t = Task::new("A", d(1, 1), d(1, 3));
        t.color = Some(Color32::from_rgb(70, 130, 180));
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("#4682b4ff"));
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.color, t.color);
    }

    #[test]
    fn translucent_color_keeps_its_channels() {
        let mut t = Task::new("A", d(1, 1), d(1, 3));
        t.color = Some(Color32::from_rgba_unmultiplied(200, 100, 50, 128));
        let json = serde_json::to_string(&t).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let hex = value["color"].as_str().unwrap();
        let written = color_serde::parse_hex(hex).unwrap().to_srgba_unmultiplied();

        let close = |a: u8, b: u8| a.abs_diff(b) <= 1;
        for (got, want) in written.iter().zip([200u8, 100, 50, 128]) {
            assert!(close(*got, want), "{hex}: {written:?}");
        }
        let back: Task = serde_json::from_str(&json).unwrap();
        let (Some(back), Some(orig)) = (back.color, t.color) else {
            panic!("colour lost: {json}");
        };
        for (got, want) in back.to_array().iter().zip(orig.to_array()) {
            assert!(close(*got, want), "{back:?} vs {orig:?}");
        }
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert!(color_serde::parse_hex("#12").is_err());
        assert!(color_serde::parse_hex("zzzzzz").is_err());
    }
}
