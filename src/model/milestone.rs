use chrono::NaiveDate;
use egui::Color32;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::color_serde;

/// A dated marker on its own row. Carries no dependency semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default, with = "color_serde")]
    pub color: Option<Color32>,
    pub description: Option<String>,
}

impl Milestone {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date,
            color: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub color: Option<Option<Color32>>,
    pub description: Option<Option<String>>,
}

impl MilestonePatch {
    pub fn apply(&self, milestone: &mut Milestone) {
        if let Some(name) = &self.name {
            milestone.name = name.clone();
        }
        if let Some(date) = self.date {
            milestone.date = date;
        }
        if let Some(color) = self.color {
            milestone.color = color;
        }
        if let Some(description) = &self.description {
            milestone.description = description.clone();
        }
    }
}
