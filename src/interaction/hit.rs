use egui::{Pos2, Rect};

use crate::config::ChartSettings;
use crate::model::TaskId;
use crate::render::ChartLayout;

/// Which end of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Start,
    End,
}

/// Part of a bar under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarRegion {
    Body,
    StartHandle,
    EndHandle,
    Connector(Anchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub task_id: TaskId,
    pub region: BarRegion,
}

/// Sizes of the interactive regions around a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitZones {
    pub handle_width: f32,
    pub connector_radius: f32,
    pub connector_offset: f32,
}

impl From<&ChartSettings> for HitZones {
    fn from(settings: &ChartSettings) -> Self {
        Self {
            handle_width: settings.handle_width,
            connector_radius: settings.connector_radius,
            connector_offset: settings.connector_offset,
        }
    }
}

impl HitZones {
    /// Centre of the link hotspot just outside one end of the bar.
    pub fn connector_center(&self, bar: Rect, anchor: Anchor) -> Pos2 {
        match anchor {
            Anchor::Start => Pos2::new(bar.left() - self.connector_offset, bar.center().y),
            Anchor::End => Pos2::new(bar.right() + self.connector_offset, bar.center().y),
        }
    }

    /// Classify `pos` against one bar. Connectors win over handles, handles
    /// over the body.
    pub fn classify(&self, bar: Rect, pos: Pos2) -> Option<BarRegion> {
        for anchor in [Anchor::Start, Anchor::End] {
            if self.connector_center(bar, anchor).distance(pos) <= self.connector_radius {
                return Some(BarRegion::Connector(anchor));
            }
        }
        if pos.y < bar.top() || pos.y > bar.bottom() {
            return None;
        }
        let half = self.handle_width / 2.0;
        let mid = bar.center().x;
        if pos.x >= bar.left() - half && pos.x <= (bar.left() + half).min(mid) {
            return Some(BarRegion::StartHandle);
        }
        if pos.x >= (bar.right() - half).max(mid) && pos.x <= bar.right() + half {
            return Some(BarRegion::EndHandle);
        }
        bar.contains(pos).then_some(BarRegion::Body)
    }

    pub fn hit_test(&self, layout: &ChartLayout, pos: Pos2) -> Option<Hit> {
        layout.tasks.iter().find_map(|g| {
            self.classify(g.rect, pos).map(|region| Hit {
                task_id: g.task_id,
                region,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn zones() -> HitZones {
        HitZones {
            handle_width: 8.0,
            connector_radius: 4.0,
            connector_offset: 10.0,
        }
    }

    fn bar() -> Rect {
        Rect::from_min_max(Pos2::new(100.0, 10.0), Pos2::new(200.0, 30.0))
    }

    #[rstest]
    #[case(Pos2::new(150.0, 20.0), Some(BarRegion::Body))]
    #[case(Pos2::new(102.0, 20.0), Some(BarRegion::StartHandle))]
    #[case(Pos2::new(97.0, 20.0), Some(BarRegion::StartHandle))]
    #[case(Pos2::new(198.0, 20.0), Some(BarRegion::EndHandle))]
    #[case(Pos2::new(90.0, 21.0), Some(BarRegion::Connector(Anchor::Start)))]
    #[case(Pos2::new(210.0, 19.0), Some(BarRegion::Connector(Anchor::End)))]
    #[case(Pos2::new(150.0, 40.0), None)]
    #[case(Pos2::new(80.0, 20.0), None)]
    fn regions(#[case] pos: Pos2, #[case] expected: Option<BarRegion>) {
        assert_eq!(zones().classify(bar(), pos), expected);
    }

    #[test]
    fn narrow_bar_splits_between_handles() {
        let narrow = Rect::from_min_max(Pos2::new(100.0, 10.0), Pos2::new(106.0, 30.0));
        assert_eq!(zones().classify(narrow, Pos2::new(102.0, 20.0)), Some(BarRegion::StartHandle));
        assert_eq!(zones().classify(narrow, Pos2::new(104.0, 20.0)), Some(BarRegion::EndHandle));
    }
}
