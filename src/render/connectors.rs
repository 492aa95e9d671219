use egui::{Pos2, Vec2};
use uuid::Uuid;

use super::geometry::ChartLayout;
use crate::model::{Dependency, DependencyKind};

/// Polyline from a predecessor anchor to a successor anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorPath {
    pub dependency_id: Uuid,
    pub kind: DependencyKind,
    /// Both endpoints are on the critical path.
    pub critical: bool,
    pub points: Vec<Pos2>,
}

impl ConnectorPath {
    /// Triangle at the end of the path pointing along its last leg.
    pub fn arrow_head(&self, size: f32) -> Option<[Pos2; 3]> {
        let [.., from, tip] = self.points.as_slice() else {
            return None;
        };
        let dir = (*tip - *from).normalized();
        if !dir.x.is_finite() || !dir.y.is_finite() {
            return None;
        }
        let back = *tip - dir * size;
        let side = Vec2::new(-dir.y, dir.x) * (size * 0.5);
        Some([*tip, back + side, back - side])
    }
}

/// Build connector paths for every dependency whose endpoints are both laid
/// out. Others are left out without complaint.
pub fn connector_paths(dependencies: &[Dependency], layout: &ChartLayout, stub: f32) -> Vec<ConnectorPath> {
    dependencies
        .iter()
        .filter_map(|dep| {
            let from = layout.task(dep.predecessor_id)?;
            let to = layout.task(dep.successor_id)?;

            let (start, out_dir) = if dep.kind.from_finish() {
                (from.rect.right_center(), 1.0)
            } else {
                (from.rect.left_center(), -1.0)
            };
            let (end, in_dir) = if dep.kind.to_start() {
                (to.rect.left_center(), -1.0)
            } else {
                (to.rect.right_center(), 1.0)
            };

            let leave = Pos2::new(start.x + out_dir * stub, start.y);
            let arrive = Pos2::new(end.x + in_dir * stub, end.y);
            let mid_y = (start.y + end.y) / 2.0;
            let mut points = vec![
                start,
                leave,
                Pos2::new(leave.x, mid_y),
                Pos2::new(arrive.x, mid_y),
                arrive,
                end,
            ];
            points.dedup();

            Some(ConnectorPath {
                dependency_id: dep.id,
                kind: dep.kind,
                critical: from.critical && to.critical,
                points,
            })
        })
        .collect()
}
