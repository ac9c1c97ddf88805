//! Placement of generated branch and merge nodes

use super::entities::Position;
use std::f64::consts::PI;

/// Distance between a parent and its branch nodes
pub const DEFAULT_BRANCH_RADIUS: f64 = 320.0;

/// Branch positions on a half-circle to the right of `parent`.
///
/// Angles are spread evenly over `-90°..=90°`, so branches fan out above
/// and below the parent. A single branch sits directly to the right.
pub fn branch_positions(parent: Position, count: usize, radius: f64) -> Vec<Position> {
    (0..count)
        .map(|i| {
            let angle = -PI / 2.0 + PI * (i as f64 + 0.5) / count as f64;
            Position::new(parent.x + radius * angle.cos(), parent.y + radius * angle.sin())
        })
        .collect()
}

/// Merge position: one radius beyond the horizontal midpoint of the
/// branches, at their average height.
pub fn merge_position(branches: &[Position], radius: f64) -> Position {
    if branches.is_empty() {
        return Position::new(radius, 0.0);
    }

    let min_x = branches.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = branches.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let avg_y = branches.iter().map(|p| p.y).sum::<f64>() / branches.len() as f64;

    Position::new((min_x + max_x) / 2.0 + radius, avg_y)
}
