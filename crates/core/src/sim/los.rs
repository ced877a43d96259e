//! Line-of-sight ray test between world points.
//! Only solid tiles occlude; platforms and toggled-off obstacles do not.

use crate::state::Grid;
use crate::types::{Cell, TileKind, Vec2};

pub(super) fn has_line_of_sight(grid: &Grid, from: Vec2, to: Vec2) -> bool {
    let origin = grid.cell_of(from);
    let target = grid.cell_of(to);

    let dx = target.x - origin.x;
    let dy = target.y - origin.y;
    let sx = dx.signum();
    let sy = dy.signum();
    let total_dist_x = dx.abs();
    let total_dist_y = dy.abs();

    let mut x = origin.x;
    let mut y = origin.y;
    let mut current_step_x = 0;
    let mut current_step_y = 0;

    while current_step_x < total_dist_x || current_step_y < total_dist_y {
        let lhs = (1 + 2 * current_step_x) * total_dist_y;
        let rhs = (1 + 2 * current_step_y) * total_dist_x;

        if lhs == rhs {
            x += sx;
            y += sy;
            current_step_x += 1;
            current_step_y += 1;
        } else if lhs < rhs {
            x += sx;
            current_step_x += 1;
        } else {
            y += sy;
            current_step_y += 1;
        }

        if x == target.x && y == target.y {
            break;
        }
        if grid.tile_at(Cell { y, x }) == TileKind::Solid {
            return false;
        }
    }
    true
}
