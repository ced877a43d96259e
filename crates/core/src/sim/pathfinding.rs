//! Bounded shortest-path search over the live tile grid.
//! This module exists so route queries stay pure and cheap to reason about.
//! It does not own recovery policy or companion motion.

use std::collections::{BTreeMap, BTreeSet};

use crate::state::Grid;
use crate::types::Cell;

/// Fixed-point scale for the Euclidean heuristic so f-costs stay in ordered
/// integers. Flooring keeps the heuristic admissible.
const COST_SCALE: u32 = 100;

/// Open-set entry. Field order matters: equal-cost ties resolve by x then y,
/// which keeps search order reproducible across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    f: u32,
    x: i32,
    y: i32,
}

/// Route from `start` to `goal`, inclusive of both ends, or `None`.
///
/// `None` conflates "unreachable" with "reachable but beyond `max_nodes`";
/// the budget guarantees a worst-case per-call cost, so callers must treat
/// `None` as "fall back to phasing", never as proof no path exists.
pub(super) fn find_path(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    max_radius: f32,
    max_nodes: u32,
) -> Option<Vec<Cell>> {
    if !grid.is_passable(start) || !grid.is_passable(goal) {
        return None;
    }
    if start.euclidean_to(goal) > max_radius {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set = BTreeSet::new();
    let mut g_score = BTreeMap::new();
    let mut came_from = BTreeMap::new();
    open_set.insert(OpenNode { f: heuristic(start, goal), x: start.x, y: start.y });
    g_score.insert(start, 0u32);

    let mut popped = 0u32;
    while let Some(curr) = open_set.pop_first() {
        popped += 1;
        if popped > max_nodes {
            return None;
        }
        let cell = Cell { y: curr.y, x: curr.x };
        if cell == goal {
            return Some(reconstruct_route(&came_from, start, goal));
        }
        let cur_g = *g_score.get(&cell).expect("popped node must have a g-score");
        for n in neighbors(cell) {
            if !grid.is_passable(n) {
                continue;
            }
            // Axis-aligned prune around the goal bounds the explored area.
            if (n.x - goal.x).abs() as f32 > max_radius || (n.y - goal.y).abs() as f32 > max_radius
            {
                continue;
            }
            let tentative = cur_g + 1;
            if tentative < *g_score.get(&n).unwrap_or(&u32::MAX) {
                came_from.insert(n, cell);
                g_score.insert(n, tentative);
                let f = tentative * COST_SCALE + heuristic(n, goal);
                open_set.insert(OpenNode { f, x: n.x, y: n.y });
            }
        }
    }
    None
}

fn heuristic(from: Cell, goal: Cell) -> u32 {
    (from.euclidean_to(goal) * COST_SCALE as f32) as u32
}

fn reconstruct_route(came: &BTreeMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut cell = goal;
    let mut route = vec![cell];
    while cell != start {
        cell = *came.get(&cell).expect("route must be reconstructible back to start");
        route.push(cell);
    }
    route.reverse();
    route
}

/// Cardinal neighbors only. Diagonal steps are never generated, so a route
/// can never cut through a sealed corner the companion could not physically
/// pass.
pub(super) fn neighbors(c: Cell) -> [Cell; 4] {
    [
        Cell { y: c.y - 1, x: c.x },
        Cell { y: c.y, x: c.x + 1 },
        Cell { y: c.y + 1, x: c.x },
        Cell { y: c.y, x: c.x - 1 },
    ]
}
