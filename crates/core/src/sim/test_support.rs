//! Shared test fixtures for the `sim` submodule test suites.
//! This module exists to avoid repeating grid and agent setup across many
//! tests. It does not own production simulation logic.

use super::*;
use crate::state::{Companion, Grid, Owner};

pub(super) fn default_sim(grid: Grid) -> Sim {
    Sim::new(1234, grid, TetherConfig::default())
}

/// Open corridor, owner on the right, ground companion on the left with a
/// clear straight walk between them.
pub(super) fn open_corridor_sim() -> (Sim, OwnerId, CompanionId) {
    let grid = Grid::new(24, 8, 16.0);
    let mut sim = default_sim(grid);
    let owner_pos = sim.state().grid.cell_center(Cell { y: 4, x: 15 });
    let companion_pos = sim.state().grid.cell_center(Cell { y: 4, x: 5 });
    let owner = sim.spawn_owner(owner_pos);
    let companion = sim.spawn_companion(owner, companion_pos, Locomotion::Ground);
    (sim, owner, companion)
}

/// Companion and owner separated by a full-height wall with an open detour
/// row along the top, so a bounded route exists but the straight line does
/// not.
pub(super) fn walled_detour_sim() -> (Sim, OwnerId, CompanionId) {
    let (mut sim, owner, companion) = open_corridor_sim();
    let grid = &mut sim.state_mut().grid;
    for y in 2..7 {
        grid.set_tile(Cell { y, x: 10 }, TileKind::Solid);
    }
    (sim, owner, companion)
}

/// Companion sealed inside a solid box: no line of sight and no route.
pub(super) fn sealed_box_sim() -> (Sim, OwnerId, CompanionId) {
    let (mut sim, owner, companion) = open_corridor_sim();
    let companion_cell = Cell { y: 4, x: 5 };
    let grid = &mut sim.state_mut().grid;
    for y in (companion_cell.y - 1)..=(companion_cell.y + 1) {
        for x in (companion_cell.x - 1)..=(companion_cell.x + 1) {
            if (Cell { y, x }) != companion_cell {
                grid.set_tile(Cell { y, x }, TileKind::Solid);
            }
        }
    }
    (sim, owner, companion)
}

/// Point the companion's intended velocity straight at its owner.
pub(super) fn push_toward_owner(sim: &mut Sim, companion: CompanionId, speed: f32) {
    let owner_id = sim.state().companions[companion].owner;
    let owner_pos = sim.state().owners[owner_id].pos;
    let companion_mut = &mut sim.state_mut().companions[companion];
    companion_mut.vel = companion_mut.pos.direction_to(owner_pos).scale(speed);
}

/// Tick the sim until the companion's stuck detector has had every chance
/// to fire, re-aiming its velocity each tick.
pub(super) fn run_until_mode_change(
    sim: &mut Sim,
    companion: CompanionId,
    now: Instant,
    max_ticks: u32,
) -> u32 {
    for tick in 0..max_ticks {
        if !sim.tether_mode(companion).is_some_and(TetherMode::is_normal) {
            return tick;
        }
        push_toward_owner(sim, companion, 4.0);
        sim.tick(now);
    }
    max_ticks
}

/// Free-standing agent pair for classifier tests, `distance` apart on the
/// horizontal axis.
pub(super) fn owner_and_companion_apart(distance: f32) -> (Owner, Companion) {
    let companion = Companion {
        id: CompanionId::default(),
        pos: Vec2::new(200.0, 200.0),
        vel: Vec2::ZERO,
        owner: OwnerId::default(),
        locomotion: Locomotion::Ground,
        tile_collide: true,
        target: None,
        spawn_fade: 0,
        dash_frames: 0,
    };
    let owner = Owner { pos: Vec2::new(200.0 + distance, 200.0), active: true };
    (owner, companion)
}

#[allow(dead_code)]
pub(super) fn draw_grid_diag(grid: &Grid, companion: Vec2, owner: Vec2) -> String {
    let companion_cell = grid.cell_of(companion);
    let owner_cell = grid.cell_of(owner);
    let mut text = String::new();
    for y in 0..grid.internal_height {
        for x in 0..grid.internal_width {
            let cell = Cell { y: y as i32, x: x as i32 };
            let c = if cell == companion_cell {
                'c'
            } else {
                match grid.tile_at(cell) {
                    _ if cell == owner_cell => '@',
                    TileKind::Solid => '#',
                    TileKind::Platform => '-',
                    TileKind::Inactive => 'o',
                    TileKind::Empty => '.',
                }
            };
            text.push(c);
        }
        text.push('\n');
    }
    text
}
