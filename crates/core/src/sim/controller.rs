//! Per-companion tether state machine: path following, phasing, and the
//! transitions between them. One `TetherState` per companion, owned apart
//! from the simulation entity and persisted across ticks.

use std::time::{Duration, Instant};

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::Rng;

use crate::state::{Companion, Grid, Owner};
use crate::sim::los::has_line_of_sight;
use crate::sim::stuck::StuckSampling;
use crate::types::*;

#[derive(Debug, Default)]
pub struct TetherState {
    pub(super) mode: TetherMode,
    pub(super) sampling: StuckSampling,
}

/// Arrival means both sight of the owner and proximity; proximity alone is
/// not enough, or a companion one thin wall away would stop recovering.
pub(super) fn arrived(
    companion: &Companion,
    owner: &Owner,
    grid: &Grid,
    config: &TetherConfig,
) -> bool {
    companion.pos.distance_to(owner.pos) <= config.arrival_radius
        && has_line_of_sight(grid, companion.pos, owner.pos)
}

/// Enter PathFollowing on a freshly computed route. Re-entry while already
/// following is a no-op; an active phase is cleanly exited first.
pub(super) fn begin_path_following(
    state: &mut TetherState,
    companion: &mut Companion,
    grid: &Grid,
    route: &[Cell],
) {
    if state.mode.is_path_following() {
        return;
    }
    if state.mode.is_phasing() {
        end_phasing(state, companion);
    }
    let waypoints = route.iter().map(|cell| grid.cell_center(*cell)).collect();
    state.mode = TetherMode::PathFollowing { route: waypoints, next: 0 };
    state.sampling.reset();
}

/// Enter Phasing: terrain collision is suspended until exit. Re-entry while
/// already phasing is a no-op; an active route is dropped first.
pub(super) fn begin_phasing(state: &mut TetherState, companion: &mut Companion, now: Instant) {
    if state.mode.is_phasing() {
        return;
    }
    state.mode =
        TetherMode::Phasing { started: now, restore_collision: companion.tile_collide };
    companion.tile_collide = false;
    state.sampling.reset();
}

pub(super) fn end_phasing(state: &mut TetherState, companion: &mut Companion) {
    if let TetherMode::Phasing { restore_collision, .. } = state.mode {
        companion.tile_collide = restore_collision;
        state.mode = TetherMode::Normal;
    }
}

pub(super) fn drive_path_following(
    state: &mut TetherState,
    companion: &mut Companion,
    owner: &Owner,
    grid: &Grid,
    config: &TetherConfig,
    now: Instant,
) {
    if arrived(companion, owner, grid, config) {
        companion.vel = Vec2::ZERO;
        state.mode = TetherMode::Normal;
        return;
    }

    let escalate = match &mut state.mode {
        TetherMode::PathFollowing { route, next } => {
            if let Some(waypoint) = route.get(*next).copied() {
                if companion.pos.distance_to(waypoint) <= config.waypoint_radius {
                    *next += 1;
                }
            }
            match route.get(*next).copied() {
                Some(waypoint) => {
                    let direction = companion.pos.direction_to(waypoint);
                    let step = companion.pos.distance_to(waypoint).min(config.follow_speed);
                    let next_pos = companion.pos.add(direction.scale(step));
                    if grid.is_passable(grid.cell_of(next_pos)) {
                        companion.vel = direction.scale(config.follow_speed);
                        companion.pos = next_pos;
                        false
                    } else {
                        // A terrain edit landed on the route after it was
                        // computed; the route is no longer legal to walk.
                        true
                    }
                }
                None => true,
            }
        }
        _ => return,
    };

    if escalate {
        // Route exhausted short of arrival, or invalidated under our feet.
        state.mode = TetherMode::Normal;
        begin_phasing(state, companion, now);
    }
}

pub(super) fn drive_phasing(
    state: &mut TetherState,
    companion: &mut Companion,
    owner: &Owner,
    grid: &Grid,
    config: &TetherConfig,
    rng: &mut ChaCha8Rng,
    now: Instant,
) {
    let TetherMode::Phasing { started, .. } = state.mode else {
        return;
    };

    if arrived(companion, owner, grid, config) {
        companion.vel = Vec2::ZERO;
        end_phasing(state, companion);
        return;
    }

    if now.duration_since(started) >= Duration::from_millis(config.phase_timeout_ms) {
        // The escape hatch: no recovery attempt outlives the timeout.
        companion.pos = owner.pos.add(random_scatter(rng, config.teleport_scatter));
        companion.vel = Vec2::ZERO;
        end_phasing(state, companion);
        return;
    }

    let distance = companion.pos.distance_to(owner.pos);
    let speed = if distance > config.phase_slowdown_distance {
        config.phase_speed
    } else {
        let floor = config.phase_speed * config.phase_min_speed_fraction;
        floor + (config.phase_speed - floor) * (distance / config.phase_slowdown_distance)
    };
    let direction = companion.pos.direction_to(owner.pos);
    companion.vel = direction.scale(speed);
    companion.pos = companion.pos.add(direction.scale(distance.min(speed)));
}

fn random_scatter(rng: &mut ChaCha8Rng, radius: f32) -> Vec2 {
    let angle = unit_f32(rng) * std::f32::consts::TAU;
    let r = radius * unit_f32(rng).sqrt();
    Vec2::new(angle.cos() * r, angle.sin() * r)
}

fn unit_f32(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u64() >> 40) as f32 / (1u32 << 24) as f32
}
