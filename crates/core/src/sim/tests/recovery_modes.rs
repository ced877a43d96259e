//! Tests for recovery-mode entry guards, mutual exclusion, route
//! exhaustion, and the phasing timeout escape hatch.

use super::super::controller;
use super::support::*;

fn controller_fixture() -> (Grid, TetherState, crate::state::Companion, crate::state::Owner) {
    let grid = Grid::new(24, 8, 16.0);
    let (mut owner, mut companion) = owner_and_companion_apart(160.0);
    companion.pos = grid.cell_center(Cell { y: 4, x: 5 });
    owner.pos = grid.cell_center(Cell { y: 4, x: 15 });
    (grid, TetherState::default(), companion, owner)
}

#[test]
fn path_following_entry_is_idempotent() {
    let (grid, mut state, mut companion, _owner) = controller_fixture();
    let first = vec![Cell { y: 4, x: 6 }, Cell { y: 4, x: 7 }, Cell { y: 4, x: 8 }];
    let second = vec![Cell { y: 1, x: 1 }];
    controller::begin_path_following(&mut state, &mut companion, &grid, &first);
    let snapshot = state.mode.clone();
    controller::begin_path_following(&mut state, &mut companion, &grid, &second);
    assert_eq!(state.mode, snapshot, "re-entry must not replace the active route");
}

#[test]
fn phasing_entry_is_idempotent() {
    let (_grid, mut state, mut companion, _owner) = controller_fixture();
    let t0 = Instant::now();
    controller::begin_phasing(&mut state, &mut companion, t0);
    let snapshot = state.mode.clone();
    controller::begin_phasing(&mut state, &mut companion, t0 + Duration::from_secs(1));
    assert_eq!(state.mode, snapshot, "re-entry must not restart the phase timer");
}

#[test]
fn entering_phasing_from_path_following_is_a_clean_handover() {
    let (grid, mut state, mut companion, _owner) = controller_fixture();
    let route = vec![Cell { y: 4, x: 6 }];
    controller::begin_path_following(&mut state, &mut companion, &grid, &route);
    controller::begin_phasing(&mut state, &mut companion, Instant::now());
    assert!(state.mode.is_phasing());
    assert!(!companion.tile_collide, "phasing must suspend terrain collision");
}

#[test]
fn entering_path_following_from_phasing_restores_collision() {
    let (grid, mut state, mut companion, _owner) = controller_fixture();
    assert!(companion.tile_collide);
    controller::begin_phasing(&mut state, &mut companion, Instant::now());
    let route = vec![Cell { y: 4, x: 6 }];
    controller::begin_path_following(&mut state, &mut companion, &grid, &route);
    assert!(state.mode.is_path_following());
    assert!(
        companion.tile_collide,
        "exiting a phase must restore the saved collision flag before the new mode starts"
    );
}

#[test]
fn modes_are_never_flagged_simultaneously() {
    let (grid, mut state, mut companion, _owner) = controller_fixture();
    let now = Instant::now();
    let route = vec![Cell { y: 4, x: 6 }];
    controller::begin_path_following(&mut state, &mut companion, &grid, &route);
    controller::begin_phasing(&mut state, &mut companion, now);
    controller::begin_path_following(&mut state, &mut companion, &grid, &route);
    controller::begin_phasing(&mut state, &mut companion, now);
    assert!(
        !(state.mode.is_path_following() && state.mode.is_phasing()),
        "recovery modes are mutually exclusive by construction"
    );
}

#[test]
fn exhausted_route_without_arrival_escalates_to_phasing() {
    let (grid, mut state, mut companion, owner) = controller_fixture();
    // A one-cell route that ends far short of the owner.
    let route = vec![grid.cell_of(companion.pos)];
    let config = TetherConfig::default();
    controller::begin_path_following(&mut state, &mut companion, &grid, &route);
    let now = Instant::now();
    for _ in 0..4 {
        controller::drive_path_following(&mut state, &mut companion, &owner, &grid, &config, now);
    }
    assert!(
        state.mode.is_phasing(),
        "running out of waypoints short of the owner must escalate"
    );
}

#[test]
fn route_sealed_mid_follow_is_never_walked_through() {
    // Wall at x=10 with two openings, so sealing the one the route uses
    // leaves another bounded route alive and the edit reaction stays quiet.
    let (mut sim, owner, companion) = open_corridor_sim();
    {
        let grid = &mut sim.state_mut().grid;
        for y in [1, 3, 4, 5] {
            grid.set_tile(Cell { y, x: 10 }, TileKind::Solid);
        }
    }
    let t0 = Instant::now();
    run_until_mode_change(&mut sim, companion, t0, 200);
    assert!(sim.tether_mode(companion).is_some_and(TetherMode::is_path_following));

    let route = match sim.tether_mode(companion) {
        Some(TetherMode::PathFollowing { route, .. }) => route.clone(),
        other => panic!("expected an active route, got {other:?}"),
    };
    let used_gap = route
        .iter()
        .map(|waypoint| sim.state().grid.cell_of(*waypoint))
        .find(|cell| cell.x == 10)
        .expect("the route must cross the wall through one of the openings");
    sim.place_block(used_gap, owner);

    let mut recovered = false;
    for _ in 0..400 {
        sim.tick(t0);
        let state = sim.state();
        let walker = &state.companions[companion];
        if walker.tile_collide {
            assert!(
                state.grid.is_passable(state.grid.cell_of(walker.pos)),
                "companion with collision enabled occupies a solid cell at {:?}",
                walker.pos
            );
        }
        if sim.tether_mode(companion).is_some_and(TetherMode::is_normal)
            && walker.pos.distance_to(state.owners[owner].pos) <= sim.config().arrival_radius
        {
            recovered = true;
            break;
        }
    }
    assert!(recovered, "the stale route must be abandoned and recovery must still finish");
}

#[test]
fn phasing_timeout_forces_relocation_near_the_owner() {
    let (mut sim, owner, companion) = sealed_box_sim();
    let t0 = Instant::now();
    run_until_mode_change(&mut sim, companion, t0, 200);
    assert!(sim.tether_mode(companion).is_some_and(TetherMode::is_phasing));

    // Owner is unreachable even while phasing: move it away every tick.
    let timeout = Duration::from_millis(sim.config().phase_timeout_ms);
    sim.state_mut().owners[owner].pos = Vec2::new(10_000.0, 10_000.0);
    sim.tick(t0 + timeout);

    assert!(
        sim.tether_mode(companion).is_some_and(TetherMode::is_normal),
        "the wall-clock timeout must end the phase"
    );
    let state = sim.state();
    let scatter = sim.config().teleport_scatter;
    let landing = state.companions[companion].pos.distance_to(state.owners[owner].pos);
    assert!(
        landing <= scatter + f32::EPSILON,
        "forced relocation must land within the scatter radius, got {landing}"
    );
    assert!(
        state.companions[companion].tile_collide,
        "collision must be restored after the forced teleport"
    );
}

#[test]
fn phasing_arrival_restores_collision_and_returns_to_normal() {
    let (mut sim, owner, companion) = sealed_box_sim();
    let t0 = Instant::now();
    run_until_mode_change(&mut sim, companion, t0, 200);
    assert!(sim.tether_mode(companion).is_some_and(TetherMode::is_phasing));

    // Let the phase fly: it crosses the sealed wall and closes the gap.
    let owner_pos = sim.state().owners[owner].pos;
    for _ in 0..400 {
        sim.tick(t0);
        if sim.tether_mode(companion).is_some_and(TetherMode::is_normal) {
            break;
        }
    }
    let state = sim.state();
    assert!(
        sim.tether_mode(companion).is_some_and(TetherMode::is_normal),
        "phasing must end by arrival well before the timeout"
    );
    assert!(state.companions[companion].tile_collide, "collision flag must be restored");
    assert!(
        state.companions[companion].pos.distance_to(owner_pos) <= sim.config().arrival_radius,
        "arrival requires closing to the configured radius"
    );
}
