//! Tick-driven simulation driver for companion tethering and recovery.
//! This file wires the focused sim submodules together and owns the
//! per-tick control flow.

use std::time::Instant;

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use slotmap::SecondaryMap;

use crate::state::{Companion, Grid, Owner, SimState};
use crate::types::*;

mod classify;
mod controller;
mod events;
mod los;
mod pathfinding;
mod stuck;

#[cfg(test)]
mod test_support;

pub use controller::TetherState;

use events::EditQueue;
use stuck::SamplingVerdict;

pub struct Sim {
    state: SimState,
    tether: SecondaryMap<CompanionId, TetherState>,
    edits: EditQueue,
    rng: ChaCha8Rng,
    tick: u64,
    config: TetherConfig,
}

impl Sim {
    pub fn new(seed: u64, grid: Grid, config: TetherConfig) -> Self {
        Self {
            state: SimState::new(grid),
            tether: SecondaryMap::new(),
            edits: EditQueue::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            config,
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn spawn_owner(&mut self, pos: Vec2) -> OwnerId {
        self.state.owners.insert(Owner { pos, active: true })
    }

    pub fn spawn_companion(
        &mut self,
        owner: OwnerId,
        pos: Vec2,
        locomotion: Locomotion,
    ) -> CompanionId {
        let id = self.state.companions.insert(Companion {
            id: CompanionId::default(),
            pos,
            vel: Vec2::ZERO,
            owner,
            locomotion,
            tile_collide: true,
            target: None,
            spawn_fade: 0,
            dash_frames: 0,
        });
        self.state.companions[id].id = id;
        self.tether.insert(id, TetherState::default());
        id
    }

    pub fn despawn_companion(&mut self, id: CompanionId) {
        self.state.companions.remove(id);
        self.tether.remove(id);
    }

    pub fn tether_mode(&self, id: CompanionId) -> Option<&TetherMode> {
        self.tether.get(id).map(|state| &state.mode)
    }

    pub fn classify(&self, id: CompanionId) -> Option<Classification> {
        let companion = self.state.companions.get(id)?;
        let owner = self.state.owners.get(companion.owner)?;
        Some(classify::classify(companion, owner, &self.config))
    }

    /// Record that `owner` placed a block at `cell`. The reaction runs on the
    /// next tick, once the grid mutation is visible to passability queries.
    pub fn notify_block_placed(&mut self, cell: Cell, owner: OwnerId) {
        self.edits.push(BlockPlaced { cell, owner });
    }

    /// Convenience for tests and tools: mutate the grid and queue the edit
    /// notification in one step, the way world-editing logic would.
    pub fn place_block(&mut self, cell: Cell, owner: OwnerId) {
        self.state.grid.set_tile(cell, TileKind::Solid);
        self.notify_block_placed(cell, owner);
    }

    /// Advance the simulation one tick. `now` is the wall clock; tests pass
    /// synthesized instants so the phasing timeout is controllable.
    pub fn tick(&mut self, now: Instant) {
        self.tick += 1;
        let ready = self.edits.drain();
        for edit in ready {
            self.react_to_edit(edit, now);
        }
        let ids: Vec<CompanionId> = self.state.companions.keys().collect();
        for id in ids {
            self.step_companion(id, now);
        }
    }

    /// Cheese prevention: a companion sealed away from its owner by a fresh
    /// edit (no line of sight, no bounded route) starts phasing immediately.
    fn react_to_edit(&mut self, edit: BlockPlaced, now: Instant) {
        let Some(owner) = self.state.owners.get(edit.owner).copied() else {
            return;
        };
        if !owner.active {
            return;
        }
        let ids: Vec<CompanionId> = self
            .state
            .companions
            .iter()
            .filter(|(_, c)| c.owner == edit.owner)
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            let grid = &self.state.grid;
            let companion = &self.state.companions[id];
            if companion.pos.distance_to(owner.pos) > self.config.assist_range {
                continue;
            }
            let classification = classify::classify(companion, &owner, &self.config);
            if classification.always_phases || classification.currently_phasing {
                continue;
            }
            if los::has_line_of_sight(grid, companion.pos, owner.pos) {
                continue;
            }
            let route = pathfinding::find_path(
                grid,
                grid.cell_of(companion.pos),
                grid.cell_of(owner.pos),
                self.config.path_radius_cells,
                self.config.path_node_budget,
            );
            if route.is_some() {
                // Still walkable; leave the companion to normal recovery.
                continue;
            }
            let Some(tether) = self.tether.get_mut(id) else { continue };
            controller::begin_phasing(tether, &mut self.state.companions[id], now);
        }
    }

    fn step_companion(&mut self, id: CompanionId, now: Instant) {
        let Some(owner_id) = self.state.companions.get(id).map(|c| c.owner) else {
            return;
        };
        let Some(owner) = self.state.owners.get(owner_id).copied() else {
            return;
        };
        if !owner.active {
            // Stale or absent owner: no transitions, re-check next tick.
            return;
        }
        let SimState { grid, companions, .. } = &mut self.state;
        let Some(companion) = companions.get_mut(id) else {
            return;
        };
        let Some(tether) = self.tether.get_mut(id) else {
            return;
        };

        match tether.mode {
            TetherMode::Normal => {
                integrate_normal_motion(grid, companion);
                let classification = classify::classify(companion, &owner, &self.config);
                if !classification.needs_path_assistance
                    || companion.pos.distance_to(owner.pos) > self.config.assist_range
                    || controller::arrived(companion, &owner, grid, &self.config)
                {
                    tether.sampling.reset();
                    return;
                }
                let verdict =
                    tether.sampling.observe(companion.pos, companion.vel, owner.pos, &self.config);
                if verdict == SamplingVerdict::Stuck {
                    let route = pathfinding::find_path(
                        grid,
                        grid.cell_of(companion.pos),
                        grid.cell_of(owner.pos),
                        self.config.path_radius_cells,
                        self.config.path_node_budget,
                    );
                    match route {
                        Some(route) => {
                            controller::begin_path_following(tether, companion, grid, &route);
                        }
                        None => controller::begin_phasing(tether, companion, now),
                    }
                }
            }
            TetherMode::PathFollowing { .. } => {
                controller::drive_path_following(tether, companion, &owner, grid, &self.config, now);
            }
            TetherMode::Phasing { .. } => {
                controller::drive_phasing(
                    tether,
                    companion,
                    &owner,
                    grid,
                    &self.config,
                    &mut self.rng,
                    now,
                );
            }
        }
    }
}

/// Minimal motion integration for companions in Normal mode: velocity is
/// applied unless normal collision would push the companion into a solid
/// tile, in which case it stays put and keeps pushing.
fn integrate_normal_motion(grid: &Grid, companion: &mut Companion) {
    if companion.vel == Vec2::ZERO {
        return;
    }
    let next = companion.pos.add(companion.vel);
    if !companion.tile_collide || grid.is_passable(grid.cell_of(next)) {
        companion.pos = next;
    }
}
