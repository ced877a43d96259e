//! Randomized invariant fuzzer: throws random grids, owner teleports, and
//! terrain edits at the tether controller and asserts its invariants hold
//! after every tick.

use anyhow::Result;
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use std::time::{Duration, Instant};
use tether_core::{Cell, Grid, Locomotion, Sim, TetherConfig, TetherMode, TileKind};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 2000)]
    ticks: u32,
}

const WIDTH: usize = 40;
const HEIGHT: usize = 24;
const MS_PER_TICK: u64 = 16;

fn random_grid(rng: &mut ChaCha8Rng) -> Grid {
    let mut grid = Grid::new(WIDTH, HEIGHT, 16.0);
    let walls = (WIDTH * HEIGHT) / 5;
    for _ in 0..walls {
        let cell = random_cell(rng);
        grid.set_tile(cell, TileKind::Solid);
    }
    grid
}

fn random_cell(rng: &mut ChaCha8Rng) -> Cell {
    Cell {
        y: 1 + (rng.next_u64() % (HEIGHT as u64 - 2)) as i32,
        x: 1 + (rng.next_u64() % (WIDTH as u64 - 2)) as i32,
    }
}

fn random_open_cell(rng: &mut ChaCha8Rng, grid: &Grid) -> Cell {
    loop {
        let cell = random_cell(rng);
        if grid.is_passable(cell) {
            return cell;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Starting fuzz harness on seed {} for {} ticks...", args.seed, args.ticks);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let grid = random_grid(&mut rng);
    let config = TetherConfig::default();
    let timeout = Duration::from_millis(config.phase_timeout_ms);
    let mut sim = Sim::new(args.seed, grid, config);

    let owner_cell = random_open_cell(&mut rng, &sim.state().grid);
    let owner = sim.spawn_owner(sim.state().grid.cell_center(owner_cell));
    let locomotions = [Locomotion::Ground, Locomotion::Flying, Locomotion::WormChain];
    let companions: Vec<_> = (0..3)
        .map(|slot| {
            let cell = random_open_cell(&mut rng, &sim.state().grid);
            let pos = sim.state().grid.cell_center(cell);
            sim.spawn_companion(owner, pos, locomotions[slot % locomotions.len()])
        })
        .collect();

    let t0 = Instant::now();

    for tick in 0..args.ticks {
        let now = t0 + Duration::from_millis(MS_PER_TICK * u64::from(tick));

        // Owner hops somewhere walkable every so often; sometimes a block
        // drops right next to a companion, as a player sealing it in would.
        if rng.next_u64() % 97 == 0 {
            let cell = random_open_cell(&mut rng, &sim.state().grid);
            let pos = sim.state().grid.cell_center(cell);
            sim.state_mut().owners[owner].pos = pos;
        }
        if rng.next_u64() % 31 == 0 {
            let slot = (rng.next_u64() as usize) % companions.len();
            let near = sim.state().companions[companions[slot]].pos;
            let mut cell = sim.state().grid.cell_of(near);
            cell.x += (rng.next_u64() % 3) as i32 - 1;
            cell.y += (rng.next_u64() % 3) as i32 - 1;
            let companion_cell = sim.state().grid.cell_of(near);
            if cell != companion_cell {
                sim.place_block(cell, owner);
            }
        }
        for &id in &companions {
            let owner_pos = sim.state().owners[owner].pos;
            let companion = &mut sim.state_mut().companions[id];
            if companion.tile_collide {
                companion.vel = companion.pos.direction_to(owner_pos).scale(4.0);
            }
        }

        sim.tick(now);

        for &id in &companions {
            let companion = &sim.state().companions[id];
            let mode = sim.tether_mode(id).expect("live companion must have tether state");
            match mode {
                TetherMode::Phasing { started, .. } => {
                    assert!(
                        !companion.tile_collide,
                        "Invariant failed: phasing companion still collides"
                    );
                    assert!(
                        now.duration_since(*started) <= timeout,
                        "Invariant failed: phase outlived its wall-clock timeout"
                    );
                }
                TetherMode::PathFollowing { route, next } => {
                    assert!(
                        *next < route.len(),
                        "Invariant failed: waypoint index ran off the route"
                    );
                    assert!(
                        companion.tile_collide,
                        "Invariant failed: path following must keep collision on"
                    );
                }
                TetherMode::Normal => {
                    assert!(
                        companion.tile_collide,
                        "Invariant failed: collision flag leaked out of a phase"
                    );
                }
            }
            assert!(
                companion.pos.x.is_finite() && companion.pos.y.is_finite(),
                "Invariant failed: position became non-finite"
            );
        }
    }

    println!("Fuzzing completed successfully.");
    Ok(())
}
