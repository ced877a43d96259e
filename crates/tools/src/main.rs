//! Scenario runner: replays a JSON-described grid and agent layout through
//! the tether simulation and reports what each companion's controller did.

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{Duration, Instant};
use tether_core::{Cell, CompanionId, Grid, Locomotion, Sim, TetherConfig, TetherMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario JSON file
    #[arg(short, long)]
    scenario: String,
    /// Milliseconds of wall-clock time credited per simulated tick
    #[arg(long, default_value_t = 16)]
    ms_per_tick: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Scenario {
    name: String,
    seed: u64,
    ticks: u32,
    /// ASCII rows: '#' solid, '.' empty, '-' platform, 'o' inactive obstacle.
    grid: Vec<String>,
    owner: CellSpec,
    companions: Vec<CompanionSpec>,
    #[serde(default)]
    edits: Vec<EditSpec>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct CellSpec {
    y: i32,
    x: i32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct CompanionSpec {
    y: i32,
    x: i32,
    locomotion: Locomotion,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct EditSpec {
    tick: u32,
    y: i32,
    x: i32,
}

fn build_grid(rows: &[String], tile_size: f32) -> Result<Grid> {
    let height = rows.len();
    let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
    if height == 0 || width == 0 {
        bail!("scenario grid must have at least one row and column");
    }
    let mut grid = Grid::new(width, height, tile_size);
    for (y, row) in rows.iter().enumerate() {
        if row.chars().count() != width {
            bail!("grid row {y} has ragged width");
        }
        for (x, ch) in row.chars().enumerate() {
            let cell = Cell { y: y as i32, x: x as i32 };
            let tile = match ch {
                '#' => tether_core::TileKind::Solid,
                '.' => tether_core::TileKind::Empty,
                '-' => tether_core::TileKind::Platform,
                'o' => tether_core::TileKind::Inactive,
                other => bail!("unknown grid glyph {other:?} at row {y} col {x}"),
            };
            grid.set_tile(cell, tile);
        }
    }
    Ok(grid)
}

fn mode_name(mode: &TetherMode) -> &'static str {
    match mode {
        TetherMode::Normal => "Normal",
        TetherMode::PathFollowing { .. } => "PathFollowing",
        TetherMode::Phasing { .. } => "Phasing",
    }
}

fn run(scenario: &Scenario, ms_per_tick: u64) -> Result<()> {
    let config = TetherConfig::default();
    let grid = build_grid(&scenario.grid, config.tile_size)?;
    let mut sim = Sim::new(scenario.seed, grid, config);

    let owner_pos = sim.state().grid.cell_center(Cell { y: scenario.owner.y, x: scenario.owner.x });
    let owner = sim.spawn_owner(owner_pos);
    let companions: Vec<CompanionId> = scenario
        .companions
        .iter()
        .map(|spec| {
            let pos = sim.state().grid.cell_center(Cell { y: spec.y, x: spec.x });
            sim.spawn_companion(owner, pos, spec.locomotion)
        })
        .collect();

    let t0 = Instant::now();
    let mut transitions: Vec<(u64, usize, &'static str)> = Vec::new();
    let mut last_modes: Vec<&'static str> = companions.iter().map(|_| "Normal").collect();

    for tick in 0..scenario.ticks {
        for edit in scenario.edits.iter().filter(|edit| edit.tick == tick) {
            sim.place_block(Cell { y: edit.y, x: edit.x }, owner);
        }
        for &id in &companions {
            let owner_pos = sim.state().owners[owner].pos;
            let companion = &mut sim.state_mut().companions[id];
            companion.vel = companion.pos.direction_to(owner_pos).scale(4.0);
        }
        sim.tick(t0 + Duration::from_millis(ms_per_tick * u64::from(tick)));

        for (slot, &id) in companions.iter().enumerate() {
            let mode = sim.tether_mode(id).map(mode_name).unwrap_or("Despawned");
            if mode != last_modes[slot] {
                transitions.push((sim.tick_count(), slot, mode));
                last_modes[slot] = mode;
            }
        }
    }

    println!("Scenario: {}", scenario.name);
    println!("Simulated {} ticks.", scenario.ticks);
    for (tick, slot, mode) in &transitions {
        println!("  tick {tick:>5}: companion {slot} -> {mode}");
    }
    for (slot, &id) in companions.iter().enumerate() {
        let state = sim.state();
        let gap = state.companions[id].pos.distance_to(state.owners[owner].pos);
        println!(
            "Companion {slot}: mode {} | distance to owner {:.1}",
            last_modes[slot], gap
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let scenario_data = fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario file: {}", args.scenario))?;
    let scenario: Scenario = serde_json::from_str(&scenario_data)
        .with_context(|| "Failed to deserialize scenario JSON")?;

    run(&scenario, args.ms_per_tick)
}
