use slotmap::SlotMap;

use crate::types::*;

#[derive(Clone)]
pub struct Grid {
    pub internal_width: usize,
    pub internal_height: usize,
    pub tiles: Vec<TileKind>,
    pub tile_size: f32,
}

impl Grid {
    /// Empty interior wrapped in a solid border. A zero-sized dimension
    /// yields an empty grid; every read then lands out of bounds and
    /// reports solid.
    pub fn new(width: usize, height: usize, tile_size: f32) -> Self {
        let mut tiles = vec![TileKind::Empty; width * height];
        if width > 0 && height > 0 {
            for x in 0..width {
                tiles[x] = TileKind::Solid;
                tiles[(height - 1) * width + x] = TileKind::Solid;
            }
            for y in 0..height {
                tiles[y * width] = TileKind::Solid;
                tiles[y * width + (width - 1)] = TileKind::Solid;
            }
        }
        Self { internal_width: width, internal_height: height, tiles, tile_size }
    }

    pub fn tile_at(&self, cell: Cell) -> TileKind {
        if cell.x < 0 || cell.y < 0 {
            return TileKind::Solid;
        }
        let xu = cell.x as usize;
        let yu = cell.y as usize;
        if xu >= self.internal_width || yu >= self.internal_height {
            return TileKind::Solid;
        }
        self.tiles[yu * self.internal_width + xu]
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as usize) < self.internal_width
            && (cell.y as usize) < self.internal_height
    }

    pub fn set_tile(&mut self, cell: Cell, tile: TileKind) {
        if !self.in_bounds(cell) {
            return;
        }
        let idx = self.index(cell);
        self.tiles[idx] = tile;
    }

    /// Whether an agent with normal collision can occupy this cell.
    /// One-way platforms and toggled-off obstacles do not block.
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.tile_at(cell) != TileKind::Solid
    }

    pub fn cell_of(&self, pos: Vec2) -> Cell {
        Cell {
            y: (pos.y / self.tile_size).floor() as i32,
            x: (pos.x / self.tile_size).floor() as i32,
        }
    }

    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        Vec2 {
            x: (cell.x as f32 + 0.5) * self.tile_size,
            y: (cell.y as f32 + 0.5) * self.tile_size,
        }
    }

    fn index(&self, cell: Cell) -> usize {
        (cell.y as usize) * self.internal_width + (cell.x as usize)
    }
}

#[derive(Clone, Debug)]
pub struct Companion {
    pub id: CompanionId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub owner: OwnerId,
    pub locomotion: Locomotion,
    /// True while the companion collides with terrain normally; cleared for
    /// the duration of a phase and restored on exit.
    pub tile_collide: bool,
    // Raw behavior fields, read only by the classifier.
    pub target: Option<u32>,
    pub spawn_fade: u8,
    pub dash_frames: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct Owner {
    pub pos: Vec2,
    pub active: bool,
}

pub struct SimState {
    pub grid: Grid,
    pub companions: SlotMap<CompanionId, Companion>,
    pub owners: SlotMap<OwnerId, Owner>,
}

impl SimState {
    pub fn new(grid: Grid) -> Self {
        Self { grid, companions: SlotMap::with_key(), owners: SlotMap::with_key() }
    }
}
