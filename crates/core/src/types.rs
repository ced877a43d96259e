use std::time::Instant;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct CompanionId;
    pub struct OwnerId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub y: i32,
    pub x: i32,
}

impl Cell {
    pub fn euclidean_to(self, other: Cell) -> f32 {
        let dy = (self.y - other.y) as f32;
        let dx = (self.x - other.x) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2 { x: self.x + other.x, y: self.y + other.y }
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2 { x: self.x - other.x, y: self.y - other.y }
    }

    pub fn scale(self, k: f32) -> Vec2 {
        Vec2 { x: self.x * k, y: self.y * k }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector pointing at `other`, or zero when the points coincide.
    pub fn direction_to(self, other: Vec2) -> Vec2 {
        let delta = other.sub(self);
        let len = delta.length();
        if len <= f32::EPSILON { Vec2::ZERO } else { delta.scale(1.0 / len) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileKind {
    Empty,
    Solid,
    /// One-way platform: stands on, walks through. Passable for routing.
    Platform,
    /// Toggled-off obstacle (e.g. an open gate). Passable until re-activated.
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Locomotion {
    Ground,
    Flying,
    /// Segmented burrower that ignores terrain entirely and never needs help.
    WormChain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BehaviorState {
    Unknown,
    Idle,
    Following,
    Attacking,
    Returning,
    Dashing,
    Spawning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Recovery mode of a tethered companion. Carrying the mode payload in the
/// variant makes PathFollowing and Phasing mutually exclusive by construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TetherMode {
    #[default]
    Normal,
    PathFollowing { route: Vec<Vec2>, next: usize },
    Phasing { started: Instant, restore_collision: bool },
}

impl TetherMode {
    pub fn is_normal(&self) -> bool {
        matches!(self, TetherMode::Normal)
    }

    pub fn is_path_following(&self) -> bool {
        matches!(self, TetherMode::PathFollowing { .. })
    }

    pub fn is_phasing(&self) -> bool {
        matches!(self, TetherMode::Phasing { .. })
    }
}

/// A block the owner just placed. Queued for one tick so the reaction reads
/// post-edit grid state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPlaced {
    pub cell: Cell,
    pub owner: OwnerId,
}

/// Normalized classifier output consumed by the tether controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub state: BehaviorState,
    pub locomotion: Locomotion,
    pub always_phases: bool,
    pub currently_phasing: bool,
    pub needs_path_assistance: bool,
}

/// Tunable constants for tethering and recovery. Defaults assume a 60 Hz tick
/// and 16-unit tiles; the stuck thresholds are empirical and exposed here so a
/// different tick rate can re-tune them without touching controller code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TetherConfig {
    /// World units per grid cell edge.
    pub tile_size: f32,
    /// Companions farther than this from their owner are handled by outer
    /// game logic, not by this controller.
    pub assist_range: f32,
    /// Search radius for the bounded pathfinder, in cells.
    pub path_radius_cells: f32,
    /// Maximum nodes popped from the A* open set before giving up.
    pub path_node_budget: u32,
    /// Samples accumulated before the stuck test may fire.
    pub stuck_min_samples: u32,
    /// Consecutive qualifying ticks required to confirm a stuck verdict.
    pub stuck_min_frames: u32,
    /// Current position must stay within this distance of the running mean
    /// to count as a stuck frame.
    pub stuck_jitter_radius: f32,
    /// Shrinkage on the dominant axis that counts as real progress.
    pub progress_threshold: f32,
    /// Speed while walking a computed route.
    pub follow_speed: f32,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_radius: f32,
    /// Distance (plus line of sight) at which the owner counts as reached.
    pub arrival_radius: f32,
    /// Top speed while phasing.
    pub phase_speed: f32,
    /// Phasing starts slowing down inside this distance to the owner.
    pub phase_slowdown_distance: f32,
    /// Floor of the phasing speed ramp, as a fraction of `phase_speed`.
    pub phase_min_speed_fraction: f32,
    /// Wall-clock bound on a phasing attempt before the forced teleport.
    pub phase_timeout_ms: u64,
    /// Radius of the random landing offset around the owner on forced teleport.
    pub teleport_scatter: f32,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            tile_size: 16.0,
            assist_range: 960.0,
            path_radius_cells: 50.0,
            path_node_budget: 1200,
            stuck_min_samples: 10,
            stuck_min_frames: 4,
            stuck_jitter_radius: 2.0,
            progress_threshold: 2.0,
            follow_speed: 6.0,
            waypoint_radius: 4.0,
            arrival_radius: 32.0,
            phase_speed: 12.0,
            phase_slowdown_distance: 100.0,
            phase_min_speed_fraction: 0.25,
            phase_timeout_ms: 3000,
            teleport_scatter: 48.0,
        }
    }
}
