//! Statistical stuck detection via a running position average.
//! A companion is stuck when it keeps pushing toward its owner but its
//! position stays pinned to the mean for several consecutive ticks.

use crate::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SamplingVerdict {
    Stuck,
    NotStuck,
}

/// Sampling state for one companion. Lives only while the controller is in
/// Normal mode; any transition out resets it.
#[derive(Clone, Debug, Default)]
pub struct StuckSampling {
    mean: Vec2,
    samples: u32,
    stuck_frames: u32,
    axis: Option<Axis>,
    start_axis_distance: f32,
}

impl StuckSampling {
    pub(super) fn reset(&mut self) {
        *self = StuckSampling::default();
    }

    pub(super) fn observe(
        &mut self,
        pos: Vec2,
        vel: Vec2,
        owner_pos: Vec2,
        config: &TetherConfig,
    ) -> SamplingVerdict {
        let to_owner = owner_pos.sub(pos);
        if vel.dot(to_owner) <= 0.0 {
            // Not trying to reach the owner; whatever run was in progress is void.
            self.reset();
            return SamplingVerdict::NotStuck;
        }

        match self.axis {
            None => {
                // First qualifying sample: lock in whichever axis dominates the
                // separation, so later progress checks measure the same thing.
                let axis = if to_owner.x.abs() >= to_owner.y.abs() {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                };
                self.axis = Some(axis);
                self.start_axis_distance = axis_distance(to_owner, axis);
            }
            Some(axis) => {
                let now = axis_distance(to_owner, axis);
                if self.start_axis_distance - now > config.progress_threshold {
                    // Real progress on the dominant axis; start a fresh run.
                    self.reset();
                    return SamplingVerdict::NotStuck;
                }
            }
        }

        self.samples += 1;
        let n = self.samples as f32;
        self.mean = self.mean.add(pos.sub(self.mean).scale(1.0 / n));

        if self.samples < config.stuck_min_samples {
            return SamplingVerdict::NotStuck;
        }
        if pos.distance_to(self.mean) < config.stuck_jitter_radius {
            self.stuck_frames += 1;
        } else {
            self.stuck_frames = 0;
        }
        if self.stuck_frames >= config.stuck_min_frames {
            SamplingVerdict::Stuck
        } else {
            SamplingVerdict::NotStuck
        }
    }
}

fn axis_distance(delta: Vec2, axis: Axis) -> f32 {
    match axis {
        Axis::Horizontal => delta.x.abs(),
        Axis::Vertical => delta.y.abs(),
    }
}
