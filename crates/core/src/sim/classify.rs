//! Behavioral classification of raw companion simulation fields.
//! This module exists to keep the "does this companion even need help"
//! policy in one exhaustively-checked place.
//! It does not own controller transitions or motion.

use crate::state::{Companion, Owner};
use crate::types::*;

/// Speed below which a companion near its owner counts as idling.
const IDLE_SPEED: f32 = 0.5;

pub(super) fn classify(
    companion: &Companion,
    owner: &Owner,
    config: &TetherConfig,
) -> Classification {
    let currently_phasing = !companion.tile_collide;
    let always_phases = match companion.locomotion {
        Locomotion::WormChain => true,
        Locomotion::Ground | Locomotion::Flying => false,
    };

    let state = behavior_state(companion, owner, currently_phasing, config);

    // Only companions actively walking back through normal collision get
    // assistance. Attacking, idle, and already-phasing companions are
    // behaving correctly and must be left alone.
    let needs_path_assistance =
        !always_phases && !currently_phasing && state == BehaviorState::Following;

    Classification {
        state,
        locomotion: companion.locomotion,
        always_phases,
        currently_phasing,
        needs_path_assistance,
    }
}

fn behavior_state(
    companion: &Companion,
    owner: &Owner,
    currently_phasing: bool,
    config: &TetherConfig,
) -> BehaviorState {
    if companion.spawn_fade > 0 {
        return BehaviorState::Spawning;
    }
    if companion.dash_frames > 0 {
        return BehaviorState::Dashing;
    }
    if companion.target.is_some() {
        return BehaviorState::Attacking;
    }
    if currently_phasing {
        return BehaviorState::Returning;
    }
    let to_owner = companion.pos.distance_to(owner.pos);
    if to_owner <= config.arrival_radius && companion.vel.length() < IDLE_SPEED {
        return BehaviorState::Idle;
    }
    if companion.vel.dot(companion.pos.direction_to(owner.pos)) > 0.0 {
        return BehaviorState::Following;
    }
    BehaviorState::Unknown
}
