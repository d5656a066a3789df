//! Weapon-hand placement tables.
//!
//! Offsets are in chest space (origin at the chest pivot, forward -Z) and
//! rotated by look pitch before being placed in the world.

use glam::Vec3;

use crate::weapon::{WeaponCategory, WeaponVisualConfig};

use super::AnimatorInput;

/// Obstacles closer than this push the weapon into the obstructed pose.
pub const OBSTRUCTION_DISTANCE: f32 = 0.6;
/// Past this look pitch (radians) the weapon is pulled toward the body.
pub const PITCH_CORRECTION_START: f32 = 0.6;

/// Stance slot a hand pose is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldStance {
    Hip,
    Ads,
    Sprint,
    Obstructed,
    Prone,
}

impl HoldStance {
    /// prone > obstructed > sprint > ADS > hip.
    pub fn select(input: &AnimatorInput) -> Self {
        let obstructed = input
            .obstruction
            .is_some_and(|d| d < OBSTRUCTION_DISTANCE);
        if input.prone {
            HoldStance::Prone
        } else if obstructed {
            HoldStance::Obstructed
        } else if input.sprinting && input.is_moving() && !input.ads {
            HoldStance::Sprint
        } else if input.ads {
            HoldStance::Ads
        } else {
            HoldStance::Hip
        }
    }
}

/// Hand offset and euler rotation `(pitch, yaw, roll)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub offset: Vec3,
    pub rotation: Vec3,
}

const fn pose(x: f32, y: f32, z: f32, pitch: f32, yaw: f32, roll: f32) -> HandPose {
    HandPose {
        offset: Vec3::new(x, y, z),
        rotation: Vec3::new(pitch, yaw, roll),
    }
}

// Rows: hip, ads, sprint, obstructed, prone
const RIFLE: [HandPose; 5] = [
    pose(0.18, -0.2, -0.35, 0.0, 0.0, 0.0),
    pose(0.0, -0.12, -0.3, 0.0, 0.0, 0.0),
    pose(0.12, -0.3, -0.2, -0.5, 0.7, 0.3),
    pose(0.14, -0.15, -0.15, 0.9, 0.0, 0.0),
    pose(0.1, -0.05, -0.45, 0.0, 0.0, 0.0),
];

const PISTOL: [HandPose; 5] = [
    pose(0.12, -0.18, -0.4, 0.0, 0.0, 0.0),
    pose(0.0, -0.1, -0.45, 0.0, 0.0, 0.0),
    pose(0.2, -0.35, -0.1, -0.9, 0.0, 0.0),
    pose(0.14, -0.05, -0.2, 1.0, 0.0, 0.0),
    pose(0.05, -0.02, -0.5, 0.0, 0.0, 0.0),
];

const SHOTGUN: [HandPose; 5] = [
    pose(0.2, -0.22, -0.33, 0.0, 0.0, 0.0),
    pose(0.0, -0.13, -0.28, 0.0, 0.0, 0.0),
    pose(0.14, -0.3, -0.2, -0.5, 0.75, 0.3),
    pose(0.15, -0.15, -0.15, 0.95, 0.0, 0.0),
    pose(0.1, -0.05, -0.42, 0.0, 0.0, 0.0),
];

const KNIFE: [HandPose; 5] = [
    pose(0.22, -0.3, -0.3, -0.3, 0.0, 0.0),
    pose(0.15, -0.2, -0.35, -0.1, 0.0, 0.0),
    pose(0.25, -0.45, -0.05, -0.8, 0.0, 0.0),
    pose(0.22, -0.3, -0.2, -0.3, 0.0, 0.0),
    pose(0.15, -0.05, -0.4, 0.0, 0.0, 0.0),
];

const THROWABLE: [HandPose; 5] = [
    pose(0.22, -0.25, -0.3, 0.0, 0.0, 0.0),
    pose(0.2, -0.1, -0.25, 0.0, 0.0, 0.0),
    pose(0.25, -0.45, -0.05, -0.6, 0.0, 0.0),
    pose(0.22, -0.25, -0.2, 0.0, 0.0, 0.0),
    pose(0.15, -0.05, -0.4, 0.0, 0.0, 0.0),
];

/// Look up the base hand pose for a category and stance.
pub fn hand_pose(category: WeaponCategory, stance: HoldStance) -> HandPose {
    let table = match category {
        WeaponCategory::Rifle => &RIFLE,
        WeaponCategory::Pistol => &PISTOL,
        WeaponCategory::Shotgun => &SHOTGUN,
        WeaponCategory::Knife => &KNIFE,
        WeaponCategory::Throwable => &THROWABLE,
    };
    let row = match stance {
        HoldStance::Hip => 0,
        HoldStance::Ads => 1,
        HoldStance::Sprint => 2,
        HoldStance::Obstructed => 3,
        HoldStance::Prone => 4,
    };
    table[row]
}

/// Pulls the weapon toward the chest when aiming sharply up or down.
pub fn pitch_correction(pitch: f32) -> Vec3 {
    let excess = (pitch.abs() - PITCH_CORRECTION_START).max(0.0);
    Vec3::new(0.0, -pitch.signum() * excess * 0.08, excess * 0.25)
}

/// Idle sway plus movement bob.
pub fn secondary_motion(
    weapon: &WeaponVisualConfig,
    time: f32,
    gait_phase: f32,
    moving: bool,
) -> Vec3 {
    let sway_t = time * weapon.sway.frequency * std::f32::consts::TAU;
    let sway = Vec3::new(
        sway_t.sin() * weapon.sway.amplitude,
        (sway_t * 2.0).sin() * weapon.sway.amplitude * 0.5,
        0.0,
    );
    if !moving {
        return sway;
    }
    let bob_t = gait_phase * weapon.bob.frequency;
    sway + Vec3::new(
        bob_t.sin() * weapon.bob.amplitude * 0.5,
        (bob_t * 2.0).sin().abs() * -weapon.bob.amplitude,
        0.0,
    )
}
