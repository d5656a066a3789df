//! Seams to the rendering collaborator.

use glam::{Mat4, Vec3};
use mirage_core::animator::AvatarPose;
use mirage_core::identity::Identity;
use mirage_core::weapon::WeaponVisualConfig;

/// Opaque handle to an avatar rig owned by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigHandle(pub u64);

/// Camera state sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    /// Projection * view, [0, 1] depth range.
    pub view_projection: Mat4,
}

impl CameraSnapshot {
    /// Right-handed perspective camera at `position` looking at `target`.
    pub fn look_at(position: Vec3, target: Vec3, fov_y: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(position, target, Vec3::Y);
        let projection = Mat4::perspective_rh(fov_y, aspect, 0.1, 1000.0);
        Self {
            position,
            view_projection: projection * view,
        }
    }
}

/// Scene-graph operations the registry drives.
pub trait SceneBackend {
    /// Build a rig. `None` if the scene cannot create one right now.
    fn create_rig(&mut self, entity_id: &str, identity: &Identity) -> Option<RigHandle>;

    fn destroy_rig(&mut self, rig: RigHandle);

    fn set_rig_visible(&mut self, rig: RigHandle, visible: bool);

    /// Root placement. Called every tick, regardless of LOD.
    fn place_rig(&mut self, rig: RigHandle, position: Vec3, yaw: f32);

    /// Full pose. Only called on ticks the avatar animates.
    fn apply_pose(&mut self, rig: RigHandle, pose: &AvatarPose);

    /// Rebuild the held weapon's parts; `None` leaves the hands empty.
    fn equip_weapon(&mut self, rig: RigHandle, weapon: Option<&WeaponVisualConfig>);

    fn set_identity(&mut self, rig: RigHandle, name: &str, identity: &Identity);

    fn set_health(&mut self, rig: RigHandle, current: f32, displayed: f32);
}

/// Static-geometry ray queries.
pub trait LineOfSight {
    /// Distance to the first hit along `direction` (normalized), if any
    /// within `max_distance`.
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32>;

    /// Whether nothing blocks the segment `from -> to`.
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let distance = delta.length();
        match delta.try_normalize() {
            Some(direction) => self.cast_ray(from, direction, distance).is_none(),
            None => true,
        }
    }
}
