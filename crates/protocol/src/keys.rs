//! Replicated state keys and broadcast event names.
//!
//! Every observer reads the same keys off every remote handle, so these are
//! part of the session contract and must not change casually.

pub const NAME: &str = "name";
pub const TEAM: &str = "team";
pub const HEALTH: &str = "health";
/// `[x, y, z]` feet position.
pub const POSITION: &str = "pos";
pub const YAW: &str = "yaw";
pub const PITCH: &str = "pitch";
pub const LEAN: &str = "lean";

pub const PRONE: &str = "prone";
pub const SLIDING: &str = "sliding";
pub const CROUCHING: &str = "crouch";
pub const ADS: &str = "ads";
pub const SPRINTING: &str = "sprint";

pub const WEAPON: &str = "weapon";
pub const ATTACHMENTS: &str = "attachments";
/// Monotonic timestamp of the last shot or swing.
pub const FIRED_AT: &str = "firedAt";
/// Short list of the most recent hit events this entity caused.
pub const HITS: &str = "hits";
/// `{stamp, impulse, point?}` written when the entity should ragdoll.
pub const RAGDOLL: &str = "ragdoll";

/// Broadcast: `{killerId}` from the victim.
pub const ON_DEATH: &str = "ON_DEATH";
/// Broadcast: `{origin, velocity, itemId}` from the thrower.
pub const ON_THROW: &str = "ON_THROW";
