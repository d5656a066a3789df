//! Mirage Client
//!
//! Drives remote avatars once per frame. The embedding application owns
//! the scene, the session transport and the local player; this crate talks
//! to them through the seams in [`render`], [`replication`] and
//! [`feedback`].

pub mod config;
pub mod effects;
pub mod entity;
pub mod feedback;
pub mod occlusion;
pub mod registry;
pub mod render;
pub mod replication;

pub use config::{AvatarConfig, ConfigError, RagdollConfig};
pub use effects::{EffectEvent, EffectsSink, FireResult, VisualEffectsBridge};
pub use entity::{EntityError, Hitbox, Lifecycle, RemoteEntity};
pub use feedback::{DamageReport, LocalFeedback, LocalObserver};
pub use occlusion::StaticGeometry;
pub use registry::{EntitySummary, FrameContext, RemoteEntityRegistry};
pub use render::{CameraSnapshot, LineOfSight, RigHandle, SceneBackend};
pub use replication::{RemoteHandle, SessionEvent, SessionInbox, SessionSender};

/// Log filter applied on top of `RUST_LOG`.
pub const DEFAULT_DIRECTIVE: &str = "mirage=info";

/// Install the global `tracing` subscriber. Fails if one is already set.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .try_init()?;

    tracing::debug!(directive = default_directive, "tracing initialized");
    Ok(())
}
