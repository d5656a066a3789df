//! Replicated-state schema for remote avatars.
//!
//! Defines the keys every observer reads off a remote handle, a dynamically
//! typed value for what the transport mirrors, and decoders into the typed
//! events the core works with. There is no transport or byte format here.

pub mod error;
pub mod events;
pub mod keys;
pub mod snapshot;
pub mod value;

pub use error::SchemaError;
pub use events::{
    decode_broadcast, decode_hit_event, decode_hit_queue, decode_ragdoll, encode_hit_event,
    BroadcastEvent, DeathEvent, RagdollPayload, ThrowEvent,
};
pub use snapshot::EntitySnapshot;
pub use value::StateValue;
