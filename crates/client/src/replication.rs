//! Seams to the replication/session collaborator.
//!
//! Continuous state is polled through [`RemoteHandle`] every tick. Discrete
//! session callbacks (join, leave, broadcast events) only push into the
//! append-only [`SessionInbox`]; the registry drains it at the start of its
//! tick, so a callback never touches an entity record directly.

use crossbeam_channel::{Receiver, Sender, TryIter};
use mirage_protocol::StateValue;

/// One remote participant's replicated key/value state.
pub trait RemoteHandle {
    fn id(&self) -> &str;

    /// Latest value for `key`, or `None` if it was never written.
    fn get_state(&self, key: &str) -> Option<StateValue>;
}

/// Discrete session notification.
pub enum SessionEvent {
    Join(Box<dyn RemoteHandle>),
    Leave {
        id: String,
    },
    /// Named broadcast (`ON_DEATH`, `ON_THROW`) from `sender_id`.
    Broadcast {
        sender_id: String,
        name: String,
        payload: StateValue,
    },
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Join(handle) => f.debug_tuple("Join").field(&handle.id()).finish(),
            SessionEvent::Leave { id } => f.debug_struct("Leave").field("id", id).finish(),
            SessionEvent::Broadcast {
                sender_id, name, ..
            } => f
                .debug_struct("Broadcast")
                .field("sender_id", sender_id)
                .field("name", name)
                .finish(),
        }
    }
}

/// Cloneable producer side handed to session callbacks.
#[derive(Clone)]
pub struct SessionSender {
    tx: Sender<SessionEvent>,
}

impl SessionSender {
    /// Returns `false` once the registry has been dropped.
    pub fn join(&self, handle: Box<dyn RemoteHandle>) -> bool {
        self.tx.send(SessionEvent::Join(handle)).is_ok()
    }

    pub fn leave(&self, id: impl Into<String>) -> bool {
        self.tx.send(SessionEvent::Leave { id: id.into() }).is_ok()
    }

    pub fn broadcast(
        &self,
        sender_id: impl Into<String>,
        name: impl Into<String>,
        payload: StateValue,
    ) -> bool {
        self.tx
            .send(SessionEvent::Broadcast {
                sender_id: sender_id.into(),
                name: name.into(),
                payload,
            })
            .is_ok()
    }
}

/// Unbounded append-only queue of session events.
pub struct SessionInbox {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl SessionInbox {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> SessionSender {
        SessionSender {
            tx: self.tx.clone(),
        }
    }

    /// Events queued so far, oldest first. Does not block.
    pub fn drain(&self) -> TryIter<'_, SessionEvent> {
        self.rx.try_iter()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for SessionInbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Handle(&'static str);

    impl RemoteHandle for Handle {
        fn id(&self) -> &str {
            self.0
        }

        fn get_state(&self, _key: &str) -> Option<StateValue> {
            None
        }
    }

    #[test]
    fn test_inbox_preserves_order() {
        let inbox = SessionInbox::new();
        let sender = inbox.sender();
        assert!(sender.join(Box::new(Handle("a"))));
        assert!(sender.broadcast("a", "ON_DEATH", StateValue::Null));
        assert!(sender.leave("a"));
        assert_eq!(inbox.len(), 3);

        let kinds: Vec<_> = inbox
            .drain()
            .map(|e| match e {
                SessionEvent::Join(h) => format!("join:{}", h.id()),
                SessionEvent::Leave { id } => format!("leave:{id}"),
                SessionEvent::Broadcast { name, .. } => format!("broadcast:{name}"),
            })
            .collect();
        assert_eq!(kinds, ["join:a", "broadcast:ON_DEATH", "leave:a"]);
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_sender_after_drop() {
        let inbox = SessionInbox::new();
        let sender = inbox.sender();
        drop(inbox);
        assert!(!sender.leave("x"));
    }
}
