// Active panel tracking. One panel at a time owns the selection; the owner is published
// on a watch channel so every other registered panel can clear its own selection.
// Handles unregister on drop.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

pub type PanelId = u64;

struct Shared {
    owner_tx: watch::Sender<Option<PanelId>>,
    registered: Mutex<BTreeSet<PanelId>>,
}

impl Shared {
    fn registered(&self) -> MutexGuard<'_, BTreeSet<PanelId>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct ActivePanelRegistry {
    shared: Arc<Shared>,
}

impl Default for ActivePanelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivePanelRegistry {
    pub fn new() -> Self {
        let (owner_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                owner_tx,
                registered: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    /// Registers a panel. Returns `None` if the id is already registered.
    pub fn register(&self, id: PanelId) -> Option<PanelHandle> {
        if !self.shared.registered().insert(id) {
            return None;
        }
        let mut owner_rx = self.shared.owner_tx.subscribe();
        owner_rx.mark_unchanged();
        debug!(panel = id, "panel registered");
        Some(PanelHandle {
            id,
            shared: self.shared.clone(),
            owner_rx,
        })
    }

    pub fn active(&self) -> Option<PanelId> {
        *self.shared.owner_tx.borrow()
    }

    /// Receives every owner change.
    pub fn subscribe(&self) -> watch::Receiver<Option<PanelId>> {
        self.shared.owner_tx.subscribe()
    }

    pub fn registered_count(&self) -> usize {
        self.shared.registered().len()
    }
}

pub struct PanelHandle {
    id: PanelId,
    shared: Arc<Shared>,
    owner_rx: watch::Receiver<Option<PanelId>>,
}

impl PanelHandle {
    pub fn id(&self) -> PanelId {
        self.id
    }

    /// Makes this panel the selection owner.
    pub fn activate(&mut self) {
        self.shared.owner_tx.send_replace(Some(self.id));
        // Our own activation is not a reason to clear our selection.
        self.owner_rx.mark_unchanged();
    }

    pub fn is_active(&self) -> bool {
        *self.shared.owner_tx.borrow() == Some(self.id)
    }

    /// True (once per change) if another panel became the owner since the last check.
    pub fn take_selection_cleared(&mut self) -> bool {
        match self.owner_rx.has_changed() {
            Ok(true) => {
                let owner = *self.owner_rx.borrow_and_update();
                matches!(owner, Some(other) if other != self.id)
            }
            _ => false,
        }
    }

    /// Waits until another panel becomes the owner.
    pub async fn selection_cleared(&mut self) {
        let id = self.id;
        loop {
            if self.owner_rx.changed().await.is_err() {
                return;
            }
            let owner = *self.owner_rx.borrow_and_update();
            if matches!(owner, Some(other) if other != id) {
                return;
            }
        }
    }
}

impl Drop for PanelHandle {
    fn drop(&mut self) {
        self.shared.registered().remove(&self.id);
        let id = self.id;
        self.shared.owner_tx.send_if_modified(|owner| {
            if *owner == Some(id) {
                *owner = None;
                true
            } else {
                false
            }
        });
        debug!(panel = id, "panel unregistered");
    }
}
