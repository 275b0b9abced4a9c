//! Synchronous change notification. Every subscriber receives the complete
//! state after each mutation, in registration order.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::state::AppState;

type Callback = Rc<RefCell<dyn FnMut(&AppState)>>;

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }
}

#[derive(Default)]
pub struct SubscriberList {
    registry: Rc<RefCell<Registry>>,
}

impl SubscriberList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&AppState) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry {
            id,
            callback: Rc::new(RefCell::new(callback)),
        });
        trace!(id, "subscriber registered");
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn notify(&self, state: &AppState) {
        // Snapshot first so callbacks may subscribe or unsubscribe while we
        // iterate.
        let snapshot: Vec<(u64, Callback)> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();

        for (id, callback) in snapshot {
            if !self.registry.borrow().contains(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut callback) => (*callback)(state),
                Err(_) => warn!(id, "subscriber re-entered during its own notification; skipped"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`SubscriberList::subscribe`]. Dropping it leaves the
/// callback registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Removes the callback. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.borrow_mut();
            let before = registry.entries.len();
            registry.entries.retain(|entry| entry.id != self.id);
            if registry.entries.len() != before {
                trace!(id = self.id, "subscriber removed");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow().contains(self.id))
    }
}
