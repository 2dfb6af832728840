//! Listener registry for reactive board queries.

use log::debug;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

/// Document-shaped board query result pushed to subscribers.
pub type Snapshot = Value;

/// Callback invoked with every fresh snapshot for the subscribed owner.
pub type SnapshotListener = Box<dyn FnMut(&Snapshot)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, (String, SnapshotListener)>,
}

#[derive(Default)]
struct Shared {
    registry: RefCell<Registry>,
    /// Subscriptions dropped while `publish` held the registry.
    detached: RefCell<Vec<u64>>,
}

/// Owner-scoped listener registry.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct SnapshotHub {
    inner: Rc<Shared>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for one owner's snapshots.
    pub fn subscribe(&self, owner_id: &str, listener: SnapshotListener) -> Subscription {
        let mut registry = self.inner.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .listeners
            .insert(id, (owner_id.to_string(), listener));
        debug!("event=snapshot_subscribe module=sync status=ok subscription_id={id}");
        Subscription {
            id,
            shared: Rc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner.registry.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.borrow().listeners.is_empty()
    }

    /// Returns whether any live subscription targets `owner_id`.
    pub fn has_listeners(&self, owner_id: &str) -> bool {
        self.inner
            .registry
            .borrow()
            .listeners
            .values()
            .any(|(owner, _)| owner.as_str() == owner_id)
    }

    /// Delivers `snapshot` to every listener subscribed for `owner_id`.
    ///
    /// Returns the number of listeners notified. A listener may drop any
    /// `Subscription` (its own included); the removal lands once delivery
    /// finishes and a detached listener is not called again. Listeners
    /// must not otherwise call back into the hub; use [`SnapshotInbox`]
    /// to defer work.
    pub fn publish(&self, owner_id: &str, snapshot: &Snapshot) -> usize {
        let mut registry = self.inner.registry.borrow_mut();
        let mut delivered = 0;
        for (id, (owner, listener)) in registry.listeners.iter_mut() {
            if owner.as_str() != owner_id || self.inner.detached.borrow().contains(id) {
                continue;
            }
            listener(snapshot);
            delivered += 1;
        }
        for id in self.inner.detached.borrow_mut().drain(..) {
            registry.listeners.remove(&id);
            debug!("event=snapshot_unsubscribe module=sync status=ok subscription_id={id}");
        }
        debug!("event=snapshot_publish module=sync status=ok delivered={delivered}");
        delivered
    }
}

/// Handle for one live listener; detaches on `unsubscribe` or drop.
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Detaches the listener now.
    pub fn unsubscribe(self) {
        // Drop performs the removal.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        match shared.registry.try_borrow_mut() {
            Ok(mut registry) => {
                registry.listeners.remove(&self.id);
                debug!(
                    "event=snapshot_unsubscribe module=sync status=ok subscription_id={}",
                    self.id
                );
            }
            // Mid-publish: `publish` removes it when delivery ends.
            Err(_) => shared.detached.borrow_mut().push(self.id),
        };
    }
}

/// FIFO of delivered snapshots, drained by the consumer on its own turn.
#[derive(Clone, Default)]
pub struct SnapshotInbox {
    queue: Rc<RefCell<VecDeque<Snapshot>>>,
}

impl SnapshotInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a listener that appends into this inbox.
    pub fn listener(&self) -> SnapshotListener {
        let queue = Rc::clone(&self.queue);
        Box::new(move |snapshot: &Snapshot| queue.borrow_mut().push_back(snapshot.clone()))
    }

    pub fn push(&self, snapshot: Snapshot) {
        self.queue.borrow_mut().push_back(snapshot);
    }

    pub fn pop(&self) -> Option<Snapshot> {
        self.queue.borrow_mut().pop_front()
    }

    /// Discards every queued snapshot; returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut queue = self.queue.borrow_mut();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Snapshot, SnapshotHub, SnapshotInbox, Subscription};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn publishes_only_to_matching_owner() {
        let hub = SnapshotHub::new();
        let alice = SnapshotInbox::new();
        let bob = SnapshotInbox::new();
        let _alice_sub = hub.subscribe("alice", alice.listener());
        let _bob_sub = hub.subscribe("bob", bob.listener());

        let delivered = hub.publish("alice", &json!([]));
        assert_eq!(delivered, 1);
        assert_eq!(alice.len(), 1);
        assert!(bob.is_empty());
    }

    #[test]
    fn unsubscribe_and_drop_detach_listener() {
        let hub = SnapshotHub::new();
        let inbox = SnapshotInbox::new();
        let explicit = hub.subscribe("alice", inbox.listener());
        let dropped = hub.subscribe("alice", inbox.listener());
        assert_eq!(hub.len(), 2);

        explicit.unsubscribe();
        assert_eq!(hub.len(), 1);
        drop(dropped);
        assert!(hub.is_empty());
        assert!(!hub.has_listeners("alice"));

        assert_eq!(hub.publish("alice", &json!([])), 0);
        assert!(inbox.is_empty());
    }

    #[test]
    fn subscription_outliving_hub_drops_cleanly() {
        let hub = SnapshotHub::new();
        let inbox = SnapshotInbox::new();
        let subscription = hub.subscribe("alice", inbox.listener());
        drop(hub);
        subscription.unsubscribe();
    }

    #[test]
    fn listener_dropping_subscription_during_publish_detaches() {
        let hub = SnapshotHub::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let calls = Rc::new(RefCell::new(0));

        let listener_slot = Rc::clone(&slot);
        let listener_calls = Rc::clone(&calls);
        let subscription = hub.subscribe(
            "alice",
            Box::new(move |_: &Snapshot| {
                *listener_calls.borrow_mut() += 1;
                listener_slot.borrow_mut().take();
            }),
        );
        *slot.borrow_mut() = Some(subscription);
        let inbox = SnapshotInbox::new();
        let _other = hub.subscribe("alice", inbox.listener());

        assert_eq!(hub.publish("alice", &json!([])), 2);
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.publish("alice", &json!([])), 1);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn inbox_preserves_delivery_order() {
        let inbox = SnapshotInbox::new();
        inbox.push(json!(1));
        inbox.push(json!(2));
        assert_eq!(inbox.pop(), Some(json!(1)));
        assert_eq!(inbox.pop(), Some(json!(2)));
        assert_eq!(inbox.pop(), None);

        inbox.push(json!(3));
        assert_eq!(inbox.clear(), 1);
        assert!(inbox.is_empty());
    }
}
