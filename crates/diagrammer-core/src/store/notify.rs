//! Subscriber list and notification delivery shared by the store implementations.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{ChangeEvent, ChangeHandler, ChangeKind, EntityId, SubscriptionId};

/// When change notifications reach subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Synchronously, from inside the mutating call
    #[default]
    Immediate,
    /// Queued until [`Notifier::flush`]
    Deferred,
}

#[derive(Default)]
struct NotifyState {
    delivery: Delivery,
    batch_depth: usize,
    batch_dirty: bool,
    batched: Vec<EntityId>,
    queued: Vec<ChangeEvent>,
}

/// Fans change events out to subscribers.
///
/// Handlers run with no internal lock held, so a handler may call back
/// into its store. A handler that errors or panics is logged and skipped.
#[derive(Default)]
pub struct Notifier {
    handlers: Mutex<Vec<(SubscriptionId, ChangeHandler)>>,
    state: Mutex<NotifyState>,
}

impl Notifier {
    pub fn new(delivery: Delivery) -> Self {
        let notifier = Self::default();
        notifier.state.lock().delivery = delivery;
        notifier
    }

    pub fn delivery(&self) -> Delivery {
        self.state.lock().delivery
    }

    /// Switching to immediate delivery flushes anything already queued
    pub fn set_delivery(&self, delivery: Delivery) {
        self.state.lock().delivery = delivery;
        if delivery == Delivery::Immediate {
            self.flush();
        }
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.handlers.lock().push((id, handler));
        debug!("Subscription {} added", id);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        let removed = handlers.len() != before;
        if removed {
            debug!("Subscription {} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Number of events waiting for [`Notifier::flush`]
    pub fn pending(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Announce a change, honoring any open batch and the delivery mode
    pub fn emit(&self, event: ChangeEvent) {
        {
            let mut state = self.state.lock();
            if state.batch_depth > 0 {
                state.batch_dirty = true;
                state.batched.extend(event.ids);
                return;
            }
            if state.delivery == Delivery::Deferred {
                state.queued.push(event);
                return;
            }
        }
        self.dispatch(&event);
    }

    pub fn begin_batch(&self) {
        self.state.lock().batch_depth += 1;
    }

    /// Close a batch. The outermost close emits a single [`ChangeKind::Batch`]
    /// event if anything changed inside it.
    pub fn end_batch(&self) {
        let event = {
            let mut state = self.state.lock();
            if state.batch_depth == 0 {
                warn!("end_batch without begin_batch");
                return;
            }
            state.batch_depth -= 1;
            if state.batch_depth > 0 || !state.batch_dirty {
                return;
            }
            state.batch_dirty = false;
            let ids = std::mem::take(&mut state.batched);
            let event = ChangeEvent::new(ChangeKind::Batch, ids);
            if state.delivery == Delivery::Deferred {
                state.queued.push(event);
                return;
            }
            event
        };
        self.dispatch(&event);
    }

    /// Deliver every queued event. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        let queued = std::mem::take(&mut self.state.lock().queued);
        for event in &queued {
            self.dispatch(event);
        }
        queued.len()
    }

    /// Call every handler with `event`. Returns how many succeeded.
    pub fn dispatch(&self, event: &ChangeEvent) -> usize {
        let handlers: Vec<ChangeHandler> = self.handlers.lock().iter().map(|(_, h)| Arc::clone(h)).collect();

        let mut delivered = 0;
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!(kind = ?event.kind, "change handler failed: {e:#}"),
                Err(_) => warn!(kind = ?event.kind, "change handler panicked"),
            }
        }
        delivered
    }
}
