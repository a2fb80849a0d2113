//! Change notification.
//!
//! Observers are plain callbacks registered on the engine. They run after a
//! mutating call has fully applied, never in the middle of one.

use config_tree::ConfigLevel;

use super::state::StateFlags;

/// What changed in the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The merged view differs from what it was before the call.
    ConfigChanged,
    /// The state bitmask changed.
    StateChanged {
        previous: StateFlags,
        current: StateFlags,
    },
    /// A level's modified flag flipped.
    ModifiedChanged { level: ConfigLevel, modified: bool },
    /// The recorded error message changed. Empty when the error was cleared.
    ErrorStringChanged(String),
    /// Non-fatal problem, e.g. a document key that cannot be addressed.
    Warning(String),
}

/// Receives [`ChangeEvent`]s from the engine.
pub trait ConfigObserver {
    fn notify(&mut self, event: &ChangeEvent);
}

impl<F> ConfigObserver for F
where
    F: FnMut(&ChangeEvent),
{
    fn notify(&mut self, event: &ChangeEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registered observers, notified in subscription order.
#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: u64,
    observers: Vec<(SubscriptionId, Box<dyn ConfigObserver>)>,
}

impl ObserverList {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn ConfigObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn dispatch(&mut self, events: &[ChangeEvent]) {
        for event in events {
            for (_, observer) in self.observers.iter_mut() {
                observer.notify(event);
            }
        }
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}
