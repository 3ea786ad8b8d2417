use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies one subscription on a [`ChangeSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

/// Synchronous fan-out of attribute-change notifications.
///
/// Listeners run in subscription order on the dispatching thread. Dispatch
/// walks a snapshot of the listener list, so a listener may subscribe or
/// unsubscribe while it is being notified; such changes apply from the next
/// dispatch on.
#[derive(Default)]
pub struct ChangeSignal {
    listeners: Mutex<Listeners>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut listeners = self.lock();
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    pub fn dispatch(&self, name: &str) {
        let snapshot: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(name);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSignal")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn dispatch_reaches_listeners_in_subscription_order() {
        let signal = ChangeSignal::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let log = Arc::clone(&log);
            signal.subscribe(move |name| log.lock().unwrap().push(format!("{tag}:{name}")));
        }

        signal.dispatch("position");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:position".to_string(), "second:position".to_string()]
        );
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let signal = ChangeSignal::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let id = signal.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.dispatch("scale");

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(signal.is_empty());
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let signal = Arc::new(ChangeSignal::new());
        let inner = Arc::clone(&signal);
        signal.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        signal.dispatch("rotation");
        assert_eq!(signal.len(), 2);
    }
}
