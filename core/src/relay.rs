use tokio::sync::watch;

/// Sticky on/off flag for one actuator. It stays as it is until set or
/// cleared. Consumers either poll [`Relay::is_set`] or hold a receiver from
/// [`Relay::subscribe`] and await changes on their own runtime.
#[derive(Debug)]
pub struct Relay {
    tx: watch::Sender<bool>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns true when the flag changed.
    pub fn set(&self) -> bool {
        self.store(true)
    }

    /// Returns true when the flag changed.
    pub fn clear(&self) -> bool {
        self.store(false)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    fn store(&self, on: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == on {
                false
            } else {
                *current = on;
                true
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_report_edges() {
        let relay = Relay::new();
        assert!(!relay.is_set());

        assert!(relay.set());
        assert!(!relay.set());
        assert!(relay.is_set());

        assert!(relay.clear());
        assert!(!relay.clear());
        assert!(!relay.is_set());
    }

    #[tokio::test]
    async fn subscriber_wakes_on_set() {
        let relay = Relay::new();
        let mut rx = relay.subscribe();

        relay.set();
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());

        // No notification for a redundant set.
        relay.set();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn wait_for_returns_once_set() {
        let relay = Relay::new();
        let mut rx = relay.subscribe();

        let waiter = tokio::spawn(async move { rx.wait_for(|on| *on).await.map(|on| *on) });
        relay.set();

        assert!(waiter.await.unwrap().unwrap());
    }
}
