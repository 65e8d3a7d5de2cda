//! Navigator that publishes history replacements to subscribers.

use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use lmsgate_auth::Navigator;

#[derive(Debug)]
pub struct ChannelNavigator {
    tx: broadcast::Sender<String>,
    current: RwLock<Option<String>>,
}

impl Default for ChannelNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelNavigator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            current: RwLock::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// The last path navigated to, if any.
    pub fn current(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for ChannelNavigator {
    fn replace(&self, path: &str) {
        tracing::debug!(path, "navigate (replace)");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(path.to_string());
        // No subscribers is fine; `current` still records it.
        let _ = self.tx.send(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replacements_reach_subscribers() {
        let nav = ChannelNavigator::new();
        let mut rx = nav.subscribe();

        nav.replace("/login");
        nav.replace("/unauthorized");

        assert_eq!(rx.recv().await.unwrap(), "/login");
        assert_eq!(rx.recv().await.unwrap(), "/unauthorized");
        assert_eq!(nav.current().as_deref(), Some("/unauthorized"));
    }
}
