//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::{MessageStore, RepositoryError};
use crate::services::{EventRouter, ForwardQueue, InteractionRouter, MessageDispatcher, MessageService};
use crate::slack::ClientRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn MessageStore>,
    messages: MessageService,
    interactions: InteractionRouter,
    events: EventRouter,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("messages", &self.inner.messages)
            .field("interactions", &self.inner.interactions)
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the services around one store, Slack client registry and forward queue.
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        clients: ClientRegistry,
        queue: ForwardQueue,
        verify_signatures: bool,
    ) -> Self {
        let dispatcher = MessageDispatcher::new(Arc::clone(&store), clients);
        let messages = MessageService::new(Arc::clone(&store), dispatcher);
        let interactions =
            InteractionRouter::new(Arc::clone(&store), queue.clone(), verify_signatures);
        let events = EventRouter::new(Arc::clone(&store), queue, verify_signatures);

        Self {
            inner: Arc::new(AppStateInner {
                store,
                messages,
                interactions,
                events,
            }),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &MessageService {
        &self.inner.messages
    }

    #[must_use]
    pub fn interactions(&self) -> &InteractionRouter {
        &self.inner.interactions
    }

    #[must_use]
    pub fn events(&self) -> &EventRouter {
        &self.inner.events
    }

    /// Check the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store's error if it cannot be reached.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.store.ping().await
    }
}
