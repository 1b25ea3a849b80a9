//! Shared Slack clients, one per bot token.
//!
//! Applications that post often would otherwise pay for a fresh connection
//! pool (and TLS handshake) on every call. Clients are created on first use
//! and kept for the life of the process.

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::client::SlackClient;

/// Concurrency-safe get-or-create registry of [`SlackClient`]s keyed by token.
///
/// Cheaply cloneable; clones share the same clients.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Cache<String, Arc<SlackClient>>,
    api_base: Arc<str>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.clients.entry_count())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ClientRegistry {
    /// Create an empty registry whose clients call `api_base`.
    #[must_use]
    pub fn new(api_base: &str) -> Self {
        // No capacity bound and no TTL: entries are never evicted.
        let clients = Cache::builder().build();

        Self {
            clients,
            api_base: Arc::from(api_base),
        }
    }

    /// Get the client for `bot_token`, creating it on first use.
    ///
    /// Concurrent first calls for the same token are coalesced: exactly one
    /// client is built and every caller receives it.
    pub async fn client_for(&self, bot_token: &SecretString) -> Arc<SlackClient> {
        let key = bot_token.expose_secret().to_owned();
        let api_base = Arc::clone(&self.api_base);
        let token = bot_token.clone();

        self.clients
            .get_with(key, async move {
                debug!("Creating Slack client for new bot token");
                Arc::new(SlackClient::new(token, &api_base))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::DEFAULT_API_BASE;

    #[tokio::test]
    async fn test_same_token_reuses_client() {
        let registry = ClientRegistry::new(DEFAULT_API_BASE);
        let token = SecretString::from("xoxb-one");

        let first = registry.client_for(&token).await;
        let second = registry.client_for(&token).await;

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_different_tokens_get_different_clients() {
        let registry = ClientRegistry::new(DEFAULT_API_BASE);

        let a = registry.client_for(&SecretString::from("xoxb-a")).await;
        let b = registry.client_for(&SecretString::from("xoxb-b")).await;

        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_yields_one_client() {
        let registry = ClientRegistry::new(DEFAULT_API_BASE);
        let token = SecretString::from("xoxb-shared");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                let token = token.clone();
                tokio::spawn(async move { registry.client_for(&token).await })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.expect("task panicked"));
        }

        let first = clients.first().expect("at least one client");
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, first)));
    }
}
