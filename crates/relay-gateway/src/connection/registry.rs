//! Connection registry
//!
//! Maps each online user to their single live connection. Lookups take a
//! shared read lock, so concurrent fan-outs never wait on each other; only
//! register and unregister take the write lock.

use super::{Connection, ConnectionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Directory of live connections keyed by user identity
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make `connection` the live connection for its user
    ///
    /// Any previous connection for that user is replaced and returned. It is
    /// not closed; its socket keeps running until the client goes away.
    pub fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let user_id = connection.user_id().to_string();
        let previous = self.connections.write().insert(user_id, connection);

        if let Some(prev) = &previous {
            tracing::debug!(
                user_id = %prev.user_id(),
                replaced = %prev.id(),
                "Connection replaced"
            );
        }

        previous
    }

    /// Remove whatever connection is registered for a user
    pub fn unregister(&self, user_id: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.write().remove(user_id);
        if removed.is_some() {
            tracing::debug!(user_id = %user_id, "Connection unregistered");
        }
        removed
    }

    /// Remove a user's entry only if it still points at `connection_id`
    ///
    /// Socket cleanup uses this so that a connection which has been replaced
    /// does not evict its successor.
    pub fn unregister_connection(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write();
        match connections.get(user_id) {
            Some(current) if current.id() == connection_id => {
                connections.remove(user_id);
                tracing::debug!(user_id = %user_id, "Connection unregistered");
                true
            }
            _ => false,
        }
    }

    /// Get the live connection for a user
    pub fn lookup(&self, user_id: &str) -> Option<Arc<Connection>> {
        self.connections.read().get(user_id).cloned()
    }

    /// Number of users currently online
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_service::Envelope;
    use tokio::sync::mpsc;

    fn connection(user_id: &str) -> (Arc<Connection>, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(10);
        (Connection::new(user_id, tx), rx)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connection("alice");

        assert!(registry.register(conn.clone()).is_none());
        assert_eq!(registry.lookup("alice").unwrap().id(), conn.id());
        assert!(registry.lookup("bob").is_none());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_register_replaces_without_closing() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = connection("alice");
        let (second, _rx2) = connection("alice");

        registry.register(first.clone());
        let replaced = registry.register(second.clone()).unwrap();

        assert_eq!(replaced.id(), first.id());
        assert_eq!(registry.lookup("alice").unwrap().id(), second.id());
        assert!(!first.is_closed());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_unregister_is_noop_when_absent() {
        let registry = ConnectionRegistry::new();
        assert!(registry.unregister("ghost").is_none());

        let (conn, _rx) = connection("alice");
        registry.register(conn);
        assert!(registry.unregister("alice").is_some());
        assert!(registry.lookup("alice").is_none());
    }

    #[test]
    fn test_stale_cleanup_keeps_successor() {
        let registry = ConnectionRegistry::new();
        let (old, _rx1) = connection("alice");
        let (new, _rx2) = connection("alice");

        registry.register(old.clone());
        registry.register(new.clone());

        assert!(!registry.unregister_connection("alice", old.id()));
        assert_eq!(registry.lookup("alice").unwrap().id(), new.id());

        assert!(registry.unregister_connection("alice", new.id()));
        assert!(registry.lookup("alice").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let registry = ConnectionRegistry::new_shared();
        let mut handles = Vec::new();

        for i in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("user-{}", i % 8);
                let (conn, rx) = connection(&user);
                registry.register(conn.clone());
                let _ = registry.lookup(&user);
                registry.unregister_connection(&user, conn.id());
                drop(rx);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.connection_count(), 0);
    }
}
