use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;

use super::Status;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no peer registered for task {0}")]
    NotFound(String),
    #[error("sending status for task {task_id} to {peer} failed: {source}")]
    Send {
        task_id: String,
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy)]
struct DeliveryEntry {
    peer: SocketAddr,
    registered: Instant,
}

/// Maps task IDs to the peer that issued them so that asynchronous status
/// events can be routed back.
#[derive(Debug, Clone)]
pub struct DeliveryTable {
    ttl: Duration,
    inner: Arc<Mutex<HashMap<String, DeliveryEntry>>>,
}

impl DeliveryTable {
    pub fn new_ttl(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Insert or overwrite the peer for `task_id`. Returns the previous peer
    /// when an in-flight entry was replaced.
    pub async fn register(&self, task_id: &str, peer: SocketAddr) -> Option<SocketAddr> {
        let now = Instant::now();
        let mut map = self.inner.lock().await;
        // purge stale entries of tasks that never finished
        let ttl = self.ttl;
        map.retain(|_, entry| now.duration_since(entry.registered) < ttl);
        map.insert(
            task_id.to_string(),
            DeliveryEntry {
                peer,
                registered: now,
            },
        )
        .map(|previous| previous.peer)
    }

    pub async fn route(&self, task_id: &str) -> Result<SocketAddr, DeliveryError> {
        let map = self.inner.lock().await;
        map.get(task_id)
            .map(|entry| entry.peer)
            .ok_or_else(|| DeliveryError::NotFound(task_id.to_string()))
    }

    /// Resolve the peer for `status`, hand it to `send`, and drop the entry
    /// once a `finished` status went out. The table stays locked for the
    /// whole exchange so a concurrent `register` for the same task cannot be
    /// lost between lookup and removal.
    pub async fn deliver<F, Fut>(&self, status: &Status, send: F) -> Result<SocketAddr, DeliveryError>
    where
        F: FnOnce(SocketAddr) -> Fut,
        Fut: Future<Output = std::io::Result<()>>,
    {
        let mut map = self.inner.lock().await;
        let peer = map
            .get(&status.task_id)
            .map(|entry| entry.peer)
            .ok_or_else(|| DeliveryError::NotFound(status.task_id.clone()))?;

        send(peer).await.map_err(|source| DeliveryError::Send {
            task_id: status.task_id.clone(),
            peer,
            source,
        })?;

        if status.is_finished() {
            map.remove(&status.task_id);
        }
        Ok(peer)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    async fn ok(_: SocketAddr) -> std::io::Result<()> {
        Ok(())
    }

    #[tokio::test]
    async fn route_after_register() {
        let table = DeliveryTable::new_ttl(60);
        assert!(table.register("T1", peer(4000)).await.is_none());
        assert_eq!(table.route("T1").await.unwrap(), peer(4000));
        assert!(matches!(
            table.route("T2").await,
            Err(DeliveryError::NotFound(id)) if id == "T2"
        ));
    }

    #[tokio::test]
    async fn register_overwrites_and_reports_previous_peer() {
        let table = DeliveryTable::new_ttl(60);
        table.register("T1", peer(4000)).await;
        assert_eq!(table.register("T1", peer(4001)).await, Some(peer(4000)));
        assert_eq!(table.route("T1").await.unwrap(), peer(4001));
    }

    #[tokio::test]
    async fn finished_removes_entry_other_statuses_keep_it() {
        let table = DeliveryTable::new_ttl(60);
        table.register("T1", peer(4000)).await;

        table.deliver(&Status::started("T1"), ok).await.unwrap();
        table.deliver(&Status::bookmark("T1", "1"), ok).await.unwrap();
        assert!(table.route("T1").await.is_ok());

        table.deliver(&Status::finished("T1"), ok).await.unwrap();
        assert!(matches!(table.route("T1").await, Err(DeliveryError::NotFound(_))));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn failed_send_keeps_entry() {
        let table = DeliveryTable::new_ttl(60);
        table.register("T1", peer(4000)).await;
        let result = table
            .deliver(&Status::finished("T1"), |_| async {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            })
            .await;
        assert!(matches!(result, Err(DeliveryError::Send { .. })));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let table = DeliveryTable::new_ttl(60);
        let result = table.deliver(&Status::finished("nobody"), ok).await;
        assert!(matches!(result, Err(DeliveryError::NotFound(_))));
    }

    #[tokio::test]
    async fn stale_entries_are_purged_on_register() {
        let table = DeliveryTable::new_ttl(0);
        table.register("old", peer(4000)).await;
        table.register("new", peer(4001)).await;
        assert!(table.route("old").await.is_err());
        assert_eq!(table.len().await, 1);
    }
}
