use std::time::Instant;

use metrics::{counter, gauge, histogram};
use status_sync_client::StatusClient;
use status_sync_core::StatusFetchPort;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::state::StatusStore;

/// Fetch port that hands batches to the background status worker.
#[derive(Debug, Clone)]
pub struct ChannelFetchPort {
    sender: UnboundedSender<Vec<String>>,
}

impl ChannelFetchPort {
    pub fn new(sender: UnboundedSender<Vec<String>>) -> Self {
        Self { sender }
    }

    /// Creates a port together with the receiving end for the worker.
    pub fn channel() -> (Self, UnboundedReceiver<Vec<String>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl StatusFetchPort for ChannelFetchPort {
    fn fetch_statuses_by_ids(&self, user_ids: Vec<String>) {
        let count = user_ids.len();
        if self.sender.send(user_ids).is_err() {
            warn!(stage = "dispatcher", count, "status worker is gone; batch dropped");
        }
    }
}

/// Spawns the worker that drains queued batches, fetches them and updates the store.
///
/// The worker exits once every [`ChannelFetchPort`] has been dropped.
pub fn spawn_status_worker(
    client: StatusClient,
    store: StatusStore,
    mut receiver: UnboundedReceiver<Vec<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(user_ids) = receiver.recv().await {
            fetch_batch(&client, &store, user_ids).await;
        }
        debug!(stage = "dispatcher", "status worker stopped");
    })
}

async fn fetch_batch(client: &StatusClient, store: &StatusStore, user_ids: Vec<String>) {
    let started = Instant::now();
    counter!("status_fetch_ids_total").increment(user_ids.len() as u64);

    match client.get_statuses_by_ids(&user_ids).await {
        Ok(statuses) => {
            histogram!("status_fetch_latency_seconds").record(started.elapsed().as_secs_f64());
            counter!("status_fetch_batches_total", "result" => "ok").increment(1);
            let received = statuses.len();
            let size = store.apply(statuses);
            gauge!("status_store_size").set(size as f64);
            info!(
                stage = "dispatcher",
                requested = user_ids.len(),
                received,
                "statuses refreshed"
            );
        }
        Err(err) => {
            histogram!("status_fetch_latency_seconds").record(started.elapsed().as_secs_f64());
            counter!("status_fetch_batches_total", "result" => "error").increment(1);
            warn!(
                stage = "dispatcher",
                requested = user_ids.len(),
                error = %err,
                "status fetch failed"
            );
        }
    }
}
