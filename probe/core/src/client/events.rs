use std::{sync::Mutex, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, error, warn};

use super::HttpNodeClient;
use crate::account::Address;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Observed arrival of a new block. One event is one observation unit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BlockEvent {
    pub height: u64,
}

/// Announcement-time rejection surfaced on an account's status stream.
/// Diagnostic only; never drives observer state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusEvent {
    pub address: Address,
    pub code: String,
}

/// Persistent event subscription to a node.
///
/// Block events are delivered in non-decreasing height order, as emitted by
/// the node; this layer neither reorders nor deduplicates them.
pub trait EventConnection: Send + Sync {
    /// Subscribe to new-block events.
    fn new_blocks(&self) -> broadcast::Receiver<BlockEvent>;

    /// Subscribe to status errors for `address`.
    fn status_errors(&self, address: &Address) -> broadcast::Receiver<StatusEvent>;

    /// Close the connection. Idempotent; calls after the first are no-ops.
    fn close(&self);
}

/// Event connection realized by interval polling of the node's HTTP API.
pub struct HttpEventConnection {
    address: Address,
    blocks_tx: broadcast::Sender<BlockEvent>,
    status_tx: broadcast::Sender<StatusEvent>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpEventConnection {
    pub(super) fn open(
        client: HttpNodeClient,
        address: Address,
        poll_interval: Duration,
    ) -> Self {
        let (blocks_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(poll_node(
            client,
            address.clone(),
            poll_interval,
            blocks_tx.clone(),
            status_tx.clone(),
        ));

        Self {
            address,
            blocks_tx,
            status_tx,
            poll_task: Mutex::new(Some(task)),
        }
    }
}

impl EventConnection for HttpEventConnection {
    fn new_blocks(&self) -> broadcast::Receiver<BlockEvent> {
        self.blocks_tx.subscribe()
    }

    fn status_errors(&self, address: &Address) -> broadcast::Receiver<StatusEvent> {
        if address != &self.address {
            warn!(
                requested = %address,
                polled = %self.address,
                "status subscription requested for a different address than the connection polls"
            );
        }
        self.status_tx.subscribe()
    }

    fn close(&self) {
        let task = self
            .poll_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(task) = task {
            task.abort();
            debug!("event connection closed");
        }
    }
}

impl Drop for HttpEventConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Polls chain height and account status errors, broadcasting each newly
/// observed item. A failed poll drops the subscription: this probe has no
/// reconnect path, so connectivity errors end the run.
async fn poll_node(
    client: HttpNodeClient,
    address: Address,
    poll_interval: Duration,
    blocks_tx: broadcast::Sender<BlockEvent>,
    status_tx: broadcast::Sender<StatusEvent>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_height: Option<u64> = None;
    let mut seen_statuses = 0usize;

    loop {
        ticker.tick().await;

        match client.chain_height().await {
            Ok(height) => {
                if let Some(last) = last_height {
                    for new_height in (last + 1)..=height {
                        let _ = blocks_tx.send(BlockEvent { height: new_height });
                    }
                    last_height = Some(height.max(last));
                } else {
                    // Baseline observation: blocks prior to open are not
                    // replayed.
                    last_height = Some(height);
                }
            }
            Err(err) => {
                error!(error = %err, "chain height poll failed; dropping subscription");
                break;
            }
        }

        match client.status_errors(&address).await {
            Ok(statuses) => {
                for status in statuses.iter().skip(seen_statuses) {
                    let _ = status_tx.send(status.clone());
                }
                seen_statuses = seen_statuses.max(statuses.len());
            }
            Err(err) => {
                error!(error = %err, "status poll failed; dropping subscription");
                break;
            }
        }
    }
}
