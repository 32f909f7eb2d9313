pub mod tracker;

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tracing::{debug, info, warn};

use crate::{
    DynError,
    account::PublicKey,
    client::{
        NodeClient,
        events::{BlockEvent, StatusEvent},
    },
    deadline::DeadlineVariant,
    transaction::TxHash,
    verdict::Verdict,
};
pub use tracker::{BLOCK_THRESHOLD, BlockTracker, ObserverState, TrackerStep};

const FUNNEL_CAPACITY: usize = 64;

/// Event funneled into the observer task. Announce acknowledgments, block
/// arrivals, and status errors all converge on one channel so state stays
/// serialized without locks.
#[derive(Clone, Debug)]
pub enum ObserverEvent {
    Block(BlockEvent),
    Status(StatusEvent),
    Announced { variant: DeadlineVariant, hash: TxHash },
}

/// Correlation hashes captured from announce acknowledgments.
///
/// Acknowledgments race the block stream: either slot may still be empty
/// when the block threshold is reached, in which case evaluation proceeds
/// against the missing hash and fails. Nothing orders hash capture ahead of
/// the counter; that ordering is deliberately left unenforced.
#[derive(Clone, Debug, Default)]
pub struct Correlation {
    dynamic: Option<TxHash>,
    static_deadline: Option<TxHash>,
}

impl Correlation {
    fn capture(&mut self, variant: DeadlineVariant, hash: TxHash) {
        match variant {
            DeadlineVariant::Dynamic => self.dynamic = Some(hash),
            DeadlineVariant::Static => self.static_deadline = Some(hash),
        }
    }

    fn matches(&self, hash: &TxHash) -> bool {
        self.dynamic.as_ref() == Some(hash) || self.static_deadline.as_ref() == Some(hash)
    }

    #[must_use]
    pub const fn dynamic(&self) -> Option<&TxHash> {
        self.dynamic.as_ref()
    }

    #[must_use]
    pub const fn static_deadline(&self) -> Option<&TxHash> {
        self.static_deadline.as_ref()
    }

    #[must_use]
    pub const fn captured(&self) -> usize {
        self.dynamic.is_some() as usize + self.static_deadline.is_some() as usize
    }
}

/// Everything the observer learned by the time it went terminal.
#[derive(Debug)]
pub struct Observation {
    pub verdict: Verdict,
    pub block_heights: Vec<u64>,
    pub correlation: Correlation,
}

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("event funnel closed before the block threshold was reached")]
    FunnelClosed,
    #[error("confirmed-transaction fetch failed")]
    HistoryFetch(#[source] DynError),
}

/// Handle to the task pumping block events into the funnel. Cancelled at
/// most once; later calls are no-ops.
#[derive(Debug, Default)]
pub struct BlockPump {
    task: Option<JoinHandle<()>>,
}

impl BlockPump {
    #[must_use]
    pub const fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("block subscription cancelled");
        }
    }
}

/// Forwards a block subscription into the observer funnel.
#[must_use]
pub fn spawn_block_pump(
    mut blocks: broadcast::Receiver<BlockEvent>,
    events: mpsc::Sender<ObserverEvent>,
) -> BlockPump {
    let task = tokio::spawn(async move {
        loop {
            match blocks.recv().await {
                Ok(block) => {
                    if events.send(ObserverEvent::Block(block)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "block pump lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    BlockPump::new(task)
}

/// Forwards a status subscription into the observer funnel. Never cancelled
/// mid-run; the task ends when the connection closes.
pub fn spawn_status_pump(
    mut statuses: broadcast::Receiver<StatusEvent>,
    events: mpsc::Sender<ObserverEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match statuses.recv().await {
                Ok(status) => {
                    if events.send(ObserverEvent::Status(status)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "status pump lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Creates the funnel both pumps and the submitter feed into.
#[must_use]
pub fn event_funnel() -> (mpsc::Sender<ObserverEvent>, mpsc::Receiver<ObserverEvent>) {
    mpsc::channel(FUNNEL_CAPACITY)
}

/// The confirmation-observation state machine:
/// `Init → Subscribed → Counting → Evaluating → Closed`.
///
/// Consumes the event funnel until three blocks have been observed, cancels
/// the block pump exactly once, fetches confirmed history for the signer,
/// and evaluates the verdict. With a timeout configured, an expired wait
/// short-circuits to the distinct timed-out verdict instead.
pub struct ConfirmationObserver {
    client: Arc<dyn NodeClient>,
    signer: PublicKey,
    tracker: BlockTracker,
    correlation: Correlation,
    state: ObserverState,
    timeout: Option<Duration>,
}

impl ConfirmationObserver {
    #[must_use]
    pub fn new(client: Arc<dyn NodeClient>, signer: PublicKey) -> Self {
        Self {
            client,
            signer,
            tracker: BlockTracker::default(),
            correlation: Correlation::default(),
            state: ObserverState::Init,
            timeout: None,
        }
    }

    /// Bounds the wall-clock wait for blocks. Off by default: without a
    /// bound the observer waits indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drives the run to a terminal verdict. The caller owns the connection
    /// and closes it after this returns, on success and failure alike.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ObserverEvent>,
        mut block_pump: BlockPump,
    ) -> Result<Observation, ObserverError> {
        self.state = ObserverState::Subscribed;
        debug!(state = ?self.state, threshold = BLOCK_THRESHOLD, "listeners active");
        let wait_limit = self.timeout.map(|timeout| Instant::now() + timeout);
        self.state = ObserverState::Counting;
        debug!(state = ?self.state, "waiting for blocks");

        loop {
            let event = match self.next_event(&mut events, wait_limit).await {
                NextEvent::Event(event) => event,
                NextEvent::FunnelClosed => {
                    block_pump.cancel();
                    return Err(ObserverError::FunnelClosed);
                }
                NextEvent::TimedOut => {
                    block_pump.cancel();
                    let blocks_seen = self.tracker.blocks();
                    warn!(blocks_seen, "wait for blocks timed out");
                    return Ok(self.into_observation(Verdict::TimedOut { blocks_seen }));
                }
            };

            match event {
                ObserverEvent::Status(status) => {
                    // Diagnostic only; never transitions state.
                    warn!(address = %status.address, code = %status.code, "status error received");
                }
                ObserverEvent::Announced { variant, hash } => {
                    info!(variant = variant.label(), %hash, "announce acknowledged");
                    self.correlation.capture(variant, hash);
                }
                ObserverEvent::Block(block) => match self.tracker.record(block.height) {
                    TrackerStep::Counting { blocks } => {
                        info!(height = block.height, blocks, "new block arrived");
                    }
                    TrackerStep::ThresholdReached { blocks } => {
                        info!(height = block.height, blocks, "block threshold reached");
                        block_pump.cancel();
                        self.state = ObserverState::Evaluating;
                        break;
                    }
                    TrackerStep::Ignored => {
                        debug!(height = block.height, "late block ignored");
                    }
                },
            }
        }

        let verdict = self.evaluate().await?;
        Ok(self.into_observation(verdict))
    }

    async fn next_event(
        &self,
        events: &mut mpsc::Receiver<ObserverEvent>,
        wait_limit: Option<Instant>,
    ) -> NextEvent {
        let received = match wait_limit {
            Some(limit) => match timeout_at(limit, events.recv()).await {
                Ok(received) => received,
                Err(_) => return NextEvent::TimedOut,
            },
            None => events.recv().await,
        };

        received.map_or(NextEvent::FunnelClosed, NextEvent::Event)
    }

    /// Fetches confirmed history and applies the verdict rule: exactly two
    /// matching records is success, anything else is failure.
    async fn evaluate(&self) -> Result<Verdict, ObserverError> {
        info!("checking confirmed transactions");

        let records = self
            .client
            .confirmed_transactions(&self.signer)
            .await
            .map_err(ObserverError::HistoryFetch)?;

        let matched = records
            .iter()
            .filter(|record| self.correlation.matches(&record.hash))
            .count();

        debug!(
            records = records.len(),
            matched,
            captured_hashes = self.correlation.captured(),
            "confirmed history filtered"
        );

        Ok(Verdict::from_matches(matched))
    }

    fn into_observation(mut self, verdict: Verdict) -> Observation {
        self.state = ObserverState::Closed;
        debug!(state = ?self.state, "observer terminal");
        Observation {
            verdict,
            block_heights: self.tracker.into_heights(),
            correlation: self.correlation,
        }
    }
}

enum NextEvent {
    Event(ObserverEvent),
    FunnelClosed,
    TimedOut,
}
