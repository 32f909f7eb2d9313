use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use deadline_probe_core::{
    Account, Address, DynError, NetworkId, PublicKey, SignedTransaction,
    client::{
        ConfirmedTransaction, NodeClient,
        events::{BlockEvent, EventConnection, StatusEvent},
    },
};
use tokio::{
    sync::{Semaphore, broadcast},
    time::{Duration, sleep},
};

pub const TEST_PRIVATE_KEY: &str =
    "575dbb3062267eff57c970a336ebbc8fbcfe12c5bd3ed7bc11eb0481d7704ced";

const DYNAMIC_MESSAGE: &str = "test-dynamic-deadline";
const STUB_CHANNEL_CAPACITY: usize = 32;
const WAIT_POLL: Duration = Duration::from_millis(10);
const WAIT_ATTEMPTS: usize = 500;

#[must_use]
pub fn test_account() -> Account {
    Account::from_private_key_hex(TEST_PRIVATE_KEY, NetworkId::PrivateTest)
        .expect("test key is valid")
}

/// Which announced transactions the stub node reports as confirmed.
#[derive(Clone, Copy, Debug)]
pub enum ConfirmMode {
    All,
    DynamicOnly,
}

/// In-memory node: records announcements and serves them back as confirmed
/// history, filtered per [`ConfirmMode`].
pub struct StubNode {
    confirm: ConfirmMode,
    fail_history: bool,
    gate: Option<Arc<Semaphore>>,
    announced: Mutex<Vec<SignedTransaction>>,
}

impl StubNode {
    #[must_use]
    pub fn new(confirm: ConfirmMode) -> Arc<Self> {
        Arc::new(Self {
            confirm,
            fail_history: false,
            gate: None,
            announced: Mutex::new(Vec::new()),
        })
    }

    /// A node whose announce acknowledgments block until the returned
    /// semaphore receives permits, so tests can decide the race order.
    #[must_use]
    pub fn gated(confirm: ConfirmMode) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let node = Arc::new(Self {
            confirm,
            fail_history: false,
            gate: Some(Arc::clone(&gate)),
            announced: Mutex::new(Vec::new()),
        });
        (node, gate)
    }

    /// A node whose history endpoint always fails.
    #[must_use]
    pub fn failing_history() -> Arc<Self> {
        Arc::new(Self {
            confirm: ConfirmMode::All,
            fail_history: true,
            gate: None,
            announced: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn announced_count(&self) -> usize {
        self.announced
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn confirms(&self, tx: &SignedTransaction) -> bool {
        match self.confirm {
            ConfirmMode::All => true,
            ConfirmMode::DynamicOnly => {
                tx.transaction.message.as_deref() == Some(DYNAMIC_MESSAGE)
            }
        }
    }
}

#[async_trait]
impl NodeClient for StubNode {
    async fn announce(&self, tx: &SignedTransaction) -> Result<(), DynError> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| "announce gate closed")?;
            permit.forget();
        }
        self.announced
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx.clone());
        Ok(())
    }

    async fn confirmed_transactions(
        &self,
        _signer: &PublicKey,
    ) -> Result<Vec<ConfirmedTransaction>, DynError> {
        if self.fail_history {
            return Err("history endpoint unavailable".into());
        }

        let announced = self
            .announced
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(announced
            .iter()
            .filter(|tx| self.confirms(tx))
            .enumerate()
            .map(|(index, tx)| ConfirmedTransaction {
                hash: tx.hash().clone(),
                height: 100 + index as u64,
                deadline: Some(tx.transaction.deadline),
            })
            .collect())
    }
}

/// In-memory event connection driven directly by the test body.
pub struct StubConnection {
    blocks: Mutex<Option<broadcast::Sender<BlockEvent>>>,
    statuses: Mutex<Option<broadcast::Sender<StatusEvent>>>,
    closes: AtomicUsize,
}

impl StubConnection {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (blocks, _) = broadcast::channel(STUB_CHANNEL_CAPACITY);
        let (statuses, _) = broadcast::channel(STUB_CHANNEL_CAPACITY);
        Arc::new(Self {
            blocks: Mutex::new(Some(blocks)),
            statuses: Mutex::new(Some(statuses)),
            closes: AtomicUsize::new(0),
        })
    }

    pub fn send_block(&self, height: u64) {
        if let Some(sender) = self
            .blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            let _ = sender.send(BlockEvent { height });
        }
    }

    pub fn send_status(&self, address: Address, code: &str) {
        if let Some(sender) = self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            let _ = sender.send(StatusEvent {
                address,
                code: code.to_owned(),
            });
        }
    }

    #[must_use]
    pub fn block_subscribers(&self) -> usize {
        self.blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drops both event streams, simulating lost connectivity.
    pub fn sever(&self) {
        self.blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl EventConnection for StubConnection {
    fn new_blocks(&self) -> broadcast::Receiver<BlockEvent> {
        self.blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or_else(|| broadcast::channel(1).1, broadcast::Sender::subscribe)
    }

    fn status_errors(&self, _address: &Address) -> broadcast::Receiver<StatusEvent> {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or_else(|| broadcast::channel(1).1, broadcast::Sender::subscribe)
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `condition` until it holds, panicking after a bounded wait.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..WAIT_ATTEMPTS {
        if condition() {
            return;
        }
        sleep(WAIT_POLL).await;
    }
    panic!("timed out waiting for {what}");
}
