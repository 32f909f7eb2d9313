use std::{sync::Arc, time::Duration};

use deadline_probe_core::{
    Account, Address, NetworkId, TxHash,
    account::AccountError,
    client::{ClientError, HttpNodeClient, NodeClient, events::EventConnection},
    observer::{
        ConfirmationObserver, ObserverError, event_funnel, spawn_block_pump, spawn_status_pump,
    },
    verdict::Verdict,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::submitter;

/// What this probe checks, for report headers and logs.
pub const CASE_TITLE: &str = "use network epoch constant for transaction deadline";

/// Recipient of both transfer variants.
pub const DEFAULT_RECIPIENT: &str = "SDU7Y3ZOH5F2WLXHLXY5AIDIJDBSF6MYYFTMKKQT";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a single probe run needs as input.
#[derive(Clone, Debug)]
pub struct CaseConfig {
    pub endpoint: String,
    pub private_key: String,
    pub recipient: Address,
    pub network: NetworkId,
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl CaseConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            private_key: private_key.into(),
            recipient: Address::from_raw(DEFAULT_RECIPIENT),
            network: NetworkId::PrivateTest,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: Address) -> Self {
        self.recipient = recipient;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Bounds the wait for blocks; `None` waits indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("account setup failed")]
    Account(#[from] AccountError),
    #[error("node client setup failed")]
    Client(#[from] ClientError),
    #[error("confirmation observation failed")]
    Observer(#[from] ObserverError),
}

/// Report produced by a finished probe run. The correlation hashes are the
/// ones captured from announce acknowledgments; either may be absent when
/// the acknowledgment lost the race against the block stream.
#[derive(Clone, Debug)]
pub struct CaseReport {
    pub title: &'static str,
    pub verdict: Verdict,
    pub block_heights: Vec<u64>,
    pub dynamic_hash: Option<TxHash>,
    pub static_hash: Option<TxHash>,
}

/// The deadline probe as a plain strategy value: hand it a configuration,
/// receive a report.
pub struct DeadlineProbe {
    config: CaseConfig,
}

impl DeadlineProbe {
    #[must_use]
    pub const fn new(config: CaseConfig) -> Self {
        Self { config }
    }

    /// Runs the probe against the configured node: build and sign both
    /// variants, announce them, open the event subscription, and drive the
    /// observer to a terminal verdict.
    pub async fn execute(&self) -> Result<CaseReport, CaseError> {
        info!(title = CASE_TITLE, endpoint = %self.config.endpoint, "executing deadline probe");

        let account =
            Account::from_private_key_hex(&self.config.private_key, self.config.network)?;
        let client = HttpNodeClient::new(&self.config.endpoint)?;
        let connection =
            client.open_event_connection(account.address().clone(), self.config.poll_interval);

        run_probe(Arc::new(client), &connection, &account, &self.config).await
    }
}

/// Drives one probe run over any client/connection pair. Announces both
/// variants first (dynamic first, neither blocking the other), then
/// subscribes and observes. The connection is closed exactly once, after
/// observation, on the success and failure paths alike.
pub async fn run_probe(
    client: Arc<dyn NodeClient>,
    connection: &dyn EventConnection,
    account: &Account,
    config: &CaseConfig,
) -> Result<CaseReport, CaseError> {
    let (events_tx, events_rx) = event_funnel();

    let pair = submitter::build_transactions(account, &config.recipient, config.network);
    submitter::announce_both(Arc::clone(&client), pair, &events_tx);

    let block_pump = spawn_block_pump(connection.new_blocks(), events_tx.clone());
    let _status_pump = spawn_status_pump(
        connection.status_errors(account.address()),
        events_tx.clone(),
    );
    drop(events_tx);

    info!("now waiting for blocks");

    let observer = ConfirmationObserver::new(client, account.public_key().clone())
        .with_timeout(config.timeout);
    let outcome = observer.run(events_rx, block_pump).await;

    // Terminal on every path: verdict or fatal error alike.
    connection.close();
    debug!("event connection released");

    let observation = outcome?;
    observation.verdict.report();

    Ok(CaseReport {
        title: CASE_TITLE,
        verdict: observation.verdict,
        block_heights: observation.block_heights,
        dynamic_hash: observation.correlation.dynamic().cloned(),
        static_hash: observation.correlation.static_deadline().cloned(),
    })
}
