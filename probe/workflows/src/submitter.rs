use std::sync::Arc;

use deadline_probe_core::{
    Account, Address, NetworkId, SignedTransaction, TransferTransaction,
    client::NodeClient,
    deadline::{Deadline, DeadlineVariant, STATIC_DEADLINE_WINDOW},
    observer::ObserverEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const DYNAMIC_MESSAGE: &str = "test-dynamic-deadline";
const STATIC_MESSAGE: &str = "test-static-deadline";

/// The two signed variants of one probe run, differing only in how their
/// deadline was derived.
pub struct TransactionPair {
    pub dynamic: SignedTransaction,
    pub static_deadline: SignedTransaction,
}

/// Builds and signs both transfer variants: the dynamic deadline computed at
/// call time, the static one computed once from the fixed 24 h window.
#[must_use]
pub fn build_transactions(
    account: &Account,
    recipient: &Address,
    network: NetworkId,
) -> TransactionPair {
    let dynamic = TransferTransaction::new(
        Deadline::dynamic(),
        recipient.clone(),
        Some(DYNAMIC_MESSAGE.to_owned()),
        network,
    );
    let static_deadline = TransferTransaction::new(
        Deadline::from_window(STATIC_DEADLINE_WINDOW),
        recipient.clone(),
        Some(STATIC_MESSAGE.to_owned()),
        network,
    );

    TransactionPair {
        dynamic: account.sign(dynamic),
        static_deadline: account.sign(static_deadline),
    }
}

/// Announces both variants, dynamic first. Each announcement runs in its own
/// task and does not block the other; the acknowledgment forwards the hash
/// into the observer funnel, racing the block stream. A failed announcement
/// is logged and otherwise shows up only as an absent confirmation.
pub fn announce_both(
    client: Arc<dyn NodeClient>,
    pair: TransactionPair,
    events: &mpsc::Sender<ObserverEvent>,
) {
    announce_one(
        Arc::clone(&client),
        pair.dynamic,
        DeadlineVariant::Dynamic,
        events.clone(),
    );
    announce_one(client, pair.static_deadline, DeadlineVariant::Static, events.clone());
}

fn announce_one(
    client: Arc<dyn NodeClient>,
    tx: SignedTransaction,
    variant: DeadlineVariant,
    events: mpsc::Sender<ObserverEvent>,
) {
    tokio::spawn(async move {
        match client.announce(&tx).await {
            Ok(()) => {
                info!(variant = variant.label(), hash = %tx.hash(), "transaction announced");
                let ack = ObserverEvent::Announced {
                    variant,
                    hash: tx.hash().clone(),
                };
                if events.send(ack).await.is_err() {
                    debug!(variant = variant.label(), "observer gone before announce ack");
                }
            }
            Err(err) => {
                warn!(
                    variant = variant.label(),
                    error = %err,
                    "announcement failed; confirmation will be absent"
                );
            }
        }
    });
}
