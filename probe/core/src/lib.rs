pub mod account;
pub mod client;
pub mod deadline;
pub mod observer;
pub mod transaction;
pub mod verdict;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

pub use account::{Account, Address, NetworkId, PublicKey};
pub use client::{ConfirmedTransaction, HttpNodeClient, NodeClient, events::EventConnection};
pub use deadline::{Deadline, DeadlineVariant, EPOCH_OFFSET_MILLIS};
pub use observer::{ConfirmationObserver, Observation, ObserverEvent};
pub use transaction::{SignedTransaction, TransferTransaction, TxHash};
pub use verdict::Verdict;
