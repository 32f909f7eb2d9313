use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    account::{Address, NetworkId, PublicKey},
    deadline::Deadline,
};

/// Uppercase hex transaction hash; the correlation key matching an announced
/// transaction against later confirmation records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    #[must_use]
    pub fn from_digest(digest: impl AsRef<[u8]>) -> Self {
        Self(hex::encode_upper(digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable transfer intent. Created once per run, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTransaction {
    pub deadline: Deadline,
    pub recipient: Address,
    pub message: Option<String>,
    pub network: NetworkId,
    pub max_fee: u64,
}

impl TransferTransaction {
    #[must_use]
    pub const fn new(
        deadline: Deadline,
        recipient: Address,
        message: Option<String>,
        network: NetworkId,
    ) -> Self {
        Self {
            deadline,
            recipient,
            message,
            network,
            max_fee: 0,
        }
    }

    /// Canonical byte encoding covered by the signature.
    #[must_use]
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.deadline.as_millis().to_le_bytes());
        bytes.extend_from_slice(self.recipient.as_str().as_bytes());
        if let Some(message) = &self.message {
            bytes.extend_from_slice(message.as_bytes());
        }
        bytes.push(self.network.tag());
        bytes.extend_from_slice(&self.max_fee.to_le_bytes());
        bytes
    }
}

/// A transfer plus its signature and derived hash, ready to announce.
#[derive(Clone, Debug, Serialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: TransferTransaction,
    pub signer: PublicKey,
    pub signature: String,
    pub hash: TxHash,
}

impl SignedTransaction {
    #[must_use]
    pub const fn hash(&self) -> &TxHash {
        &self.hash
    }

    #[must_use]
    pub const fn signer(&self) -> &PublicKey {
        &self.signer
    }
}
