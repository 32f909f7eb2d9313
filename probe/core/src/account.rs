use std::fmt;

use ed25519_dalek::{SECRET_KEY_LENGTH, Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::transaction::{SignedTransaction, TransferTransaction, TxHash};

const PRIVATE_KEY_HEX_LEN: usize = SECRET_KEY_LENGTH * 2;
const ADDRESS_BODY_BYTES: usize = 20;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("private key must be {PRIVATE_KEY_HEX_LEN} hex characters (got {got})")]
    InvalidPrivateKey { got: usize },
    #[error("private key is not valid hex")]
    MalformedPrivateKey(#[from] hex::FromHexError),
}

/// Network a transaction is valid on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkId {
    Mainnet,
    Testnet,
    PrivateTest,
}

impl NetworkId {
    /// Wire tag byte mixed into the signing payload.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Mainnet => 0x68,
            Self::Testnet => 0x98,
            Self::PrivateTest => 0x90,
        }
    }

    const fn address_prefix(self) -> char {
        match self {
            Self::Mainnet => 'N',
            Self::Testnet => 'T',
            Self::PrivateTest => 'S',
        }
    }
}

/// Raw network address identifying a transaction party.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.to_ascii_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded ed25519 public key; the identity whose confirmed history the
/// observer queries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(hex::encode_upper(key.as_bytes()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Submitting identity: signing key plus its derived public identity and
/// address on a given network.
#[derive(Debug)]
pub struct Account {
    signing_key: SigningKey,
    public_key: PublicKey,
    address: Address,
    network: NetworkId,
}

impl Account {
    /// Parses a hex private key and derives the account identity. An empty
    /// key (the probe's shipped default) fails here, before any network call.
    pub fn from_private_key_hex(private_key: &str, network: NetworkId) -> Result<Self, AccountError> {
        if private_key.len() != PRIVATE_KEY_HEX_LEN {
            return Err(AccountError::InvalidPrivateKey {
                got: private_key.len(),
            });
        }

        let mut secret = [0u8; SECRET_KEY_LENGTH];
        hex::decode_to_slice(private_key, &mut secret)?;

        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();
        let public_key = PublicKey::from_verifying_key(&verifying_key);
        let address = derive_address(&verifying_key, network);

        Ok(Self {
            signing_key,
            public_key,
            address,
            network,
        })
    }

    /// Signs a transfer and derives the hash used to correlate confirmations.
    #[must_use]
    pub fn sign(&self, transaction: TransferTransaction) -> SignedTransaction {
        let payload = transaction.signing_bytes();
        let signature = self.signing_key.sign(&payload);

        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        hasher.update(self.signing_key.verifying_key().as_bytes());
        hasher.update(&payload);
        let hash = TxHash::from_digest(hasher.finalize());

        SignedTransaction {
            transaction,
            signer: self.public_key.clone(),
            signature: hex::encode_upper(signature.to_bytes()),
            hash,
        }
    }

    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub const fn network(&self) -> NetworkId {
        self.network
    }
}

fn derive_address(public_key: &VerifyingKey, network: NetworkId) -> Address {
    let digest = Sha256::digest(public_key.as_bytes());
    let body = hex::encode_upper(&digest[..ADDRESS_BODY_BYTES]);
    Address(format!("{}{body}", network.address_prefix()))
}
