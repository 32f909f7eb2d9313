pub mod events;
pub mod paths;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::error;

use crate::{
    DynError,
    account::{Address, PublicKey},
    deadline::Deadline,
    transaction::{SignedTransaction, TxHash},
};
use self::events::HttpEventConnection;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid node url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Transaction record returned from an account's confirmed history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmedTransaction {
    pub hash: TxHash,
    pub height: u64,
    #[serde(default)]
    pub deadline: Option<Deadline>,
}

#[derive(Deserialize)]
struct ChainHeight {
    height: u64,
}

/// Narrow request/response surface the observer and submitter depend on.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Fire-and-forget announcement: success only means the node accepted
    /// the transaction into its pipeline.
    async fn announce(&self, tx: &SignedTransaction) -> Result<(), DynError>;

    /// Full confirmed-transaction history for a public identity.
    async fn confirmed_transactions(
        &self,
        signer: &PublicKey,
    ) -> Result<Vec<ConfirmedTransaction>, DynError>;
}

/// Thin async client for the node's HTTP endpoints.
#[derive(Clone, Debug)]
pub struct HttpNodeClient {
    base_url: Url,
    client: Client,
}

impl HttpNodeClient {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(endpoint).map_err(|err| ClientError::InvalidUrl {
            url: endpoint.to_owned(),
            message: err.to_string(),
        })?;
        Ok(Self::from_url(base_url))
    }

    #[must_use]
    pub fn from_url(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Announce a signed transaction, logging the node's response body on
    /// rejection.
    pub async fn announce_transaction(&self, tx: &SignedTransaction) -> Result<(), ClientError> {
        let res = self
            .client
            .put(self.join_base(paths::TRANSACTION_ANNOUNCE))
            .json(tx)
            .send()
            .await?;

        if let Err(status_err) = res.error_for_status_ref() {
            let status = res.status();
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!(%status, %body, "announce request failed");
            return Err(status_err.into());
        }
        Ok(())
    }

    /// Current chain height.
    pub async fn chain_height(&self) -> Result<u64, ClientError> {
        let info: ChainHeight = self.get_json(paths::CHAIN_HEIGHT).await?;
        Ok(info.height)
    }

    /// Confirmed-transaction history for a public identity.
    pub async fn account_transactions(
        &self,
        signer: &PublicKey,
    ) -> Result<Vec<ConfirmedTransaction>, ClientError> {
        self.get_json(&paths::account_transactions(signer.as_str()))
            .await
    }

    /// Announcement-time rejections recorded for an address.
    pub async fn status_errors(
        &self,
        address: &Address,
    ) -> Result<Vec<events::StatusEvent>, ClientError> {
        self.get_json(&paths::account_status_errors(address.as_str()))
            .await
    }

    /// Opens the persistent event subscription for `address`, polling the
    /// node at `poll_interval`.
    #[must_use]
    pub fn open_event_connection(
        &self,
        address: Address,
        poll_interval: Duration,
    ) -> HttpEventConnection {
        HttpEventConnection::open(self.clone(), address, poll_interval)
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.get_response(path).await?;
        Ok(response.error_for_status()?.json().await?)
    }

    async fn get_response(&self, path: &str) -> reqwest::Result<Response> {
        self.client.get(self.join_base(path)).send().await
    }

    fn join_base(&self, path: &str) -> Url {
        let trimmed = path.trim_start_matches('/');
        match self.base_url.join(trimmed) {
            Ok(url) => url,
            Err(err) => {
                error!(
                    error = %err,
                    base = %self.base_url,
                    path,
                    "failed to join url; falling back to base url"
                );
                self.base_url.clone()
            }
        }
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn announce(&self, tx: &SignedTransaction) -> Result<(), DynError> {
        self.announce_transaction(tx)
            .await
            .map_err(|err| -> DynError { err.into() })
    }

    async fn confirmed_transactions(
        &self,
        signer: &PublicKey,
    ) -> Result<Vec<ConfirmedTransaction>, DynError> {
        self.account_transactions(signer)
            .await
            .map_err(|err| -> DynError { err.into() })
    }
}
