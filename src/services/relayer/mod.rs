//! Relayer Service HTTP client.
//!
//! The relayer owns the fee-payer account. It publishes its identity and the
//! tokens it accepts as payment, quotes fees over provisional transactions,
//! and co-signs the final transaction as fee payer.
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{
    constants::{
        RELAYER_BLOCKHASH_PATH, RELAYER_CONFIG_PATH, RELAYER_ORDER_STATUS_PATH,
        RELAYER_PAYMENT_INSTRUCTION_PATH, RELAYER_SIGN_PATH,
    },
    models::{
        BlockhashResponse, OrderStatusResponse, PaymentInstructionRequest,
        PaymentInstructionResponse, RelayerConfigResponse, SignTransactionRequest,
        SignTransactionResponse,
    },
};

#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum RelayerClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Relayer returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode relayer response: {0}")]
    Decode(String),
    #[error("Invalid relayer URL: {0}")]
    InvalidUrl(String),
}

impl RelayerClientError {
    /// Transport failures, timeouts, throttling and server errors may succeed on retry.
    pub fn is_retriable(&self) -> bool {
        match self {
            RelayerClientError::Http(_) | RelayerClientError::Timeout(_) => true,
            RelayerClientError::Status { status, .. } => *status == 429 || *status >= 500,
            RelayerClientError::Decode(_) | RelayerClientError::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for RelayerClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RelayerClientError::Timeout(error.to_string())
        } else if error.is_decode() {
            RelayerClientError::Decode(error.to_string())
        } else if error.is_builder() {
            RelayerClientError::InvalidUrl(error.to_string())
        } else {
            RelayerClientError::Http(error.to_string())
        }
    }
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait RelayerServiceTrait: Send + Sync {
    /// `GET /config`: fee payer identity and accepted fee tokens.
    async fn get_config(&self) -> Result<RelayerConfigResponse, RelayerClientError>;

    /// `GET /blockhash`: the relayer's view of the current freshness token.
    async fn get_blockhash(&self) -> Result<BlockhashResponse, RelayerClientError>;

    /// `POST /payment-instruction`: quotes a fee over the given transaction.
    async fn get_payment_instruction(
        &self,
        request: &PaymentInstructionRequest,
    ) -> Result<PaymentInstructionResponse, RelayerClientError>;

    /// `POST /sign`: the relayer's fee-payer counter-signature.
    async fn sign_transaction(
        &self,
        request: &SignTransactionRequest,
    ) -> Result<SignTransactionResponse, RelayerClientError>;

    /// `GET /order-status?signature=`: settlement state for deferred relayers.
    async fn get_order_status(
        &self,
        signature: &str,
    ) -> Result<OrderStatusResponse, RelayerClientError>;
}

pub struct HttpRelayerClient {
    client: Client,
    base_url: String,
}

impl HttpRelayerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RelayerClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RelayerClientError::InvalidUrl(base_url));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, RelayerClientError> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(RelayerClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        serde_json::from_slice(&body).map_err(|e| RelayerClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RelayerServiceTrait for HttpRelayerClient {
    async fn get_config(&self) -> Result<RelayerConfigResponse, RelayerClientError> {
        let response = self.client.get(self.url(RELAYER_CONFIG_PATH)).send().await?;
        Self::parse_response(response).await
    }

    async fn get_blockhash(&self) -> Result<BlockhashResponse, RelayerClientError> {
        let response = self
            .client
            .get(self.url(RELAYER_BLOCKHASH_PATH))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn get_payment_instruction(
        &self,
        request: &PaymentInstructionRequest,
    ) -> Result<PaymentInstructionResponse, RelayerClientError> {
        let response = self
            .client
            .post(self.url(RELAYER_PAYMENT_INSTRUCTION_PATH))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn sign_transaction(
        &self,
        request: &SignTransactionRequest,
    ) -> Result<SignTransactionResponse, RelayerClientError> {
        let response = self
            .client
            .post(self.url(RELAYER_SIGN_PATH))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn get_order_status(
        &self,
        signature: &str,
    ) -> Result<OrderStatusResponse, RelayerClientError> {
        let response = self
            .client
            .get(self.url(RELAYER_ORDER_STATUS_PATH))
            .query(&[("signature", signature)])
            .send()
            .await?;
        Self::parse_response(response).await
    }
}
