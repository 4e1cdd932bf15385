//! Submission & Confirmation Monitor.
//!
//! Submits the exact signed bytes and observes the outcome. Confirmation is
//! bounded by the freshness token's last valid block height and a wall-clock
//! cap. Expiry yields `TimedOut`, never `Failed`, because a transaction that
//! was not seen in time may still land.
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{
        ConfirmOptions, ConfirmationOutcome, FinalTransaction, OrderStatus, RelayError,
        SubmissionHandle,
    },
    services::{RelayerServiceTrait, SolanaProviderTrait},
};

pub struct SubmissionMonitor<P, R>
where
    P: SolanaProviderTrait + ?Sized,
    R: RelayerServiceTrait + ?Sized,
{
    provider: Arc<P>,
    relayer: Arc<R>,
}

impl<P, R> SubmissionMonitor<P, R>
where
    P: SolanaProviderTrait + ?Sized,
    R: RelayerServiceTrait + ?Sized,
{
    pub fn new(provider: Arc<P>, relayer: Arc<R>) -> Self {
        Self { provider, relayer }
    }

    /// Sends the final transaction once.
    ///
    /// A transaction with any placeholder signature is refused before any
    /// network call is made.
    pub async fn submit(&self, final_tx: &FinalTransaction) -> Result<SubmissionHandle, RelayError> {
        let transaction = &final_tx.transaction;
        let placeholders = transaction.placeholder_slots();
        if !placeholders.is_empty() {
            return Err(RelayError::InvalidSignature(format!(
                "refusing to submit with unsigned slots {:?}",
                placeholders
            )));
        }
        let expected = *transaction
            .id()
            .ok_or_else(|| RelayError::Internal("transaction has no signatures".to_string()))?;

        let signature = self.provider.send_raw_transaction(transaction.wire()).await?;
        if signature != expected {
            warn!(
                "Ledger reported signature {} for transaction {}",
                signature, expected
            );
        }
        info!("Submitted transaction {}", expected);

        Ok(SubmissionHandle {
            signature: expected,
            wire: transaction.wire().to_vec(),
            last_valid_block_height: final_tx.freshness.last_valid_block_height,
        })
    }

    /// Re-sends the stored bytes of an earlier submission.
    ///
    /// Nothing is re-negotiated or re-signed. Once the freshness token has
    /// expired the bytes can no longer land and `TimedOut` is returned.
    pub async fn resubmit(&self, handle: &SubmissionHandle) -> Result<(), RelayError> {
        let height = self.provider.get_block_height().await?;
        if height > handle.last_valid_block_height {
            return Err(RelayError::TimedOut(format!(
                "block height {} passed last valid height {}",
                height, handle.last_valid_block_height
            )));
        }
        self.provider.send_raw_transaction(&handle.wire).await?;
        info!("Resubmitted transaction {}", handle.signature);
        Ok(())
    }

    /// Polls the ledger until the transaction reaches `options.commitment`,
    /// fails, or expires.
    ///
    /// Cancelling `cancel` stops polling immediately with `Cancelled`; the
    /// submitted transaction is unaffected.
    pub async fn await_confirmation(
        &self,
        handle: &SubmissionHandle,
        options: &ConfirmOptions,
        cancel: &CancellationToken,
    ) -> Result<ConfirmationOutcome, RelayError> {
        let deadline = Instant::now() + options.timeout;
        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = sleep_until(deadline) => return Ok(self.wall_clock_expired(handle)),
                polled = self.poll_ledger(handle, options) => polled,
            };
            if let Some(outcome) = polled {
                return Ok(outcome);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = sleep_until(deadline) => return Ok(self.wall_clock_expired(handle)),
                _ = sleep(options.poll_interval) => {}
            }
        }
    }

    /// Polls the relayer's order status for relayers that settle asynchronously.
    pub async fn await_order_settlement(
        &self,
        handle: &SubmissionHandle,
        options: &ConfirmOptions,
        cancel: &CancellationToken,
    ) -> Result<ConfirmationOutcome, RelayError> {
        let deadline = Instant::now() + options.timeout;
        let signature = handle.signature.to_string();
        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = sleep_until(deadline) => return Ok(self.wall_clock_expired(handle)),
                polled = self.relayer.get_order_status(&signature) => polled,
            };
            match polled {
                Ok(response) => match response.status {
                    OrderStatus::Closed => {
                        info!("Order {} settled", signature);
                        return Ok(ConfirmationOutcome::Confirmed { slot: None });
                    }
                    OrderStatus::Failed => {
                        return Ok(ConfirmationOutcome::Failed(format!(
                            "relayer reported order {} failed",
                            signature
                        )));
                    }
                    status => debug!("Order {} is {:?}", signature, status),
                },
                Err(e) => warn!("Order status for {} unavailable: {}", signature, e),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = sleep_until(deadline) => return Ok(self.wall_clock_expired(handle)),
                _ = sleep(options.poll_interval) => {}
            }
        }
    }

    fn wall_clock_expired(&self, handle: &SubmissionHandle) -> ConfirmationOutcome {
        warn!(
            "Gave up waiting for {} after the confirmation timeout",
            handle.signature
        );
        ConfirmationOutcome::TimedOut
    }

    /// One polling step. `None` means keep polling. Transient RPC failures are
    /// logged and polled again.
    async fn poll_ledger(
        &self,
        handle: &SubmissionHandle,
        options: &ConfirmOptions,
    ) -> Option<ConfirmationOutcome> {
        match self.provider.get_signature_status(&handle.signature).await {
            Ok(Some(status)) => {
                if let Some(err) = status.err {
                    warn!("Transaction {} failed: {}", handle.signature, err);
                    return Some(ConfirmationOutcome::Failed(err));
                }
                if status.satisfies(options.commitment) {
                    info!(
                        "Transaction {} reached {} at slot {}",
                        handle.signature, options.commitment, status.slot
                    );
                    return Some(ConfirmationOutcome::Confirmed {
                        slot: Some(status.slot),
                    });
                }
                debug!(
                    "Transaction {} is {}, waiting for {}",
                    handle.signature, status.commitment, options.commitment
                );
                // Landed transactions no longer depend on the blockhash.
                return None;
            }
            Ok(None) => debug!("Transaction {} not seen yet", handle.signature),
            Err(e) => warn!("Status lookup for {} failed: {}", handle.signature, e),
        }

        match self.provider.get_block_height().await {
            Ok(height) if height > handle.last_valid_block_height => {
                warn!(
                    "Blockhash for {} expired at block height {} (last valid {})",
                    handle.signature, height, handle.last_valid_block_height
                );
                Some(ConfirmationOutcome::TimedOut)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Block height lookup failed: {}", e);
                None
            }
        }
    }
}
