//! Sponsored relay engine.
//!
//! Drives one sponsored send through the five components:
//!
//! ```text
//! AccountResolver ─┐
//!                  ├─> TransactionAssembler -> FeeNegotiator (round 1, rebuild, round 2)
//!                  │        -> SignatureAssembler (relayer co-sign, wallet sign)
//!                  │        -> SubmissionMonitor (submit, confirm)
//! ```
//!
//! Each send runs in its own [`RelaySession`]. Sessions share nothing, so
//! concurrent sends from the same initiator are independent. Every network
//! call up to submission can be cancelled.
use std::{future::Future, str::FromStr, sync::Arc};

use log::{error, info, warn};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tokio_util::sync::CancellationToken;

mod accounts;
pub use accounts::*;

mod assembler;
pub use assembler::*;

mod negotiator;
pub use negotiator::*;

mod signature;
pub use signature::*;

mod monitor;
pub use monitor::*;

mod session;
pub use session::*;

#[cfg(test)]
pub mod test_setup;

use crate::{
    constants::{DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_COMPUTE_UNIT_PRICE},
    models::{
        ConfirmOptions, ConfirmationOutcome, FeeQuote, RelayError, RelayerConfigResponse,
        SubmissionHandle,
    },
    services::{
        retry_with_backoff, RelayerClientError, RelayerServiceTrait, SolanaProviderTrait,
        WalletSigner,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayEngineConfig {
    pub compute_budget: ComputeBudget,
    pub negotiation: NegotiationPolicy,
    pub confirm: ConfirmOptions,
}

impl Default for RelayEngineConfig {
    fn default() -> Self {
        Self {
            compute_budget: ComputeBudget::new(
                DEFAULT_COMPUTE_UNIT_LIMIT,
                DEFAULT_COMPUTE_UNIT_PRICE,
            ),
            negotiation: NegotiationPolicy::default(),
            confirm: ConfirmOptions::default(),
        }
    }
}

/// A user-initiated sponsored send.
#[derive(Debug, Clone, PartialEq)]
pub struct SponsoredSend {
    pub initiator: Pubkey,
    pub fee_token: String,
    /// Business instructions, in order. Compute budget instructions are optional.
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayReceipt {
    pub session_id: String,
    pub submission: SubmissionHandle,
    pub fee_quote: FeeQuote,
    /// `None` when confirmation was not awaited or polling was cancelled.
    pub outcome: Option<ConfirmationOutcome>,
    pub state: RelayState,
}

async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T, RelayError>
where
    F: Future<Output = Result<T, RelayError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RelayError::Cancelled),
        result = future => result,
    }
}

pub struct SponsoredRelayEngine<P, R, W>
where
    P: SolanaProviderTrait + ?Sized,
    R: RelayerServiceTrait + ?Sized,
    W: WalletSigner + ?Sized,
{
    provider: Arc<P>,
    relayer: Arc<R>,
    wallet: Arc<W>,
    config: RelayEngineConfig,
}

impl<P, R, W> SponsoredRelayEngine<P, R, W>
where
    P: SolanaProviderTrait + ?Sized,
    R: RelayerServiceTrait + ?Sized,
    W: WalletSigner + ?Sized,
{
    pub fn new(provider: Arc<P>, relayer: Arc<R>, wallet: Arc<W>, config: RelayEngineConfig) -> Self {
        Self {
            provider,
            relayer,
            wallet,
            config,
        }
    }

    pub fn config(&self) -> &RelayEngineConfig {
        &self.config
    }

    fn negotiator(&self) -> FeeNegotiator<P, R> {
        FeeNegotiator::new(
            self.provider.clone(),
            self.relayer.clone(),
            TransactionAssembler::new(self.config.compute_budget),
            self.config.negotiation,
        )
    }

    fn monitor(&self) -> SubmissionMonitor<P, R> {
        SubmissionMonitor::new(self.provider.clone(), self.relayer.clone())
    }

    /// `GET /config` with transport retries.
    pub async fn relayer_config(&self) -> Result<RelayerConfigResponse, RelayError> {
        let relayer = self.relayer.as_ref();
        Ok(retry_with_backoff(
            "config",
            RelayerClientError::is_retriable,
            || relayer.get_config(),
            &self.config.negotiation.retry,
        )
        .await?)
    }

    /// Checks the send against the relayer's published policy and resolves
    /// its fee payer.
    pub async fn prepare(&self, send: &SponsoredSend) -> Result<NegotiationRequest, RelayError> {
        if send.instructions.is_empty() {
            return Err(RelayError::Configuration(
                "nothing to relay: no instructions".to_string(),
            ));
        }
        let relayer_config = self.relayer_config().await?;
        if !relayer_config.accepts(&send.fee_token) {
            return Err(RelayError::Configuration(format!(
                "relayer does not accept fee token {}",
                send.fee_token
            )));
        }
        let fee_payer = Pubkey::from_str(&relayer_config.fee_payer).map_err(|e| {
            RelayError::Configuration(format!(
                "relayer fee payer '{}' is not a valid address: {}",
                relayer_config.fee_payer, e
            ))
        })?;

        Ok(NegotiationRequest {
            initiator: send.initiator,
            fee_payer,
            fee_token: send.fee_token.clone(),
            instructions: send.instructions.clone(),
        })
    }

    /// Negotiates, signs and submits. Does not wait for confirmation.
    pub async fn send(
        &self,
        send: SponsoredSend,
        cancel: &CancellationToken,
    ) -> Result<RelayReceipt, RelayError> {
        self.run(send, cancel, false).await
    }

    /// Negotiates, signs, submits and waits for the configured commitment.
    ///
    /// Cancelling after submission stops polling and returns a receipt
    /// without an outcome; the transaction may still land.
    pub async fn send_and_confirm(
        &self,
        send: SponsoredSend,
        cancel: &CancellationToken,
    ) -> Result<RelayReceipt, RelayError> {
        self.run(send, cancel, true).await
    }

    /// Re-sends the bytes of an earlier submission.
    pub async fn resubmit(&self, handle: &SubmissionHandle) -> Result<(), RelayError> {
        self.monitor().resubmit(handle).await
    }

    pub async fn await_confirmation(
        &self,
        handle: &SubmissionHandle,
        cancel: &CancellationToken,
    ) -> Result<ConfirmationOutcome, RelayError> {
        self.monitor()
            .await_confirmation(handle, &self.config.confirm, cancel)
            .await
    }

    /// Waits for a relayer with deferred settlement to close the order.
    pub async fn await_order_settlement(
        &self,
        handle: &SubmissionHandle,
        cancel: &CancellationToken,
    ) -> Result<ConfirmationOutcome, RelayError> {
        self.monitor()
            .await_order_settlement(handle, &self.config.confirm, cancel)
            .await
    }

    /// Reads `owner`'s balance of `mint`; `None` when there is nothing to show.
    pub async fn token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<TokenBalance>, RelayError> {
        Ok(AccountResolver::token_balance(self.provider.as_ref(), owner, mint).await?)
    }

    async fn run(
        &self,
        send: SponsoredSend,
        cancel: &CancellationToken,
        confirm: bool,
    ) -> Result<RelayReceipt, RelayError> {
        let mut session = RelaySession::new(send.initiator);
        info!(
            "Session {}: sponsored send for {} paying in {}",
            session.id(),
            send.initiator,
            send.fee_token
        );

        let result = self.drive(&mut session, &send, cancel, confirm).await;
        if let Err(e) = &result {
            session.abort(e);
            match e {
                RelayError::Cancelled => info!("Session {} cancelled", session.id()),
                e if e.is_retryable() => warn!(
                    "Session {} ended in {}: {}",
                    session.id(),
                    session.state(),
                    e
                ),
                e => error!(
                    "Session {} failed ({}): {}",
                    session.id(),
                    e.category(),
                    e
                ),
            }
        }
        result
    }

    async fn drive(
        &self,
        session: &mut RelaySession,
        send: &SponsoredSend,
        cancel: &CancellationToken,
        confirm: bool,
    ) -> Result<RelayReceipt, RelayError> {
        session.apply(RelayEvent::Start)?;
        let request = cancellable(cancel, self.prepare(send)).await?;

        let negotiated = self.negotiate(session, &request, cancel).await?;
        session.record_quote(negotiated.quote.clone());
        session.apply(RelayEvent::Round2Quoted)?;

        let signatures = SignatureAssembler::new(self.relayer.clone(), self.wallet.clone());
        let final_tx = cancellable(cancel, signatures.assemble(&negotiated, &request.initiator))
            .await?;
        session.record_initiator_index(final_tx.initiator_index);
        session.apply(RelayEvent::Signed)?;

        if cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        let monitor = self.monitor();
        let handle = monitor.submit(&final_tx).await?;
        session.record_submission(handle.clone());
        session.apply(RelayEvent::Submitted)?;
        info!(
            "Session {}: submitted {} with fee {} {}",
            session.id(),
            handle.signature,
            final_tx.fee_quote.fee_amount,
            final_tx.fee_quote.fee_token
        );

        let outcome = if confirm {
            match monitor
                .await_confirmation(&handle, &self.config.confirm, cancel)
                .await
            {
                Ok(outcome) => {
                    session.apply(RelayEvent::ConfirmationObserved(outcome.clone()))?;
                    Some(outcome)
                }
                Err(RelayError::Cancelled) => {
                    info!(
                        "Session {}: stopped waiting for {}",
                        session.id(),
                        handle.signature
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        Ok(RelayReceipt {
            session_id: session.id().to_string(),
            submission: handle,
            fee_quote: final_tx.fee_quote,
            outcome,
            state: session.state().clone(),
        })
    }

    /// Negotiates the fee, moving the session through each completed step.
    async fn negotiate(
        &self,
        session: &mut RelaySession,
        request: &NegotiationRequest,
        cancel: &CancellationToken,
    ) -> Result<NegotiatedTransaction, RelayError> {
        let negotiator = self.negotiator();
        let negotiated = cancellable(
            cancel,
            negotiator.negotiate(request, |step| {
                let event = match step {
                    NegotiationStep::Round1Quoted(quote) => {
                        info!(
                            "Session {}: round 1 estimate {} {}",
                            session.id(),
                            quote.fee_amount,
                            quote.fee_token
                        );
                        RelayEvent::Round1Quoted
                    }
                    NegotiationStep::Rebuilt => RelayEvent::Rebuilt,
                    NegotiationStep::Restarting { attempt, reason } => {
                        warn!(
                            "Session {}: restarting negotiation as attempt {} after: {}",
                            session.id(),
                            attempt,
                            reason
                        );
                        RelayEvent::Restart
                    }
                };
                session.apply(event).map(|_| ())
            }),
        )
        .await?;
        info!(
            "Session {}: round 2 fee {} {}",
            session.id(),
            negotiated.quote.fee_amount,
            negotiated.quote.fee_token
        );
        Ok(negotiated)
    }
}
