//! Fee Negotiator.
//!
//! Runs the two-round quote protocol against the Relayer Service:
//!
//! 1. Round 1 quotes the assembled transaction without a payment instruction.
//! 2. The transaction is rebuilt with a fresh freshness token and the Round 1
//!    payment instruction appended.
//! 3. Round 2 quotes the rebuilt transaction. Its payment instruction replaces
//!    the Round 1 one; the Round 1 quote is discarded.
//!
//! Adding the payment instruction changes the size and compute cost of the
//! transaction, so only a quote computed over a transaction that already
//! carries a payment instruction is binding.
use std::{fmt, str::FromStr, sync::Arc};

use log::{debug, info, warn};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    constants::DEFAULT_NEGOTIATION_MAX_ATTEMPTS,
    domain::relay::{AccountResolver, ProvisionalTransaction, TransactionAssembler},
    models::{FeeQuote, FreshnessToken, NegotiationRound, PaymentInstructionRequest, RelayError},
    services::{
        retry_with_backoff, RelayerClientError, RelayerServiceTrait, RetryConfig,
        SolanaProviderTrait,
    },
};

/// Where freshness tokens come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FreshnessSource {
    /// `getLatestBlockhash` on the ledger RPC.
    #[default]
    Ledger,
    /// The relayer's `GET /blockhash`.
    Relayer,
}

impl FromStr for FreshnessSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ledger" => Ok(FreshnessSource::Ledger),
            "relayer" => Ok(FreshnessSource::Relayer),
            other => Err(format!("unknown freshness source '{}'", other)),
        }
    }
}

impl fmt::Display for FreshnessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreshnessSource::Ledger => write!(f, "ledger"),
            FreshnessSource::Relayer => write!(f, "relayer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationPolicy {
    /// Transport retries for each relayer call made during negotiation.
    pub retry: RetryConfig,
    /// Total negotiation attempts; malformed quotes restart from Round 1.
    pub max_attempts: u8,
    /// Quotes above this amount (fee token base units) are refused.
    pub max_fee_amount: Option<u64>,
    pub freshness_source: FreshnessSource,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            max_attempts: DEFAULT_NEGOTIATION_MAX_ATTEMPTS,
            max_fee_amount: None,
            freshness_source: FreshnessSource::default(),
        }
    }
}

/// Inputs of one negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationRequest {
    pub initiator: Pubkey,
    pub fee_payer: Pubkey,
    pub fee_token: String,
    pub instructions: Vec<Instruction>,
}

/// Output of Round 1. The quote is a proposal only.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateOutcome {
    pub provisional: ProvisionalTransaction,
    pub quote: FeeQuote,
}

/// Output of the rebuild step: the transaction Round 2 is computed over.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildOutcome {
    pub provisional: ProvisionalTransaction,
    pub freshness: FreshnessToken,
    pub estimate_fee_token: String,
}

/// Progress reported by [`FeeNegotiator::negotiate`] between relayer calls.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationStep {
    /// Round 1 returned a proposal.
    Round1Quoted(FeeQuote),
    /// The payment-bearing transaction for Round 2 is built.
    Rebuilt,
    /// A malformed quote discarded the attempt; `attempt` is the one starting.
    Restarting { attempt: u8, reason: String },
}

/// The negotiated transaction carrying the Round 2 payment instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedTransaction {
    pub provisional: ProvisionalTransaction,
    pub quote: FeeQuote,
    pub freshness: FreshnessToken,
    pub business_instruction_count: usize,
}

impl NegotiatedTransaction {
    /// Instruction count the signed transaction must keep.
    pub fn instruction_count(&self) -> usize {
        self.provisional.transaction.instruction_count()
    }
}

pub struct FeeNegotiator<P, R>
where
    P: SolanaProviderTrait + ?Sized,
    R: RelayerServiceTrait + ?Sized,
{
    provider: Arc<P>,
    relayer: Arc<R>,
    assembler: TransactionAssembler,
    policy: NegotiationPolicy,
}

impl<P, R> FeeNegotiator<P, R>
where
    P: SolanaProviderTrait + ?Sized,
    R: RelayerServiceTrait + ?Sized,
{
    pub fn new(
        provider: Arc<P>,
        relayer: Arc<R>,
        assembler: TransactionAssembler,
        policy: NegotiationPolicy,
    ) -> Self {
        Self {
            provider,
            relayer,
            assembler,
            policy,
        }
    }

    pub fn policy(&self) -> &NegotiationPolicy {
        &self.policy
    }

    /// Fetches a freshness token from the configured source.
    pub async fn fetch_freshness(&self) -> Result<FreshnessToken, RelayError> {
        let token = match self.policy.freshness_source {
            FreshnessSource::Ledger => self.provider.get_latest_blockhash_with_height().await?,
            FreshnessSource::Relayer => {
                let relayer = self.relayer.as_ref();
                let response = retry_with_backoff(
                    "blockhash",
                    RelayerClientError::is_retriable,
                    || relayer.get_blockhash(),
                    &self.policy.retry,
                )
                .await?;
                FreshnessToken::try_from(&response)?
            }
        };
        debug!(
            "Fetched freshness token {} valid until block height {}",
            token.blockhash, token.last_valid_block_height
        );
        Ok(token)
    }

    /// Round 1: quote the transaction without a payment instruction.
    pub async fn estimate(
        &self,
        request: &NegotiationRequest,
    ) -> Result<EstimateOutcome, RelayError> {
        if request.fee_payer == request.initiator {
            return Err(RelayError::Configuration(
                "fee payer must not be the initiator".to_string(),
            ));
        }
        let freshness = self.fetch_freshness().await?;
        let provisional =
            self.assembler
                .assemble(&request.instructions, &request.fee_payer, &freshness)?;
        let quote = self
            .request_quote(NegotiationRound::Estimate, &provisional, request)
            .await?;
        if quote.fee_token != request.fee_token {
            return Err(RelayError::MalformedQuote(format!(
                "round 1 quoted in {} but {} was requested",
                quote.fee_token, request.fee_token
            )));
        }
        Ok(EstimateOutcome { provisional, quote })
    }

    /// Rebuild with a fresh freshness token and the Round 1 payment instruction appended.
    pub async fn rebuild(
        &self,
        request: &NegotiationRequest,
        estimate: EstimateOutcome,
    ) -> Result<RebuildOutcome, RelayError> {
        let freshness = self.fetch_freshness().await?;
        let mut instructions = request.instructions.clone();
        instructions.push(estimate.quote.payment_instruction);

        let provisional = self
            .assembler
            .assemble(&instructions, &request.fee_payer, &freshness)?;
        self.ensure_payment_included(&provisional, request)?;

        Ok(RebuildOutcome {
            provisional,
            freshness,
            estimate_fee_token: estimate.quote.fee_token,
        })
    }

    /// Round 2: quote the rebuilt transaction and substitute its payment instruction.
    ///
    /// The substituted transaction reuses the rebuild's freshness token, so the
    /// only difference from the quoted bytes is the payment instruction itself.
    pub async fn final_quote(
        &self,
        request: &NegotiationRequest,
        rebuilt: RebuildOutcome,
    ) -> Result<NegotiatedTransaction, RelayError> {
        let quote = self
            .request_quote(NegotiationRound::Final, &rebuilt.provisional, request)
            .await?;
        if quote.fee_token != rebuilt.estimate_fee_token {
            return Err(RelayError::MalformedQuote(format!(
                "fee token changed between rounds: {} -> {}",
                rebuilt.estimate_fee_token, quote.fee_token
            )));
        }

        let mut instructions = request.instructions.clone();
        instructions.push(quote.payment_instruction.clone());
        let provisional =
            self.assembler
                .assemble(&instructions, &request.fee_payer, &rebuilt.freshness)?;
        let business_instruction_count = self.ensure_payment_included(&provisional, request)?;

        info!(
            "Negotiated fee of {} {} ({} instructions)",
            quote.fee_amount,
            quote.fee_token,
            provisional.transaction.instruction_count()
        );

        Ok(NegotiatedTransaction {
            provisional,
            quote,
            freshness: rebuilt.freshness,
            business_instruction_count,
        })
    }

    /// Runs Round 1, rebuild and Round 2, restarting from Round 1 on malformed
    /// quotes up to the configured number of attempts.
    ///
    /// `on_step` sees every step as it completes; an error from it ends the
    /// negotiation with that error.
    pub async fn negotiate<F>(
        &self,
        request: &NegotiationRequest,
        mut on_step: F,
    ) -> Result<NegotiatedTransaction, RelayError>
    where
        F: FnMut(NegotiationStep) -> Result<(), RelayError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.negotiate_once(request, &mut on_step).await {
                Err(RelayError::MalformedQuote(reason)) if attempt < max_attempts => {
                    warn!(
                        "Malformed quote on attempt {}/{}: {}. Restarting from round 1",
                        attempt, max_attempts, reason
                    );
                    attempt += 1;
                    on_step(NegotiationStep::Restarting { attempt, reason })?;
                }
                other => return other,
            }
        }
    }

    async fn negotiate_once<F>(
        &self,
        request: &NegotiationRequest,
        on_step: &mut F,
    ) -> Result<NegotiatedTransaction, RelayError>
    where
        F: FnMut(NegotiationStep) -> Result<(), RelayError>,
    {
        let estimate = self.estimate(request).await?;
        on_step(NegotiationStep::Round1Quoted(estimate.quote.clone()))?;
        let rebuilt = self.rebuild(request, estimate).await?;
        on_step(NegotiationStep::Rebuilt)?;
        self.final_quote(request, rebuilt).await
    }

    async fn request_quote(
        &self,
        round: NegotiationRound,
        provisional: &ProvisionalTransaction,
        request: &NegotiationRequest,
    ) -> Result<FeeQuote, RelayError> {
        let body = PaymentInstructionRequest {
            transaction: provisional.transaction.encode(),
            fee_token: request.fee_token.clone(),
            source_account: request.initiator.to_string(),
        };
        let relayer = self.relayer.as_ref();
        let body_ref = &body;
        let response = retry_with_backoff(
            "payment-instruction",
            RelayerClientError::is_retriable,
            move || relayer.get_payment_instruction(body_ref),
            &self.policy.retry,
        )
        .await?;

        let payment_instruction = Instruction::try_from(&response.payment_instruction)?;
        self.validate_payment_instruction(&payment_instruction, response.fee_amount, request)?;

        if let Some(max_fee) = self.policy.max_fee_amount {
            if response.fee_amount > max_fee {
                return Err(RelayError::Quote(format!(
                    "{} quoted fee {} exceeds ceiling {}",
                    round, response.fee_amount, max_fee
                )));
            }
        }

        let fee_token = response
            .fee_token
            .unwrap_or_else(|| request.fee_token.clone());
        info!(
            "Relayer quoted {} {} in {}",
            response.fee_amount, fee_token, round
        );
        Ok(FeeQuote::new(
            round,
            payment_instruction,
            response.fee_amount,
            fee_token,
        ))
    }

    /// A payment instruction may only require signatures the transaction
    /// already has, and a token transfer must move exactly the quoted amount
    /// under the initiator's authority.
    fn validate_payment_instruction(
        &self,
        instruction: &Instruction,
        fee_amount: u64,
        request: &NegotiationRequest,
    ) -> Result<(), RelayError> {
        if let Some(meta) = instruction.accounts.iter().find(|meta| {
            meta.is_signer && meta.pubkey != request.initiator && meta.pubkey != request.fee_payer
        }) {
            return Err(RelayError::MalformedQuote(format!(
                "payment instruction requires unexpected signer {}",
                meta.pubkey
            )));
        }

        if let Some(transfer) = AccountResolver::decode_transfer(instruction)? {
            if transfer.amount != fee_amount {
                return Err(RelayError::MalformedQuote(format!(
                    "payment instruction transfers {} but fee amount is {}",
                    transfer.amount, fee_amount
                )));
            }
            if transfer.authority != request.initiator {
                return Err(RelayError::MalformedQuote(format!(
                    "payment instruction authority {} is not the initiator",
                    transfer.authority
                )));
            }
        }
        Ok(())
    }

    /// Checks the payment instruction survived assembly as its own
    /// instruction and returns the number of business instructions before it.
    ///
    /// Caller compute budget instructions are folded into the prefix, so the
    /// business count comes from the planned body, not the raw request.
    fn ensure_payment_included(
        &self,
        provisional: &ProvisionalTransaction,
        request: &NegotiationRequest,
    ) -> Result<usize, RelayError> {
        let (planned, prefix_len) = self.assembler.plan(&request.instructions);
        let business_instruction_count = planned.len() - prefix_len;
        let expected = provisional.budget_prefix_len + business_instruction_count + 1;
        let actual = provisional.transaction.instruction_count();
        if actual < expected {
            return Err(RelayError::MalformedQuote(format!(
                "expected at least {} instructions including payment, found {}",
                expected, actual
            )));
        }
        Ok(business_instruction_count)
    }
}
