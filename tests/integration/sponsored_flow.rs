//! End-to-end sponsored sends against a mocked Relayer Service and an
//! in-memory ledger.
//!
//! The relayer is served by wiremock. Its `/sign` endpoint co-signs the
//! fee-payer slot with a real keypair, and the ledger verifies every
//! signature before accepting a transaction.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::{keypair::keypair_from_seed, Signer},
    transaction::Transaction,
};
use sponsored_relay::{
    domain::{
        AccountResolver, ComputeBudget, NegotiationPolicy, RelayEngineConfig, RelayState,
        SponsoredRelayEngine, SponsoredSend,
    },
    models::{
        CommitmentLevel, ConfirmOptions, ConfirmationOutcome, EncodedSerializedTransaction,
        FreshnessToken, LedgerSignatureStatus, PaymentInstructionRequest, RelayError,
        SerializedInstruction, SignTransactionRequest, SignTransactionResponse,
        SponsoredTransaction,
    },
    services::{
        HttpRelayerClient, LocalWalletSigner, RetryConfig, SolanaProviderError, SolanaProviderTrait,
    },
    utils::{message_section, write_signature_slot},
};
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

const DECIMALS: u8 = 6;
const ROUND_1_FEE: u64 = 50_000;
const ROUND_2_FEE: u64 = 70_000;

/// Accepts transactions whose signatures all verify and reports them as
/// confirmed once submitted.
struct FakeLedger {
    freshness: FreshnessToken,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl FakeLedger {
    fn new() -> Self {
        Self {
            freshness: FreshnessToken::new(Hash::new_unique(), 1_000),
            submitted: Mutex::new(Vec::new()),
        }
    }

    fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SolanaProviderTrait for FakeLedger {
    async fn get_account(&self, _pubkey: &Pubkey) -> Result<Option<Account>, SolanaProviderError> {
        Ok(None)
    }

    async fn get_latest_blockhash_with_height(
        &self,
    ) -> Result<FreshnessToken, SolanaProviderError> {
        Ok(self.freshness)
    }

    async fn get_block_height(&self) -> Result<u64, SolanaProviderError> {
        Ok(900)
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, SolanaProviderError> {
        let transaction: Transaction = bincode::deserialize(wire)
            .map_err(|e| SolanaProviderError::TransactionRejected(e.to_string()))?;
        transaction
            .verify()
            .map_err(|e| SolanaProviderError::TransactionRejected(e.to_string()))?;
        self.submitted.lock().unwrap().push(wire.to_vec());
        Ok(transaction.signatures[0])
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<LedgerSignatureStatus>, SolanaProviderError> {
        let landed = self.submitted().iter().any(|wire| {
            bincode::deserialize::<Transaction>(wire)
                .map(|transaction| transaction.signatures[0] == *signature)
                .unwrap_or(false)
        });
        Ok(landed.then_some(LedgerSignatureStatus {
            slot: 42,
            commitment: CommitmentLevel::Confirmed,
            err: None,
        }))
    }
}

/// `POST /sign`: fills the fee-payer slot, optionally tampering with the
/// message afterwards.
struct CoSigner {
    fee_payer: Keypair,
    tamper: bool,
}

impl Respond for CoSigner {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: SignTransactionRequest = request.body_json().unwrap();
        let mut wire = body.transaction.to_bytes().unwrap();
        let transaction = SponsoredTransaction::from_wire(wire.clone()).unwrap();
        let index = transaction
            .find_signer_index(&self.fee_payer.pubkey())
            .unwrap();
        let signature = self
            .fee_payer
            .sign_message(message_section(&wire).unwrap());
        write_signature_slot(&mut wire, index, signature.as_ref()).unwrap();
        if self.tamper {
            let last = wire.len() - 1;
            wire[last] ^= 0xff;
        }
        ResponseTemplate::new(200).set_body_json(SignTransactionResponse {
            signed_transaction: EncodedSerializedTransaction::from_bytes(&wire),
        })
    }
}

struct Scenario {
    server: MockServer,
    ledger: Arc<FakeLedger>,
    initiator: Keypair,
    fee_payer: Keypair,
    fee_mint: Pubkey,
    business_mint: Pubkey,
    recipient: Pubkey,
}

impl Scenario {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            ledger: Arc::new(FakeLedger::new()),
            initiator: keypair_from_seed(&[7u8; 32]).unwrap(),
            fee_payer: keypair_from_seed(&[9u8; 32]).unwrap(),
            fee_mint: Pubkey::new_unique(),
            business_mint: Pubkey::new_unique(),
            recipient: Pubkey::new_unique(),
        }
    }

    fn transfer(&self, mint: &Pubkey, owner: &Pubkey, to: &Pubkey, amount: u64) -> Instruction {
        let program_id = spl_token::id();
        AccountResolver::create_transfer_checked_instruction(
            &program_id,
            &AccountResolver::holding_account(owner, mint, &program_id),
            mint,
            &AccountResolver::holding_account(to, mint, &program_id),
            owner,
            amount,
            DECIMALS,
        )
        .unwrap()
    }

    fn payment(&self, amount: u64) -> Instruction {
        self.transfer(
            &self.fee_mint,
            &self.initiator.pubkey(),
            &self.fee_payer.pubkey(),
            amount,
        )
    }

    fn send(&self) -> SponsoredSend {
        SponsoredSend {
            initiator: self.initiator.pubkey(),
            fee_token: self.fee_mint.to_string(),
            instructions: vec![self.transfer(
                &self.business_mint,
                &self.initiator.pubkey(),
                &self.recipient,
                1_000_000,
            )],
        }
    }

    async fn mount_config(&self) {
        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "feePayer": self.fee_payer.pubkey().to_string(),
                "acceptedFeeTokens": [self.fee_mint.to_string()]
            })))
            .mount(&self.server)
            .await;
    }

    /// Round 1 is quoted at `ROUND_1_FEE`, every later quote at `ROUND_2_FEE`.
    async fn mount_quotes(&self) {
        Mock::given(method("POST"))
            .and(path("/payment-instruction"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paymentInstruction": SerializedInstruction::from(&self.payment(ROUND_1_FEE)),
                "feeAmount": ROUND_1_FEE.to_string()
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/payment-instruction"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paymentInstruction": SerializedInstruction::from(&self.payment(ROUND_2_FEE)),
                "feeAmount": ROUND_2_FEE
            })))
            .mount(&self.server)
            .await;
    }

    async fn mount_sign(&self, tamper: bool) {
        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(CoSigner {
                fee_payer: keypair_from_seed(&[9u8; 32]).unwrap(),
                tamper,
            })
            .mount(&self.server)
            .await;
    }

    fn engine(&self) -> SponsoredRelayEngine<FakeLedger, HttpRelayerClient, LocalWalletSigner> {
        let relayer = HttpRelayerClient::new(&self.server.uri(), Duration::from_secs(5)).unwrap();
        let wallet = LocalWalletSigner::new(keypair_from_seed(&[7u8; 32]).unwrap());
        let config = RelayEngineConfig {
            compute_budget: ComputeBudget::new(200_000, 0),
            negotiation: NegotiationPolicy {
                retry: RetryConfig::no_retry(),
                ..NegotiationPolicy::default()
            },
            confirm: ConfirmOptions {
                commitment: CommitmentLevel::Confirmed,
                timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(10),
            },
        };
        SponsoredRelayEngine::new(
            self.ledger.clone(),
            Arc::new(relayer),
            Arc::new(wallet),
            config,
        )
    }

    async fn quoted_transactions(&self) -> Vec<SponsoredTransaction> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == "/payment-instruction")
            .map(|request| {
                let body: PaymentInstructionRequest = request.body_json().unwrap();
                SponsoredTransaction::from_encoded(&body.transaction).unwrap()
            })
            .collect()
    }

    async fn sign_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == "/sign")
            .count()
    }
}

fn carries_instruction(transaction: &Transaction, instruction: &Instruction) -> bool {
    transaction
        .message
        .instructions
        .iter()
        .any(|compiled| compiled.data == instruction.data)
}

#[tokio::test]
async fn test_sponsored_send_pays_round_two_fee_and_confirms() {
    let scenario = Scenario::start().await;
    scenario.mount_config().await;
    scenario.mount_quotes().await;
    scenario.mount_sign(false).await;

    let receipt = scenario
        .engine()
        .send_and_confirm(scenario.send(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        receipt.outcome,
        Some(ConfirmationOutcome::Confirmed { slot: Some(42) })
    );
    assert_eq!(receipt.state, RelayState::Confirmed);
    assert_eq!(receipt.fee_quote.fee_amount, ROUND_2_FEE);

    // Round 1 quotes budget + business, Round 2 adds the Round 1 payment.
    let quoted = scenario.quoted_transactions().await;
    assert_eq!(quoted.len(), 2);
    assert_eq!(quoted[0].instruction_count(), 2);
    assert_eq!(quoted[1].instruction_count(), 3);
    assert!(carries_instruction(
        quoted[1].transaction(),
        &scenario.payment(ROUND_1_FEE)
    ));

    let submitted = scenario.ledger.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0], receipt.submission.wire);
    let landed: Transaction = bincode::deserialize(&submitted[0]).unwrap();
    assert_eq!(landed.message.instructions.len(), 3);
    assert_eq!(landed.message.account_keys[0], scenario.fee_payer.pubkey());
    assert!(carries_instruction(&landed, &scenario.payment(ROUND_2_FEE)));
    assert!(!carries_instruction(&landed, &scenario.payment(ROUND_1_FEE)));
    assert_eq!(landed.signatures[0], receipt.submission.signature);
}

#[tokio::test]
async fn test_send_without_confirmation_returns_after_submission() {
    let scenario = Scenario::start().await;
    scenario.mount_config().await;
    scenario.mount_quotes().await;
    scenario.mount_sign(false).await;

    let receipt = scenario
        .engine()
        .send(scenario.send(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(receipt.outcome, None);
    assert_eq!(receipt.state, RelayState::Confirming);
    assert_eq!(scenario.ledger.submitted().len(), 1);
}

#[tokio::test]
async fn test_tampered_co_signature_is_never_submitted() {
    let scenario = Scenario::start().await;
    scenario.mount_config().await;
    scenario.mount_quotes().await;
    scenario.mount_sign(true).await;

    let result = scenario
        .engine()
        .send_and_confirm(scenario.send(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(RelayError::CoSign(_))));
    assert!(scenario.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_unaccepted_fee_token_stops_before_quoting() {
    let scenario = Scenario::start().await;
    scenario.mount_config().await;
    scenario.mount_quotes().await;
    scenario.mount_sign(false).await;

    let mut send = scenario.send();
    send.fee_token = Pubkey::new_unique().to_string();
    let result = scenario
        .engine()
        .send(send, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(RelayError::Configuration(_))));
    assert!(scenario.quoted_transactions().await.is_empty());
    assert_eq!(scenario.sign_requests().await, 0);
}

#[tokio::test]
async fn test_relayer_quote_error_aborts_session() {
    let scenario = Scenario::start().await;
    scenario.mount_config().await;
    Mock::given(method("POST"))
        .and(path("/payment-instruction"))
        .respond_with(ResponseTemplate::new(400).set_body_string("insufficient liquidity"))
        .mount(&scenario.server)
        .await;

    let result = scenario
        .engine()
        .send(scenario.send(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(RelayError::Quote(_))));
    assert_eq!(scenario.sign_requests().await, 0);
    assert!(scenario.ledger.submitted().is_empty());
}
