//! Signature Assembler.
//!
//! The relayer co-signs first. Its returned bytes become the base of the
//! final transaction: the wallet signs those exact bytes, and the initiator's
//! signature is written into its slot without re-serializing anything, so the
//! relayer's signature stays valid.
use std::sync::Arc;

use log::{debug, info};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::{
    domain::relay::NegotiatedTransaction,
    models::{FinalTransaction, RelayError, SignTransactionRequest, SponsoredTransaction},
    services::{RelayerServiceTrait, WalletSigner},
    utils::{
        is_placeholder_signature, message_section, read_signature_slot, write_signature_slot,
        SIGNATURE_LENGTH,
    },
};

/// Signature slot of `account`, or `SignerNotFound` when it is not a required signer.
pub fn locate_signer(
    transaction: &SponsoredTransaction,
    account: &Pubkey,
) -> Result<usize, RelayError> {
    transaction
        .find_signer_index(account)
        .ok_or_else(|| RelayError::SignerNotFound(account.to_string()))
}

/// Checks length and placeholder value of a raw signature.
pub fn validate_signature(bytes: &[u8]) -> Result<Signature, RelayError> {
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(RelayError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            bytes.len()
        )));
    }
    if is_placeholder_signature(bytes) {
        return Err(RelayError::InvalidSignature(
            "signature is the all-zero placeholder".to_string(),
        ));
    }
    Signature::try_from(bytes).map_err(|e| RelayError::InvalidSignature(e.to_string()))
}

/// Writes `signature` into slot `index` of `base` and re-parses the result.
///
/// Every byte outside the slot is preserved. The re-parsed transaction must
/// keep `base`'s instructions byte for byte.
pub fn inject_signature(
    base: &SponsoredTransaction,
    index: usize,
    signature: &Signature,
) -> Result<SponsoredTransaction, RelayError> {
    let mut wire = base.wire().to_vec();
    write_signature_slot(&mut wire, index, signature.as_ref())?;
    let injected = SponsoredTransaction::from_wire(wire)
        .map_err(|e| RelayError::Reconstruction(format!("re-parse failed: {}", e)))?;

    if injected.instruction_count() != base.instruction_count() {
        return Err(RelayError::Reconstruction(format!(
            "instruction count changed from {} to {}",
            base.instruction_count(),
            injected.instruction_count()
        )));
    }
    if injected.compiled_instructions() != base.compiled_instructions()
        || injected.message_bytes()? != base.message_bytes()?
    {
        return Err(RelayError::Reconstruction(
            "instruction bytes changed during signature injection".to_string(),
        ));
    }
    Ok(injected)
}

pub struct SignatureAssembler<R, W>
where
    R: RelayerServiceTrait + ?Sized,
    W: WalletSigner + ?Sized,
{
    relayer: Arc<R>,
    wallet: Arc<W>,
}

impl<R, W> SignatureAssembler<R, W>
where
    R: RelayerServiceTrait + ?Sized,
    W: WalletSigner + ?Sized,
{
    pub fn new(relayer: Arc<R>, wallet: Arc<W>) -> Self {
        Self { relayer, wallet }
    }

    /// Obtains the relayer's fee-payer signature over the negotiated transaction.
    ///
    /// The returned transaction is parsed from the relayer's bytes. It must
    /// carry the negotiated message unchanged and a valid fee payer signature.
    pub async fn co_sign(
        &self,
        negotiated: &NegotiatedTransaction,
    ) -> Result<SponsoredTransaction, RelayError> {
        let round2 = &negotiated.provisional.transaction;
        let fee_payer = *round2
            .fee_payer()
            .ok_or_else(|| RelayError::Internal("transaction has no fee payer".to_string()))?;

        let response = self
            .relayer
            .sign_transaction(&SignTransactionRequest {
                transaction: round2.encode(),
                signer_key: fee_payer.to_string(),
            })
            .await
            .map_err(|e| RelayError::CoSign(e.to_string()))?;

        let co_signed = SponsoredTransaction::from_encoded(&response.signed_transaction)
            .map_err(|e| RelayError::CoSign(format!("unreadable signed transaction: {}", e)))?;

        if co_signed.message_bytes()? != round2.message_bytes()? {
            return Err(RelayError::CoSign(
                "relayer altered the transaction message".to_string(),
            ));
        }

        let fee_payer_index = locate_signer(&co_signed, &fee_payer)?;
        let fee_payer_signature = co_signed
            .signature(fee_payer_index)
            .ok_or_else(|| RelayError::CoSign("fee payer slot missing".to_string()))?;
        if is_placeholder_signature(fee_payer_signature.as_ref())
            || !fee_payer_signature.verify(fee_payer.as_ref(), co_signed.message_bytes()?)
        {
            return Err(RelayError::CoSign(format!(
                "invalid fee payer signature from {}",
                fee_payer
            )));
        }

        debug!("Relayer {} co-signed slot {}", fee_payer, fee_payer_index);
        Ok(co_signed)
    }

    /// Obtains the initiator's signature over `co_signed` and injects it.
    pub async fn sign(
        &self,
        negotiated: &NegotiatedTransaction,
        co_signed: SponsoredTransaction,
        initiator: &Pubkey,
    ) -> Result<FinalTransaction, RelayError> {
        let index = locate_signer(&co_signed, initiator)?;
        let wallet_key = self.wallet.pubkey()?;
        if &wallet_key != initiator {
            return Err(RelayError::SignerUnavailable(format!(
                "connected wallet {} is not the initiator {}",
                wallet_key, initiator
            )));
        }

        let signed_by_wallet = self.wallet.sign_transaction(co_signed.wire()).await?;

        let wallet_message = message_section(&signed_by_wallet)
            .map_err(|e| RelayError::InvalidSignature(format!("unreadable wallet output: {}", e)))?;
        if wallet_message != co_signed.message_bytes()? {
            return Err(RelayError::InvalidSignature(
                "wallet altered the transaction message".to_string(),
            ));
        }

        let slot = read_signature_slot(&signed_by_wallet, index)
            .map_err(|e| RelayError::InvalidSignature(e.to_string()))?;
        let signature = validate_signature(slot)?;
        if !signature.verify(initiator.as_ref(), co_signed.message_bytes()?) {
            return Err(RelayError::InvalidSignature(format!(
                "signature does not verify for {}",
                initiator
            )));
        }

        let transaction = inject_signature(&co_signed, index, &signature)?;
        if transaction.instruction_count() != negotiated.instruction_count()
            || transaction.compiled_instructions()
                != negotiated.provisional.transaction.compiled_instructions()
        {
            return Err(RelayError::Reconstruction(format!(
                "final transaction has {} instructions, negotiated {}",
                transaction.instruction_count(),
                negotiated.instruction_count()
            )));
        }

        info!(
            "Assembled final transaction {} ({} bytes)",
            signature,
            transaction.wire().len()
        );

        Ok(FinalTransaction {
            transaction,
            freshness: negotiated.freshness,
            fee_quote: negotiated.quote.clone(),
            initiator_index: index,
        })
    }

    /// Co-sign with the relayer, then sign with the wallet.
    pub async fn assemble(
        &self,
        negotiated: &NegotiatedTransaction,
        initiator: &Pubkey,
    ) -> Result<FinalTransaction, RelayError> {
        if !negotiated.quote.is_final() {
            return Err(RelayError::Internal(format!(
                "refusing to sign over a {} quote",
                negotiated.quote.round
            )));
        }
        locate_signer(&negotiated.provisional.transaction, initiator)?;
        let co_signed = self.co_sign(negotiated).await?;
        self.sign(negotiated, co_signed, initiator).await
    }
}
