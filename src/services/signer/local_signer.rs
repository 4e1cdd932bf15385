use std::path::Path;

use async_trait::async_trait;
use log::debug;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::{SeedDerivable, Signer as SolanaSigner},
    transaction::Transaction,
};

use crate::{
    models::SignerError,
    utils::{message_section, write_signature_slot},
};

use super::WalletSigner;

/// Wallet backed by an in-process keypair.
pub struct LocalWalletSigner {
    keypair: Keypair,
}

impl LocalWalletSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_seed(seed: &[u8]) -> Result<Self, SignerError> {
        let keypair = Keypair::from_seed(seed)
            .map_err(|e| SignerError::KeyError(format!("Failed to create signer: {}", e)))?;
        Ok(Self::new(keypair))
    }

    /// Loads a JSON keypair file as written by `solana-keygen`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SignerError> {
        let path = path.as_ref();
        let keypair = read_keypair_file(path).map_err(|e| {
            SignerError::Unavailable(format!(
                "Failed to read keypair file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(keypair))
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    fn pubkey(&self) -> Result<Pubkey, SignerError> {
        Ok(self.keypair.pubkey())
    }

    async fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, SignerError> {
        let transaction: Transaction = bincode::deserialize(wire)
            .map_err(|e| SignerError::InvalidTransaction(e.to_string()))?;
        let pubkey = self.keypair.pubkey();
        let required = transaction.message.header.num_required_signatures as usize;
        let index = transaction
            .message
            .account_keys
            .iter()
            .take(required)
            .position(|key| *key == pubkey)
            .ok_or_else(|| {
                SignerError::InvalidTransaction(format!(
                    "{} is not a required signer",
                    pubkey
                ))
            })?;

        let message = message_section(wire)
            .map_err(|e| SignerError::InvalidTransaction(e.to_string()))?;
        let signature = self.keypair.sign_message(message);

        let mut signed = wire.to_vec();
        write_signature_slot(&mut signed, index, signature.as_ref())
            .map_err(|e| SignerError::SigningError(e.to_string()))?;
        debug!("Wallet {} signed slot {}", pubkey, index);
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, message::Message, signature::Signature};
    use solana_system_interface::instruction as system_instruction;
    use std::io::Write;

    fn valid_seed() -> Vec<u8> {
        vec![1u8; 32]
    }

    fn unsigned_wire(fee_payer: &Pubkey, sender: &Pubkey) -> Vec<u8> {
        let ix = system_instruction::transfer(sender, &Pubkey::new_unique(), 10);
        let message = Message::new_with_blockhash(&[ix], Some(fee_payer), &Hash::new_unique());
        bincode::serialize(&Transaction::new_unsigned(message)).unwrap()
    }

    #[test]
    fn test_from_seed() {
        let signer = LocalWalletSigner::from_seed(&valid_seed()).unwrap();
        assert_ne!(signer.pubkey().unwrap().to_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_from_seed_invalid() {
        let result = LocalWalletSigner::from_seed(&[1u8; 10]);
        assert!(matches!(result, Err(SignerError::KeyError(_))));
    }

    #[test]
    fn test_from_file() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let bytes: Vec<u8> = keypair.to_bytes().to_vec();
        write!(file, "{}", serde_json::to_string(&bytes).unwrap()).unwrap();

        let signer = LocalWalletSigner::from_file(file.path()).unwrap();
        assert_eq!(signer.pubkey().unwrap(), keypair.pubkey());
    }

    #[test]
    fn test_from_missing_file() {
        let result = LocalWalletSigner::from_file("/nonexistent/wallet.json");
        assert!(matches!(result, Err(SignerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_sign_transaction_fills_only_own_slot() {
        let signer = LocalWalletSigner::from_seed(&valid_seed()).unwrap();
        let sender = signer.pubkey().unwrap();
        let wire = unsigned_wire(&Pubkey::new_unique(), &sender);

        let signed = signer.sign_transaction(&wire).await.unwrap();
        assert_eq!(signed.len(), wire.len());
        assert_eq!(&signed[..65], &wire[..65]);
        assert_eq!(&signed[129..], &wire[129..]);

        let tx: Transaction = bincode::deserialize(&signed).unwrap();
        assert_eq!(tx.signatures[0], Signature::default());
        assert!(tx.signatures[1].verify(sender.as_ref(), &tx.message_data()));
    }

    #[tokio::test]
    async fn test_sign_transaction_not_a_signer() {
        let signer = LocalWalletSigner::from_seed(&valid_seed()).unwrap();
        let wire = unsigned_wire(&Pubkey::new_unique(), &Pubkey::new_unique());

        let result = signer.sign_transaction(&wire).await;
        assert!(matches!(result, Err(SignerError::InvalidTransaction(_))));
    }

    #[tokio::test]
    async fn test_sign_transaction_garbage() {
        let signer = LocalWalletSigner::from_seed(&valid_seed()).unwrap();
        let result = signer.sign_transaction(&[0xff, 0x01]).await;
        assert!(matches!(result, Err(SignerError::InvalidTransaction(_))));
    }
}
