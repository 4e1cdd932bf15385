//! Property-based tests for signature injection.
//!
//! Injecting a signature must touch only the 64 bytes of its slot, whatever
//! the instructions, the slot or the signature bytes are.
use proptest::{prelude::*, test_runner::Config};
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use sponsored_relay::{
    domain::{inject_signature, validate_signature},
    models::{RelayError, SponsoredTransaction},
    utils::{SignatureLayout, SIGNATURE_LENGTH},
};

/// A two-signer transaction (fee payer, initiator) with unfilled slots.
fn unsigned_transaction(data: Vec<u8>, extra_accounts: usize) -> SponsoredTransaction {
    let fee_payer = Pubkey::new_from_array([1u8; 32]);
    let initiator = Pubkey::new_from_array([2u8; 32]);
    let mut accounts = vec![AccountMeta::new(initiator, true)];
    accounts.extend((0..extra_accounts).map(|i| {
        AccountMeta::new_readonly(Pubkey::new_from_array([10 + i as u8; 32]), false)
    }));
    let instruction = Instruction {
        program_id: Pubkey::new_from_array([3u8; 32]),
        accounts,
        data,
    };
    let mut message = Message::new(&[instruction], Some(&fee_payer));
    message.recent_blockhash = Hash::new_from_array([4u8; 32]);
    SponsoredTransaction::from_transaction(Transaction::new_unsigned(message)).unwrap()
}

fn non_placeholder_signature() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), SIGNATURE_LENGTH)
        .prop_filter("all-zero placeholder", |bytes| bytes.iter().any(|b| *b != 0))
}

proptest! {
  #![proptest_config(Config {
    cases: 256, ..Config::default()
  })]

  #[test]
  fn prop_inject_signature_changes_only_its_slot(
    data in prop::collection::vec(any::<u8>(), 0..200),
    extra_accounts in 0usize..6,
    index in 0usize..2,
    signature in non_placeholder_signature()
  ) {
      let base = unsigned_transaction(data, extra_accounts);
      let signature = validate_signature(&signature).unwrap();
      let injected = inject_signature(&base, index, &signature).unwrap();

      let offset = SignatureLayout::parse(base.wire()).unwrap().slot_offset(index).unwrap();
      let slot = offset..offset + SIGNATURE_LENGTH;
      prop_assert_eq!(injected.wire().len(), base.wire().len());
      prop_assert_eq!(&injected.wire()[..slot.start], &base.wire()[..slot.start]);
      prop_assert_eq!(&injected.wire()[slot.end..], &base.wire()[slot.end..]);
      prop_assert_eq!(&injected.wire()[slot], signature.as_ref());
      prop_assert_eq!(injected.signature(index), Some(&signature));
  }

  #[test]
  fn prop_inject_signature_out_of_range_slot_fails(
    index in 2usize..64,
    signature in non_placeholder_signature()
  ) {
      let base = unsigned_transaction(vec![1, 2, 3], 1);
      let signature = Signature::try_from(signature.as_slice()).unwrap();
      prop_assert!(inject_signature(&base, index, &signature).is_err());
  }

  #[test]
  fn prop_validate_signature_rejects_wrong_length(
    bytes in prop::collection::vec(any::<u8>(), 0..128)
        .prop_filter("exact length", |bytes| bytes.len() != SIGNATURE_LENGTH)
  ) {
      prop_assert!(matches!(
          validate_signature(&bytes),
          Err(RelayError::InvalidSignature(_))
      ));
  }
}
