//! Byte-level helpers for the legacy Solana wire transaction layout.
//!
//! A serialized transaction is laid out as:
//!
//! ```text
//! [compact-u16 signature count][signature 0 (64 bytes)]...[signature n-1][message bytes]
//! ```
//!
//! These helpers locate signature slots and the message section directly in the
//! bytes, so a signature can be written into a transaction that another party
//! already signed without re-serializing it.
use thiserror::Error;

/// Length of an ed25519 signature slot.
pub const SIGNATURE_LENGTH: usize = 64;

/// Longest legal compact-u16 encoding.
const MAX_SHORT_VEC_BYTES: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WireError {
    #[error("Truncated transaction bytes: {0}")]
    Truncated(String),
    #[error("Invalid compact length prefix: {0}")]
    InvalidLengthPrefix(String),
    #[error("Signature slot {index} out of range ({count} slots)")]
    SlotOutOfRange { index: usize, count: usize },
    #[error("Invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },
}

/// Decodes a compact-u16 ("short vec") length prefix.
///
/// Returns the decoded value and the number of bytes it occupied.
pub fn decode_short_vec_len(bytes: &[u8]) -> Result<(usize, usize), WireError> {
    let mut value: usize = 0;
    for (position, byte) in bytes.iter().take(MAX_SHORT_VEC_BYTES).enumerate() {
        value |= ((byte & 0x7f) as usize) << (position * 7);
        if byte & 0x80 == 0 {
            if value > u16::MAX as usize {
                return Err(WireError::InvalidLengthPrefix(format!(
                    "value {} exceeds u16",
                    value
                )));
            }
            return Ok((value, position + 1));
        }
    }
    if bytes.len() < MAX_SHORT_VEC_BYTES {
        Err(WireError::Truncated("length prefix".to_string()))
    } else {
        Err(WireError::InvalidLengthPrefix(
            "continuation bit set on final byte".to_string(),
        ))
    }
}

/// Position of the signature array inside a wire transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureLayout {
    /// Number of signature slots.
    pub count: usize,
    /// Size of the compact-u16 prefix preceding the slots.
    pub prefix_len: usize,
}

impl SignatureLayout {
    pub fn parse(wire: &[u8]) -> Result<Self, WireError> {
        let (count, prefix_len) = decode_short_vec_len(wire)?;
        let layout = Self { count, prefix_len };
        if wire.len() < layout.message_offset() {
            return Err(WireError::Truncated(format!(
                "{} signature slots need {} bytes, got {}",
                count,
                layout.message_offset(),
                wire.len()
            )));
        }
        Ok(layout)
    }

    /// Byte offset of the signature slot at `index`.
    pub fn slot_offset(&self, index: usize) -> Result<usize, WireError> {
        if index >= self.count {
            return Err(WireError::SlotOutOfRange {
                index,
                count: self.count,
            });
        }
        Ok(self.prefix_len + index * SIGNATURE_LENGTH)
    }

    pub fn message_offset(&self) -> usize {
        self.prefix_len + self.count * SIGNATURE_LENGTH
    }
}

/// Returns the message bytes (everything after the signature array).
pub fn message_section(wire: &[u8]) -> Result<&[u8], WireError> {
    let layout = SignatureLayout::parse(wire)?;
    Ok(&wire[layout.message_offset()..])
}

/// Returns the raw bytes of the signature slot at `index`.
pub fn read_signature_slot(wire: &[u8], index: usize) -> Result<&[u8], WireError> {
    let layout = SignatureLayout::parse(wire)?;
    let offset = layout.slot_offset(index)?;
    Ok(&wire[offset..offset + SIGNATURE_LENGTH])
}

/// Overwrites the signature slot at `index`, leaving every other byte untouched.
pub fn write_signature_slot(
    wire: &mut [u8],
    index: usize,
    signature: &[u8],
) -> Result<(), WireError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(WireError::InvalidSignatureLength {
            expected: SIGNATURE_LENGTH,
            actual: signature.len(),
        });
    }
    let layout = SignatureLayout::parse(wire)?;
    let offset = layout.slot_offset(index)?;
    wire[offset..offset + SIGNATURE_LENGTH].copy_from_slice(signature);
    Ok(())
}

/// True when the slot holds the all-zero placeholder.
pub fn is_placeholder_signature(signature: &[u8]) -> bool {
    signature.iter().all(|byte| *byte == 0)
}
