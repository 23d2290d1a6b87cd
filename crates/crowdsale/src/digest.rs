//! Byte-exact message construction for the on-chain purchase verifier.
//!
//! The sale contract recomputes
//! `keccak256(abi.encodePacked(token, amountToPay, amountToReceive, expiresAt))`,
//! wraps it as an `eth_sign` personal message and recovers the signer, so
//! every byte here has to match the Solidity side.

use num_bigint::BigUint;
use tiny_keccak::{Hasher, Keccak};

use crate::address::Address;
use crate::error::AuthorizeError;

/// Length of the packed purchase message: one address and three uint256 words.
pub const PACKED_LEN: usize = 20 + 32 * 3;

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Keccak-256 as used by the EVM (not the NIST SHA3-256 padding).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// Zero-extend an unsigned integer into a big-endian uint256 word.
///
/// Returns `None` when the value does not fit in 256 bits.
pub fn uint256_word(value: &BigUint) -> Option<[u8; 32]> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Some(word)
}

/// The fields covered by an authorization signature.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseMessage<'a> {
    pub token: &'a Address,
    pub amount_to_pay: &'a BigUint,
    pub amount_to_receive: &'a BigUint,
    pub expires_at: u64,
}

impl PurchaseMessage<'_> {
    /// Tightly packed encoding: `address ‖ uint256 ‖ uint256 ‖ uint256`.
    pub fn encode_packed(&self) -> Result<[u8; PACKED_LEN], AuthorizeError> {
        let pay = uint256_word(self.amount_to_pay).ok_or_else(|| {
            AuthorizeError::InvalidAmount("amount to pay exceeds uint256".to_string())
        })?;
        let receive = uint256_word(self.amount_to_receive).ok_or_else(|| {
            AuthorizeError::InvalidAmount("amount to receive exceeds uint256".to_string())
        })?;
        let mut expires = [0u8; 32];
        expires[24..].copy_from_slice(&self.expires_at.to_be_bytes());

        let mut packed = [0u8; PACKED_LEN];
        packed[..20].copy_from_slice(self.token.as_bytes());
        packed[20..52].copy_from_slice(&pay);
        packed[52..84].copy_from_slice(&receive);
        packed[84..].copy_from_slice(&expires);
        Ok(packed)
    }

    /// Keccak-256 of the packed encoding.
    pub fn hash(&self) -> Result<[u8; 32], AuthorizeError> {
        Ok(keccak256(&self.encode_packed()?))
    }

    /// The digest that is actually signed: the message hash wrapped as a
    /// personal message.
    pub fn signing_hash(&self) -> Result<[u8; 32], AuthorizeError> {
        Ok(personal_message_hash(&self.hash()?))
    }
}

/// Hash a 32-byte digest under the `eth_sign` personal message prefix.
pub fn personal_message_hash(digest: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(PERSONAL_MESSAGE_PREFIX);
    hasher.update(digest);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{eip191_hash_message, U256};
    use alloy::sol_types::SolValue;

    fn token() -> Address {
        Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap()
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_uint256_word() {
        let word = uint256_word(&BigUint::from(1000u32)).unwrap();
        assert_eq!(word[30], 0x03);
        assert_eq!(word[31], 0xe8);
        assert!(word[..30].iter().all(|b| *b == 0));

        assert_eq!(uint256_word(&BigUint::from(0u8)), Some([0u8; 32]));

        let max = (BigUint::from(1u8) << 256u32) - 1u8;
        assert_eq!(uint256_word(&max), Some([0xff; 32]));
        assert_eq!(uint256_word(&(max + 1u8)), None);
    }

    #[test]
    fn test_packed_layout() {
        let token = token();
        let pay = BigUint::from(5u64) * BigUint::from(10u64).pow(18);
        let receive = BigUint::from(2_600_000u64);
        let msg = PurchaseMessage {
            token: &token,
            amount_to_pay: &pay,
            amount_to_receive: &receive,
            expires_at: 1_700_000_000,
        };

        let packed = msg.encode_packed().unwrap();
        assert_eq!(packed.len(), 116);
        assert_eq!(&packed[..20], token.as_bytes());
        assert_eq!(BigUint::from_bytes_be(&packed[20..52]), pay);
        assert_eq!(BigUint::from_bytes_be(&packed[52..84]), receive);
        assert_eq!(BigUint::from_bytes_be(&packed[84..]), BigUint::from(1_700_000_000u64));
    }

    #[test]
    fn test_matches_solidity_encode_packed() {
        let token = token();
        let pay = BigUint::from(123_456_789_000_000_000_000u128);
        let receive = BigUint::from(42u8);
        let msg = PurchaseMessage {
            token: &token,
            amount_to_pay: &pay,
            amount_to_receive: &receive,
            expires_at: 1_650_000_000,
        };

        let reference = (
            alloy::primitives::Address::from(*token.as_bytes()),
            U256::from(123_456_789_000_000_000_000u128),
            U256::from(42u8),
            U256::from(1_650_000_000u64),
        )
            .abi_encode_packed();

        assert_eq!(msg.encode_packed().unwrap().to_vec(), reference);
        assert_eq!(
            msg.hash().unwrap(),
            alloy::primitives::keccak256(&reference).0
        );
    }

    #[test]
    fn test_personal_message_matches_eip191() {
        let digest = keccak256(b"crowdsale");
        assert_eq!(personal_message_hash(&digest), eip191_hash_message(digest).0);
    }

    #[test]
    fn test_oversized_amount_rejected() {
        let token = token();
        let huge = BigUint::from(1u8) << 300u32;
        let small = BigUint::from(1u8);
        let msg = PurchaseMessage {
            token: &token,
            amount_to_pay: &small,
            amount_to_receive: &huge,
            expires_at: 0,
        };
        assert!(matches!(
            msg.encode_packed(),
            Err(AuthorizeError::InvalidAmount(_))
        ));
    }
}
