//! Recoverable ECDSA signatures over 32-byte digests.

use std::fmt;

use alloy::primitives::{Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::address::Address;
use crate::error::{ConfigError, SignError};

/// Environment variable holding the hex-encoded signing key.
pub const PRIVATE_KEY_ENV: &str = "SIGNER_PRIVATE_KEY";

/// Produces 65-byte `r ‖ s ‖ v` signatures (`v` ∈ {27, 28}) over prehashed
/// digests.
pub trait DigestSigner: Send + Sync {
    /// Address recovered from every signature this signer produces.
    fn address(&self) -> Address;

    fn sign(&self, digest: &[u8; 32]) -> Result<[u8; 65], SignError>;
}

/// Signer holding a secp256k1 private key in process memory.
#[derive(Clone)]
pub struct LocalSigner {
    inner: PrivateKeySigner,
    address: Address,
}

impl LocalSigner {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self, ConfigError> {
        let inner: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPrivateKey)?;
        let address = Address::from(inner.address().0 .0);
        Ok(Self { inner, address })
    }

    /// Read the key from [`PRIVATE_KEY_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = std::env::var(PRIVATE_KEY_ENV).map_err(|_| ConfigError::MissingPrivateKey)?;
        let signer = Self::from_hex(&key)?;
        tracing::info!(address = %signer.address, "Loaded authorization signer");
        Ok(signer)
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl DigestSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, digest: &[u8; 32]) -> Result<[u8; 65], SignError> {
        let signature = self
            .inner
            .sign_hash_sync(&B256::from(*digest))
            .map_err(|e| SignError::Backend(e.to_string()))?;
        Ok(signature.as_bytes())
    }
}

/// Recover the address that produced `signature` over `digest`.
pub fn recover_signer(digest: &[u8; 32], signature: &[u8; 65]) -> Result<Address, SignError> {
    let signature = Signature::from_raw(signature)
        .map_err(|e| SignError::InvalidSignature(e.to_string()))?;
    let recovered = signature
        .recover_address_from_prehash(&B256::from(*digest))
        .map_err(|e| SignError::InvalidSignature(e.to_string()))?;
    Ok(Address::from(recovered.0 .0))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::digest::keccak256;

    /// Well-known development key (first Anvil/Hardhat account).
    pub(crate) const DEV_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    pub(crate) const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_from_hex_address() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        assert_eq!(signer.address().to_checksum(), DEV_ADDRESS);

        let bare = LocalSigner::from_hex(DEV_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(bare.address(), signer.address());
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(
            LocalSigner::from_hex("0x1234"),
            Err(ConfigError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        let rendered = format!("{signer:?}");
        assert!(rendered.contains(DEV_ADDRESS));
        assert!(!rendered.contains(DEV_KEY.trim_start_matches("0x")));
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        let digest = keccak256(b"purchase");

        let signature = signer.sign(&digest).unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);
        assert_eq!(recover_signer(&digest, &signature).unwrap(), signer.address());

        // Deterministic (RFC 6979) nonces.
        assert_eq!(signer.sign(&digest).unwrap(), signature);

        let other = keccak256(b"another purchase");
        assert_ne!(recover_signer(&other, &signature).unwrap(), signer.address());
    }
}
