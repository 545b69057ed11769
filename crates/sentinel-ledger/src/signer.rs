use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Signature;

use crate::error::{LedgerError, Result};

/// Abstracts the channel's counterparty co-signer (§4.3/§9's first Open
/// Question: "specify whether the counterparty is a real broker ... or a
/// stubbed co-signer ... the core should expose this choice as an adapter,
/// not hard-code it").
///
/// A production implementation sends the digest over a bidirectional
/// message bus to a real broker and awaits its signature; tests use
/// [`LocalDeterministicSigner`] instead.
#[async_trait]
pub trait CounterpartySigner: Send + Sync {
    /// Sign `digest` (already hashed with the Ethereum personal-message
    /// prefix applied by the caller via `ethers::utils::hash_message`) and
    /// return the raw 65-byte signature.
    async fn co_sign(&self, digest: [u8; 32]) -> Result<Vec<u8>>;

    /// The address this signer's signatures should recover to.
    fn address(&self) -> ethers::types::Address;
}

/// A deterministic local signer standing in for a real broker, for tests
/// and for single-process demos. Holds its own secp256k1 key and signs
/// whatever digest it is asked to, with no network round-trip.
pub struct LocalDeterministicSigner {
    wallet: LocalWallet,
}

impl LocalDeterministicSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        LocalDeterministicSigner { wallet }
    }
}

#[async_trait]
impl CounterpartySigner for LocalDeterministicSigner {
    async fn co_sign(&self, digest: [u8; 32]) -> Result<Vec<u8>> {
        let signature: Signature = self
            .wallet
            .sign_message(digest.to_vec())
            .await
            .map_err(|e| LedgerError::TransportFailure(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn address(&self) -> ethers::types::Address {
        self.wallet.address()
    }
}

/// Recover the signer address from a raw 65-byte signature over `digest`,
/// using the same personal-message-prefixed hashing the signer applied
/// (§4.3/§9: "do not roll a custom scheme").
pub fn recover(signature_bytes: &[u8], digest: [u8; 32]) -> Result<ethers::types::Address> {
    let signature = Signature::try_from(signature_bytes)
        .map_err(|e| LedgerError::SignatureMismatch(e.to_string()))?;
    signature
        .recover(digest.to_vec())
        .map_err(|e| LedgerError::SignatureMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::LocalWallet;

    #[tokio::test]
    async fn signature_recovers_to_signer_address() {
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let expected_address = wallet.address();
        let signer = LocalDeterministicSigner::new(wallet);
        let digest = [7u8; 32];
        let sig = signer.co_sign(digest).await.unwrap();
        let recovered = recover(&sig, digest).unwrap();
        assert_eq!(recovered, expected_address);
    }

    #[tokio::test]
    async fn wrong_digest_recovers_to_a_different_address() {
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let expected_address = wallet.address();
        let signer = LocalDeterministicSigner::new(wallet);
        let sig = signer.co_sign([1u8; 32]).await.unwrap();
        let recovered = recover(&sig, [2u8; 32]).unwrap();
        assert_ne!(recovered, expected_address);
    }
}
