//! Signing credential bound to a wallet address

use crate::error::{SwapError, SwapResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;
use zeroize::Zeroizing;

/// Private-key credential used to sign order placements
#[derive(Clone)]
pub struct Credential {
    wallet: LocalWallet,
}

impl Credential {
    /// Parse a hex private key (with or without `0x`)
    pub fn from_private_key(key: &str) -> SwapResult<Self> {
        let key = Zeroizing::new(key.trim().to_string());
        let wallet = key
            .parse::<LocalWallet>()
            .map_err(|e| SwapError::Authentication(format!("Invalid private key: {}", e)))?;
        Ok(Self { wallet })
    }

    /// Load the credential from the named environment variable
    pub fn from_env(var: &str) -> SwapResult<Self> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => {
                let key = Zeroizing::new(key);
                Self::from_private_key(&key)
            }
            _ => Err(SwapError::Authentication(format!(
                "No wallet configured. Set {} to a private key",
                var
            ))),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Fail unless this credential controls `wallet_address`
    pub fn ensure_controls(&self, wallet_address: &str) -> SwapResult<()> {
        let expected = wallet_address.parse::<Address>().map_err(|e| {
            SwapError::Authentication(format!(
                "Wallet address {} is not a signable EVM address: {}",
                wallet_address, e
            ))
        })?;

        if expected != self.address() {
            return Err(SwapError::Authentication(format!(
                "Credential is bound to {:?}, not {:?}",
                self.address(),
                expected
            )));
        }
        Ok(())
    }

    /// EIP-191 personal-message signature over `digest`, `0x`-prefixed hex
    pub async fn sign_digest(&self, digest: &[u8; 32]) -> SwapResult<String> {
        let signature = self
            .wallet
            .sign_message(&digest[..])
            .await
            .map_err(|e| SwapError::Authentication(format!("Signing failed: {}", e)))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address())
            .field("key", &"***REDACTED***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DEV_ADDRESS, DEV_KEY};

    #[test]
    fn test_credential_address() {
        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        assert_eq!(credential.address(), DEV_ADDRESS.parse::<Address>().unwrap());
        assert!(credential.ensure_controls(DEV_ADDRESS).is_ok());
        assert!(credential
            .ensure_controls(&DEV_ADDRESS.to_lowercase())
            .is_ok());
    }

    #[test]
    fn test_credential_wrong_wallet() {
        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        let result = credential.ensure_controls("0x0000000000000000000000000000000000000001");
        assert!(matches!(result, Err(SwapError::Authentication(_))));

        let result = credential.ensure_controls("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        assert!(matches!(result, Err(SwapError::Authentication(_))));
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(
            Credential::from_private_key("not-a-key"),
            Err(SwapError::Authentication(_))
        ));
    }

    #[test]
    fn test_missing_env_key() {
        std::env::remove_var("FUSION_TEST_MISSING_KEY");
        assert!(matches!(
            Credential::from_env("FUSION_TEST_MISSING_KEY"),
            Err(SwapError::Authentication(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        let debug = format!("{:?}", credential);
        assert!(!debug.contains(&DEV_KEY[2..]));
    }

    #[tokio::test]
    async fn test_sign_digest() {
        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        let signature = credential.sign_digest(&[1u8; 32]).await.unwrap();
        assert!(signature.starts_with("0x"));
        // r || s || v
        assert_eq!(signature.len(), 2 + 65 * 2);
    }
}
