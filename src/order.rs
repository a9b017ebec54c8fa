//! Order submitter: places a quoted order backed by a hashlock
//!
//! Placement is never retried here: a response lost to a timeout may still
//! have created the order upstream. Callers re-quote and resubmit explicitly.

use crate::error::{SwapError, SwapResult};
use crate::fusion::{FusionApi, PlaceOrderRequest};
use crate::secrets::{keccak256, to_hex, SecretSet};
use crate::types::Quote;
use crate::wallet::Credential;

use std::sync::Arc;
use tracing::{debug, error, info};

pub struct OrderSubmitter {
    api: Arc<dyn FusionApi>,
}

impl OrderSubmitter {
    pub fn new(api: Arc<dyn FusionApi>) -> Self {
        Self { api }
    }

    /// Place the order and return its order hash
    pub async fn submit_order(
        &self,
        quote: &Quote,
        secrets: &SecretSet,
        wallet_address: &str,
        credential: Option<&Credential>,
    ) -> SwapResult<String> {
        let credential = credential.ok_or_else(|| {
            SwapError::Authentication("a signing credential is required to place orders".to_string())
        })?;
        credential.ensure_controls(wallet_address)?;

        let preset = quote.preset().map_err(|e| SwapError::Configuration(e.to_string()))?;
        if secrets.len() != preset.secrets_count {
            return Err(SwapError::Configuration(format!(
                "preset {} requires {} secrets, got {}",
                quote.recommended_preset,
                preset.secrets_count,
                secrets.len()
            )));
        }

        let digest = order_digest(quote, secrets, wallet_address);
        debug!("Order digest {}", to_hex(&digest));
        let signature = credential.sign_digest(&digest).await?;

        let request = PlaceOrderRequest {
            quote_id: quote.quote_id.clone(),
            src_chain_id: quote.source_network_id,
            dst_chain_id: quote.destination_network_id,
            preset: quote.recommended_preset.clone(),
            wallet_address: wallet_address.to_string(),
            hash_lock: secrets.hash_lock().to_hex(),
            secret_hashes: secrets.iter().map(|s| s.hash_hex()).collect(),
            signature,
        };

        info!(
            "Placing order: {} -> {} with {} secret(s), hashlock {}",
            quote.source_chain,
            quote.destination_chain,
            secrets.len(),
            secrets.hash_lock()
        );

        match self.api.place_order(&request).await {
            Ok(order_hash) => {
                info!("Order placed: {}", order_hash);
                crate::metrics::record_order_submitted(&quote.source_chain);
                Ok(order_hash)
            }
            Err(e) => {
                error!("Order placement failed: {}", e);
                crate::metrics::record_order_failed(&quote.source_chain);
                Err(SwapError::Submission(e.upstream_message()))
            }
        }
    }
}

/// `keccak256(quote_id ++ wallet ++ hashlock ++ secret_hash_0 ++ ... )`
fn order_digest(quote: &Quote, secrets: &SecretSet, wallet_address: &str) -> [u8; 32] {
    let mut packed = Vec::with_capacity(64 + 32 * (secrets.len() + 1));
    packed.extend_from_slice(quote.quote_id.as_deref().unwrap_or_default().as_bytes());
    packed.extend_from_slice(wallet_address.to_lowercase().as_bytes());
    packed.extend_from_slice(secrets.hash_lock().as_bytes());
    for hash in secrets.secret_hashes() {
        packed.extend_from_slice(&hash);
    }
    keccak256(&packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::MockFusionApi;
    use crate::secrets::generate_secrets;
    use crate::test_support::{quote, DEV_ADDRESS, DEV_KEY};

    fn credential() -> Credential {
        Credential::from_private_key(DEV_KEY).unwrap()
    }

    #[tokio::test]
    async fn test_submit_single_fill() {
        let secrets = generate_secrets(1).unwrap();
        let expected_lock = secrets.hash_lock().to_hex();
        let expected_hash = secrets.get(0).unwrap().hash_hex();

        let mut api = MockFusionApi::new();
        api.expect_place_order()
            .withf(move |req| {
                req.hash_lock == expected_lock
                    && req.secret_hashes == vec![expected_hash.clone()]
                    && req.src_chain_id == 1
                    && req.dst_chain_id == 42161
                    && req.preset == "fast"
                    && req.signature.starts_with("0x")
            })
            .times(1)
            .returning(|_| Ok("0xabc".to_string()));

        let submitter = OrderSubmitter::new(Arc::new(api));
        let order_hash = submitter
            .submit_order(&quote(1), &secrets, DEV_ADDRESS, Some(&credential()))
            .await
            .unwrap();
        assert_eq!(order_hash, "0xabc");
    }

    #[tokio::test]
    async fn test_secret_hashes_in_index_order() {
        let secrets = generate_secrets(3).unwrap();
        let expected: Vec<String> = secrets.iter().map(|s| s.hash_hex()).collect();

        let mut api = MockFusionApi::new();
        api.expect_place_order()
            .withf(move |req| req.secret_hashes == expected)
            .times(1)
            .returning(|_| Ok("0xdef".to_string()));

        let submitter = OrderSubmitter::new(Arc::new(api));
        let result = submitter
            .submit_order(&quote(3), &secrets, DEV_ADDRESS, Some(&credential()))
            .await;
        assert_eq!(result.unwrap(), "0xdef");
    }

    #[tokio::test]
    async fn test_count_mismatch_makes_no_call() {
        // No expectations: any network call panics
        let api = MockFusionApi::new();
        let submitter = OrderSubmitter::new(Arc::new(api));

        let secrets = generate_secrets(2).unwrap();
        let result = submitter
            .submit_order(&quote(3), &secrets, DEV_ADDRESS, Some(&credential()))
            .await;
        assert!(matches!(result, Err(SwapError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let submitter = OrderSubmitter::new(Arc::new(MockFusionApi::new()));
        let secrets = generate_secrets(1).unwrap();

        let result = submitter
            .submit_order(&quote(1), &secrets, DEV_ADDRESS, None)
            .await;
        assert!(matches!(result, Err(SwapError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_credential_for_other_wallet() {
        let submitter = OrderSubmitter::new(Arc::new(MockFusionApi::new()));
        let secrets = generate_secrets(1).unwrap();

        let result = submitter
            .submit_order(
                &quote(1),
                &secrets,
                "0x0000000000000000000000000000000000000001",
                Some(&credential()),
            )
            .await;
        assert!(matches!(result, Err(SwapError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_placement_failure_is_submission_error() {
        let mut api = MockFusionApi::new();
        api.expect_place_order()
            .times(1)
            .returning(|_| Err(SwapError::api("place_order", "HTTP 500: relayer unavailable")));

        let submitter = OrderSubmitter::new(Arc::new(api));
        let secrets = generate_secrets(1).unwrap();
        match submitter
            .submit_order(&quote(1), &secrets, DEV_ADDRESS, Some(&credential()))
            .await
        {
            Err(SwapError::Submission(message)) => {
                assert_eq!(message, "HTTP 500: relayer unavailable")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_digest_depends_on_secrets() {
        let a = SecretSet::from_secrets(vec![[1u8; 32]]).unwrap();
        let b = SecretSet::from_secrets(vec![[2u8; 32]]).unwrap();
        let q = quote(1);

        assert_eq!(
            order_digest(&q, &a, DEV_ADDRESS),
            order_digest(&q, &a, &DEV_ADDRESS.to_lowercase())
        );
        assert_ne!(
            order_digest(&q, &a, DEV_ADDRESS),
            order_digest(&q, &b, DEV_ADDRESS)
        );
    }
}
