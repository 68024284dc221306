use anyhow::{bail, Result};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// HMAC-SHA256 of `data`, hex-encoded. The gateway signs
/// `"{order_id}|{payment_id}"` with the key secret and webhook bodies with
/// the webhook secret.
pub fn sign_hmac_sha256_hex(secret: &str, data: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature over `data`. Malformed hex fails.
fn verify_hmac_sha256_hex(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(sig_bytes) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    mac.verify_slice(&sig_bytes).is_ok()
}

pub fn verify_payment_signature(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    verify_hmac_sha256_hex(
        secret,
        format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes(),
        signature,
    )
}

pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    verify_hmac_sha256_hex(secret, body, signature)
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl GatewayClient {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            key_id,
            key_secret,
        }
    }

    /// Create an order on the payment gateway. `amount_minor` is in the
    /// currency's minor unit.
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let resp = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderRequest {
                amount: amount_minor,
                currency,
                receipt,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("gateway order creation failed with status {}", resp.status());
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_signature_round_trip() {
        let sig = sign_hmac_sha256_hex("key-secret", "order_123|pay_456");
        assert!(verify_payment_signature(
            "key-secret",
            "order_123",
            "pay_456",
            &sig
        ));
    }

    #[test]
    fn tampered_payment_id_rejected() {
        let sig = sign_hmac_sha256_hex("key-secret", "order_123|pay_456");
        assert!(!verify_payment_signature(
            "key-secret",
            "order_123",
            "pay_999",
            &sig
        ));
    }

    #[test]
    fn malformed_hex_signature_rejected() {
        assert!(!verify_payment_signature(
            "key-secret",
            "order_123",
            "pay_456",
            "not-hex-at-all"
        ));
        assert!(!verify_webhook_signature("key-secret", b"{}", ""));
    }

    #[test]
    fn webhook_body_signature() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = {
            let mut mac = Hmac::<Sha256>::new_from_slice(b"hook-secret").unwrap();
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        };
        assert!(verify_webhook_signature("hook-secret", body, &sig));
        assert!(!verify_webhook_signature("hook-secret", b"{}", &sig));
        assert!(!verify_webhook_signature("other-secret", body, &sig));
    }
}
