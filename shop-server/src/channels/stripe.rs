//! Stripe via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::PaymentGateway;

const STRIPE_API: &str = "https://api.stripe.com/v1";

/// Webhook timestamps older than this are rejected (replay protection)
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error: {0}")]
    Api(String),

    #[error("No balance transaction yet for {0}")]
    FeeUnavailable(String),
}

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(client: reqwest::Client, secret_key: String) -> Self {
        Self { client, secret_key }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    /// Reads `latest_charge.balance_transaction.fee` of the payment intent
    async fn fee_for(&self, payment_ref: &str) -> Result<i64, GatewayError> {
        let resp: serde_json::Value = self
            .client
            .get(format!("{STRIPE_API}/payment_intents/{payment_ref}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("expand[]", "latest_charge.balance_transaction")])
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = resp.get("error") {
            let message = err["message"].as_str().unwrap_or("unknown error");
            return Err(GatewayError::Api(message.to_string()));
        }

        extract_fee(&resp).ok_or_else(|| GatewayError::FeeUnavailable(payment_ref.to_string()))
    }
}

fn extract_fee(payment_intent: &serde_json::Value) -> Option<i64> {
    payment_intent
        .get("latest_charge")?
        .get("balance_transaction")?
        .get("fee")?
        .as_i64()
}

/// Verify a `Stripe-Signature` header (`t=<ts>,v1=<hex hmac>`) against the raw body
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now_secs - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("Webhook timestamp outside tolerance");
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe may send several v1 signatures during secret rotation
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err("Webhook signature mismatch")
    }
}

#[cfg(test)]
pub(crate) fn sign_for_test(payload: &[u8], secret: &str, ts: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{ts}.").as_bytes());
    mac.update(payload);
    format!("t={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
