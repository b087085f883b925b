// core/src/services/signature.rs

//! Razorpay checkout signatures: hex HMAC-SHA256 over `"{order_id}|{payment_id}"`.

use crate::error::{CommerceError, CommerceResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(secret: &str, gateway_order_id: &str, payment_id: &str) -> CommerceResult<HmacSha256> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| CommerceError::Gateway(format!("unusable signing secret: {}", e)))?;
  mac.update(gateway_order_id.as_bytes());
  mac.update(b"|");
  mac.update(payment_id.as_bytes());
  Ok(mac)
}

/// Lowercase hex signature the gateway is expected to send back.
pub fn compute_signature(secret: &str, gateway_order_id: &str, payment_id: &str) -> CommerceResult<String> {
  let mac = keyed_mac(secret, gateway_order_id, payment_id)?;
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` in constant time. Anything that is not the exact hex
/// digest (wrong length, non-hex, different bytes) is `InvalidSignature`.
#[instrument(name = "signature::verify", skip(secret, signature))]
pub fn verify_signature(secret: &str, gateway_order_id: &str, payment_id: &str, signature: &str) -> CommerceResult<()> {
  let provided = match hex::decode(signature.trim()) {
    Ok(bytes) => bytes,
    Err(e) => {
      warn!(error = %e, "Signature is not valid hex.");
      return Err(CommerceError::InvalidSignature);
    }
  };
  keyed_mac(secret, gateway_order_id, payment_id)?
    .verify_slice(&provided)
    .map_err(|_| {
      warn!("Signature mismatch.");
      CommerceError::InvalidSignature
    })?;
  debug!("Signature verified.");
  Ok(())
}
