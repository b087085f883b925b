// server/src/services/razorpay.rs

//! Razorpay REST adapter for the `PaymentGateway` port.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use storefront_core::ports::{GatewayOrder, GatewayOrderRequest, GatewayPayment, PaymentGateway};
use storefront_core::{CommerceError, CommerceResult};
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
  error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
  #[serde(default)]
  description: Option<String>,
  #[serde(default)]
  code: Option<String>,
}

#[derive(Clone)]
pub struct RazorpayClient {
  client: Client,
  base_url: String,
  key_id: String,
  key_secret: String,
}

impl std::fmt::Debug for RazorpayClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RazorpayClient")
      .field("base_url", &self.base_url)
      .field("key_id", &self.key_id)
      .finish_non_exhaustive()
  }
}

impl RazorpayClient {
  pub fn new(base_url: &str, key_id: &str, key_secret: &str) -> CommerceResult<Self> {
    let client = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| CommerceError::Gateway(format!("HTTP client setup failed: {}", e)))?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      key_id: key_id.to_string(),
      key_secret: key_secret.to_string(),
    })
  }

  /// Turns a non-2xx response into a `Gateway` error carrying the provider's description.
  async fn read_json<T: for<'de> Deserialize<'de>>(response: Response, action: &str) -> CommerceResult<T> {
    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      let detail = serde_json::from_str::<RazorpayErrorBody>(&text)
        .ok()
        .and_then(|b| b.error.description.or(b.error.code))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
      warn!(%status, action, detail = %detail, "Razorpay request rejected.");
      return Err(CommerceError::Gateway(format!("{} failed: {}", action, detail)));
    }
    response
      .json::<T>()
      .await
      .map_err(|e| CommerceError::Gateway(format!("{} returned an unreadable body: {}", action, e)))
  }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
  fn key_id(&self) -> &str {
    &self.key_id
  }

  #[instrument(name = "razorpay::create_order", skip(self, request), fields(amount = request.amount, receipt = %request.receipt), err(Display))]
  async fn create_order(&self, request: GatewayOrderRequest) -> CommerceResult<GatewayOrder> {
    let response = self
      .client
      .post(format!("{}/v1/orders", self.base_url))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&request)
      .send()
      .await
      .map_err(|e| CommerceError::Gateway(format!("Order creation failed: {}", e)))?;
    let order: GatewayOrder = Self::read_json(response, "Order creation").await?;
    debug!(gateway_order_id = %order.id, "Razorpay order created.");
    Ok(order)
  }

  #[instrument(name = "razorpay::fetch_payment", skip(self), err(Display))]
  async fn fetch_payment(&self, payment_id: &str) -> CommerceResult<GatewayPayment> {
    let response = self
      .client
      .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .send()
      .await
      .map_err(|e| CommerceError::Gateway(format!("Payment fetch failed: {}", e)))?;
    let payment: GatewayPayment = Self::read_json(response, "Payment fetch").await?;
    debug!(status = %payment.status, "Razorpay payment fetched.");
    Ok(payment)
  }
}
