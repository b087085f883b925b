// server/tests/api_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Duration;
use common::*;
use serde_json::{json, Value};
use storefront_core::models::OtpChannel;
use storefront_server::web::auth::Role;
use uuid::Uuid;

macro_rules! send {
  ($app:expr, $req:expr) => {{
    let resp = test::call_service(&$app, $req.to_request()).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
  }};
}

macro_rules! place_order {
  ($t:expr, $app:expr, $method:expr) => {{
    let req = test::TestRequest::post()
      .uri("/api/v1/orders/new")
      .insert_header($t.buyer_auth())
      .set_json($t.new_order_body($method));
    let (status, body) = send!($app, req);
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["order"].clone()
  }};
}

#[actix_web::test]
async fn health_needs_no_session() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let (status, body) = send!(app, test::TestRequest::get().uri("/api/v1/health"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn missing_or_forged_sessions_are_unauthorized() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;

  let (status, body) = send!(app, test::TestRequest::get().uri("/api/v1/orders/my"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["success"], false);

  let (_, token) = t.buyer_auth();
  let forged = token.replacen(".user.", ".admin.", 1);
  let req = test::TestRequest::get()
    .uri("/api/v1/orders/all")
    .insert_header(("Authorization", forged));
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_routes_refuse_regular_users() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let req = test::TestRequest::get().uri("/api/v1/orders/all").insert_header(t.buyer_auth());
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::FORBIDDEN);

  let req = test::TestRequest::get().uri("/api/v1/orders/all").insert_header(t.admin_auth());
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["pagination"]["totalItems"], 0);
}

#[actix_web::test]
async fn new_order_reports_every_missing_field() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let req = test::TestRequest::post()
    .uri("/api/v1/orders/new")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "total": 10 }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let message = body["message"].as_str().unwrap();
  assert!(message.contains("shippingInfo"), "{}", message);
  assert!(message.contains("orderItems"), "{}", message);
  assert!(message.contains("paymentMethod"), "{}", message);
}

#[actix_web::test]
async fn orders_are_listed_for_their_owner_only() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Online");
  assert_eq!(order["paymentStatus"], "Pending");
  assert_eq!(order["status"], "Pending");
  assert_eq!(t.stock(), 10);

  let req = test::TestRequest::get()
    .uri("/api/v1/orders/my?paymentMethod=online")
    .insert_header(t.buyer_auth());
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["orders"][0]["_id"], order["_id"]);
  assert_eq!(body["pagination"]["totalItems"], 1);
  assert_eq!(body["pagination"]["pageSize"], 10);

  let uri = format!("/api/v1/orders/{}", order["_id"].as_str().unwrap());
  let req = test::TestRequest::get()
    .uri(&uri)
    .insert_header(t.bearer(Uuid::new_v4(), Role::User));
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::FORBIDDEN);

  let req = test::TestRequest::get().uri(&uri).insert_header(t.admin_auth());
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["order"]["_id"], order["_id"]);
}

#[actix_web::test]
async fn online_checkout_marks_paid_and_reduces_stock_once() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Online");
  let order_id = order["_id"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "orderId": order_id, "amount": 300 }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["key"], KEY_ID);
  assert_eq!(body["amount"], 30000);
  assert_eq!(body["currency"], "INR");

  let callback = t.gateway.capture(body["orderId"].as_str().unwrap()).unwrap();
  let verify_body = json!({
    "razorpay_order_id": callback.gateway_order_id,
    "razorpay_payment_id": callback.payment_id,
    "razorpay_signature": callback.signature,
    "orderId": order_id,
  });

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/verify")
    .insert_header(t.buyer_auth())
    .set_json(verify_body.clone());
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["message"], "Payment successful");
  assert_eq!(body["order"]["paymentStatus"], "Paid");
  assert_eq!(body["order"]["status"], "Processing");
  assert_eq!(t.stock(), 8);

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/verify")
    .insert_header(t.buyer_auth())
    .set_json(verify_body);
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::OK);
  assert_eq!(t.stock(), 8);
}

#[actix_web::test]
async fn mismatched_amount_is_rejected() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Online");
  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "orderId": order["_id"], "amount": 1 }));
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(t.gateway.created_orders().is_empty());
}

#[actix_web::test]
async fn bad_signature_fails_the_order() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Online");
  let order_id = order["_id"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/verify")
    .insert_header(t.buyer_auth())
    .set_json(json!({
      "razorpay_order_id": "order_fake",
      "razorpay_payment_id": "pay_fake",
      "razorpay_signature": "00ff",
      "orderId": order_id,
    }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Invalid payment signature");

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/orders/{}", order_id))
    .insert_header(t.buyer_auth());
  let (_, body) = send!(app, req);
  assert_eq!(body["order"]["paymentStatus"], "Failed");
  assert_eq!(t.stock(), 10);
}

#[actix_web::test]
async fn paid_callback_cannot_be_replayed_for_another_order() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let first = place_order!(t, app, "Online");
  let second = place_order!(t, app, "Online");

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "orderId": first["_id"] }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK, "{}", body);
  let callback = t.gateway.capture(body["orderId"].as_str().unwrap()).unwrap();

  let verify_body = |order_id: &Value| {
    json!({
      "razorpay_order_id": callback.gateway_order_id,
      "razorpay_payment_id": callback.payment_id,
      "razorpay_signature": callback.signature,
      "orderId": order_id,
    })
  };
  let req = test::TestRequest::post()
    .uri("/api/v1/payments/verify")
    .insert_header(t.buyer_auth())
    .set_json(verify_body(&first["_id"]));
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::OK);
  assert_eq!(t.stock(), 8);

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/verify")
    .insert_header(t.buyer_auth())
    .set_json(verify_body(&second["_id"]));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().starts_with("Payment does not match order"), "{}", body);
  assert_eq!(t.stock(), 8);

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/orders/{}", second["_id"].as_str().unwrap()))
    .insert_header(t.buyer_auth());
  let (_, body) = send!(app, req);
  assert_eq!(body["order"]["paymentStatus"], "Failed");
}

#[actix_web::test]
async fn cod_otp_round_trip_confirms_the_order() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Cod");
  let order_id = order["_id"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order/cod/send-otp")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "phone": "9876543210" }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["message"], "OTP sent successfully");
  assert_eq!(body["resendAfter"], 60);

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order/cod/send-otp")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "phone": "9876543210" }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
  assert_eq!(body["retryAfter"], 60);

  let code = t
    .notifier
    .last_code_for(&OtpChannel::Phone("9876543210".into()))
    .unwrap();
  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order/cod/verify-otp")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "otp": code, "orderId": order_id, "phone": "9876543210" }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["message"], "COD confirmed successfully");
  assert_eq!(body["order"]["paymentStatus"], "Pending");
  assert_eq!(body["order"]["status"], "Processing");
  assert_eq!(body["order"]["paymentMethod"], "Cod");
  assert_eq!(t.stock(), 8);
}

#[actix_web::test]
async fn expired_otp_is_rejected_and_fails_the_order() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Cod");
  let order_id = order["_id"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order/cod/send-otp")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "email": "buyer@test.local" }));
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::OK);

  t.clock.advance(Duration::minutes(6));
  let code = t
    .notifier
    .last_code_for(&OtpChannel::Email("buyer@test.local".into()))
    .unwrap();
  let req = test::TestRequest::post()
    .uri("/api/v1/payments/order/cod/verify-otp")
    .insert_header(t.buyer_auth())
    .set_json(json!({ "otp": code, "orderId": order_id, "email": "buyer@test.local" }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Invalid or expired OTP");
  assert_eq!(t.stock(), 10);
}

#[actix_web::test]
async fn admin_can_update_and_delete_orders() {
  let t = TestApp::new();
  let app = test::init_service(t.app()).await;
  let order = place_order!(t, app, "Cod");
  let order_id = order["_id"].as_str().unwrap().to_string();

  let req = test::TestRequest::put()
    .uri("/api/v1/orders/update-status")
    .insert_header(t.admin_auth())
    .set_json(json!({ "orderId": order_id, "status": "shipped" }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["message"], "Order status updated successfully");

  let req = test::TestRequest::put()
    .uri(&format!("/api/v1/orders/payment-status/{}", order_id))
    .insert_header(t.admin_auth())
    .set_json(json!({ "paymentStatus": "Paid" }));
  let (status, body) = send!(app, req);
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["order"]["paymentStatus"], "Paid");
  assert_eq!(body["order"]["status"], "Shipped");

  let req = test::TestRequest::delete()
    .uri(&format!("/api/v1/orders/delete/{}", order_id))
    .insert_header(t.admin_auth());
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::OK);

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/orders/{}", order_id))
    .insert_header(t.admin_auth());
  let (status, _) = send!(app, req);
  assert_eq!(status, StatusCode::NOT_FOUND);
}
