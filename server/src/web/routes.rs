// server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{order_handlers, payment_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Fixed segments come before `/{id}` so they are not captured as ids.
      .service(
        web::scope("/orders")
          .route("/new", web::post().to(order_handlers::new_order_handler))
          .route("/my", web::get().to(order_handlers::my_orders_handler))
          .route("/all", web::get().to(order_handlers::all_orders_handler))
          .route("/update-status", web::put().to(order_handlers::update_status_by_body_handler))
          .route(
            "/payment-status/{order_id}",
            web::put().to(order_handlers::update_payment_status_handler),
          )
          .route("/delete/{id}", web::delete().to(order_handlers::delete_order_handler))
          .route("/{id}", web::get().to(order_handlers::get_order_handler))
          .route("/{id}", web::put().to(order_handlers::update_status_handler)),
      )
      .service(
        web::scope("/payments")
          .route("/order", web::post().to(payment_handlers::create_gateway_order_handler))
          .route("/verify", web::post().to(payment_handlers::verify_payment_handler))
          .route("/order/cod/send-otp", web::post().to(payment_handlers::send_cod_otp_handler))
          .route("/order/cod/verify-otp", web::post().to(payment_handlers::verify_cod_otp_handler)),
      ),
  );
}
