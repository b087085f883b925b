// server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use storefront_core::ports::{Notifier, SystemClock};
use storefront_core::{CommerceServices, CommerceSettings, InMemoryStore};
use storefront_server::db::PgStore;
use storefront_server::services::{LogNotifier, RazorpayClient, TwoFactorNotifier};
use storefront_server::web::configure_app_routes;
use storefront_server::{AppConfig, AppState};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

async fn build_services(config: &AppConfig) -> anyhow::Result<CommerceServices> {
  let gateway = Arc::new(RazorpayClient::new(
    &config.razorpay_api_base,
    &config.razorpay_key_id,
    &config.razorpay_key_secret,
  )?);

  let email = LogNotifier::new(config.email_sender.clone());
  let notifier: Arc<dyn Notifier> = match &config.two_factor_api_key {
    Some(api_key) => Arc::new(TwoFactorNotifier::new(
      &config.two_factor_api_base,
      api_key,
      &config.two_factor_sender_id,
      email,
    )?),
    None => {
      tracing::warn!("TWO_FACTOR_API_KEY not set; SMS messages will only be logged.");
      Arc::new(email)
    }
  };

  let settings = CommerceSettings {
    gateway_key_secret: config.razorpay_key_secret.clone(),
    currency: config.currency.clone(),
    otp: config.otp.clone(),
  };
  let clock = Arc::new(SystemClock);

  match &config.database_url {
    Some(url) => {
      let store = Arc::new(PgStore::connect(url).await?);
      if config.run_migrations {
        store.migrate().await?;
      }
      Ok(CommerceServices::new(
        store.clone(),
        store.clone(),
        store,
        gateway,
        notifier,
        clock,
        settings,
      ))
    }
    None => {
      tracing::warn!("DATABASE_URL not set; using the in-memory store. Data is lost on restart.");
      Ok(CommerceServices::in_memory(
        Arc::new(InMemoryStore::new()),
        gateway,
        notifier,
        clock,
        settings,
      ))
    }
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront order server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let services = match build_services(&app_config).await {
    Ok(services) => services,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise backing services.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let app_state = AppState::new(services, app_config.clone());
  tracing::info!(flows = ?app_state.flows.flow_names(), "Application state ready.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
