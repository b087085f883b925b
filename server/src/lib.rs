// server/src/lib.rs

//! HTTP surface of the storefront: configuration, Postgres stores, the
//! Razorpay and SMS adapters, session checks and the `/api/v1` routes.

pub mod config;
pub mod db;
pub mod errors;
pub mod services;
pub mod state;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
