// src/lib.rs

//! Storefront order orchestration.
//!
//! Orders are created `Pending`/`Pending` and are confirmed by one of two
//! routes:
//!  - online: a gateway order is created for the stored total, the checkout
//!    callback's signature is checked and the payment must be `captured`;
//!  - cash on delivery: a one-time password is sent to a phone or email and
//!    must be verified against the order.
//!
//! Either confirmation reduces stock exactly once. The request flows are
//! `Pipeline`s over per-request context types, dispatched through a
//! `FlowRegistry`. Persistence, the gateway, message delivery and time are
//! reached only through the traits in `ports`.

pub mod error;
pub mod flows;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod services;

pub use crate::error::{CommerceError, CommerceResult, FlowError, FlowResult};
pub use crate::flows::{
  register_all_flows, CodVerificationCtx, GatewayOrderCtx, OtpDispatchCtx, PaymentVerificationCtx,
};
pub use crate::memory::InMemoryStore;
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
pub use crate::registry::FlowRegistry;
pub use crate::services::{CommerceServices, CommerceSettings, OrderLifecycle, OtpPolicy};
