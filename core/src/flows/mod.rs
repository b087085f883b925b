// core/src/flows/mod.rs

//! The four request flows, each a `Pipeline` over its own context type.
//! `register_all_flows` installs them in a `FlowRegistry` so callers dispatch
//! on the context they built.

pub mod cod_verification;
pub mod contexts;
pub mod gateway_order;
pub mod otp_dispatch;
pub mod payment_verification;

use crate::error::{CommerceError, FlowError};
use crate::registry::FlowRegistry;
use tracing::info;

pub use cod_verification::cod_verification_flow;
pub use contexts::{CodVerificationCtx, GatewayOrderCtx, OtpDispatchCtx, PaymentVerificationCtx};
pub use gateway_order::gateway_order_flow;
pub use otp_dispatch::otp_dispatch_flow;
pub use payment_verification::payment_verification_flow;

pub fn register_all_flows<E>(registry: &FlowRegistry<E>)
where
  E: std::error::Error + From<FlowError> + From<CommerceError> + Send + Sync + 'static,
{
  registry.register_flow(gateway_order_flow());
  registry.register_flow(payment_verification_flow());
  registry.register_flow(otp_dispatch_flow());
  registry.register_flow(cod_verification_flow());
  info!(flows = ?registry.flow_names(), "Commerce flows registered.");
}
