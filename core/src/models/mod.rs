// core/src/models/mod.rs

//! Data structures shared by the stores, the lifecycle and the flows.

pub mod order;
pub mod otp;
pub mod product;
pub mod query;

pub use order::{
  DeliveryStatus, NewOrder, Order, OrderItem, PaymentMethod, PaymentStatus, ShippingInfo, Transition,
  TransitionGuard,
};
pub use otp::{OtpChannel, OtpRecord};
pub use product::Product;
pub use query::{OrderFilter, OrderPage, PageRequest, Pagination};
