// core/src/models/query.rs

//! Filtering and pagination for order listings.

use super::order::{DeliveryStatus, Order, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  pub user_id: Option<Uuid>,
  pub month: Option<u32>,
  pub year: Option<i32>,
  pub payment_status: Option<PaymentStatus>,
  pub payment_method: Option<PaymentMethod>,
  pub status: Option<DeliveryStatus>,
}

impl OrderFilter {
  /// Half-open `[start, end)` creation window selected by `month`/`year`.
  ///
  /// A month without a year means that month of the current year; a year
  /// without a month means the whole year.
  pub fn created_between(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if self.month.is_none() && self.year.is_none() {
      return None;
    }
    let year = self.year.unwrap_or_else(|| now.year());
    let (start, end) = match self.month.filter(|m| (1..=12).contains(m)) {
      Some(month) => {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
          NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
          NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        (start, end)
      }
      None => (NaiveDate::from_ymd_opt(year, 1, 1)?, NaiveDate::from_ymd_opt(year + 1, 1, 1)?),
    };
    Some((
      Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0)?),
      Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0)?),
    ))
  }

  pub fn matches(&self, order: &Order, now: DateTime<Utc>) -> bool {
    if self.user_id.is_some_and(|u| u != order.user_id) {
      return false;
    }
    if self.payment_status.is_some_and(|p| p != order.payment_status) {
      return false;
    }
    if self.payment_method.is_some_and(|m| m != order.payment_method) {
      return false;
    }
    if self.status.is_some_and(|s| s != order.status) {
      return false;
    }
    match self.created_between(now) {
      Some((start, end)) => order.created_at >= start && order.created_at < end,
      None => true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub current_page: u32,
  pub page_size: u32,
}

impl PageRequest {
  /// Clamps page to >= 1 and size to `1..=MAX_PAGE_SIZE`.
  pub fn new(current_page: Option<u32>, page_size: Option<u32>) -> Self {
    Self {
      current_page: current_page.unwrap_or(1).max(1),
      page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.current_page - 1) * u64::from(self.page_size)
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self::new(None, None)
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub current_page: u32,
  pub page_size: u32,
  pub total_items: u64,
  pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
  pub orders: Vec<Order>,
  pub pagination: Pagination,
}

impl OrderPage {
  pub fn new(orders: Vec<Order>, page: PageRequest, total_items: u64) -> Self {
    let total_pages = total_items.div_ceil(u64::from(page.page_size));
    Self {
      orders,
      pagination: Pagination {
        current_page: page.current_page,
        page_size: page.page_size,
        total_items,
        total_pages,
      },
    }
  }
}
