// server/src/db/orders.rs
use super::{store_err, PgStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use storefront_core::models::{
  DeliveryStatus, Order, OrderFilter, OrderItem, OrderPage, PageRequest, PaymentStatus, ShippingInfo, Transition,
  TransitionGuard,
};
use storefront_core::ports::OrderStore;
use storefront_core::{CommerceError, CommerceResult};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, order_items, shipping_info, sub_total, tax, discount, shipping_charges, \
  total, payment_method, payment_status, status, gateway_order_id, created_at, updated_at";

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  order_items: Json<Vec<OrderItem>>,
  shipping_info: Json<ShippingInfo>,
  sub_total: Decimal,
  tax: Decimal,
  discount: Decimal,
  shipping_charges: Decimal,
  total: Decimal,
  payment_method: String,
  payment_status: String,
  status: String,
  gateway_order_id: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = CommerceError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      order_items: row.order_items.0,
      shipping_info: row.shipping_info.0,
      sub_total: row.sub_total,
      tax: row.tax,
      discount: row.discount,
      shipping_charges: row.shipping_charges,
      total: row.total,
      payment_method: row.payment_method.parse().map_err(CommerceError::store)?,
      payment_status: row.payment_status.parse().map_err(CommerceError::store)?,
      status: row.status.parse().map_err(CommerceError::store)?,
      gateway_order_id: row.gateway_order_id,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
  qb.push(" WHERE TRUE");
  if let Some(user_id) = filter.user_id {
    qb.push(" AND user_id = ").push_bind(user_id);
  }
  if let Some((start, end)) = filter.created_between(Utc::now()) {
    qb.push(" AND created_at >= ").push_bind(start);
    qb.push(" AND created_at < ").push_bind(end);
  }
  if let Some(payment_status) = filter.payment_status {
    qb.push(" AND payment_status = ").push_bind(payment_status.as_str());
  }
  if let Some(payment_method) = filter.payment_method {
    qb.push(" AND payment_method = ").push_bind(payment_method.as_str());
  }
  if let Some(status) = filter.status {
    qb.push(" AND status = ").push_bind(status.as_str());
  }
}

impl PgStore {
  async fn update_returning(&self, mut qb: QueryBuilder<'_, Postgres>, op: &'static str) -> CommerceResult<Option<Order>> {
    qb.push(" RETURNING ").push(ORDER_COLUMNS);
    qb.build_query_as::<OrderRow>()
      .fetch_optional(self.pool())
      .await
      .map_err(store_err(op))?
      .map(Order::try_from)
      .transpose()
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn insert(&self, order: Order) -> CommerceResult<Order> {
    sqlx::query(
      "INSERT INTO orders (id, user_id, order_items, shipping_info, sub_total, tax, discount, shipping_charges, \
       total, payment_method, payment_status, status, gateway_order_id, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(Json(&order.order_items))
    .bind(Json(&order.shipping_info))
    .bind(order.sub_total)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.shipping_charges)
    .bind(order.total)
    .bind(order.payment_method.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.status.as_str())
    .bind(order.gateway_order_id.as_deref())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(self.pool())
    .await
    .map_err(store_err("insert order"))?;
    Ok(order)
  }

  async fn get(&self, id: Uuid) -> CommerceResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    sqlx::query_as::<_, OrderRow>(&sql)
      .bind(id)
      .fetch_optional(self.pool())
      .await
      .map_err(store_err("get order"))?
      .map(Order::try_from)
      .transpose()
  }

  async fn list(&self, filter: &OrderFilter, page: PageRequest) -> CommerceResult<OrderPage> {
    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
    push_filters(&mut count_qb, filter);
    let total_items: i64 = count_qb
      .build_query_scalar::<i64>()
      .fetch_one(self.pool())
      .await
      .map_err(store_err("count orders"))?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM orders", ORDER_COLUMNS));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
      .push_bind(i64::from(page.page_size))
      .push(" OFFSET ")
      .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
    let rows = qb
      .build_query_as::<OrderRow>()
      .fetch_all(self.pool())
      .await
      .map_err(store_err("list orders"))?;

    let orders = rows.into_iter().map(Order::try_from).collect::<CommerceResult<Vec<_>>>()?;
    Ok(OrderPage::new(orders, page, u64::try_from(total_items).unwrap_or_default()))
  }

  async fn transition(&self, id: Uuid, guard: &TransitionGuard, to: Transition) -> CommerceResult<Option<Order>> {
    let payment_in: Vec<&'static str> = guard.payment_in.iter().map(PaymentStatus::as_str).collect();
    let status_in: Vec<&'static str> = guard.status_in.iter().map(DeliveryStatus::as_str).collect();

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET payment_status = ");
    qb.push_bind(to.payment_status.as_str())
      .push(", status = ")
      .push_bind(to.status.as_str());
    if let Some(method) = to.payment_method {
      qb.push(", payment_method = ").push_bind(method.as_str());
    }
    qb.push(", updated_at = now() WHERE id = ")
      .push_bind(id)
      .push(" AND payment_status = ANY(")
      .push_bind(payment_in)
      .push(") AND status = ANY(")
      .push_bind(status_in)
      .push(")");
    self.update_returning(qb, "transition order").await
  }

  async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> CommerceResult<Option<Order>> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET payment_status = ");
    qb.push_bind(status.as_str())
      .push(", updated_at = now() WHERE id = ")
      .push_bind(id);
    self.update_returning(qb, "set payment status").await
  }

  async fn set_delivery_status(&self, id: Uuid, status: DeliveryStatus) -> CommerceResult<Option<Order>> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET status = ");
    qb.push_bind(status.as_str())
      .push(", updated_at = now() WHERE id = ")
      .push_bind(id);
    self.update_returning(qb, "set delivery status").await
  }

  async fn set_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> CommerceResult<Option<Order>> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET gateway_order_id = ");
    qb.push_bind(gateway_order_id.to_string())
      .push(", updated_at = now() WHERE id = ")
      .push_bind(id);
    self.update_returning(qb, "bind gateway order").await
  }

  async fn delete(&self, id: Uuid) -> CommerceResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(id)
      .execute(self.pool())
      .await
      .map_err(store_err("delete order"))?;
    Ok(result.rows_affected() > 0)
  }
}
