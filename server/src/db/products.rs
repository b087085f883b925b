// server/src/db/products.rs
use super::{store_err, PgStore};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::FromRow;
use storefront_core::models::Product;
use storefront_core::ports::ProductStore;
use storefront_core::{CommerceError, CommerceResult};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct ProductRow {
  id: Uuid,
  name: String,
  price: Decimal,
  stock: i64,
}

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Product {
      id: row.id,
      name: row.name,
      price: row.price,
      stock: row.stock,
    }
  }
}

#[async_trait]
impl ProductStore for PgStore {
  async fn get(&self, id: Uuid) -> CommerceResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>("SELECT id, name, price, stock FROM products WHERE id = $1")
      .bind(id)
      .fetch_optional(self.pool())
      .await
      .map_err(store_err("get product"))?;
    Ok(row.map(Product::from))
  }

  async fn decrement_stock(&self, id: Uuid, quantity: u32) -> CommerceResult<()> {
    let result = sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
      .bind(i64::from(quantity))
      .bind(id)
      .execute(self.pool())
      .await
      .map_err(store_err("decrement stock"))?;
    if result.rows_affected() == 0 {
      return Err(CommerceError::not_found(format!("Product {}", id)));
    }
    Ok(())
  }
}
