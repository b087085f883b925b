// server/src/db/otps.rs
use super::{store_err, PgStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use storefront_core::models::{OtpChannel, OtpRecord};
use storefront_core::ports::OtpStore;
use storefront_core::{CommerceError, CommerceResult};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct OtpRow {
  id: Uuid,
  channel_kind: String,
  channel_value: String,
  code_hash: String,
  user_id: Option<Uuid>,
  created_at: DateTime<Utc>,
  expires_at: DateTime<Utc>,
  consumed_at: Option<DateTime<Utc>>,
  attempts: i32,
}

impl TryFrom<OtpRow> for OtpRecord {
  type Error = CommerceError;

  fn try_from(row: OtpRow) -> Result<Self, Self::Error> {
    let channel = match row.channel_kind.as_str() {
      "phone" => OtpChannel::Phone(row.channel_value),
      "email" => OtpChannel::Email(row.channel_value),
      other => return Err(CommerceError::store(format!("unknown OTP channel kind '{}'", other))),
    };
    Ok(OtpRecord {
      id: row.id,
      channel,
      code_hash: row.code_hash,
      user_id: row.user_id,
      created_at: row.created_at,
      expires_at: row.expires_at,
      consumed_at: row.consumed_at,
      attempts: u32::try_from(row.attempts).unwrap_or_default(),
    })
  }
}

#[async_trait]
impl OtpStore for PgStore {
  async fn insert(&self, record: OtpRecord) -> CommerceResult<()> {
    sqlx::query(
      "INSERT INTO otp_records (id, channel_kind, channel_value, code_hash, user_id, created_at, expires_at, consumed_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id)
    .bind(record.channel.kind())
    .bind(record.channel.value())
    .bind(&record.code_hash)
    .bind(record.user_id)
    .bind(record.created_at)
    .bind(record.expires_at)
    .bind(record.consumed_at)
    .execute(self.pool())
    .await
    .map_err(store_err("insert otp"))?;
    Ok(())
  }

  async fn latest(&self, channel: &OtpChannel) -> CommerceResult<Option<OtpRecord>> {
    sqlx::query_as::<_, OtpRow>(
      "SELECT id, channel_kind, channel_value, code_hash, user_id, created_at, expires_at, consumed_at, attempts \
       FROM otp_records WHERE channel_kind = $1 AND channel_value = $2 \
       ORDER BY created_at DESC, seq DESC LIMIT 1",
    )
    .bind(channel.kind())
    .bind(channel.value())
    .fetch_optional(self.pool())
    .await
    .map_err(store_err("latest otp"))?
    .map(OtpRecord::try_from)
    .transpose()
  }

  async fn count_since(&self, channel: &OtpChannel, since: DateTime<Utc>) -> CommerceResult<u64> {
    let count: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM otp_records WHERE channel_kind = $1 AND channel_value = $2 AND created_at > $3",
    )
    .bind(channel.kind())
    .bind(channel.value())
    .bind(since)
    .fetch_one(self.pool())
    .await
    .map_err(store_err("count otps"))?;
    Ok(u64::try_from(count).unwrap_or_default())
  }

  async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> CommerceResult<bool> {
    let result = sqlx::query("UPDATE otp_records SET consumed_at = $1 WHERE id = $2 AND consumed_at IS NULL")
      .bind(at)
      .bind(id)
      .execute(self.pool())
      .await
      .map_err(store_err("consume otp"))?;
    Ok(result.rows_affected() == 1)
  }

  async fn record_attempt(&self, id: Uuid) -> CommerceResult<Option<u32>> {
    let attempts: Option<i32> =
      sqlx::query_scalar("UPDATE otp_records SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts")
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(store_err("record otp attempt"))?;
    Ok(attempts.map(|n| u32::try_from(n).unwrap_or_default()))
  }
}
