//! The store: one handle over either SQL dialect.

use crate::error::{StoreError, StoreResult};
use crate::sql;
use crate::types::{ExchangeRecord, MonitoredPair, PriceRow, SamplerPair};
use serde::Deserialize;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::{MySqlPool, PgPool, Row};
use tracing::{debug, info};

/// Database connection settings (`[database]` section of the config).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub db_type: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Selected SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    MySql,
    Postgres,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::MySql => "mysql",
            StoreKind::Postgres => "postgres",
        }
    }
}

/// Catalog reader and snapshot writer over MySQL or PostgreSQL.
#[derive(Debug)]
pub enum Store {
    MySql(MySqlPool),
    Postgres(PgPool),
}

impl Store {
    /// Connect according to `database.type`.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Store> {
        match config.db_type.to_lowercase().as_str() {
            "mysql" => {
                let dsn = format!(
                    "mysql://{}:{}@{}:{}/{}",
                    config.user, config.password, config.host, config.port, config.database
                );
                let pool = MySqlPoolOptions::new()
                    .max_connections(20)
                    .connect(&dsn)
                    .await?;
                info!(host = %config.host, database = %config.database, "connected to mysql");
                Ok(Store::MySql(pool))
            }
            "postgres" | "postgresql" => {
                let dsn = format!(
                    "postgres://{}:{}@{}:{}/{}",
                    config.user, config.password, config.host, config.port, config.database
                );
                let pool = PgPoolOptions::new()
                    .max_connections(20)
                    .connect(&dsn)
                    .await?;
                info!(host = %config.host, database = %config.database, "connected to postgres");
                Ok(Store::Postgres(pool))
            }
            other => Err(StoreError::UnsupportedType(other.to_string())),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            Store::MySql(_) => StoreKind::MySql,
            Store::Postgres(_) => StoreKind::Postgres,
        }
    }

    pub async fn close(&self) {
        match self {
            Store::MySql(pool) => pool.close().await,
            Store::Postgres(pool) => pool.close().await,
        }
    }

    /// Desired subscription set for the supervisor: active monitored pairs
    /// with their venue, symbol and market type.
    pub async fn active_pairs_for_data_monitor(&self) -> StoreResult<Vec<MonitoredPair>> {
        let pairs = match self {
            Store::MySql(pool) => {
                let rows = sqlx::query(sql::mysql::ACTIVE_PAIRS_FOR_DATA_MONITOR)
                    .fetch_all(pool)
                    .await?;
                rows.iter()
                    .map(|row| {
                        Ok(MonitoredPair {
                            exchange_id: row.try_get::<i32, _>(0)? as i64,
                            exchange_name: row.try_get(1)?,
                            pair_id: row.try_get::<i32, _>(2)? as i64,
                            symbol: row.try_get(3)?,
                            market_type: row.try_get(4)?,
                        })
                    })
                    .collect::<StoreResult<Vec<_>>>()?
            }
            Store::Postgres(pool) => {
                let rows = sqlx::query(sql::postgres::ACTIVE_PAIRS_FOR_DATA_MONITOR)
                    .fetch_all(pool)
                    .await?;
                rows.iter()
                    .map(|row| {
                        Ok(MonitoredPair {
                            exchange_id: row.try_get::<i32, _>(0)? as i64,
                            exchange_name: row.try_get(1)?,
                            pair_id: row.try_get::<i32, _>(2)? as i64,
                            symbol: row.try_get(3)?,
                            market_type: row.try_get(4)?,
                        })
                    })
                    .collect::<StoreResult<Vec<_>>>()?
            }
        };
        debug!(count = pairs.len(), "loaded active pairs");
        Ok(pairs)
    }

    /// Connection record for one exchange, by case-insensitive name.
    pub async fn exchange_by_name(&self, name: &str) -> StoreResult<ExchangeRecord> {
        let record = match self {
            Store::MySql(pool) => {
                let row = sqlx::query(sql::mysql::EXCHANGE_BY_NAME)
                    .bind(name)
                    .fetch_optional(pool)
                    .await?;
                let row = row.ok_or_else(|| StoreError::ExchangeNotFound(name.to_string()))?;
                ExchangeRecord {
                    id: row.try_get::<i32, _>(0)? as i64,
                    name: row.try_get(1)?,
                    base_url: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
                    ws_url: row.try_get(3)?,
                }
            }
            Store::Postgres(pool) => {
                let row = sqlx::query(sql::postgres::EXCHANGE_BY_NAME)
                    .bind(name)
                    .fetch_optional(pool)
                    .await?;
                let row = row.ok_or_else(|| StoreError::ExchangeNotFound(name.to_string()))?;
                ExchangeRecord {
                    id: row.try_get::<i32, _>(0)? as i64,
                    name: row.try_get(1)?,
                    base_url: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
                    ws_url: row.try_get(3)?,
                }
            }
        };
        Ok(record)
    }

    /// Pair set sampled by the price monitor (`MONITORING.ACTIVE = 1`).
    pub async fn monitoring_pairs(&self) -> StoreResult<Vec<SamplerPair>> {
        let pairs = match self {
            Store::MySql(pool) => {
                let rows = sqlx::query(sql::mysql::MONITORING_PAIRS).fetch_all(pool).await?;
                rows.iter()
                    .map(|row| {
                        Ok(SamplerPair {
                            exchange_id: row.try_get::<i32, _>(0)? as i64,
                            pair_id: row.try_get::<i32, _>(1)? as i64,
                            exchange_name: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
                        })
                    })
                    .collect::<StoreResult<Vec<_>>>()?
            }
            Store::Postgres(pool) => {
                let rows = sqlx::query(sql::postgres::MONITORING_PAIRS).fetch_all(pool).await?;
                rows.iter()
                    .map(|row| {
                        Ok(SamplerPair {
                            exchange_id: row.try_get::<i32, _>(0)? as i64,
                            pair_id: row.try_get::<i32, _>(1)? as i64,
                            exchange_name: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
                        })
                    })
                    .collect::<StoreResult<Vec<_>>>()?
            }
        };
        Ok(pairs)
    }

    /// Insert all snapshot rows in one transaction; any failure rolls the
    /// whole batch back.
    pub async fn insert_price_rows(&self, rows: &[PriceRow]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        match self {
            Store::MySql(pool) => {
                let mut tx = pool.begin().await?;
                for row in rows {
                    let mut query = sqlx::query(sql::mysql::INSERT_PRICE_ROW)
                        .bind(row.date)
                        .bind(row.price_timestamp)
                        .bind(row.pair_id);
                    for ask in row.asks.iter().rev() {
                        query = query.bind(ask.price).bind(ask.volume);
                    }
                    for bid in row.bids.iter() {
                        query = query.bind(bid.price).bind(bid.volume);
                    }
                    query.execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
            Store::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                for row in rows {
                    let mut query = sqlx::query(sql::postgres::INSERT_PRICE_ROW)
                        .bind(row.date)
                        .bind(row.price_timestamp)
                        .bind(row.pair_id);
                    for ask in row.asks.iter().rev() {
                        query = query.bind(ask.price).bind(ask.volume);
                    }
                    for bid in row.bids.iter() {
                        query = query.bind(bid.price).bind(bid.volume);
                    }
                    query.execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
        }
        info!(count = rows.len(), "saved price snapshot rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(db_type: &str) -> StoreConfig {
        StoreConfig {
            db_type: db_type.into(),
            host: "localhost".into(),
            port: 5432,
            user: "u".into(),
            password: "p".into(),
            database: "d".into(),
        }
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected() {
        let err = Store::connect(&config("sqlite")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedType(_)));
    }

    #[test]
    fn test_kind_names_match_config_values() {
        assert_eq!(StoreKind::MySql.as_str(), "mysql");
        assert_eq!(StoreKind::Postgres.as_str(), "postgres");
    }
}
