use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use stocker_core::indicator::kind::derived;
use stocker_core::market::frame::{SeriesFrame, columns};
use stocker_core::store::error::StoreError;
use stocker_core::store::port::SeriesArchive;
use tracing::{debug, info};

/// 归档表列名与序列表列名的对应关系（按建表顺序）
pub const ARCHIVED_COLUMNS: [(&str, &str); 17] = [
    ("open", columns::OPEN),
    ("high", columns::HIGH),
    ("low", columns::LOW),
    ("close", columns::CLOSE),
    ("volume", columns::VOLUME),
    ("sma_20", derived::SMA_20),
    ("sma_50", derived::SMA_50),
    ("ema_12", derived::EMA_12),
    ("ema_26", derived::EMA_26),
    ("rsi", derived::RSI),
    ("upper_bb", derived::UPPER_BB),
    ("lower_bb", derived::LOWER_BB),
    ("macd", derived::MACD),
    ("signal_line", derived::SIGNAL_LINE),
    ("obv", derived::OBV),
    ("percent_k", derived::PERCENT_K),
    ("percent_d", derived::PERCENT_D),
];

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// # Summary
/// `SeriesArchive` 的 SQLite 实现，所有代码共用一张 `stock_data` 表。
///
/// # Invariants
/// * 主键为 `(ticker, date)`，重复写入同一天时整体替换该行。
/// * 数值列均可为空，缺失单元格写为 NULL。
pub struct SqliteSeriesArchive {
    pool: SqlitePool,
}

impl SqliteSeriesArchive {
    /// # Summary
    /// 连接数据库并确保表结构存在。
    ///
    /// # Logic
    /// 1. 解析连接串，开启 `create_if_missing`。
    /// 2. 创建连接池。
    /// 3. 执行建表 SQL。
    ///
    /// # Arguments
    /// * `database_url` - 例如 `sqlite://stocker.db`。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 归档实例或错误。
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::InitError(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        let archive = Self { pool };
        archive.init_schema().await?;
        info!(url = database_url, "Series archive ready");
        Ok(archive)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let value_columns: Vec<String> = ARCHIVED_COLUMNS
            .iter()
            .map(|(column, _)| format!("{} REAL", column))
            .collect();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS stock_data (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                {},
                PRIMARY KEY (ticker, date)
            )",
            value_columns.join(",\n                ")
        );
        sqlx::query(&ddl).execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    /// 已归档的代码列表（按字母序）
    pub async fn tickers(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT ticker FROM stock_data ORDER BY ticker")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl SeriesArchive for SqliteSeriesArchive {
    /// # Summary
    /// 在单个事务中批量写入序列。
    ///
    /// # Logic
    /// 1. 开启事务。
    /// 2. 对每个交易日执行 `INSERT OR REPLACE`，缺失列写为 NULL。
    /// 3. 提交事务。
    async fn save_series(&self, ticker: &str, series: &SeriesFrame) -> Result<usize, StoreError> {
        let names: Vec<&str> = ARCHIVED_COLUMNS.iter().map(|(column, _)| *column).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO stock_data (ticker, date, {}) VALUES (?, ?, {})",
            names.join(", "),
            placeholders
        );

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for (row, date) in series.index().iter().enumerate() {
            let mut query = sqlx::query(&sql).bind(ticker).bind(*date);
            for (_, frame_column) in ARCHIVED_COLUMNS {
                query = query.bind(series.value(frame_column, row));
            }
            query.execute(&mut *tx).await.map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;

        debug!(ticker, rows = series.len(), "Series archived");
        Ok(series.len())
    }

    /// # Summary
    /// 读取闭区间内的归档序列。
    ///
    /// # Logic
    /// 1. 按日期升序查询。
    /// 2. 逐列组装为序列表。
    async fn load_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SeriesFrame, StoreError> {
        let names: Vec<&str> = ARCHIVED_COLUMNS.iter().map(|(column, _)| *column).collect();
        let sql = format!(
            "SELECT date, {} FROM stock_data WHERE ticker = ? AND date >= ? AND date <= ? ORDER BY date ASC",
            names.join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(ticker)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut index = Vec::with_capacity(rows.len());
        let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in &rows {
            index.push(row.try_get::<NaiveDate, _>("date").map_err(db_err)?);
            for (column, values) in names.iter().zip(cells.iter_mut()) {
                values.push(row.try_get::<Option<f64>, _>(*column).map_err(db_err)?);
            }
        }

        let mut frame = SeriesFrame::with_index(index);
        for ((_, frame_column), values) in ARCHIVED_COLUMNS.iter().zip(cells) {
            frame
                .set_column(frame_column, values)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        }
        Ok(frame)
    }
}
