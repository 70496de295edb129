/// PostgreSQL-backed reading store.
///
/// Owns a single `postgres::Client`, opened lazily on first use and reopened
/// if the server drops it. Every statement runs under the configured
/// `statement_timeout`, so a stalled server fails the operation instead of
/// hanging the run.
///
/// Snapshot replacement is a delete followed by batched inserts and is not
/// wrapped in a transaction; concurrent writers for one source are kept apart
/// with a session advisory lock keyed on `source_id`.

use std::time::Duration;

use ::postgres::fallible_iterator::FallibleIterator;
use ::postgres::types::ToSql;
use ::postgres::{Client, Config, NoTls, Row};
use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{Reading, SourceExtent, TimeRange};
use crate::store::ReadingStore;

/// Rows per multi-row INSERT; four parameters each stays well under the
/// protocol's 65535 parameter cap.
const INSERT_BATCH: usize = 1000;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS turbine_readings (
        source_id    INTEGER          NOT NULL,
        timestamp    TIMESTAMP        NOT NULL,
        wind_speed   DOUBLE PRECISION NOT NULL CHECK (wind_speed >= 0),
        power_output DOUBLE PRECISION NOT NULL CHECK (power_output >= 0)
    );
    CREATE INDEX IF NOT EXISTS idx_turbine_readings_source_time
        ON turbine_readings (source_id, timestamp);
";

const RANGE_SQL: &str = "
    SELECT source_id, timestamp, wind_speed, power_output
    FROM turbine_readings
    WHERE source_id = $1
      AND ($2::timestamp IS NULL OR timestamp >= $2)
      AND ($3::timestamp IS NULL OR timestamp <= $3)
    ORDER BY timestamp ASC
";

pub struct PgStore {
    config: Config,
    client: Option<Client>,
}

impl PgStore {
    /// Prepares a store for `database_url`. No connection is made until the
    /// first operation.
    pub fn new(database_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut config: Config = database_url.parse().map_err(StoreError::Connect)?;
        config.connect_timeout(timeout);
        config.options(&format!("-c statement_timeout={}", timeout.as_millis()));
        Ok(Self { config, client: None })
    }

    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Closes the connection, if open.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("database connection closed");
        }
    }

    fn client(&mut self) -> Result<&mut Client, StoreError> {
        if !self.is_connected() {
            let client = self.config.connect(NoTls).map_err(StoreError::Connect)?;
            info!("database connection opened");
            self.client = Some(client);
        }
        self.client
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("connection not open".to_string()))
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn reading_from_row(row: &Row) -> Result<Reading, StoreError> {
    Ok(Reading {
        source_id: row.try_get(0)?,
        timestamp: row.try_get(1)?,
        wind_speed: row.try_get(2)?,
        power_output: row.try_get(3)?,
    })
}

impl ReadingStore for PgStore {
    fn ensure_indexes(&mut self) -> Result<(), StoreError> {
        self.client()?.batch_execute(SCHEMA_SQL)?;
        debug!("turbine_readings schema and index ensured");
        Ok(())
    }

    fn ping(&mut self) -> Result<(), StoreError> {
        self.client()?.simple_query("SELECT 1")?;
        Ok(())
    }

    fn lock_source(&mut self, source_id: i32) -> Result<(), StoreError> {
        self.client()?
            .execute("SELECT pg_advisory_lock($1::bigint)", &[&i64::from(source_id)])?;
        Ok(())
    }

    fn unlock_source(&mut self, source_id: i32) -> Result<(), StoreError> {
        self.client()?
            .execute("SELECT pg_advisory_unlock($1::bigint)", &[&i64::from(source_id)])?;
        Ok(())
    }

    fn delete_source(&mut self, source_id: i32) -> Result<u64, StoreError> {
        let deleted = self
            .client()?
            .execute("DELETE FROM turbine_readings WHERE source_id = $1", &[&source_id])?;
        Ok(deleted)
    }

    fn insert_readings(&mut self, readings: &[Reading]) -> Result<u64, StoreError> {
        let client = self.client()?;
        let mut written = 0;

        for batch in readings.chunks(INSERT_BATCH) {
            let placeholders: Vec<String> = (0..batch.len())
                .map(|i| {
                    let p = i * 4;
                    format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4)
                })
                .collect();
            let sql = format!(
                "INSERT INTO turbine_readings (source_id, timestamp, wind_speed, power_output) VALUES {}",
                placeholders.join(", ")
            );

            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(batch.len() * 4);
            for r in batch {
                params.push(&r.source_id);
                params.push(&r.timestamp);
                params.push(&r.wind_speed);
                params.push(&r.power_output);
            }

            written += client.execute(sql.as_str(), &params)?;
        }

        Ok(written)
    }

    fn fetch_readings(
        &mut self,
        source_id: i32,
        range: &TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<Reading>, StoreError> {
        // LIMIT NULL is LIMIT ALL.
        let limit = limit.map(|l| l as i64);
        let sql = format!("{RANGE_SQL} LIMIT $4");
        let rows = self
            .client()?
            .query(sql.as_str(), &[&source_id, &range.start, &range.end, &limit])?;
        rows.iter().map(reading_from_row).collect()
    }

    fn scan_readings(
        &mut self,
        source_id: i32,
        range: &TimeRange,
        visit: &mut dyn FnMut(&Reading),
    ) -> Result<(), StoreError> {
        let params: [&(dyn ToSql + Sync); 3] = [&source_id, &range.start, &range.end];
        let mut rows = self.client()?.query_raw(RANGE_SQL, params.iter().copied())?;
        while let Some(row) = rows.next()? {
            visit(&reading_from_row(&row)?);
        }
        Ok(())
    }

    fn source_extent(&mut self, source_id: i32) -> Result<SourceExtent, StoreError> {
        let row = self.client()?.query_one(
            "SELECT COUNT(*), MIN(timestamp), MAX(timestamp)
             FROM turbine_readings
             WHERE source_id = $1",
            &[&source_id],
        )?;
        let count: i64 = row.try_get(0)?;
        let oldest: Option<NaiveDateTime> = row.try_get(1)?;
        let newest: Option<NaiveDateTime> = row.try_get(2)?;
        Ok(SourceExtent { reading_count: count.max(0) as u64, oldest, newest })
    }
}
