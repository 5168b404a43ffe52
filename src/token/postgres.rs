use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{PgPool, Row};

use crate::core::error::Error;
use crate::token::claims::{IssuedTokenRecord, TokenKind};
use crate::token::store::{RecordFilter, TokenStore};

#[derive(Clone, Debug)]
pub(crate) struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TokenStore for PgTokenStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<IssuedTokenRecord>, Error> {
        if filter.keys.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT unique_id, subject_id, kind, expires_at
            FROM issued_tokens
            WHERE unique_id = ANY($1)
            AND ($2::BIGINT IS NULL OR expires_at > $2);",
        )
        .bind(filter.unique_ids())
        .bind(filter.live_at)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let record = map_record(row)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn insert_pair(
        &self,
        access: &IssuedTokenRecord,
        refresh: &IssuedTokenRecord,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        if let Err(e) = insert(&mut *tx, access).await {
            return Err(classify_insert_error(e, Error::StoreUnavailable));
        }

        // Dropping the transaction rolls back the access row.
        if let Err(e) = insert(&mut *tx, refresh).await {
            return Err(classify_insert_error(e, Error::PartialWrite));
        }

        tx.commit().await?;

        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM issued_tokens WHERE expires_at <= $1;")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

async fn insert(conn: &mut PgConnection, record: &IssuedTokenRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO issued_tokens (unique_id, subject_id, kind, expires_at)
        VALUES ($1, $2, $3, $4);",
    )
    .bind(&record.unique_id)
    .bind(record.subject_id)
    .bind(record.kind.as_str())
    .bind(record.expires_at)
    .execute(conn)
    .await?;

    Ok(())
}

fn classify_insert_error(e: sqlx::Error, otherwise: fn(sqlx::Error) -> Error) -> Error {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::DuplicateIssuance
        }
        e => otherwise(e),
    }
}

fn map_record(row: PgRow) -> Result<IssuedTokenRecord, Error> {
    let kind: String = row.try_get("kind")?;

    Ok(IssuedTokenRecord {
        unique_id: row.try_get("unique_id")?,
        subject_id: row.try_get("subject_id")?,
        expires_at: row.try_get("expires_at")?,
        kind: kind.parse::<TokenKind>()?,
    })
}
