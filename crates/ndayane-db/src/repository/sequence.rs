//! # Sequence Repository
//!
//! Atomic counters behind document numbers.
//!
//! ```text
//! next_value("VT202610")
//!      │
//!      ▼
//! INSERT INTO document_sequences (prefix, last_value) VALUES ('VT202610', 1)
//! ON CONFLICT (prefix) DO UPDATE SET last_value = last_value + 1
//! RETURNING last_value
//!      │
//!      ▼
//! 1, 2, 3, ... one statement, so two cashiers can never get the same value
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use ndayane_core::numbering::{format_number, sequence_key, DocumentKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRepository;

impl SequenceRepository {
    /// Increments and returns the counter for `key`, starting at 1.
    pub async fn next_value(&self, conn: &mut SqliteConnection, key: &str) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (prefix, last_value) VALUES (?1, 1)
            ON CONFLICT (prefix) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;

        Ok(value)
    }

    /// Allocates the next document number for `kind` in the month of `at`.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let number = db.sequences().next_number(&mut tx, DocumentKind::Sale, now).await?;
    /// // "VT2026100001"
    /// ```
    pub async fn next_number(
        &self,
        conn: &mut SqliteConnection,
        kind: DocumentKind,
        at: DateTime<Utc>,
    ) -> DbResult<String> {
        let key = sequence_key(kind, at);
        let value = self.next_value(conn, &key).await?;
        let number = format_number(&key, value);

        debug!(number = %number, "Allocated document number");
        Ok(number)
    }
}
