use sqlx::PgPool;

use crate::error::IndexerError;
use crate::indexer::types::{InEvent, OutEvent};

/// What became of an inbound receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InOutcome {
    /// A pending outbound row was completed.
    Completed,
    /// No matching outbound send was ever observed.
    Lost,
    /// The receipt was already recorded (duplicate delivery).
    Duplicate,
}

/// Open a transfer: one row per kappa, born pending. Replayed logs trip the
/// primary key and are absorbed as duplicate delivery.
pub async fn insert_out(pool: &PgPool, ev: &OutEvent) -> Result<bool, IndexerError> {
    let result = sqlx::query(
        "INSERT INTO txs (kappa, from_tx_hash, from_address, to_address, sent_value, \
         from_chain_id, to_chain_id, sent_time, sent_token, received_token, pending)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)",
    )
    .bind(ev.kappa.as_slice())
    .bind(ev.from_tx_hash.as_slice())
    .bind(ev.from_address.as_slice())
    .bind(ev.to_address.as_slice())
    .bind(ev.sent_value.to_string())
    .bind(ev.from_chain_id as i64)
    .bind(ev.to_chain_id as i64)
    .bind(ev.sent_time as i64)
    .bind(ev.sent_token.as_slice())
    .bind(ev.received_token.as_slice())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            tracing::debug!(kappa = %ev.kappa, "Outbound transfer already recorded");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Settle an inbound receipt against its pending outbound row, or record it
/// as lost when no such row exists. A completed row re-targeted by a replay
/// re-updates with identical values, which is harmless.
pub async fn apply_in(pool: &PgPool, ev: &InEvent) -> Result<InOutcome, IndexerError> {
    let update = sqlx::query(
        "UPDATE txs
         SET to_tx_hash = $1, received_value = $2, pending = FALSE, received_time = $3, \
         swap_success = $4
         WHERE kappa = $5",
    )
    .bind(ev.to_tx_hash.as_slice())
    .bind(ev.received_value.to_string())
    .bind(ev.received_time as i64)
    .bind(ev.swap_success)
    .bind(ev.kappa.as_slice())
    .execute(pool)
    .await;

    match update {
        Ok(result) => match result.rows_affected() {
            1 => return Ok(InOutcome::Completed),
            0 => {}
            n => {
                return Err(IndexerError::Invariant(format!(
                    "inbound update for kappa {} touched {} rows",
                    ev.kappa, n
                )))
            }
        },
        Err(e) => {
            // Defensive: a failed update must still leave a trace of the
            // receipt, so fall through to the lost table.
            tracing::warn!(kappa = %ev.kappa, error = %e, "Inbound update failed, recording as lost");
        }
    }

    insert_lost(pool, ev).await
}

async fn insert_lost(pool: &PgPool, ev: &InEvent) -> Result<InOutcome, IndexerError> {
    let result = sqlx::query(
        "INSERT INTO lost_txs (kappa, to_tx_hash, to_address, received_value, to_chain_id, \
         received_time, received_token, swap_success, fee)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(ev.kappa.as_slice())
    .bind(ev.to_tx_hash.as_slice())
    .bind(ev.to_address.as_slice())
    .bind(ev.received_value.to_string())
    .bind(ev.to_chain_id as i64)
    .bind(ev.received_time as i64)
    .bind(ev.received_token.as_slice())
    .bind(ev.swap_success)
    .bind(ev.fee.to_string())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(InOutcome::Lost),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            tracing::debug!(kappa = %ev.kappa, "Lost receipt already recorded");
            Ok(InOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}
