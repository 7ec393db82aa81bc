//! All-or-nothing transaction scope for multi-document writes.

use log::{debug, error, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fmt::Display;
use std::time::Instant;

/// Runs `body` inside one immediate transaction on `conn`.
///
/// The write lock is taken before `body` runs, so the gating reads it performs
/// see the same state its writes are applied to. `Ok` commits once; `Err`
/// rolls back every write made by `body` and is returned unchanged. Nothing
/// is retried.
///
/// # Errors
/// - Returns the error produced by `body`.
/// - Returns a store error when the transaction cannot begin or commit.
pub fn run_in_transaction<T, E, F>(conn: &Connection, operation: &str, body: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<rusqlite::Error> + Display,
{
    let started_at = Instant::now();
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    match body(&tx) {
        Ok(value) => {
            if let Err(err) = tx.commit() {
                error!(
                    "event=tx_commit module=db status=error op={} duration_ms={} error={}",
                    operation,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
            debug!(
                "event=tx_commit module=db status=ok op={} duration_ms={}",
                operation,
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=tx_rollback module=db status=error op={} error={}",
                    operation, rollback_err
                );
            }
            warn!(
                "event=tx_abort module=db status=aborted op={} duration_ms={} reason={}",
                operation,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
