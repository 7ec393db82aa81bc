//! Schema versions of the content store.
//!
//! Each step is an embedded SQL script. The applied version lives in
//! `PRAGMA user_version`, so opening an up-to-date store costs one pragma
//! read.
//!
//! # Invariants
//! - Steps are listed in ascending version order without gaps.
//! - Pending steps run inside one immediate transaction: a failed step leaves
//!   the store at its previous version, and two processes racing on a fresh
//!   file migrate it once.
//! - A store written by a newer binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

struct SchemaStep {
    version: u32,
    label: &'static str,
    script: &'static str,
}

const STEPS: [SchemaStep; 2] = [
    SchemaStep {
        version: 1,
        label: "content_collections",
        script: include_str!("0001_content_collections.sql"),
    },
    SchemaStep {
        version: 2,
        label: "ownership_indexes",
        script: include_str!("0002_ownership_indexes.sql"),
    },
];

/// Schema version this binary writes.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Brings the store behind `conn` up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    match stored_version(conn)? {
        found if found > latest => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: found,
                latest_supported: latest,
            })
        }
        found if found == latest => return Ok(()),
        _ => {}
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Re-read under the write lock; another process may have finished first.
    let start = stored_version(&tx)?;
    for step in STEPS.iter().filter(|step| step.version > start) {
        tx.execute_batch(step.script)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} step={}",
            step.version, step.label
        );
    }
    tx.commit()?;
    Ok(())
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
