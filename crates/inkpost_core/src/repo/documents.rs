//! Document column codecs shared by the entity repositories.

use crate::model::entity::{Entity, EntityId, EntityKind, Ref};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Back-reference list column on an owning document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RefListColumn {
    pub owner: EntityKind,
    pub table: &'static str,
    pub column: &'static str,
}

pub(crate) fn parse_entity_id(value: &str, column: &str) -> RepoResult<EntityId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid id value `{value}` in {column}")))
}

pub(crate) fn encode_refs<T>(refs: &[Ref<T>]) -> RepoResult<String> {
    serde_json::to_string(refs)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode id list: {err}")))
}

pub(crate) fn decode_refs<T: Entity>(raw: &str, column: &str) -> RepoResult<Vec<Ref<T>>> {
    serde_json::from_str(raw)
        .map_err(|err| RepoError::InvalidData(format!("invalid id list in {column}: {err}")))
}

/// Appends `target` to the list unless it is already present.
pub(crate) fn push_ref<T: Entity>(
    conn: &Connection,
    list: RefListColumn,
    owner_id: EntityId,
    target: Ref<T>,
) -> RepoResult<()> {
    rewrite_ref_list::<T>(conn, list, owner_id, |refs| {
        if !refs.contains(&target) {
            refs.push(target);
        }
    })
}

/// Removes every occurrence of `target`; absent targets are a no-op.
pub(crate) fn pull_ref<T: Entity>(
    conn: &Connection,
    list: RefListColumn,
    owner_id: EntityId,
    target: Ref<T>,
) -> RepoResult<()> {
    rewrite_ref_list::<T>(conn, list, owner_id, |refs| {
        refs.retain(|current| *current != target);
    })
}

// Read-modify-write of one document column. Callers that need the update to
// be isolated from concurrent writers pass a connection inside a transaction.
fn rewrite_ref_list<T: Entity>(
    conn: &Connection,
    list: RefListColumn,
    owner_id: EntityId,
    edit: impl FnOnce(&mut Vec<Ref<T>>),
) -> RepoResult<()> {
    let RefListColumn {
        owner,
        table,
        column,
    } = list;
    let owner_text = owner_id.to_string();

    let raw: Option<String> = conn
        .query_row(
            &format!("SELECT {column} FROM {table} WHERE id = ?1;"),
            [owner_text.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let raw = raw.ok_or(RepoError::NotFound {
        kind: owner,
        id: owner_id,
    })?;

    let mut refs = decode_refs::<T>(&raw, &format!("{table}.{column}"))?;
    edit(&mut refs);
    let encoded = encode_refs(&refs)?;

    conn.execute(
        &format!(
            "UPDATE {table}
             SET {column} = ?2,
                 updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;"
        ),
        params![owner_text, encoded],
    )?;
    Ok(())
}
