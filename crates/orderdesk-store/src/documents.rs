use orderdesk_shared::{CollectionKind, DocId, Fields, Revision, SortDirection};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::remote::{PageQuery, RemoteDocument};

/// Outcome of a replace: whether a document with that id existed before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    pub revision: Revision,
    pub existed: bool,
}

impl Database {
    pub fn insert_document(&self, kind: CollectionKind, id: &DocId, fields: &Fields) -> Result<Revision> {
        let tx = self.conn().unchecked_transaction()?;
        let revision = next_revision(&tx)?;
        tx.execute(
            "INSERT INTO documents (collection, id, revision, sort_value, fields)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kind.name(),
                id.as_str(),
                revision.0 as i64,
                kind.sort_order().value_of(fields),
                serde_json::to_string(fields)?,
            ],
        )?;
        tx.commit()?;
        Ok(revision)
    }

    /// Replace the document's fields, creating it if it does not exist.
    pub fn replace_document(&self, kind: CollectionKind, id: &DocId, fields: &Fields) -> Result<Written> {
        let tx = self.conn().unchecked_transaction()?;
        let existed = document_exists(&tx, kind, id)?;
        let revision = next_revision(&tx)?;
        tx.execute(
            "INSERT INTO documents (collection, id, revision, sort_value, fields)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (collection, id) DO UPDATE SET
                 revision = excluded.revision,
                 sort_value = excluded.sort_value,
                 fields = excluded.fields",
            params![
                kind.name(),
                id.as_str(),
                revision.0 as i64,
                kind.sort_order().value_of(fields),
                serde_json::to_string(fields)?,
            ],
        )?;
        tx.commit()?;
        Ok(Written { revision, existed })
    }

    /// Merge `patch` into an existing document and return the merged result.
    pub fn merge_document(&self, kind: CollectionKind, id: &DocId, patch: &Fields) -> Result<RemoteDocument> {
        let tx = self.conn().unchecked_transaction()?;
        let mut current = read_document(&tx, kind, id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;

        for (key, value) in patch {
            current.fields.insert(key.clone(), value.clone());
        }
        let revision = next_revision(&tx)?;
        tx.execute(
            "UPDATE documents SET revision = ?3, sort_value = ?4, fields = ?5
             WHERE collection = ?1 AND id = ?2",
            params![
                kind.name(),
                id.as_str(),
                revision.0 as i64,
                kind.sort_order().value_of(&current.fields),
                serde_json::to_string(&current.fields)?,
            ],
        )?;
        tx.commit()?;

        current.revision = revision;
        Ok(current)
    }

    /// Delete a document. Returns the revision of the delete, or `None` if
    /// the document did not exist.
    pub fn delete_document(&self, kind: CollectionKind, id: &DocId) -> Result<Option<Revision>> {
        let tx = self.conn().unchecked_transaction()?;
        let affected = tx.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![kind.name(), id.as_str()],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        let revision = next_revision(&tx)?;
        tx.commit()?;
        Ok(Some(revision))
    }

    /// Ordered page of documents strictly after the query cursor.
    pub fn page_documents(&self, kind: CollectionKind, query: &PageQuery) -> Result<Vec<RemoteDocument>> {
        let sql = match query.order.direction {
            SortDirection::Ascending => {
                "SELECT id, revision, fields FROM documents
                 WHERE collection = ?1
                   AND (?2 IS NULL OR sort_value > ?2 OR (sort_value = ?2 AND id > ?3))
                 ORDER BY sort_value ASC, id ASC
                 LIMIT ?4"
            }
            SortDirection::Descending => {
                "SELECT id, revision, fields FROM documents
                 WHERE collection = ?1
                   AND (?2 IS NULL OR sort_value < ?2 OR (sort_value = ?2 AND id > ?3))
                 ORDER BY sort_value DESC, id ASC
                 LIMIT ?4"
            }
        };

        let (after_value, after_id) = match &query.start_after {
            Some(cursor) => (Some(cursor.sort_value.as_str()), Some(cursor.id.as_str())),
            None => (None, None),
        };

        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(
            params![kind.name(), after_value, after_id, query.limit as i64],
            row_to_raw,
        )?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(decode_raw(row?)?);
        }
        Ok(documents)
    }

    /// Whether any document of the collection has `field` equal to `value`.
    pub fn document_exists_where(&self, kind: CollectionKind, field: &str, value: &str) -> Result<bool> {
        let path = format!("$.\"{}\"", field.replace('"', ""));
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM documents
                 WHERE collection = ?1 AND json_extract(fields, ?2) = ?3
                 LIMIT 1",
                params![kind.name(), path, value],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count_documents(&self, kind: CollectionKind) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![kind.name()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn next_revision(conn: &Connection) -> Result<Revision> {
    conn.execute("UPDATE write_sequence SET value = value + 1 WHERE id = 0", [])?;
    let value: i64 = conn.query_row("SELECT value FROM write_sequence WHERE id = 0", [], |row| row.get(0))?;
    Ok(Revision(value as u64))
}

fn document_exists(conn: &Connection, kind: CollectionKind, id: &DocId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2",
            params![kind.name(), id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn read_document(conn: &Connection, kind: CollectionKind, id: &DocId) -> Result<Option<RemoteDocument>> {
    let raw = conn
        .query_row(
            "SELECT id, revision, fields FROM documents WHERE collection = ?1 AND id = ?2",
            params![kind.name(), id.as_str()],
            row_to_raw,
        )
        .optional()?;
    raw.map(decode_raw).transpose()
}

type RawRow = (String, i64, String);

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_raw((id, revision, fields): RawRow) -> Result<RemoteDocument> {
    Ok(RemoteDocument {
        id: DocId(id),
        revision: Revision(revision as u64),
        fields: serde_json::from_str(&fields)?,
    })
}
