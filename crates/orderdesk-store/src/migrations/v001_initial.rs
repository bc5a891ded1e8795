//! v001 -- Initial schema creation.
//!
//! Creates the `documents` table holding every collection's documents as JSON
//! field mappings, and the single-row `write_sequence` counter that stamps
//! each write with a revision.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Documents
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,                 -- customers | products | orders
    id         TEXT NOT NULL,                 -- store-assigned identifier
    revision   INTEGER NOT NULL,              -- write_sequence value of the last write
    sort_value TEXT NOT NULL DEFAULT '',      -- value of the collection's sort field
    fields     TEXT NOT NULL,                 -- JSON object

    PRIMARY KEY (collection, id)
);

-- ----------------------------------------------------------------
-- Write sequence (single row)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS write_sequence (
    id    INTEGER PRIMARY KEY CHECK (id = 0),
    value INTEGER NOT NULL
);

INSERT OR IGNORE INTO write_sequence (id, value) VALUES (0, 0);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
