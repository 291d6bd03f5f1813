//! Ledger schema definition
//!
//! The `log` table layout is a compatibility contract: other tooling reads
//! the same database to decide what has already been archived, so the table
//! name, column names, and the normalized-URL primary key must not change.

use rusqlite::Connection;

/// SQL schema for the ledger database
pub const LOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS log (
    url TEXT PRIMARY KEY NOT NULL,
    date TEXT DEFAULT CURRENT_TIMESTAMP NOT NULL
);
";

/// Initializes the ledger schema on a connection
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(LOG_SCHEMA)
}
