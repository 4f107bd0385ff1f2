use super::*;

const SEQUENCE_TABLE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sequence (
        node_id INTEGER PRIMARY KEY,
        sequence TEXT NOT NULL,
        length INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS membership (
        node_id INTEGER PRIMARY KEY,
        genomes TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS genome (
        idx INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )",
];

const SEQUENCE_INDEX_STATEMENTS: &[&str] =
    &["CREATE UNIQUE INDEX IF NOT EXISTS idx_genome_name ON genome(name)"];

const ADJACENCY_TABLE_STATEMENTS: &[&str] = &["CREATE TABLE IF NOT EXISTS adjacency (
        node_id INTEGER PRIMARY KEY,
        children TEXT NOT NULL
    )"];

pub(super) fn create_sequence_tables(conn: &Connection) -> Result<(), StorageError> {
    for statement in SEQUENCE_TABLE_STATEMENTS
        .iter()
        .chain(SEQUENCE_INDEX_STATEMENTS)
    {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub(super) fn create_adjacency_tables(conn: &Connection) -> Result<(), StorageError> {
    for statement in ADJACENCY_TABLE_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub(super) fn schema_version(conn: &Connection) -> Result<u32, StorageError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version.max(0) as u32)
}

pub(super) fn apply_schema_version(conn: &Connection, label: &str) -> Result<(), StorageError> {
    let stored_version = schema_version(conn)?;

    if stored_version > SCHEMA_VERSION {
        return Err(StorageError::Other(format!(
            "Unsupported {label} schema version: {stored_version} (max supported: {SCHEMA_VERSION})"
        )));
    }

    if stored_version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION.to_string())?;
    }
    Ok(())
}
