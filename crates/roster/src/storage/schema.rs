//! `SQLite` schema definitions for the record store.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the students table.
///
/// `name` and `level` carry `CHECK` constraints so the store refuses empty
/// values even if a caller skips validation. `version` counts mutations and
/// is never exposed.
pub const CREATE_STUDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL CHECK (length(name) > 0),
    position TEXT,
    level TEXT NOT NULL CHECK (length(level) > 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0
)
";

/// SQL statement to create an index on `created_at` for newest-first listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_students_created_at ON students(created_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_STUDENTS_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_METADATA_TABLE,
];

/// Columns selected for a student row, in the order `row_to_student` reads them.
pub const STUDENT_COLUMNS: &str = "id, name, position, level, created_at, updated_at";
