//! Record store for roster.
//!
//! This module provides `SQLite`-based persistent storage for student
//! records behind an r2d2 connection pool. The pool is built once at
//! startup and cloned into every request handler.

pub mod migrations;
pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{ffi, params, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result, ValidationError};
use crate::student::{Student, StudentFields, StudentId, StudentPatch};

use schema::STUDENT_COLUMNS;

/// Default number of pooled connections for a file-backed store.
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Storage engine for student records.
///
/// Cheap to clone: clones share the same connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Connection pool.
    pool: Pool<SqliteConnectionManager>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.path)
            .field("pool", &self.pool.state())
            .finish()
    }
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// fills the pool and initializes the schema. Fails if any of that
    /// doesn't succeed, so callers can refuse to start.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
            )
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .map_err(|source| Error::DatabaseOpen {
                path: path.clone(),
                source,
            })?;

        let storage = Self { path, pool };
        migrations::initialize_schema(&*storage.conn()?)?;

        info!("Database opened successfully at {}", storage.path.display());
        Ok(storage)
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// The pool holds exactly one connection that is never recycled, since
    /// every new in-memory connection would see an empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(SqliteConnectionManager::memory())
            .map_err(|source| Error::DatabaseOpen {
                path: path.clone(),
                source,
            })?;

        let storage = Self { path, pool };
        migrations::initialize_schema(&*storage.conn()?)?;
        Ok(storage)
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Check that a connection can be checked out and answers a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// List every record, newest-created first.
    ///
    /// Records created within the same millisecond keep insertion order
    /// (later insert first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self) -> Result<Vec<Student>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY created_at DESC, rowid DESC"
        ))?;

        let students = stmt
            .query_map([], Self::row_to_student)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(students)
    }

    /// Get a record by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &StudentId) -> Result<Option<Student>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
                [id.to_string()],
                Self::row_to_student,
            )
            .optional()?;
        Ok(result)
    }

    /// Insert a new record built from validated fields.
    ///
    /// The store assigns `id`, `created_at` and `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] on a unique-constraint collision,
    /// [`Error::Validation`] if a column constraint rejects the row, or a
    /// database error.
    pub fn insert(&self, fields: StudentFields) -> Result<Student> {
        let student = Student::new(fields);
        self.insert_record(&student)?;
        debug!("Inserted student with id {}", student.id);
        Ok(student)
    }

    fn insert_record(&self, student: &Student) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO students (id, name, position, level, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                student.id.to_string(),
                student.name,
                student.position,
                student.level,
                format_timestamp(student.created_at),
                format_timestamp(student.updated_at),
            ],
        )
        .map_err(|e| constraint_error(e, student))?;
        Ok(())
    }

    /// Apply a validated partial update.
    ///
    /// Returns the updated record, or `None` if no record has this id.
    /// Concurrent updates to the same record are last-writer-wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] or [`Error::Validation`] if the store
    /// rejects the new values, or a database error.
    pub fn update(&self, id: &StudentId, patch: &StudentPatch) -> Result<Option<Student>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
                [id.to_string()],
                Self::row_to_student,
            )
            .optional()?;
        let Some(mut student) = existing else {
            return Ok(None);
        };

        student.apply(patch);
        tx.execute(
            r"
            UPDATE students
            SET name = ?2, position = ?3, level = ?4, updated_at = ?5, version = version + 1
            WHERE id = ?1
            ",
            params![
                student.id.to_string(),
                student.name,
                student.position,
                student.level,
                format_timestamp(student.updated_at),
            ],
        )
        .map_err(|e| constraint_error(e, &student))?;
        tx.commit()?;

        debug!("Updated student with id {}", student.id);
        Ok(Some(student))
    }

    /// Delete a record by id.
    ///
    /// Returns `true` if a record was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: &StudentId) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM students WHERE id = ?1", [id.to_string()])?;
        if affected > 0 {
            debug!("Deleted student with id {}", id);
        }
        Ok(affected > 0)
    }

    /// Count stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Convert a database row to a Student struct.
    fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(4)?;
        let updated_at: String = row.get(5)?;

        Ok(Student {
            id: StudentId::parse(&id)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))?,
            name: row.get(1)?,
            position: row.get(2)?,
            level: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
            updated_at: parse_timestamp(5, &updated_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map constraint violations to record-level errors.
///
/// Unique and primary-key collisions become [`Error::DuplicateKey`] naming
/// the offending columns; `CHECK`/`NOT NULL` failures become validation
/// errors. Anything else passes through as a query error.
fn constraint_error(err: rusqlite::Error, student: &Student) -> Error {
    let rusqlite::Error::SqliteFailure(ffi_err, message) = &err else {
        return err.into();
    };
    if ffi_err.code != rusqlite::ErrorCode::ConstraintViolation {
        return err.into();
    }
    let message = message.clone().unwrap_or_default();

    match ffi_err.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            let mut fields = serde_json::Map::new();
            for column in constrained_columns(&message) {
                let value = match column {
                    "id" => serde_json::json!(student.id),
                    "name" => serde_json::json!(student.name),
                    "position" => serde_json::json!(student.position),
                    "level" => serde_json::json!(student.level),
                    _ => serde_json::Value::Null,
                };
                fields.insert(column.to_string(), value);
            }
            Error::DuplicateKey { fields }
        }
        ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
            let mut errors = ValidationError::new();
            errors.push("record", message);
            Error::Validation(errors)
        }
        _ => err.into(),
    }
}

/// Extract column names from `"UNIQUE constraint failed: students.a, students.b"`.
fn constrained_columns(message: &str) -> Vec<&str> {
    message
        .split_once(": ")
        .map(|(_, cols)| {
            cols.split(", ")
                .map(|c| c.rsplit('.').next().unwrap_or(c).trim())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::NewStudent;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn fields(name: &str, level: &str) -> StudentFields {
        NewStudent {
            name: Some(name.to_string()),
            position: None,
            level: Some(level.to_string()),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
        assert!(storage.unwrap().ping().is_ok());
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let created = storage.insert(fields("Ana", "L1")).unwrap();

        let retrieved = storage.get(&created.id).unwrap();
        assert_eq!(retrieved, Some(created));
    }

    #[test]
    fn test_insert_assigns_unique_ids() {
        let storage = create_test_storage();
        let a = storage.insert(fields("Ana", "L1")).unwrap();
        let b = storage.insert(fields("Ana", "L1")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_insert_duplicate_id() {
        let storage = create_test_storage();
        let student = Student::new(fields("Ana", "L1"));
        storage.insert_record(&student).unwrap();

        let err = storage.insert_record(&student).unwrap_err();
        match err {
            Error::DuplicateKey { fields } => {
                assert_eq!(fields["id"], student.id.to_string());
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_store_rejects_empty_name() {
        let storage = create_test_storage();
        let mut student = Student::new(fields("Ana", "L1"));
        student.name = String::new();

        let err = storage.insert_record(&student).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        let result = storage.get(&StudentId::generate()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let storage = create_test_storage();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(storage.insert(fields(&format!("S{i}"), "L1")).unwrap().id);
        }

        let listed: Vec<_> = storage.list().unwrap().into_iter().map(|s| s.id).collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_list_empty() {
        let storage = create_test_storage();
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_update_partial() {
        let storage = create_test_storage();
        let created = storage.insert(fields("Ana", "L1")).unwrap();

        let patch = StudentPatch {
            level: Some("L2".to_string()),
            ..StudentPatch::default()
        };
        let updated = storage.update(&created.id, &patch).unwrap().unwrap();

        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.level, "L2");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(storage.get(&created.id).unwrap(), Some(updated));
    }

    #[test]
    fn test_update_bumps_version() {
        let storage = create_test_storage();
        let created = storage.insert(fields("Ana", "L1")).unwrap();
        storage
            .update(&created.id, &StudentPatch::default())
            .unwrap();
        storage
            .update(&created.id, &StudentPatch::default())
            .unwrap();

        let version: i64 = storage
            .conn()
            .unwrap()
            .query_row(
                "SELECT version FROM students WHERE id = ?1",
                [created.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_update_nonexistent() {
        let storage = create_test_storage();
        let result = storage
            .update(&StudentId::generate(), &StudentPatch::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_delete() {
        let storage = create_test_storage();
        let created = storage.insert(fields("Ana", "L1")).unwrap();

        assert!(storage.delete(&created.id).unwrap());
        assert!(storage.get(&created.id).unwrap().is_none());
        assert!(!storage.delete(&created.id).unwrap());
    }

    #[test]
    fn test_delete_nonexistent() {
        let storage = create_test_storage();
        assert!(!storage.delete(&StudentId::generate()).unwrap());
    }

    #[test]
    fn test_position_roundtrip() {
        let storage = create_test_storage();
        let created = storage
            .insert(
                NewStudent {
                    name: Some("Ana".to_string()),
                    position: Some("Captain".to_string()),
                    level: Some("L1".to_string()),
                }
                .validate()
                .unwrap(),
            )
            .unwrap();

        let retrieved = storage.get(&created.id).unwrap().unwrap();
        assert_eq!(retrieved.position.as_deref(), Some("Captain"));
    }

    #[test]
    fn test_unicode_content() {
        let storage = create_test_storage();
        let created = storage.insert(fields("Zoë 世界", "Nivel ñ")).unwrap();
        let retrieved = storage.get(&created.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Zoë 世界");
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("students.db");

        let storage = Storage::open(&db_path, 4).unwrap();
        let created = storage.insert(fields("Ana", "L1")).unwrap();
        assert_eq!(storage.path(), db_path);
        drop(storage);

        let reopened = Storage::open(&db_path, 4).unwrap();
        assert_eq!(reopened.get(&created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/students.db");

        let storage = Storage::open(&nested_path, 2).unwrap();
        assert!(nested_path.exists());
        drop(storage);
    }

    #[test]
    fn test_storage_clone_shares_pool() {
        let storage = create_test_storage();
        let clone = storage.clone();
        let created = storage.insert(fields("Ana", "L1")).unwrap();
        assert!(clone.get(&created.id).unwrap().is_some());
    }

    #[test]
    fn test_storage_debug() {
        let storage = create_test_storage();
        let debug_str = format!("{storage:?}");
        assert!(debug_str.contains("Storage"));
        assert!(debug_str.contains(":memory:"));
    }

    #[test]
    fn test_constrained_columns() {
        assert_eq!(
            constrained_columns("UNIQUE constraint failed: students.id"),
            vec!["id"]
        );
        assert_eq!(
            constrained_columns("UNIQUE constraint failed: students.name, students.level"),
            vec!["name", "level"]
        );
        assert!(constrained_columns("garbage").is_empty());
    }

    #[test]
    fn test_timestamp_format_roundtrip() {
        let ts = crate::student::now();
        let formatted = format_timestamp(ts);
        assert_eq!(formatted.len(), "2024-01-01T00:00:00.000Z".len());
        assert_eq!(parse_timestamp(0, &formatted).unwrap(), ts);
    }
}
