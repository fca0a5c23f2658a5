//! Core record types for roster.
//!
//! This module defines the student record as it crosses the wire, the input
//! shapes accepted for create and partial update, and the validation that
//! runs on them before anything reaches the record store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, ValidationError};

/// Unique identifier of a student record.
///
/// Generated by the store at creation time and never reused. The wire form
/// is the hyphenated lowercase UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(Uuid);

impl StudentId {
    /// Generate a fresh, random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if `s` is not a well-formed key.
    pub fn parse(s: &str) -> Result<Self, Error> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

impl FromStr for StudentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A persisted student record, in its wire representation.
///
/// Only these fields are ever exposed to clients; the store's row id and
/// version counter stay inside the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Store-assigned identifier.
    pub id: StudentId,
    /// Display name, never empty.
    pub name: String,
    /// Optional position or role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Level, never empty.
    pub level: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Build a new record from validated fields, stamped with the current time.
    #[must_use]
    pub fn new(fields: StudentFields) -> Self {
        let now = now();
        Self {
            id: StudentId::generate(),
            name: fields.name,
            position: fields.position,
            level: fields.level,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a validated patch into this record.
    ///
    /// Only supplied fields change. `updated_at` always moves forward, even
    /// when two mutations land within the same millisecond.
    pub fn apply(&mut self, patch: &StudentPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(position) = &patch.position {
            self.position = if position.is_empty() {
                None
            } else {
                Some(position.clone())
            };
        }
        if let Some(level) = &patch.level {
            self.level.clone_from(level);
        }

        let now = now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::milliseconds(1)
        };
    }
}

/// Current time at the precision the store keeps.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Validated, trimmed fields for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFields {
    /// Trimmed, non-empty name.
    pub name: String,
    /// Trimmed position, `None` when absent or blank.
    pub position: Option<String>,
    /// Trimmed, non-empty level.
    pub level: String,
}

/// Request body for creating a student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    /// Required name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Required level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl NewStudent {
    /// Validate and trim the request.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming every missing or blank required
    /// field.
    pub fn validate(self) -> Result<StudentFields, ValidationError> {
        let mut errors = ValidationError::new();
        let name = required(&mut errors, "name", self.name);
        let level = required(&mut errors, "level", self.level);
        errors.into_result()?;

        let position = self
            .position
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(StudentFields {
            name: name.unwrap_or_default(),
            position,
            level: level.unwrap_or_default(),
        })
    }
}

/// Request body for a partial update.
///
/// Omitted (or `null`) fields are left untouched. An empty `position`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPatch {
    /// New name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New position, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// New level, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl StudentPatch {
    /// Validate and trim the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `name` or `level` is supplied but
    /// blank.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let name = self
            .name
            .and_then(|n| required(&mut errors, "name", Some(n)));
        let level = self
            .level
            .and_then(|l| required(&mut errors, "level", Some(l)));
        errors.into_result()?;

        Ok(Self {
            name,
            position: self.position.map(|p| p.trim().to_string()),
            level,
        })
    }

    /// Whether no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.position.is_none() && self.level.is_none()
    }
}

fn required(
    errors: &mut ValidationError,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        None => {
            errors.push(field, format!("Path `{field}` is required."));
            None
        }
        Some(v) if v.is_empty() => {
            errors.push(field, format!("Path `{field}` must not be empty."));
            None
        }
        Some(v) => Some(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_student_id_roundtrip() {
        let id = StudentId::generate();
        let parsed = StudentId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_student_id_rejects_malformed() {
        let err = StudentId::parse("not-an-id").unwrap_err();
        assert!(matches!(err, Error::InvalidId(ref s) if s == "not-an-id"));
        assert!("".parse::<StudentId>().is_err());
        assert!("507f1f77bcf86cd799439011".parse::<StudentId>().is_err());
    }

    #[test]
    fn test_student_ids_unique() {
        let a = StudentId::generate();
        let b = StudentId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_student_trims() {
        let fields = NewStudent {
            name: Some("  Ana  ".to_string()),
            position: Some(" Captain ".to_string()),
            level: Some("\tL1\n".to_string()),
        }
        .validate()
        .unwrap();

        assert_eq!(fields.name, "Ana");
        assert_eq!(fields.position.as_deref(), Some("Captain"));
        assert_eq!(fields.level, "L1");
    }

    #[test]
    fn test_new_student_missing_required() {
        let err = NewStudent::default().validate().unwrap_err();
        let names: Vec<_> = err.errors().iter().map(|e| e.field).collect();
        assert_eq!(names, vec!["name", "level"]);
    }

    #[test]
    fn test_new_student_blank_name() {
        let err = NewStudent {
            name: Some("   ".to_string()),
            position: None,
            level: Some("L1".to_string()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].field, "name");
    }

    #[test]
    fn test_new_student_blank_position_is_absent() {
        let fields = NewStudent {
            name: Some("Ana".to_string()),
            position: Some("  ".to_string()),
            level: Some("L1".to_string()),
        }
        .validate()
        .unwrap();
        assert!(fields.position.is_none());
    }

    #[test]
    fn test_patch_validate() {
        let patch = StudentPatch {
            name: None,
            position: None,
            level: Some(" L2 ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(patch.level.as_deref(), Some("L2"));
        assert!(patch.name.is_none());

        let err = StudentPatch {
            name: Some(String::new()),
            ..StudentPatch::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.errors()[0].field, "name");
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(StudentPatch::default().is_empty());
        assert!(!StudentPatch {
            position: Some(String::new()),
            ..StudentPatch::default()
        }
        .is_empty());
    }

    #[test]
    fn test_apply_changes_only_supplied_fields() {
        let mut student = Student::new(fields("Ana", "L1"));
        let before = student.clone();

        student.apply(&StudentPatch {
            level: Some("L2".to_string()),
            ..StudentPatch::default()
        });

        assert_eq!(student.id, before.id);
        assert_eq!(student.name, "Ana");
        assert_eq!(student.level, "L2");
        assert_eq!(student.created_at, before.created_at);
        assert!(student.updated_at > before.updated_at);
    }

    #[test]
    fn test_apply_clears_position() {
        let mut student = Student::new(fields("Ana", "L1"));
        student.position = Some("Captain".to_string());

        student.apply(&StudentPatch {
            position: Some(String::new()),
            ..StudentPatch::default()
        });
        assert!(student.position.is_none());
    }

    #[test]
    fn test_apply_updated_at_strictly_increases() {
        let mut student = Student::new(fields("Ana", "L1"));
        let mut last = student.updated_at;
        for _ in 0..5 {
            student.apply(&StudentPatch::default());
            assert!(student.updated_at > last);
            last = student.updated_at;
        }
    }

    #[test]
    fn test_student_serialization_shape() {
        let student = Student::new(fields("Ana", "L1"));
        let json = serde_json::to_value(&student).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("id"));
        assert!(obj.contains_key("createdAt"));
        assert!(obj.contains_key("updatedAt"));
        assert!(!obj.contains_key("position"));
        assert!(!obj.contains_key("_id"));
        assert_eq!(obj["id"], student.id.to_string());
        assert_eq!(obj["name"], "Ana");
    }

    #[test]
    fn test_student_deserialization() {
        let student = Student::new(fields("Ana", "L1"));
        let json = serde_json::to_string(&student).unwrap();
        let back: Student = serde_json::from_str(&json).unwrap();
        assert_eq!(student, back);
    }
}
