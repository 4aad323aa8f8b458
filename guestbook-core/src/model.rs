//! Directory entries and identifiers shared by the intake workflow.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Identifier of a staff member or student.
///
/// The reference-data endpoint sends ids as JSON numbers or numeric strings
/// depending on the table they come from. Everything is normalized once, when
/// the directory is loaded, so `7` and `"7"` compare equal afterwards. A
/// string only becomes a number when it prints back unchanged: `"0012"`
/// stays text and never collides with `12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Parse a textual id. Blank input means "no selection".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<i64>() {
            Ok(n) if n.to_string() == trimmed => Some(EntityId::Number(n)),
            _ => Some(EntityId::Text(trimmed.to_string())),
        }
    }

    /// Normalize a raw JSON value. Null, booleans, containers and blank
    /// strings carry no usable id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(EntityId::Number(i))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| EntityId::Number(f as i64))
                        .or_else(|| Some(EntityId::Text(n.to_string())))
                }
            }
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntityId::Number(n) => serializer.serialize_i64(*n),
            EntityId::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// The value of a select control: an id, or nothing.
///
/// On the wire an empty selection is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(pub Option<EntityId>);

impl Selection {
    pub fn id(&self) -> Option<&EntityId> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Some(id) => id.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }
}

/// A selectable staff entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryOption {
    pub value: EntityId,
    pub label: String,
}

/// A selectable student entry with the fields shown once it is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentOption {
    pub value: EntityId,
    /// Search label, `"{nis} | {name}"`.
    pub label: String,
    pub student_name: String,
    pub nis: Option<String>,
    pub nisn: Option<String>,
    pub kelas: Option<String>,
}

/// Read-only student details displayed under the student picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentSnapshot {
    pub nis: String,
    pub nisn: String,
    pub kelas: String,
}

impl StudentSnapshot {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_option(option: &StudentOption) -> Self {
        Self {
            nis: option.nis.clone().unwrap_or_default(),
            nisn: option.nisn.clone().unwrap_or_default(),
            kelas: option.kelas.clone().unwrap_or_default(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.nis.is_empty() && self.nisn.is_empty() && self.kelas.is_empty()
    }

    /// Class as displayed; a missing class shows as "-".
    pub fn class_label(&self) -> &str {
        if self.kelas.is_empty() {
            "-"
        } else {
            &self.kelas
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_and_numbers_normalize_to_the_same_id() {
        assert_eq!(EntityId::from_json(&json!(7)), EntityId::from_json(&json!("7")));
        assert_eq!(EntityId::from_json(&json!(" 12 ")), Some(EntityId::Number(12)));
        assert_eq!(EntityId::from_json(&json!(3.0)), Some(EntityId::Number(3)));
    }

    #[test]
    fn non_numeric_ids_are_kept_as_text() {
        assert_eq!(
            EntityId::from_json(&json!("S-001")),
            Some(EntityId::Text("S-001".to_string()))
        );
    }

    #[test]
    fn leading_zero_ids_stay_distinct_from_their_numeric_value() {
        let padded = EntityId::from_json(&json!("0012")).unwrap();
        assert_eq!(padded, EntityId::Text("0012".to_string()));
        assert_ne!(Some(padded.clone()), EntityId::from_json(&json!("12")));
        assert_ne!(Some(padded.clone()), EntityId::from_json(&json!(12)));
        assert_eq!(serde_json::to_value(&padded).unwrap(), json!("0012"));

        assert_eq!(EntityId::parse("+5"), Some(EntityId::Text("+5".to_string())));
        assert_eq!(EntityId::parse("-5"), Some(EntityId::Number(-5)));
    }

    #[test]
    fn blank_and_null_ids_are_rejected() {
        assert_eq!(EntityId::from_json(&json!("")), None);
        assert_eq!(EntityId::from_json(&json!("   ")), None);
        assert_eq!(EntityId::from_json(&Value::Null), None);
        assert_eq!(EntityId::from_json(&json!(true)), None);
    }

    #[test]
    fn empty_selection_serializes_as_empty_string() {
        assert_eq!(serde_json::to_value(Selection(None)).unwrap(), json!(""));
        assert_eq!(
            serde_json::to_value(Selection(Some(EntityId::Number(4)))).unwrap(),
            json!(4)
        );
        assert_eq!(
            serde_json::to_value(Selection(Some(EntityId::Text("x".into())))).unwrap(),
            json!("x")
        );
    }

    #[test]
    fn snapshot_class_label_falls_back_to_dash() {
        let snapshot = StudentSnapshot::blank();
        assert!(snapshot.is_blank());
        assert_eq!(snapshot.class_label(), "-");
    }
}
