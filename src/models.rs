use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A stored record as it travels through the store and the gateway.
///
/// The service side never interprets records beyond their natural key and
/// the handful of fields used for filtering, so it works on JSON objects.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub class_id: String,
}

/// A dated attendance-taking session for one subject.
///
/// `class_id` duplicates the subject's class for cheap filtering and must
/// always equal it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date_time: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub subject_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub class_id: String,
}

/// `id` is also the payload printed in the student's QR card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dob: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub class_id: String,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub activity_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub student_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: String,
}

/// Users stored without a recognised role read back as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Monitor,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub password: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub activity_id: String,
    pub activity_name: String,
    pub total_students: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub present_rate: f64,
}

/// Renders a key-like JSON value the way the stored data compares keys:
/// strings as-is, numbers and booleans by their text. Null, empty strings
/// and structured values carry no key.
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The identity used for merge and delete: `id` when present, otherwise
/// `username`.
pub fn natural_key(record: &Record) -> Option<String> {
    record
        .get("id")
        .and_then(key_text)
        .or_else(|| record.get("username").and_then(key_text))
}

/// Records are stored without validation, and imported rosters carry
/// numeric ids and blank cells as null. Missing, null and scalar values all
/// read back as text so one odd record never fails a whole list.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        other => key_text(&other).unwrap_or_default(),
    })
}

fn lenient_role<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Compares a record field against a filter value using key text, so a
/// numeric `classId` of 7 matches the query string "7".
pub fn field_matches(record: &Record, field: &str, expected: &str) -> bool {
    record
        .get(field)
        .and_then(key_text)
        .map(|v| v == expected)
        .unwrap_or(false)
}
