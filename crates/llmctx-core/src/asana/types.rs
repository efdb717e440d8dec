//! Asana API record shapes.
//!
//! Projects and stories use fixed fields. Tasks keep the raw JSON object
//! because the rendered fields are chosen by configuration.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A compact user reference (`owner`, `created_by`, `assignee`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub gid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub gid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub owner: Option<UserRef>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_on: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

/// A task as returned by the API, restricted to the requested fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRecord(pub Map<String, Value>);

impl TaskRecord {
    pub fn gid(&self) -> Option<&str> {
        self.0.get("gid").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Value> for TaskRecord {
    /// Non-object values become an empty record.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// One entry of a task's story (comment and activity) history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub gid: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Pagination cursor returned alongside list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPage {
    pub offset: String,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub next_page: Option<NextPage>,
}

impl<T> Page<T> {
    /// A final page holding `data`.
    pub fn last(data: Vec<T>) -> Self {
        Self {
            data,
            next_page: None,
        }
    }

    /// The offset of the following page, if any.
    pub fn next_offset(&self) -> Option<&str> {
        self.next_page
            .as_ref()
            .map(|next| next.offset.as_str())
            .filter(|offset| !offset.is_empty())
    }
}

/// `{"data": ...}` single-resource envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// A task with its story history, ready to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDetail {
    pub record: TaskRecord,
    pub stories: Vec<StoryRecord>,
}
