//! Task field selection: rendered label -> Asana field key.

use crate::provider::ProviderError;

/// Ordered label -> field-key map for rendered task fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

/// Reference fields that only carry a `gid` unless `.name` is requested.
const NAMED_REFERENCES: &[&str] = &["assignee", "completed_by", "created_by", "parent"];

impl FieldMap {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Build from a TOML table. Every value must be a string; declaration
    /// order is kept.
    pub fn from_table(table: &toml::Table) -> Result<Self, ProviderError> {
        let mut entries = Vec::with_capacity(table.len());
        for (label, value) in table {
            let key = value.as_str().ok_or_else(|| {
                ProviderError::config(format!(
                    "fields.{label}: expected a field name string, got {}",
                    value.type_str()
                ))
            })?;
            if key.trim().is_empty() {
                return Err(ProviderError::config(format!(
                    "fields.{label}: field name must not be empty"
                )));
            }
            entries.push((label.clone(), key.to_string()));
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, k)| (l.as_str(), k.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `opt_fields` selection sent with task requests.
    ///
    /// Always includes `name` (used for the task heading), and `<ref>.name`
    /// for reference fields that render as a person's name.
    pub fn opt_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = vec!["name".to_string()];
        let mut push = |field: String| {
            if !fields.contains(&field) {
                fields.push(field);
            }
        };
        for (_, key) in self.iter() {
            push(key.to_string());
            if NAMED_REFERENCES.contains(&key) {
                push(format!("{key}.name"));
            }
        }
        fields
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        let entries = [
            ("Task", "name"),
            ("Task ID", "gid"),
            ("Created At", "created_at"),
            ("Modified At", "modified_at"),
            ("Completed", "completed"),
            ("Assignee", "assignee"),
            ("Due On", "due_on"),
            ("Notes", "notes"),
        ];
        Self::new(
            entries
                .into_iter()
                .map(|(l, k)| (l.to_string(), k.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_map_order() {
        let map = FieldMap::default();
        let labels: Vec<&str> = map.iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec![
                "Task",
                "Task ID",
                "Created At",
                "Modified At",
                "Completed",
                "Assignee",
                "Due On",
                "Notes"
            ]
        );
    }

    #[test]
    fn test_from_table_keeps_declaration_order() {
        let table: toml::Table = toml::from_str(
            r#"
Zeta = "notes"
Alpha = "name"
"#,
        )
        .unwrap();
        let map = FieldMap::from_table(&table).unwrap();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("Zeta", "notes"), ("Alpha", "name")]);
    }

    #[test]
    fn test_from_table_rejects_non_strings() {
        let table: toml::Table = toml::from_str("Task = 3").unwrap();
        let err = FieldMap::from_table(&table).unwrap_err();
        assert!(err.to_string().contains("fields.Task"));
    }

    #[test]
    fn test_opt_fields_always_request_name_once() {
        let map = FieldMap::new(vec![
            ("Task".into(), "name".into()),
            ("Assignee".into(), "assignee".into()),
            ("Owner".into(), "assignee".into()),
        ]);
        assert_eq!(
            map.opt_fields(),
            vec!["name", "assignee", "assignee.name"]
        );
    }

    #[test]
    fn test_opt_fields_for_notes_only() {
        let map = FieldMap::new(vec![("Notes".into(), "notes".into())]);
        assert_eq!(map.opt_fields(), vec!["name", "notes"]);
    }
}
