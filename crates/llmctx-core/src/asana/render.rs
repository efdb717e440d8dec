//! Markdown rendering of an Asana project and its tasks.

use chrono_tz::Tz;
use serde_json::Value;

use crate::markdown::{MarkdownWriter, NOT_AVAILABLE, format_date};

use super::fields::FieldMap;
use super::types::{ProjectRecord, StoryRecord, TaskDetail};

/// Task fields rendered through the date formatter.
const DATE_FIELDS: &[&str] = &[
    "created_at",
    "modified_at",
    "completed_at",
    "due_on",
    "due_at",
    "start_on",
    "start_at",
];

/// Render `project` and its tasks, in API order, as Markdown.
///
/// ```text
/// # Project: Demo
/// **Project ID**: P1
/// ...
///
/// ## Tasks
/// ### Task: T1
/// **Task**: T1
/// #### Stories
/// - July 7th, 2024 7:00 AM by Ada: looks good
///
/// ```
pub fn render_project(
    project: &ProjectRecord,
    tasks: &[TaskDetail],
    fields: &FieldMap,
    tz: Tz,
) -> String {
    let mut md = MarkdownWriter::new();

    md.heading(1, &format!("Project: {}", or_na(project.name.as_deref())))
        .field("Project ID", &project.gid)
        .field("Created At", &format_date(project.created_at.as_deref(), tz))
        .field("Modified At", &format_date(project.modified_at.as_deref(), tz))
        .field(
            "Owner",
            or_na(project.owner.as_ref().and_then(|o| o.name.as_deref())),
        )
        .field("Notes", or_na(project.notes.as_deref()))
        .field("Start On", or_na(project.start_on.as_deref()))
        .field("Due On", or_na(project.due_on.as_deref()))
        .blank_line()
        .heading(2, "Tasks");

    for task in tasks {
        render_task(&mut md, task, fields, tz);
    }
    md.finish()
}

fn render_task(md: &mut MarkdownWriter, task: &TaskDetail, fields: &FieldMap, tz: Tz) {
    md.heading(3, &format!("Task: {}", or_na(task.record.name())));
    for (label, key) in fields.iter() {
        let value = task.record.get(key);
        let rendered = if DATE_FIELDS.contains(&key) {
            format_date(value.and_then(Value::as_str), tz)
        } else if key == "assignee" {
            or_na(value.and_then(|v| v.get("name")).and_then(Value::as_str)).to_string()
        } else {
            render_value(value)
        };
        md.field(label, &rendered);
    }
    md.heading(4, "Stories");
    for story in &task.stories {
        md.list_item(&story_line(story, tz));
    }
    md.blank_line();
}

fn story_line(story: &StoryRecord, tz: Tz) -> String {
    let author = story.created_by.as_ref().and_then(|u| u.name.as_deref());
    format!(
        "{} by {}: {}",
        format_date(story.created_at.as_deref(), tz),
        or_na(author),
        story.text.as_deref().unwrap_or_default()
    )
}

/// Render a raw JSON field value.
fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(map)) => match map.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => Value::Object(map.clone()).to_string(),
        },
        Some(Value::Array(items)) if items.is_empty() => NOT_AVAILABLE.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| render_value(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}
