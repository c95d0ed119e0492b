use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::model::{timestamp, Idea, IdeaTasks, Status, Task};

pub const EXPORT_FILE_NAME: &str = "ideas-stack-data.json";

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    timestamp::parse(raw).map_err(|_| {
        AppError::InvalidInput(format!(
            "invalid due date '{raw}' (use YYYY-MM-DD or RFC 3339)"
        ))
    })
}

/// Lifecycle stages on one line with the current one bracketed.
pub fn format_status_track(current: Status) -> String {
    Status::ALL
        .iter()
        .map(|status| {
            if *status == current {
                format!("[{}]", status.as_str())
            } else {
                status.as_str().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let mut line = format!("- [{mark}] {} (task id {}", task.title, task.id);
    if let Some(due) = task.due_date {
        line.push_str(&format!(", due {}", format_datetime(due)));
    }
    line.push(')');
    line
}

pub fn format_idea_line(idea: &Idea) -> String {
    format!(
        "{} [{}] {} / {} (tasks {}/{}, {}%)",
        idea.id,
        idea.status.as_str(),
        idea.title,
        idea.category.as_str(),
        idea.completed_tasks(),
        idea.tasks.len(),
        idea.progress()
    )
}

pub fn format_idea_detail(idea: &Idea) -> String {
    let mut output = String::new();
    output.push_str(&format!("Idea ID: {}\n", idea.id));
    output.push_str(&format!("Title: {}\n", idea.title));
    output.push_str(&format!("Category: {}\n", idea.category.as_str()));
    output.push_str(&format!("Status: {}\n", format_status_track(idea.status)));
    output.push_str(&format!("Progress: {}%\n", idea.progress()));
    if !idea.description.trim().is_empty() {
        output.push_str(&format!("Description: {}\n", idea.description));
    }
    if !idea.notes.trim().is_empty() {
        output.push_str(&format!("Notes: {}\n", idea.notes));
    }
    output.push_str(&format!("Created: {}\n", format_datetime(idea.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(idea.updated_at)));
    output.push('\n');
    if idea.tasks.is_empty() {
        output.push_str("Tasks: (none)");
        return output;
    }
    output.push_str("Tasks:\n");
    for task in &idea.tasks {
        output.push_str(&format_task_line(task));
        output.push('\n');
    }
    output.trim_end().to_string()
}

pub fn format_task_groups(groups: &[IdeaTasks]) -> String {
    let mut output = String::new();
    for group in groups {
        output.push_str(&format!("{} (idea id {})\n", group.idea_title, group.idea_id));
        for task in &group.tasks {
            output.push_str("  ");
            output.push_str(&format_task_line(task));
            output.push('\n');
        }
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn due_date_accepts_plain_dates_and_timestamps() {
        assert_eq!(
            parse_due_date("2024-06-01").expect("date"),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("2024-06-01T12:30:00+02:00").expect("timestamp"),
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap()
        );
        assert!(matches!(
            parse_due_date("next week"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn status_track_brackets_current_stage() {
        assert_eq!(
            format_status_track(Status::Prototype),
            "Concept > [Prototype] > Testing > Implementation"
        );
    }

    #[test]
    fn task_line_shows_completion_and_due_date() {
        let task = Task {
            id: "t1".to_string(),
            title: "Buy motors".to_string(),
            completed: true,
            idea_id: "i1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            due_date: Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
        };
        assert_eq!(
            format_task_line(&task),
            "- [x] Buy motors (task id t1, due 2024-06-01 09:00)"
        );
    }
}
