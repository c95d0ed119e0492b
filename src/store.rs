use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::AppError;
use crate::events::{ChangeOrigin, Events, StoreEvent};
use crate::model::{now, Idea, IdeaInput, IdeaTasks, Status, Task, TaskFilter};
use crate::storage::{Storage, STORAGE_KEY};
use crate::watch::ChangeWatcher;

const SAVE_FAILED: &str = "Failed to save your data. Please try again.";
const IMPORT_FAILED: &str = "Failed to import data. Invalid format.";
const LOAD_FAILED: &str = "Failed to load your data.";

/// Owner of the persisted idea collection.
///
/// Every operation reads the whole collection from storage, works on that
/// copy and writes it back. Nothing is cached between calls, so a change made
/// by another process is picked up by the next operation (last writer wins).
pub struct Store<S> {
    storage: S,
    key: String,
    events: Events,
}

impl<S: Storage> Store<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            events: Events::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Reads the collection. A missing or unreadable blob yields an empty
    /// collection; only failures of the backend itself are returned.
    pub async fn load(&self) -> Result<Vec<Idea>, AppError> {
        let raw = match self.storage.get(&self.key).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(
                    target: "store",
                    key = %self.key,
                    error = %err,
                    "Failed to read ideas"
                );
                self.events.error(LOAD_FAILED);
                return Err(AppError::StorageRead(err));
            }
        };
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Vec<Idea>>(&raw) {
            Ok(ideas) => Ok(ideas),
            Err(err) => {
                tracing::error!(
                    target: "store",
                    key = %self.key,
                    error = %err,
                    "Failed to load ideas, treating store as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Replaces the stored collection with `ideas`.
    pub async fn save(&self, ideas: &[Idea]) -> Result<(), AppError> {
        let payload = serde_json::to_string(ideas)?;
        if let Err(err) = self.storage.set(&self.key, &payload).await {
            tracing::error!(
                target: "store",
                key = %self.key,
                error = %err,
                "Failed to save ideas"
            );
            self.events.error(SAVE_FAILED);
            return Err(AppError::StorageWrite(err));
        }
        self.events.data_changed(ChangeOrigin::Local);
        Ok(())
    }

    pub async fn add_idea(&self, input: IdeaInput) -> Result<Idea, AppError> {
        self.ensure_non_empty("idea title", &input.title)?;
        let mut ideas = self.load().await?;
        let now = now();
        let idea = Idea {
            id: new_id(),
            title: input.title,
            category: input.category,
            description: input.description,
            status: input.status,
            notes: input.notes,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        ideas.push(idea.clone());
        self.save(&ideas).await?;

        tracing::debug!(target: "store", id = %idea.id, "Added idea");
        self.events.success("Idea added successfully!");
        Ok(idea)
    }

    pub async fn get_idea(&self, id: &str) -> Result<Idea, AppError> {
        let ideas = self.load().await?;
        ideas
            .into_iter()
            .find(|idea| idea.id == id)
            .ok_or_else(|| self.not_found("Idea", id))
    }

    /// Looks up one task through its parent idea.
    pub async fn get_task(&self, idea_id: &str, task_id: &str) -> Result<Task, AppError> {
        let idea = self.get_idea(idea_id).await?;
        idea.tasks
            .into_iter()
            .find(|task| task.id == task_id)
            .ok_or_else(|| self.not_found("Task", task_id))
    }

    /// Replaces the stored idea with the same id, keeping its original
    /// creation time and its position in the collection.
    pub async fn update_idea(&self, mut idea: Idea) -> Result<Idea, AppError> {
        self.ensure_non_empty("idea title", &idea.title)?;
        if let Some(task) = idea.tasks.iter().find(|task| task.idea_id != idea.id) {
            return Err(self.invalid(format!(
                "task id {} belongs to idea id {}, not {}",
                task.id, task.idea_id, idea.id
            )));
        }

        let mut ideas = self.load().await?;
        let index = position_of(&ideas, &idea.id).ok_or_else(|| self.not_found("Idea", &idea.id))?;
        let stored = &ideas[index];
        idea.created_at = stored.created_at;
        idea.updated_at = stored.updated_at;
        touch(&mut idea);
        ideas[index] = idea.clone();
        self.save(&ideas).await?;

        tracing::debug!(target: "store", id = %idea.id, "Updated idea");
        self.events.success("Idea updated successfully!");
        Ok(idea)
    }

    pub async fn set_status(&self, id: &str, status: Status) -> Result<Idea, AppError> {
        let mut ideas = self.load().await?;
        let index = position_of(&ideas, id).ok_or_else(|| self.not_found("Idea", id))?;
        let idea = &mut ideas[index];
        idea.status = status;
        touch(idea);
        let updated = idea.clone();
        self.save(&ideas).await?;

        tracing::debug!(target: "store", id = %id, status = status.as_str(), "Changed idea status");
        self.events
            .success(format!("Status updated to {}", status.as_str()));
        Ok(updated)
    }

    pub async fn delete_idea(&self, id: &str) -> Result<(), AppError> {
        let mut ideas = self.load().await?;
        let before = ideas.len();
        ideas.retain(|idea| idea.id != id);
        if ideas.len() == before {
            return Err(self.not_found("Idea", id));
        }
        self.save(&ideas).await?;

        tracing::debug!(target: "store", id = %id, "Deleted idea");
        self.events.success("Idea deleted successfully!");
        Ok(())
    }

    pub async fn add_task(
        &self,
        idea_id: &str,
        title: String,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, AppError> {
        self.ensure_non_empty("task title", &title)?;
        let mut ideas = self.load().await?;
        let index = position_of(&ideas, idea_id).ok_or_else(|| self.not_found("Idea", idea_id))?;
        let task = Task {
            id: new_id(),
            title,
            completed: false,
            idea_id: idea_id.to_string(),
            created_at: now(),
            due_date,
        };
        let idea = &mut ideas[index];
        idea.tasks.push(task.clone());
        touch(idea);
        self.save(&ideas).await?;

        tracing::debug!(target: "store", idea_id = %idea_id, id = %task.id, "Added task");
        self.events.success("Task added successfully!");
        Ok(task)
    }

    /// Replaces a task in place, located through its `idea_id`.
    pub async fn update_task(&self, mut task: Task) -> Result<Task, AppError> {
        self.ensure_non_empty("task title", &task.title)?;
        let mut ideas = self.load().await?;
        let idea_index =
            position_of(&ideas, &task.idea_id).ok_or_else(|| self.not_found("Idea", &task.idea_id))?;
        let idea = &mut ideas[idea_index];
        let task_index = idea
            .tasks
            .iter()
            .position(|existing| existing.id == task.id)
            .ok_or_else(|| self.not_found("Task", &task.id))?;
        task.created_at = idea.tasks[task_index].created_at;
        idea.tasks[task_index] = task.clone();
        touch(idea);
        self.save(&ideas).await?;

        tracing::debug!(target: "store", idea_id = %task.idea_id, id = %task.id, "Updated task");
        self.events.success("Task updated successfully!");
        Ok(task)
    }

    pub async fn delete_task(&self, idea_id: &str, task_id: &str) -> Result<(), AppError> {
        let mut ideas = self.load().await?;
        let index = position_of(&ideas, idea_id).ok_or_else(|| self.not_found("Idea", idea_id))?;
        let idea = &mut ideas[index];
        let before = idea.tasks.len();
        idea.tasks.retain(|task| task.id != task_id);
        if idea.tasks.len() == before {
            return Err(self.not_found("Task", task_id));
        }
        touch(idea);
        self.save(&ideas).await?;

        tracing::debug!(target: "store", idea_id = %idea_id, id = %task_id, "Deleted task");
        self.events.success("Task deleted successfully!");
        Ok(())
    }

    /// Ideas whose title, description or category contain `query`, ignoring
    /// case. An empty query matches every idea.
    pub async fn search(&self, query: &str) -> Result<Vec<Idea>, AppError> {
        let ideas = self.load().await?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(ideas);
        }
        Ok(ideas.into_iter().filter(|idea| idea.matches(query)).collect())
    }

    /// Tasks across all ideas, grouped by idea in collection order. Ideas
    /// with no task passing the filter are left out.
    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<IdeaTasks>, AppError> {
        let ideas = self.load().await?;
        let now = now();
        let groups = ideas
            .into_iter()
            .filter_map(|idea| {
                let tasks: Vec<Task> = idea
                    .tasks
                    .into_iter()
                    .filter(|task| match filter {
                        TaskFilter::All => true,
                        TaskFilter::Upcoming => task.is_upcoming(now),
                    })
                    .collect();
                if tasks.is_empty() {
                    return None;
                }
                Some(IdeaTasks {
                    idea_id: idea.id,
                    idea_title: idea.title,
                    tasks,
                })
            })
            .collect();
        Ok(groups)
    }

    pub async fn export_data(&self) -> Result<String, AppError> {
        let ideas = self.load().await?;
        let payload = serde_json::to_string_pretty(&ideas)?;
        self.events.success("Data exported successfully!");
        Ok(payload)
    }

    /// Replaces the whole collection with the ideas in `payload`. Nothing is
    /// written unless the payload validates. Returns the number of ideas.
    pub async fn import_data(&self, payload: &str) -> Result<usize, AppError> {
        let ideas = match parse_collection(payload) {
            Ok(ideas) => ideas,
            Err(message) => {
                tracing::warn!(target: "store", error = %message, "Rejected import");
                self.events.error(IMPORT_FAILED);
                return Err(AppError::InvalidFormat(message));
            }
        };
        self.save(&ideas).await?;

        tracing::info!(target: "store", ideas = ideas.len(), "Imported collection");
        self.events.success("Data imported successfully!");
        Ok(ideas.len())
    }

    /// Starts forwarding out-of-process writes as `DataChanged(External)`.
    /// Returns `None` when the backend cannot observe such writes.
    pub fn watch_external(&self) -> Result<Option<ChangeWatcher>, AppError> {
        let events = self.events.clone();
        self.storage
            .watch(
                &self.key,
                Box::new(move || events.data_changed(ChangeOrigin::External)),
            )
            .map_err(AppError::StorageRead)
    }

    fn not_found(&self, kind: &str, id: &str) -> AppError {
        self.events.error(format!("{kind} not found"));
        AppError::NotFound(format!("{} id {id}", kind.to_lowercase()))
    }

    fn invalid(&self, message: String) -> AppError {
        self.events.error(message.clone());
        AppError::InvalidInput(message)
    }

    fn ensure_non_empty(&self, label: &str, value: &str) -> Result<(), AppError> {
        if value.trim().is_empty() {
            return Err(self.invalid(format!("{label} cannot be empty")));
        }
        Ok(())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn position_of(ideas: &[Idea], id: &str) -> Option<usize> {
    ideas.iter().position(|idea| idea.id == id)
}

/// Bumps `updated_at`, never moving it behind `created_at` or backwards.
fn touch(idea: &mut Idea) {
    idea.updated_at = now().max(idea.updated_at).max(idea.created_at);
}

fn parse_collection(payload: &str) -> Result<Vec<Idea>, String> {
    let value: Value = serde_json::from_str(payload).map_err(|err| err.to_string())?;
    if !value.is_array() {
        return Err("expected a JSON array of ideas".to_string());
    }
    let ideas: Vec<Idea> = serde_json::from_value(value).map_err(|err| err.to_string())?;
    validate_collection(&ideas)?;
    Ok(ideas)
}

fn validate_collection(ideas: &[Idea]) -> Result<(), String> {
    let mut idea_ids = HashSet::new();
    let mut task_ids = HashSet::new();
    let mut problems = Vec::new();

    for idea in ideas {
        if !idea_ids.insert(idea.id.as_str()) {
            problems.push(format!("duplicate idea id {}", idea.id));
        }
        if idea.title.trim().is_empty() {
            problems.push(format!("idea id {} has an empty title", idea.id));
        }
        if idea.updated_at < idea.created_at {
            problems.push(format!("idea id {} was updated before it was created", idea.id));
        }
        for task in &idea.tasks {
            if !task_ids.insert(task.id.as_str()) {
                problems.push(format!("duplicate task id {}", task.id));
            }
            if task.title.trim().is_empty() {
                problems.push(format!("task id {} has an empty title", task.id));
            }
            if task.idea_id != idea.id {
                problems.push(format!(
                    "task id {} references idea id {} but is stored under {}",
                    task.id, task.idea_id, idea.id
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
