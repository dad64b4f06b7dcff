//! The task list and its persistence.
//!
//! [`TaskRepository`] owns the ordered tasks (most recent first) and the
//! current [`Filter`]. Every mutation writes the full list back to the store
//! under [`TASKS_KEY`] before returning; when that write fails the in-memory
//! list is left untouched. Lookups by id are linear scans.

use std::collections::HashSet;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::filter::Filter;
use crate::store::PersistentStore;
use crate::task::{Task, new_task_id};

pub const TASKS_KEY: &str = "brighttodo.todos";

#[derive(Debug)]
pub struct TaskRepository<S> {
    store: S,
    tasks: Vec<Task>,
    filter: Filter,
}

impl<S: PersistentStore> TaskRepository<S> {
    /// Loads the stored list. Unreadable data is discarded and the list
    /// starts empty; the caller is never told.
    pub fn load(store: S) -> Self {
        Self::load_with_diagnostics(store, |_| {})
    }

    /// Like [`TaskRepository::load`], but hands the parse error to
    /// `on_discard` when stored data had to be thrown away.
    #[instrument(skip(store, on_discard))]
    pub fn load_with_diagnostics<F>(store: S, on_discard: F) -> Self
    where
        F: FnOnce(&serde_json::Error),
    {
        let tasks = match store.get(TASKS_KEY) {
            None => {
                debug!("no stored tasks");
                Vec::new()
            }
            Some(raw) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => normalize_loaded(tasks),
                Err(err) => {
                    debug!(error = %err, "discarding unreadable task data");
                    on_discard(&err);
                    Vec::new()
                }
            },
        };

        debug!(count = tasks.len(), "loaded tasks");
        Self {
            store,
            tasks,
            filter: Filter::All,
        }
    }

    /// Prepends a task with the trimmed text. Blank input is dropped without
    /// touching the store. Returns the new id.
    #[instrument(skip(self, raw_text))]
    pub fn add(&mut self, raw_text: &str) -> anyhow::Result<Option<String>> {
        let text = raw_text.trim();
        if text.is_empty() {
            debug!("ignoring blank task text");
            return Ok(None);
        }

        let mut task = Task::new(text.to_string());
        while self.contains(&task.id) {
            task.id = new_task_id();
        }
        let id = task.id.clone();

        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(task);
        next.extend(self.tasks.iter().cloned());
        self.commit(next)?;

        info!(id = %id, count = self.tasks.len(), "task added");
        Ok(Some(id))
    }

    /// Flips the completion flag. Returns `false` (and writes nothing) when
    /// no task has `id`.
    #[instrument(skip(self))]
    pub fn toggle(&mut self, id: &str) -> anyhow::Result<bool> {
        let Some(idx) = self.position(id) else {
            debug!("toggle target not found");
            return Ok(false);
        };

        let mut next = self.tasks.clone();
        next[idx].completed = !next[idx].completed;
        let completed = next[idx].completed;
        self.commit(next)?;

        debug!(completed, "task toggled");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> anyhow::Result<bool> {
        let next: Vec<Task> = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        let removed = next.len() != self.tasks.len();
        self.commit(next)?;

        debug!(removed, "remove applied");
        Ok(removed)
    }

    /// Replaces the text of `id` with the trimmed input. Blank input cancels
    /// the edit and keeps the old text. The list is written either way.
    /// Returns whether the text changed.
    #[instrument(skip(self, raw_text))]
    pub fn edit(&mut self, id: &str, raw_text: &str) -> anyhow::Result<bool> {
        let text = raw_text.trim();
        let mut next = self.tasks.clone();
        let mut changed = false;

        if !text.is_empty()
            && let Some(task) = next.iter_mut().find(|t| t.id == id)
            && task.text != text
        {
            task.text = text.to_string();
            changed = true;
        }

        self.commit(next)?;
        debug!(changed, "edit applied");
        Ok(changed)
    }

    #[instrument(skip(self))]
    pub fn clear_completed(&mut self) -> anyhow::Result<usize> {
        let next: Vec<Task> = self.tasks.iter().filter(|t| !t.completed).cloned().collect();
        let removed = self.tasks.len() - next.len();
        self.commit(next)?;

        info!(removed, remaining = self.tasks.len(), "cleared completed tasks");
        Ok(removed)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        debug!(filter = %filter, "filter changed");
        self.filter = filter;
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn visible_list(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| self.filter.matches(t))
            .collect()
    }

    pub fn remaining_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.len() - self.remaining_count()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Writes `next` to the store and adopts it only once the write went
    /// through, so a failed write leaves the list as it was.
    fn commit(&mut self, next: Vec<Task>) -> anyhow::Result<()> {
        let json = serde_json::to_string(&next).context("failed to serialise tasks")?;
        self.store
            .set(TASKS_KEY, &json)
            .context("failed to persist tasks")?;
        self.tasks = next;
        Ok(())
    }
}

/// Stored data written by older versions may carry untrimmed or blank text and
/// duplicate timestamp ids. Blank entries are dropped and duplicates get a
/// fresh id so that later lookups by id stay unambiguous.
fn normalize_loaded(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut out = Vec::with_capacity(tasks.len());

    for mut task in tasks {
        let trimmed = task.text.trim();
        if trimmed.is_empty() {
            debug!(id = %task.id, "dropping stored task with blank text");
            continue;
        }
        if trimmed.len() != task.text.len() {
            task.text = trimmed.to_string();
        }

        if !seen.insert(task.id.clone()) {
            let fresh = new_task_id();
            debug!(old = %task.id, new = %fresh, "reassigning duplicate task id");
            task.id = fresh.clone();
            seen.insert(fresh);
        }

        out.push(task);
    }

    out
}
