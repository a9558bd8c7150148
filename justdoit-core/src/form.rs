//! Create/edit form state for the dashboard.

use crate::task::{NewTask, Priority, Task, TaskId, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditTarget {
    #[default]
    Creating,
    Editing(TaskId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub target: EditTarget,
    pub draft: Draft,
}

impl FormState {
    pub fn is_editing(&self) -> bool {
        matches!(self.target, EditTarget::Editing(_))
    }

    pub fn editing_id(&self) -> Option<TaskId> {
        match self.target {
            EditTarget::Editing(id) => Some(id),
            EditTarget::Creating => None,
        }
    }

    /// Switch to editing `task`, replacing whatever was being drafted.
    pub fn begin_edit(&mut self, task: &Task) {
        self.target = EditTarget::Editing(task.id);
        self.draft = Draft {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority.unwrap_or(Priority::Low),
        };
    }

    pub fn reset(&mut self) {
        *self = FormState::default();
    }

    /// Title is the only required field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.draft.title.trim().is_empty() {
            return Err("Title is required.");
        }
        Ok(())
    }

    pub fn to_new_task(&self) -> NewTask {
        NewTask {
            title: self.draft.title.trim().to_string(),
            description: self.draft.description.clone(),
            priority: self.draft.priority,
        }
    }

    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            title: Some(self.draft.title.trim().to_string()),
            description: Some(self.draft.description.clone()),
            priority: Some(self.draft.priority),
            completed: None,
        }
    }
}
