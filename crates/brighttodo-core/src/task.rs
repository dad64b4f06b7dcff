use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,

    pub text: String,

    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// New open task with a freshly generated id. `text` is stored as given;
    /// trimming is the repository's job.
    pub fn new(text: String) -> Self {
        Self {
            id: new_task_id(),
            text,
            completed: false,
        }
    }

    pub fn with_id(id: impl Into<String>, text: impl Into<String>, completed: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed,
        }
    }

    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}
