use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accent colours the progress tracker cycles through, one per stage.
pub const STAGE_ACCENTS: &[&str] = &["violet-500/80", "blue-500/70"];

/// A submitted capture and its processing pipeline.
///
/// Fetched wholesale on every poll and replaced, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub stages: Vec<Stage>,
}

/// One pipeline step. `id` is the backing job, absent until the server
/// schedules it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

impl Stage {
    pub fn is_scheduled(&self) -> bool {
        self.id.is_some()
    }
}

impl Assignment {
    /// Job ids of every stage the server has scheduled, in pipeline order.
    pub fn scheduled_jobs(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.stages.iter().filter_map(|stage| stage.id)
    }
}

/// `items[index mod len]`, or `None` for an empty slice.
pub fn cyclic<T>(items: &[T], index: usize) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(index % items.len())
    }
}

pub fn stage_accent(index: usize) -> &'static str {
    cyclic(STAGE_ACCENTS, index).copied().unwrap_or_default()
}
