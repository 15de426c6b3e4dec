//! Core types for the ResortOS server.

use serde::{Deserialize, Serialize};

/// Task lifecycle status. The set is fixed; transitions between statuses
/// are governed by [`crate::lifecycle::allowed_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Inbox,
    Backlog,
    InProgress,
    Blocked,
    InReview,
    Done,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::Backlog => "backlog",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::InReview => "in_review",
            TaskStatus::Done => "done",
            TaskStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbox" => Some(TaskStatus::Inbox),
            "backlog" => Some(TaskStatus::Backlog),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "in_review" => Some(TaskStatus::InReview),
            "done" => Some(TaskStatus::Done),
            "archived" => Some(TaskStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Parse a priority string. Unrecognized values fall back to medium.
    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// Whether a team member is a person or an AI agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Human,
    Ai,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Human => "human",
            MemberType::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(MemberType::Human),
            "ai" => Some(MemberType::Ai),
            _ => None,
        }
    }
}

/// A task in the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub org_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub engine_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub reviewer_id: Option<i64>,

    // Blocked bookkeeping, set while status == blocked and cleared on exit.
    pub blocker_reason: Option<String>,
    pub blocked_since: Option<i64>,

    pub estimated_hours: Option<f64>,
    pub impact: Option<String>,
    pub output: Option<String>,
    pub learnings: Option<String>,
    pub evaluation_rating: Option<i32>,
    pub sort_order: i64,

    pub started_at: Option<i64>,
    pub due_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Only inbox and backlog are valid starting statuses.
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub engine_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub reviewer_id: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub impact: Option<String>,
    pub sort_order: Option<i64>,
    pub due_at: Option<i64>,
}

/// Field-level patch for a task. Lifecycle fields (status and its
/// side-effect timestamps) are deliberately absent; those only move
/// through the engine operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub engine_id: Option<Option<i64>>,
    pub owner_id: Option<Option<i64>>,
    pub reviewer_id: Option<Option<i64>>,
    pub estimated_hours: Option<Option<f64>>,
    pub impact: Option<String>,
    pub output: Option<String>,
    pub learnings: Option<String>,
    pub sort_order: Option<i64>,
    pub due_at: Option<Option<i64>>,
}

/// Filters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub engine_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub priority: Option<Priority>,
}

/// A member of the organization, human or AI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub slug: String,
    pub member_type: MemberType,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub avatar_emoji: Option<String>,
    pub ai_model: Option<String>,
    pub max_concurrent_tasks: i64,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a team member.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeamMember {
    pub name: String,
    pub slug: String,
    pub member_type: MemberType,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub avatar_emoji: Option<String>,
    pub ai_model: Option<String>,
    pub max_concurrent_tasks: Option<i64>,
}

/// Field-level patch for a team member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamMemberPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub avatar_emoji: Option<String>,
    pub ai_model: Option<String>,
    pub max_concurrent_tasks: Option<i64>,
    pub status: Option<String>,
}

/// A value engine: a named area of work tasks belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub goal: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
    pub status: String,
}

/// Input for creating an engine.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEngine {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub goal: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

/// One entry in the append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub org_id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub description: String,
    pub autonomy_level: Option<String>,
    pub created_at: i64,
}

/// Filters for listing activity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub action: Option<String>,
}

/// Input for recording an activity entry.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub org_id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub description: String,
    pub autonomy_level: Option<String>,
}

/// A lesson captured from completed work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub org_id: i64,
    pub title: String,
    pub insight: String,
    pub context: Option<String>,
    pub action: Option<String>,
    pub source_task_id: Option<i64>,
    pub created_by_id: Option<i64>,
    pub created_at: i64,
}

/// Input for recording a lesson.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
    pub title: String,
    pub insight: String,
    pub context: Option<String>,
    pub action: Option<String>,
    pub source_task_id: Option<i64>,
    pub created_by_id: Option<i64>,
}

/// A comment on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub author_id: Option<i64>,
    pub content: String,
    pub confidence: Option<String>,
    pub autonomy_level: Option<String>,
    pub created_at: i64,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub author_id: Option<i64>,
    pub content: String,
    pub confidence: Option<String>,
    pub autonomy_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            TaskStatus::Inbox,
            TaskStatus::Backlog,
            TaskStatus::InProgress,
            TaskStatus::Blocked,
            TaskStatus::InReview,
            TaskStatus::Done,
            TaskStatus::Archived,
        ] {
            assert_eq!(TaskStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(TaskStatus::parse("doing"), None);
    }

    #[test]
    fn priority_parse_defaults_to_medium() {
        assert_eq!(Priority::parse("high"), Priority::High);
        assert_eq!(Priority::parse("low"), Priority::Low);
        assert_eq!(Priority::parse("urgent"), Priority::Medium);
    }
}
