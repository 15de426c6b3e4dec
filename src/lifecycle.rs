//! Task lifecycle engine: the fixed transition table and the operations
//! that move tasks through it.
//!
//! The engine is the only writer of task status and its side-effect
//! timestamps. Every status write is conditioned on the status the engine
//! read, so two racing callers cannot both land the same edge; the loser
//! gets one reload-and-retry before the conflict is surfaced.

use crate::db::tasks::{self, TransitionOutcome, TransitionWrite};
use crate::db::{members, now_ms, Database};
use crate::error::{ApiError, ApiResult};
use crate::types::{NewActivity, NewLesson, Task, TaskStatus};
use tracing::{debug, warn};

/// Statuses reachable from the given one.
pub fn allowed_next(status: TaskStatus) -> &'static [TaskStatus] {
    use TaskStatus::*;
    match status {
        Inbox => &[Backlog, Archived],
        Backlog => &[InProgress, Inbox, Archived],
        InProgress => &[Done, Blocked, InReview, Backlog],
        Blocked => &[InProgress, Backlog],
        InReview => &[Done, InProgress],
        Done => &[Archived, InProgress],
        Archived => &[],
    }
}

/// Whether the edge `from -> to` exists in the transition table.
pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    allowed_next(from).contains(&to)
}

/// Statuses a task may be created in.
pub fn valid_initial(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Inbox | TaskStatus::Backlog)
}

/// Caller context for a plain status transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionRequest {
    pub actor_id: Option<i64>,
    pub blocker_reason: Option<String>,
}

/// Caller input for evaluating a finished task.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub approve: bool,
    pub evaluator_id: Option<i64>,
    pub impact: Option<String>,
    pub learnings: Option<String>,
    pub rating: Option<i32>,
    pub lesson_title: Option<String>,
    pub lesson_insight: Option<String>,
    pub lesson_context: Option<String>,
    pub lesson_action: Option<String>,
}

/// The lifecycle engine. Cheap to clone; shares the database handle.
#[derive(Clone)]
pub struct LifecycleEngine {
    db: Database,
}

impl LifecycleEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn load(&self, task_id: i64) -> ApiResult<Task> {
        tasks::get_task(&self.db, task_id)?.ok_or_else(|| ApiError::not_found("Task", task_id))
    }

    /// Move a task along an edge of the transition table, applying the
    /// side-effect timestamps for the target status.
    pub fn transition(
        &self,
        task_id: i64,
        requested: TaskStatus,
        req: &TransitionRequest,
    ) -> ApiResult<Task> {
        for attempt in 0..2 {
            let task = self.load(task_id)?;
            let allowed = allowed_next(task.status);
            if !allowed.contains(&requested) {
                return Err(ApiError::invalid_transition(task.status, requested, allowed));
            }

            let (started_at, completed_at, blocker_reason, blocked_since) =
                status_effects(&task, requested, req.blocker_reason.as_deref());

            let write = TransitionWrite {
                expected_status: task.status,
                new_status: requested,
                set_owner_id: None,
                started_at,
                completed_at,
                blocker_reason,
                blocked_since,
                impact: None,
                learnings: None,
                evaluation_rating: None,
                activity: NewActivity {
                    org_id: task.org_id,
                    actor_id: req.actor_id,
                    action: "task_status_changed".to_string(),
                    entity_type: "task".to_string(),
                    entity_id: task.id,
                    description: format!(
                        "Task \"{}\" moved from {} to {}",
                        task.title, task.status, requested
                    ),
                    autonomy_level: None,
                },
                lesson: None,
            };

            match tasks::apply_transition(&self.db, task_id, &write)? {
                TransitionOutcome::Applied(task) => {
                    debug!(task_id, from = %write.expected_status, to = %requested, "task transitioned");
                    return Ok(task);
                }
                TransitionOutcome::Missing => return Err(ApiError::not_found("Task", task_id)),
                TransitionOutcome::Conflict => {
                    warn!(task_id, attempt, "concurrent status change, reloading");
                }
            }
        }
        Err(ApiError::write_conflict(task_id))
    }

    /// Claim an unowned backlog task for a team member. Sets the owner and
    /// starts work in one step. The member must exist and be active.
    pub fn claim(&self, task_id: i64, agent_id: i64) -> ApiResult<Task> {
        let member = members::get_member(&self.db, agent_id)?
            .ok_or_else(|| ApiError::not_found("Team member", agent_id))?;
        if member.status != "active" {
            return Err(ApiError::precondition_failed(format!(
                "Member {} is not active",
                member.name
            )));
        }

        for attempt in 0..2 {
            let task = self.load(task_id)?;
            if task.owner_id.is_some() {
                return Err(ApiError::precondition_failed("Task is already assigned"));
            }
            if task.status != TaskStatus::Backlog {
                return Err(ApiError::precondition_failed(format!(
                    "Task is not claimable from status {}",
                    task.status
                )));
            }

            let (started_at, completed_at, blocker_reason, blocked_since) =
                status_effects(&task, TaskStatus::InProgress, None);

            let write = TransitionWrite {
                expected_status: TaskStatus::Backlog,
                new_status: TaskStatus::InProgress,
                set_owner_id: Some(agent_id),
                started_at,
                completed_at,
                blocker_reason,
                blocked_since,
                impact: None,
                learnings: None,
                evaluation_rating: None,
                activity: NewActivity {
                    org_id: task.org_id,
                    actor_id: Some(agent_id),
                    action: "task_claimed".to_string(),
                    entity_type: "task".to_string(),
                    entity_id: task.id,
                    description: format!("Task claimed: {}", task.title),
                    autonomy_level: Some("L1".to_string()),
                },
                lesson: None,
            };

            match tasks::apply_transition(&self.db, task_id, &write)? {
                TransitionOutcome::Applied(task) => return Ok(task),
                TransitionOutcome::Missing => return Err(ApiError::not_found("Task", task_id)),
                TransitionOutcome::Conflict => {
                    warn!(task_id, attempt, "concurrent claim, reloading");
                }
            }
        }
        Err(ApiError::write_conflict(task_id))
    }

    /// Record the outcome of finished work. Approval settles the task in
    /// done; rejection sends it back to in_progress for rework.
    pub fn evaluate(&self, task_id: i64, eval: &Evaluation) -> ApiResult<Task> {
        if let Some(rating) = eval.rating {
            if !(1..=5).contains(&rating) {
                return Err(ApiError::invalid_value(
                    "rating",
                    "rating must be between 1 and 5",
                ));
            }
        }

        for attempt in 0..2 {
            let task = self.load(task_id)?;
            if !matches!(task.status, TaskStatus::Done | TaskStatus::InReview) {
                return Err(ApiError::precondition_failed(format!(
                    "Only tasks in review or done can be evaluated, not {}",
                    task.status
                )));
            }

            let write = if eval.approve {
                let completed_at = if task.status == TaskStatus::InReview {
                    Some(now_ms())
                } else {
                    task.completed_at
                };
                TransitionWrite {
                    expected_status: task.status,
                    new_status: TaskStatus::Done,
                    set_owner_id: None,
                    started_at: task.started_at,
                    completed_at,
                    blocker_reason: task.blocker_reason.clone(),
                    blocked_since: task.blocked_since,
                    impact: eval.impact.clone(),
                    learnings: eval.learnings.clone(),
                    evaluation_rating: eval.rating,
                    activity: NewActivity {
                        org_id: task.org_id,
                        actor_id: eval.evaluator_id,
                        action: "task_evaluated".to_string(),
                        entity_type: "task".to_string(),
                        entity_id: task.id,
                        description: match eval.rating {
                            Some(rating) => {
                                format!("Task evaluated: {} ({}/5)", task.title, rating)
                            }
                            None => format!("Task evaluated: {}", task.title),
                        },
                        autonomy_level: None,
                    },
                    lesson: lesson_from(eval, task_id),
                }
            } else {
                let (started_at, completed_at, blocker_reason, blocked_since) =
                    status_effects(&task, TaskStatus::InProgress, None);
                TransitionWrite {
                    expected_status: task.status,
                    new_status: TaskStatus::InProgress,
                    set_owner_id: None,
                    started_at,
                    completed_at,
                    blocker_reason,
                    blocked_since,
                    impact: eval.impact.clone(),
                    learnings: eval.learnings.clone(),
                    evaluation_rating: eval.rating,
                    activity: NewActivity {
                        org_id: task.org_id,
                        actor_id: eval.evaluator_id,
                        action: "task_returned".to_string(),
                        entity_type: "task".to_string(),
                        entity_id: task.id,
                        description: format!("Task returned for rework: {}", task.title),
                        autonomy_level: None,
                    },
                    lesson: lesson_from(eval, task_id),
                }
            };

            match tasks::apply_transition(&self.db, task_id, &write)? {
                TransitionOutcome::Applied(task) => return Ok(task),
                TransitionOutcome::Missing => return Err(ApiError::not_found("Task", task_id)),
                TransitionOutcome::Conflict => {
                    warn!(task_id, attempt, "concurrent evaluation, reloading");
                }
            }
        }
        Err(ApiError::write_conflict(task_id))
    }
}

/// Compute the side-effect fields for entering `requested` from the task's
/// current status. Returns the final values of started_at, completed_at,
/// blocker_reason, and blocked_since.
fn status_effects(
    task: &Task,
    requested: TaskStatus,
    blocker_reason: Option<&str>,
) -> (Option<i64>, Option<i64>, Option<String>, Option<i64>) {
    let now = now_ms();

    // started_at is set on first entry into in_progress only
    let started_at = if requested == TaskStatus::InProgress && task.started_at.is_none() {
        Some(now)
    } else {
        task.started_at
    };

    // completed_at refreshes on every entry into done
    let completed_at = if requested == TaskStatus::Done {
        Some(now)
    } else {
        task.completed_at
    };

    let (blocker_reason, blocked_since) = if requested == TaskStatus::Blocked {
        (
            blocker_reason
                .map(str::to_string)
                .or_else(|| task.blocker_reason.clone()),
            Some(now),
        )
    } else if task.status == TaskStatus::Blocked {
        // leaving blocked clears the bookkeeping
        (None, None)
    } else {
        (task.blocker_reason.clone(), task.blocked_since)
    };

    (started_at, completed_at, blocker_reason, blocked_since)
}

fn lesson_from(eval: &Evaluation, task_id: i64) -> Option<NewLesson> {
    match (&eval.lesson_title, &eval.lesson_insight) {
        (Some(title), Some(insight)) => Some(NewLesson {
            title: title.clone(),
            insight: insight.clone(),
            context: eval.lesson_context.clone(),
            action: eval.lesson_action.clone(),
            source_task_id: Some(task_id),
            created_by_id: eval.evaluator_id,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn archived_is_terminal() {
        assert!(allowed_next(Archived).is_empty());
    }

    #[test]
    fn table_edges_match_the_workflow() {
        assert_eq!(allowed_next(Inbox), &[Backlog, Archived][..]);
        assert_eq!(allowed_next(Backlog), &[InProgress, Inbox, Archived][..]);
        assert_eq!(
            allowed_next(InProgress),
            &[Done, Blocked, InReview, Backlog][..]
        );
        assert_eq!(allowed_next(Blocked), &[InProgress, Backlog][..]);
        assert_eq!(allowed_next(InReview), &[Done, InProgress][..]);
        assert_eq!(allowed_next(Done), &[Archived, InProgress][..]);
    }

    #[test]
    fn no_shortcut_from_inbox_to_done() {
        assert!(!can_transition(Inbox, Done));
        assert!(!can_transition(Inbox, InProgress));
        assert!(!can_transition(Blocked, Done));
    }

    #[test]
    fn only_inbox_and_backlog_are_valid_initial_statuses() {
        assert!(valid_initial(Inbox));
        assert!(valid_initial(Backlog));
        assert!(!valid_initial(InProgress));
        assert!(!valid_initial(Done));
        assert!(!valid_initial(Archived));
    }
}
