//! Integration tests for the task lifecycle engine.
//!
//! These tests drive the engine against an in-memory SQLite database and
//! verify the transition table, side-effect timestamps, claiming,
//! evaluation, and the audit trail.

use resort_os::db::tasks::{self, TransitionOutcome, TransitionWrite};
use resort_os::db::{activity, lessons, members, Database, DEFAULT_ORG_ID};
use resort_os::error::ErrorCode;
use resort_os::lifecycle::{Evaluation, LifecycleEngine, TransitionRequest};
use resort_os::types::{
    ActivityEntry, ActivityFilter, MemberType, NewActivity, NewTask, NewTeamMember, Task,
    TaskStatus, TeamMember, TeamMemberPatch,
};

/// Helper to create a fresh in-memory database and engine for testing.
fn setup() -> (Database, LifecycleEngine) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let engine = LifecycleEngine::new(db.clone());
    (db, engine)
}

fn new_task_input(title: &str, status: TaskStatus) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        status: Some(status),
        priority: None,
        engine_id: None,
        owner_id: None,
        reviewer_id: None,
        estimated_hours: None,
        impact: None,
        sort_order: None,
        due_at: None,
    }
}

fn create_task(db: &Database, status: TaskStatus) -> Task {
    tasks::create_task(db, DEFAULT_ORG_ID, &new_task_input("Test task", status))
        .expect("Failed to create task")
}

fn add_member(db: &Database, slug: &str) -> TeamMember {
    members::create_member(
        db,
        DEFAULT_ORG_ID,
        &NewTeamMember {
            name: slug.to_string(),
            slug: slug.to_string(),
            member_type: MemberType::Ai,
            email: None,
            timezone: None,
            avatar_emoji: None,
            ai_model: None,
            max_concurrent_tasks: None,
        },
    )
    .expect("Failed to create member")
}

/// Fetch the audit entries recorded against a task, newest first.
fn task_activity(db: &Database, task_id: i64) -> Vec<ActivityEntry> {
    activity::list_activity(
        db,
        DEFAULT_ORG_ID,
        &ActivityFilter {
            entity_type: Some("task".to_string()),
            entity_id: Some(task_id),
            ..Default::default()
        },
        100,
    )
    .expect("Failed to list activity")
}

/// Walk a task through a sequence of statuses via the engine.
fn advance(engine: &LifecycleEngine, task_id: i64, path: &[TaskStatus]) -> Task {
    let mut task = None;
    for status in path {
        task = Some(
            engine
                .transition(task_id, *status, &TransitionRequest::default())
                .expect("transition failed"),
        );
    }
    task.expect("empty path")
}

fn approval() -> Evaluation {
    Evaluation {
        approve: true,
        evaluator_id: None,
        impact: None,
        learnings: None,
        rating: None,
        lesson_title: None,
        lesson_insight: None,
        lesson_context: None,
        lesson_action: None,
    }
}

mod transition_tests {
    use super::*;

    #[test]
    fn transition_follows_table_edges() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Inbox);

        let task = engine
            .transition(task.id, TaskStatus::Backlog, &TransitionRequest::default())
            .unwrap();
        assert_eq!(task.status, TaskStatus::Backlog);

        let task = engine
            .transition(
                task.id,
                TaskStatus::InProgress,
                &TransitionRequest::default(),
            )
            .unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn invalid_transition_reports_allowed_targets() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Inbox);

        let err = engine
            .transition(task.id, TaskStatus::Done, &TransitionRequest::default())
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidTransition);
        let allowed = err.allowed.expect("allowed list missing");
        assert_eq!(allowed, vec![TaskStatus::Backlog, TaskStatus::Archived]);
    }

    #[test]
    fn archived_tasks_cannot_move() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Inbox);
        advance(&engine, task.id, &[TaskStatus::Archived]);

        let err = engine
            .transition(task.id, TaskStatus::Backlog, &TransitionRequest::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.allowed.as_deref(), Some(&[][..]));
    }

    #[test]
    fn transition_on_unknown_task_is_not_found() {
        let (_db, engine) = setup();
        let err = engine
            .transition(9999, TaskStatus::Backlog, &TransitionRequest::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn started_at_is_set_only_on_first_entry_into_in_progress() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        assert!(task.started_at.is_none());

        let task = advance(&engine, task.id, &[TaskStatus::InProgress]);
        let first_start = task.started_at.expect("started_at not set");

        // Bounce back to backlog and start again
        let task = advance(
            &engine,
            task.id,
            &[TaskStatus::Backlog, TaskStatus::InProgress],
        );
        assert_eq!(task.started_at, Some(first_start));
    }

    #[test]
    fn completed_at_refreshes_on_every_entry_into_done() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);

        let task = advance(&engine, task.id, &[TaskStatus::InProgress, TaskStatus::Done]);
        let first_done = task.completed_at.expect("completed_at not set");

        std::thread::sleep(std::time::Duration::from_millis(5));
        let task = advance(&engine, task.id, &[TaskStatus::InProgress, TaskStatus::Done]);
        let second_done = task.completed_at.expect("completed_at cleared");
        assert!(second_done > first_done);
    }

    #[test]
    fn entering_blocked_records_reason_and_since() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(&engine, task.id, &[TaskStatus::InProgress]);

        let req = TransitionRequest {
            actor_id: None,
            blocker_reason: Some("waiting on vendor".to_string()),
        };
        let task = engine
            .transition(task.id, TaskStatus::Blocked, &req)
            .unwrap();

        assert_eq!(task.status, TaskStatus::Blocked);
        assert_eq!(task.blocker_reason.as_deref(), Some("waiting on vendor"));
        assert!(task.blocked_since.is_some());
    }

    #[test]
    fn leaving_blocked_clears_bookkeeping() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(&engine, task.id, &[TaskStatus::InProgress]);
        engine
            .transition(
                task.id,
                TaskStatus::Blocked,
                &TransitionRequest {
                    actor_id: None,
                    blocker_reason: Some("stuck".to_string()),
                },
            )
            .unwrap();

        let task = advance(&engine, task.id, &[TaskStatus::InProgress]);
        assert!(task.blocker_reason.is_none());
        assert!(task.blocked_since.is_none());
    }

    #[test]
    fn entering_blocked_without_reason_leaves_reason_empty() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(&engine, task.id, &[TaskStatus::InProgress]);

        let task = advance(&engine, task.id, &[TaskStatus::Blocked]);
        assert!(task.blocker_reason.is_none());
        assert!(task.blocked_since.is_some());
    }

    #[test]
    fn every_transition_is_audited() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Inbox);
        advance(
            &engine,
            task.id,
            &[TaskStatus::Backlog, TaskStatus::InProgress, TaskStatus::Done],
        );

        let entries = task_activity(&db, task.id);
        let changes: Vec<_> = entries
            .iter()
            .filter(|e| e.action == "task_status_changed")
            .collect();
        assert_eq!(changes.len(), 3);
        assert!(changes
            .iter()
            .any(|e| e.description.contains("from in_progress to done")));
    }
}

mod claim_tests {
    use super::*;

    #[test]
    fn claim_assigns_owner_and_starts_work() {
        let (db, engine) = setup();
        let member = add_member(&db, "agent-a");
        let task = create_task(&db, TaskStatus::Backlog);

        let task = engine.claim(task.id, member.id).unwrap();

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.owner_id, Some(member.id));
        assert!(task.started_at.is_some());
    }

    #[test]
    fn claim_rejects_already_assigned_task() {
        let (db, engine) = setup();
        let member_a = add_member(&db, "agent-a");
        let member_b = add_member(&db, "agent-b");
        let task = create_task(&db, TaskStatus::Backlog);
        engine.claim(task.id, member_a.id).unwrap();

        // Put it back in backlog, still owned by agent-a
        advance(&engine, task.id, &[TaskStatus::Backlog]);

        let err = engine.claim(task.id, member_b.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
        assert!(err.message.contains("already assigned"));
    }

    #[test]
    fn claim_rejects_non_backlog_task() {
        let (db, engine) = setup();
        let member = add_member(&db, "agent-a");
        let task = create_task(&db, TaskStatus::Inbox);

        let err = engine.claim(task.id, member.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
        assert!(err.message.contains("not claimable"));
    }

    #[test]
    fn claim_rejects_inactive_member() {
        let (db, engine) = setup();
        let member = add_member(&db, "agent-a");
        members::update_member(
            &db,
            member.id,
            &TeamMemberPatch {
                status: Some("inactive".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let task = create_task(&db, TaskStatus::Backlog);

        let err = engine.claim(task.id, member.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
        assert!(err.message.contains("not active"));

        // Unchanged and still claimable by an active member
        let task = tasks::get_task(&db, task.id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Backlog);
        assert!(task.owner_id.is_none());
    }

    #[test]
    fn claim_by_unknown_member_is_not_found() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);

        let err = engine.claim(task.id, 4242).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn claim_is_audited_with_autonomy_level() {
        let (db, engine) = setup();
        let member = add_member(&db, "agent-a");
        let task = create_task(&db, TaskStatus::Backlog);
        engine.claim(task.id, member.id).unwrap();

        let entries = task_activity(&db, task.id);
        let claim = entries
            .iter()
            .find(|e| e.action == "task_claimed")
            .expect("claim not audited");
        assert_eq!(claim.actor_id, Some(member.id));
        assert_eq!(claim.autonomy_level.as_deref(), Some("L1"));
    }
}

mod evaluate_tests {
    use super::*;

    #[test]
    fn approving_in_review_task_completes_it() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(
            &engine,
            task.id,
            &[TaskStatus::InProgress, TaskStatus::InReview],
        );

        let eval = Evaluation {
            rating: Some(4),
            impact: Some("cut checkout time in half".to_string()),
            ..approval()
        };
        let task = engine.evaluate(task.id, &eval).unwrap();

        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());
        assert_eq!(task.evaluation_rating, Some(4));
        assert_eq!(task.impact.as_deref(), Some("cut checkout time in half"));
    }

    #[test]
    fn approving_done_task_keeps_completed_at() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        let task = advance(&engine, task.id, &[TaskStatus::InProgress, TaskStatus::Done]);
        let completed = task.completed_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        let task = engine.evaluate(task.id, &approval()).unwrap();

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.completed_at, completed);
    }

    #[test]
    fn rejecting_returns_task_for_rework() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(
            &engine,
            task.id,
            &[TaskStatus::InProgress, TaskStatus::InReview],
        );

        let eval = Evaluation {
            approve: false,
            learnings: Some("needs real copy, not lorem ipsum".to_string()),
            ..approval()
        };
        let task = engine.evaluate(task.id, &eval).unwrap();

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(
            task.learnings.as_deref(),
            Some("needs real copy, not lorem ipsum")
        );

        let entries = task_activity(&db, task.id);
        assert!(entries.iter().any(|e| e.action == "task_returned"));
    }

    #[test]
    fn evaluate_rejects_unfinished_tasks() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);

        let err = engine.evaluate(task.id, &approval()).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(&engine, task.id, &[TaskStatus::InProgress, TaskStatus::Done]);

        let eval = Evaluation {
            rating: Some(6),
            ..approval()
        };
        let err = engine.evaluate(task.id, &eval).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn lesson_is_recorded_when_title_and_insight_given() {
        let (db, engine) = setup();
        let member = add_member(&db, "reviewer");
        let task = create_task(&db, TaskStatus::Backlog);
        advance(&engine, task.id, &[TaskStatus::InProgress, TaskStatus::Done]);

        let eval = Evaluation {
            evaluator_id: Some(member.id),
            lesson_title: Some("Ship smaller".to_string()),
            lesson_insight: Some("Small batches reviewed faster".to_string()),
            lesson_context: Some("newsletter launch".to_string()),
            lesson_action: Some("Split future work into day-sized tasks".to_string()),
            ..approval()
        };
        engine.evaluate(task.id, &eval).unwrap();

        let lessons = lessons::list_lessons(&db, DEFAULT_ORG_ID).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].title, "Ship smaller");
        assert_eq!(lessons[0].source_task_id, Some(task.id));
        assert_eq!(lessons[0].created_by_id, Some(member.id));
        assert_eq!(lessons[0].context.as_deref(), Some("newsletter launch"));
        assert_eq!(
            lessons[0].action.as_deref(),
            Some("Split future work into day-sized tasks")
        );
    }

    #[test]
    fn no_lesson_without_both_fields() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(&engine, task.id, &[TaskStatus::InProgress, TaskStatus::Done]);

        let eval = Evaluation {
            lesson_title: Some("Half a lesson".to_string()),
            ..approval()
        };
        engine.evaluate(task.id, &eval).unwrap();

        assert!(lessons::list_lessons(&db, DEFAULT_ORG_ID).unwrap().is_empty());
    }

    #[test]
    fn evaluation_is_audited() {
        let (db, engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        advance(
            &engine,
            task.id,
            &[TaskStatus::InProgress, TaskStatus::InReview],
        );

        let eval = Evaluation {
            rating: Some(5),
            ..approval()
        };
        engine.evaluate(task.id, &eval).unwrap();

        let entries = task_activity(&db, task.id);
        let entry = entries
            .iter()
            .find(|e| e.action == "task_evaluated")
            .expect("evaluation not audited");
        assert!(entry.description.contains("(5/5)"));
    }
}

mod conflict_tests {
    use super::*;

    fn write_for(task: &Task, expected: TaskStatus) -> TransitionWrite {
        TransitionWrite {
            expected_status: expected,
            new_status: TaskStatus::InProgress,
            set_owner_id: None,
            started_at: None,
            completed_at: None,
            blocker_reason: None,
            blocked_since: None,
            impact: None,
            learnings: None,
            evaluation_rating: None,
            activity: NewActivity {
                org_id: task.org_id,
                actor_id: None,
                action: "task_status_changed".to_string(),
                entity_type: "task".to_string(),
                entity_id: task.id,
                description: "test".to_string(),
                autonomy_level: None,
            },
            lesson: None,
        }
    }

    #[test]
    fn stale_snapshot_write_reports_conflict() {
        let (db, _engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);

        // Pretend we read the task while it was in_progress
        let write = write_for(&task, TaskStatus::InProgress);
        let outcome = tasks::apply_transition(&db, task.id, &write).unwrap();
        assert!(matches!(outcome, TransitionOutcome::Conflict));

        // And nothing was written, including the audit entry
        let unchanged = tasks::get_task(&db, task.id).unwrap().unwrap();
        assert_eq!(unchanged.status, TaskStatus::Backlog);
        let entries = task_activity(&db, task.id);
        assert!(entries.iter().all(|e| e.action != "task_status_changed"));
    }

    #[test]
    fn write_against_missing_task_reports_missing() {
        let (db, _engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);
        tasks::delete_task(&db, task.id).unwrap();

        let write = write_for(&task, TaskStatus::Backlog);
        let outcome = tasks::apply_transition(&db, task.id, &write).unwrap();
        assert!(matches!(outcome, TransitionOutcome::Missing));
    }

    #[test]
    fn matching_snapshot_write_lands() {
        let (db, _engine) = setup();
        let task = create_task(&db, TaskStatus::Backlog);

        let write = write_for(&task, TaskStatus::Backlog);
        let outcome = tasks::apply_transition(&db, task.id, &write).unwrap();
        match outcome {
            TransitionOutcome::Applied(task) => {
                assert_eq!(task.status, TaskStatus::InProgress)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
