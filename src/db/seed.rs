//! Demo data seeding for a fresh database.

use super::{activity, engines, members, tasks, Database, DEFAULT_ORG_ID};
use crate::types::{
    MemberType, NewActivity, NewEngine, NewTask, NewTeamMember, Priority, TaskStatus,
};
use anyhow::Result;
use tracing::info;

/// Populate the default organization with starter engines, members, and
/// tasks. Does nothing if engines already exist.
pub fn seed(db: &Database) -> Result<()> {
    if !engines::list_engines(db, DEFAULT_ORG_ID)?.is_empty() {
        info!("database already seeded, skipping");
        return Ok(());
    }

    let engine_defs = [
        ("Growth", "growth", "📈", "Bring more guests in"),
        ("Fulfillment", "fulfillment", "🏨", "Deliver great stays"),
        ("Innovation", "innovation", "💡", "Build what is next"),
    ];
    let mut engine_ids = Vec::new();
    for (name, slug, emoji, goal) in engine_defs {
        let engine = engines::create_engine(
            db,
            DEFAULT_ORG_ID,
            &NewEngine {
                name: name.to_string(),
                slug: slug.to_string(),
                description: None,
                goal: Some(goal.to_string()),
                emoji: Some(emoji.to_string()),
                color: None,
            },
        )?;
        engine_ids.push(engine.id);
    }

    let operator = members::create_member(
        db,
        DEFAULT_ORG_ID,
        &NewTeamMember {
            name: "Operator".to_string(),
            slug: "operator".to_string(),
            member_type: MemberType::Human,
            email: None,
            timezone: None,
            avatar_emoji: Some("🧑‍💼".to_string()),
            ai_model: None,
            max_concurrent_tasks: None,
        },
    )?;
    members::create_member(
        db,
        DEFAULT_ORG_ID,
        &NewTeamMember {
            name: "Concierge Agent".to_string(),
            slug: "concierge-agent".to_string(),
            member_type: MemberType::Ai,
            email: None,
            timezone: None,
            avatar_emoji: Some("🤖".to_string()),
            ai_model: Some("gpt-4o".to_string()),
            max_concurrent_tasks: Some(5),
        },
    )?;

    let task_defs = [
        ("Refresh booking page copy", engine_ids[0], Priority::High),
        ("Draft weekly guest newsletter", engine_ids[0], Priority::Medium),
        ("Audit checkout flow friction", engine_ids[1], Priority::Medium),
        ("Prototype late-checkout upsell", engine_ids[2], Priority::Low),
    ];
    for (title, engine_id, priority) in task_defs {
        tasks::create_task(
            db,
            DEFAULT_ORG_ID,
            &NewTask {
                title: title.to_string(),
                description: None,
                status: Some(TaskStatus::Backlog),
                priority: Some(priority),
                engine_id: Some(engine_id),
                owner_id: None,
                reviewer_id: Some(operator.id),
                estimated_hours: None,
                impact: None,
                sort_order: None,
                due_at: None,
            },
        )?;
    }

    activity::record_activity(
        db,
        &NewActivity {
            org_id: DEFAULT_ORG_ID,
            actor_id: None,
            action: "org_seeded".to_string(),
            entity_type: "organization".to_string(),
            entity_id: DEFAULT_ORG_ID,
            description: "Seeded demo data: 3 engines, 2 members, 4 tasks".to_string(),
            autonomy_level: None,
        },
    )?;

    info!("seeded demo data: 3 engines, 2 members, 4 tasks");
    Ok(())
}
