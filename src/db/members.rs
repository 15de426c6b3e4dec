//! Team member CRUD.

use super::{now_ms, Database};
use crate::types::{MemberType, NewTeamMember, TeamMember, TeamMemberPatch};
use anyhow::Result;
use rusqlite::{params, Connection, Row};

fn parse_member_row(row: &Row) -> rusqlite::Result<TeamMember> {
    let type_raw: String = row.get("member_type")?;
    let member_type = MemberType::parse(&type_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown member type: {}", type_raw).into(),
        )
    })?;

    Ok(TeamMember {
        id: row.get("id")?,
        org_id: row.get("org_id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        member_type,
        email: row.get("email")?,
        timezone: row.get("timezone")?,
        avatar_emoji: row.get("avatar_emoji")?,
        ai_model: row.get("ai_model")?,
        max_concurrent_tasks: row.get("max_concurrent_tasks")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn get_member_internal(conn: &Connection, member_id: i64) -> Result<Option<TeamMember>> {
    let mut stmt = conn.prepare("SELECT * FROM team_members WHERE id = ?1")?;
    let result = stmt.query_row(params![member_id], parse_member_row);
    match result {
        Ok(member) => Ok(Some(member)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create a team member.
pub fn create_member(db: &Database, org_id: i64, input: &NewTeamMember) -> Result<TeamMember> {
    db.with_conn(|conn| {
        let now = now_ms();
        conn.execute(
            "INSERT INTO team_members (org_id, name, slug, member_type, email, timezone,
                 avatar_emoji, ai_model, max_concurrent_tasks, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                org_id,
                input.name,
                input.slug,
                input.member_type.as_str(),
                input.email,
                input.timezone,
                input.avatar_emoji,
                input.ai_model,
                input.max_concurrent_tasks.unwrap_or(3),
                now,
            ],
        )?;
        let member = get_member_internal(conn, conn.last_insert_rowid())?
            .ok_or_else(|| anyhow::anyhow!("member vanished after insert"))?;
        Ok(member)
    })
}

/// Get a team member by ID.
pub fn get_member(db: &Database, member_id: i64) -> Result<Option<TeamMember>> {
    db.with_conn(|conn| get_member_internal(conn, member_id))
}

/// List team members for an organization.
pub fn list_members(db: &Database, org_id: i64) -> Result<Vec<TeamMember>> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM team_members WHERE org_id = ?1 ORDER BY name ASC")?;
        let rows = stmt.query_map(params![org_id], parse_member_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}

/// Apply a field-level patch to a team member.
pub fn update_member(
    db: &Database,
    member_id: i64,
    patch: &TeamMemberPatch,
) -> Result<Option<TeamMember>> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let Some(member) = get_member_internal(&tx, member_id)? else {
            return Ok(None);
        };

        let name = patch.name.clone().unwrap_or(member.name);
        let email = patch.email.clone().or(member.email);
        let timezone = patch.timezone.clone().or(member.timezone);
        let avatar_emoji = patch.avatar_emoji.clone().or(member.avatar_emoji);
        let ai_model = patch.ai_model.clone().or(member.ai_model);
        let max_concurrent = patch
            .max_concurrent_tasks
            .unwrap_or(member.max_concurrent_tasks);
        let status = patch.status.clone().unwrap_or(member.status);

        tx.execute(
            "UPDATE team_members SET name = ?2, email = ?3, timezone = ?4,
                 avatar_emoji = ?5, ai_model = ?6, max_concurrent_tasks = ?7,
                 status = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                member_id,
                name,
                email,
                timezone,
                avatar_emoji,
                ai_model,
                max_concurrent,
                status,
                now_ms(),
            ],
        )?;

        let member = get_member_internal(&tx, member_id)?;
        tx.commit()?;
        Ok(member)
    })
}

/// Delete a team member. Returns false if it did not exist.
pub fn delete_member(db: &Database, member_id: i64) -> Result<bool> {
    db.with_conn(|conn| {
        let rows = conn.execute("DELETE FROM team_members WHERE id = ?1", params![member_id])?;
        Ok(rows > 0)
    })
}
