//! Experience persistence. Every query is scoped to the owning user.

use std::collections::{HashMap, HashSet};

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::experience::{ExperienceInput, ExperienceRow};

pub async fn list_experiences(pool: &PgPool, user_id: Uuid) -> Result<Vec<ExperienceRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperienceRow>(
        "SELECT * FROM experiences WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_experience(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<ExperienceRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperienceRow>("SELECT * FROM experiences WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_experience(
    pool: &PgPool,
    user_id: Uuid,
    input: &ExperienceInput,
) -> Result<ExperienceRow, sqlx::Error> {
    sqlx::query_as::<_, ExperienceRow>(
        r#"
        INSERT INTO experiences (id, user_id, kind, description, skills, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(input.details.kind_str())
    .bind(&input.description)
    .bind(&input.skills)
    .bind(Json(&input.details))
    .fetch_one(pool)
    .await
}

/// Replaces an experience. `None` when it does not exist for this user.
pub async fn update_experience(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &ExperienceInput,
) -> Result<Option<ExperienceRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperienceRow>(
        r#"
        UPDATE experiences
        SET kind = $1, description = $2, skills = $3, details = $4, updated_at = now()
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(input.details.kind_str())
    .bind(&input.description)
    .bind(&input.skills)
    .bind(Json(&input.details))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_experience(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM experiences WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Loads the user's experiences in exactly the order of `ids`.
/// Any id that is unknown or belongs to someone else is `NotFound`.
pub async fn get_experiences_in_order(
    pool: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<ExperienceRow>, AppError> {
    ensure_unique(ids)?;
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows = sqlx::query_as::<_, ExperienceRow>(
        "SELECT * FROM experiences WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(user_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;

    order_by_ids(rows, ids)
}

/// Checks inside `tx` that every id belongs to `user_id` and holds a share
/// lock on those rows until commit, so they cannot be deleted or handed to
/// another user between the check and the writes that reference them.
pub async fn lock_owned_experiences(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<(), AppError> {
    ensure_unique(ids)?;
    if ids.is_empty() {
        return Ok(());
    }

    let found: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM experiences WHERE user_id = $1 AND id = ANY($2) FOR SHARE",
    )
    .bind(user_id)
    .bind(ids)
    .fetch_all(&mut **tx)
    .await?;

    match first_missing(ids, &found) {
        Some(id) => Err(AppError::NotFound(format!("Experience {id} not found"))),
        None => Ok(()),
    }
}

fn first_missing(requested: &[Uuid], found: &[Uuid]) -> Option<Uuid> {
    let found: HashSet<&Uuid> = found.iter().collect();
    requested.iter().find(|id| !found.contains(id)).copied()
}

pub fn ensure_unique(ids: &[Uuid]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::Validation(format!(
            "experience {dup} listed more than once"
        )));
    }
    Ok(())
}

fn order_by_ids(rows: Vec<ExperienceRow>, ids: &[Uuid]) -> Result<Vec<ExperienceRow>, AppError> {
    let mut by_id: HashMap<Uuid, ExperienceRow> = rows.into_iter().map(|r| (r.id, r)).collect();
    ids.iter()
        .map(|id| {
            by_id
                .remove(id)
                .ok_or_else(|| AppError::NotFound(format!("Experience {id} not found")))
        })
        .collect()
}
