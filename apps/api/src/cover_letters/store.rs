//! Cover letter persistence and the ordered experience links.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::AppError;
use crate::experiences::store::lock_owned_experiences;
use crate::models::cover_letter::{CoverLetterInput, CoverLetterRow};
use crate::models::experience::ExperienceRow;

pub async fn list_cover_letters(pool: &PgPool, user_id: Uuid) -> Result<Vec<CoverLetterRow>, sqlx::Error> {
    sqlx::query_as::<_, CoverLetterRow>(
        "SELECT * FROM cover_letters WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_cover_letter(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<CoverLetterRow>, sqlx::Error> {
    sqlx::query_as::<_, CoverLetterRow>(
        "SELECT * FROM cover_letters WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Linked experiences, most relevant first.
pub async fn linked_experiences(
    pool: &PgPool,
    cover_letter_id: Uuid,
) -> Result<Vec<ExperienceRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperienceRow>(
        r#"
        SELECT e.*
        FROM cover_letter_experiences cle
        JOIN experiences e ON e.id = cle.experience_id
        WHERE cle.cover_letter_id = $1
        ORDER BY cle.relevance_order ASC
        "#,
    )
    .bind(cover_letter_id)
    .fetch_all(pool)
    .await
}

/// Inserts a letter and its experience links in one transaction.
/// Link ids must belong to `user_id`; the ownership check runs in the same
/// transaction.
pub async fn insert_cover_letter(
    pool: &PgPool,
    user_id: Uuid,
    input: &CoverLetterInput,
) -> Result<CoverLetterRow, AppError> {
    let mut tx = pool.begin().await?;
    lock_owned_experiences(&mut tx, user_id, &input.experience_ids).await?;

    let row = sqlx::query_as::<_, CoverLetterRow>(
        r#"
        INSERT INTO cover_letters
            (id, user_id, company_name, job_title, hiring_manager, job_description,
             generated_content, status, chances, chances_explanation)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.company_name)
    .bind(&input.job_title)
    .bind(&input.hiring_manager)
    .bind(&input.job_description)
    .bind(&input.generated_content)
    .bind(input.status.as_str())
    .bind(input.chances.map(|c| c.as_str()))
    .bind(&input.chances_explanation)
    .fetch_one(&mut *tx)
    .await?;

    write_links(&mut tx, row.id, &input.experience_ids).await?;
    tx.commit().await?;
    Ok(row)
}

/// Replaces a letter and its links. `None` when it does not exist for this user.
pub async fn update_cover_letter(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &CoverLetterInput,
) -> Result<Option<CoverLetterRow>, AppError> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<_, CoverLetterRow>(
        r#"
        UPDATE cover_letters
        SET company_name = $1, job_title = $2, hiring_manager = $3, job_description = $4,
            generated_content = $5, status = $6, chances = $7, chances_explanation = $8,
            updated_at = now()
        WHERE id = $9 AND user_id = $10
        RETURNING *
        "#,
    )
    .bind(&input.company_name)
    .bind(&input.job_title)
    .bind(&input.hiring_manager)
    .bind(&input.job_description)
    .bind(&input.generated_content)
    .bind(input.status.as_str())
    .bind(input.chances.map(|c| c.as_str()))
    .bind(&input.chances_explanation)
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    lock_owned_experiences(&mut tx, user_id, &input.experience_ids).await?;

    sqlx::query("DELETE FROM cover_letter_experiences WHERE cover_letter_id = $1")
        .bind(row.id)
        .execute(&mut *tx)
        .await?;
    write_links(&mut tx, row.id, &input.experience_ids).await?;
    tx.commit().await?;
    Ok(Some(row))
}

pub async fn delete_cover_letter(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cover_letters WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// `relevance_order` is the 0-based position in `experience_ids`.
async fn write_links(
    tx: &mut Transaction<'_, Postgres>,
    cover_letter_id: Uuid,
    experience_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    for (order, experience_id) in experience_ids.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO cover_letter_experiences (cover_letter_id, experience_id, relevance_order)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(cover_letter_id)
        .bind(experience_id)
        .bind(order as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
