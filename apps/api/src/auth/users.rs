use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::verifier::IdentityClaims;
use crate::errors::AppError;
use crate::models::user::UserRow;

/// Resolves the backend user for a verified identity, creating it on first sight.
///
/// Lookup order: `firebase_uid`, then email (rebinding the uid when the
/// provider account was recreated), then insert.
pub async fn get_or_create_user(pool: &PgPool, claims: &IdentityClaims) -> Result<UserRow, AppError> {
    let by_uid: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE firebase_uid = $1")
        .bind(&claims.uid)
        .fetch_optional(pool)
        .await?;
    if let Some(user) = by_uid {
        return Ok(user);
    }

    let by_email: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&claims.email)
        .fetch_optional(pool)
        .await?;
    if let Some(user) = by_email {
        info!("Rebinding identity for existing user {}", user.id);
        let user = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET firebase_uid = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(&claims.uid)
        .bind(user.id)
        .fetch_one(pool)
        .await?;
        return Ok(user);
    }

    // Two first requests from the same account can race; the conflict arm
    // returns the row the other one inserted.
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, email, firebase_uid, full_name, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (firebase_uid) DO UPDATE SET email = EXCLUDED.email
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&claims.email)
    .bind(&claims.uid)
    .bind(claims.name.as_deref().unwrap_or(""))
    .fetch_one(pool)
    .await?;

    info!("Created user {}", user.id);
    Ok(user)
}

pub async fn update_full_name(pool: &PgPool, user_id: Uuid, full_name: &str) -> Result<UserRow, AppError> {
    Ok(sqlx::query_as::<_, UserRow>(
        "UPDATE users SET full_name = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(full_name)
    .bind(user_id)
    .fetch_one(pool)
    .await?)
}
