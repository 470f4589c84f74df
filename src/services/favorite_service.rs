use crate::error::AppResult;
use crate::models::favorite::Favorite;
use crate::models::identity::IdentityRef;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

pub struct FavoriteService;

impl FavoriteService {
    pub async fn is_favorite(
        db: &Pool<Postgres>,
        owner: &IdentityRef,
        target: &IdentityRef,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM favorites \
             WHERE owner_kind = $1 AND owner_id = $2 AND target_kind = $3 AND target_id = $4 \
             LIMIT 1",
        )
        .bind(&owner.kind)
        .bind(owner.id)
        .bind(&target.kind)
        .bind(target.id)
        .fetch_optional(db)
        .await?;

        Ok(row.is_some())
    }

    /// Star or unstar `target` for `owner`. Idempotent both ways: starring an
    /// existing favorite inserts nothing (the unique constraint plus
    /// ON CONFLICT collapse concurrent duplicate stars to one row), and
    /// unstarring a missing one is a no-op. Returns whether a row actually
    /// changed.
    pub async fn set_favorite(
        db: &Pool<Postgres>,
        owner: &IdentityRef,
        target: &IdentityRef,
        desired: bool,
    ) -> AppResult<bool> {
        let result = if desired {
            sqlx::query(
                "INSERT INTO favorites (id, owner_kind, owner_id, target_kind, target_id) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (owner_kind, owner_id, target_kind, target_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(&owner.kind)
            .bind(owner.id)
            .bind(&target.kind)
            .bind(target.id)
            .execute(db)
            .await?
        } else {
            sqlx::query(
                "DELETE FROM favorites \
                 WHERE owner_kind = $1 AND owner_id = $2 AND target_kind = $3 AND target_id = $4",
            )
            .bind(&owner.kind)
            .bind(owner.id)
            .bind(&target.kind)
            .bind(target.id)
            .execute(db)
            .await?
        };

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_favorites(
        db: &Pool<Postgres>,
        owner: &IdentityRef,
    ) -> AppResult<Vec<Favorite>> {
        let rows = sqlx::query(
            "SELECT id, owner_kind, owner_id, target_kind, target_id, created_at \
             FROM favorites \
             WHERE owner_kind = $1 AND owner_id = $2 \
             ORDER BY created_at DESC",
        )
        .bind(&owner.kind)
        .bind(owner.id)
        .fetch_all(db)
        .await?;

        let favorites = rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let created_at: DateTime<Utc> = row.get("created_at");
                Favorite {
                    id,
                    owner: IdentityRef::new(row.get::<String, _>("owner_kind"), row.get("owner_id")),
                    target: IdentityRef::new(
                        row.get::<String, _>("target_kind"),
                        row.get("target_id"),
                    ),
                    created_at,
                }
            })
            .collect();

        Ok(favorites)
    }
}
