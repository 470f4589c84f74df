use crate::error::AppResult;
use crate::models::contact::ContactSummary;
use crate::models::identity::IdentityRef;
use crate::models::{page_offset, Paginated};
use crate::services::message_service::MessageService;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

// Folds both directions of the traffic with `me` into (partner, created_at)
// rows. Self-to-self rows cannot exist (send() rejects them) but are
// excluded anyway.
const PARTNER_ROWS: &str = "SELECT CASE WHEN from_kind = $1 AND from_id = $2 THEN to_kind ELSE from_kind END AS partner_kind, \
            CASE WHEN from_kind = $1 AND from_id = $2 THEN to_id ELSE from_id END AS partner_id, \
            created_at \
     FROM messages \
     WHERE ((from_kind = $1 AND from_id = $2) OR (to_kind = $1 AND to_id = $2)) \
       AND NOT (from_kind = $1 AND from_id = $2 AND to_kind = $1 AND to_id = $2)";

pub struct ContactService;

impl ContactService {
    /// One page of conversation partners, most recently active first.
    ///
    /// Partners are grouped by (kind, id) over messages in either direction;
    /// ordering is MAX(created_at) descending, tie-broken by the group's
    /// earliest message then by partner key so equal timestamps page
    /// deterministically. Unseen counts are computed per partner through the
    /// message store.
    pub async fn list_contacts(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        page: i64,
        per_page: i64,
    ) -> AppResult<Paginated<ContactSummary>> {
        let per_page = per_page.clamp(1, 200);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM (SELECT partner_kind, partner_id FROM ({}) t GROUP BY partner_kind, partner_id) g",
            PARTNER_ROWS
        ))
        .bind(&me.kind)
        .bind(me.id)
        .fetch_one(db)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT partner_kind, partner_id, MAX(created_at) AS last_message_at, MIN(created_at) AS first_message_at \
             FROM ({}) t \
             GROUP BY partner_kind, partner_id \
             ORDER BY last_message_at DESC, first_message_at ASC, partner_kind ASC, partner_id ASC \
             LIMIT $3 OFFSET $4",
            PARTNER_ROWS
        ))
        .bind(&me.kind)
        .bind(me.id)
        .bind(per_page)
        .bind(page_offset(page, per_page))
        .fetch_all(db)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let partner = IdentityRef::new(
                row.get::<String, _>("partner_kind"),
                row.get::<i64, _>("partner_id"),
            );
            let last_message_at: DateTime<Utc> = row.get("last_message_at");
            let unseen_count = MessageService::count_unseen(db, me, &partner).await?;
            items.push(ContactSummary {
                partner,
                last_message_at,
                unseen_count,
            });
        }

        Ok(Paginated::new(items, total, per_page))
    }
}
