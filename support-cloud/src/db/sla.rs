use sqlx::PgPool;

use shared::support::{SlaTarget, TicketPriority};

use crate::store::BoxError;

#[derive(sqlx::FromRow)]
struct SlaRow {
    priority: String,
    first_response_hours: f64,
    resolution_hours: f64,
}

pub async fn list(pool: &PgPool) -> Result<Vec<SlaTarget>, BoxError> {
    let rows: Vec<SlaRow> = sqlx::query_as(
        "SELECT priority, first_response_hours, resolution_hours FROM sla_config",
    )
    .fetch_all(pool)
    .await?;

    let mut targets = rows
        .into_iter()
        .map(|row| {
            let priority = TicketPriority::from_db(&row.priority)
                .ok_or_else(|| format!("Unknown SLA priority: {}", row.priority))?;
            Ok(SlaTarget {
                priority,
                first_response_hours: row.first_response_hours,
                resolution_hours: row.resolution_hours,
            })
        })
        .collect::<Result<Vec<_>, BoxError>>()?;
    // Most urgent first, as shown in the settings screen
    targets.sort_by_key(|t| std::cmp::Reverse(t.priority as u8));
    Ok(targets)
}

pub async fn upsert_all(pool: &PgPool, targets: &[SlaTarget], now: i64) -> Result<(), BoxError> {
    let mut tx = pool.begin().await?;
    for target in targets {
        sqlx::query(
            "INSERT INTO sla_config (priority, first_response_hours, resolution_hours, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (priority) DO UPDATE
             SET first_response_hours = EXCLUDED.first_response_hours,
                 resolution_hours = EXCLUDED.resolution_hours,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(target.priority.as_db())
        .bind(target.first_response_hours)
        .bind(target.resolution_hours)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
