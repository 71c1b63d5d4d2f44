use sqlx::PgPool;

/// INSERT first and check `rows_affected`, so two concurrent deliveries of
/// one email cannot both win.
pub async fn claim(pool: &PgPool, email_id: &str, now: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_inbound_emails (email_id, processed_at)
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(email_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn release(pool: &PgPool, email_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_inbound_emails WHERE email_id = $1")
        .bind(email_id)
        .execute(pool)
        .await?;
    Ok(())
}
