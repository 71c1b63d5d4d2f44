use sqlx::PgPool;
use uuid::Uuid;

/// Admin console account. Accounts are provisioned directly in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StaffProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub hashed_password: String,
    pub is_active: bool,
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<StaffProfile>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, email, name, role, hashed_password, is_active
         FROM staff_profiles WHERE lower(email) = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}
