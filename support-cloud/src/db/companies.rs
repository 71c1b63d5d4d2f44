use sqlx::PgPool;
use uuid::Uuid;

use shared::support::Company;

#[derive(sqlx::FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub created_at: i64,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            domain: row.domain,
            created_at: row.created_at,
        }
    }
}

pub async fn find_by_domain(pool: &PgPool, domain: &str) -> Result<Option<Company>, sqlx::Error> {
    let row: Option<CompanyRow> =
        sqlx::query_as("SELECT id, name, domain, created_at FROM companies WHERE domain = $1")
            .bind(domain)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Into::into))
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Company>, sqlx::Error> {
    let row: Option<CompanyRow> =
        sqlx::query_as("SELECT id, name, domain, created_at FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Into::into))
}

/// Two first-time requesters from one domain may race; the loser gets the
/// winner's row back.
pub async fn upsert(
    pool: &PgPool,
    name: &str,
    domain: &str,
    now: i64,
) -> Result<Company, sqlx::Error> {
    let row: CompanyRow = sqlx::query_as(
        "INSERT INTO companies (id, name, domain, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (domain) DO UPDATE SET domain = EXCLUDED.domain
         RETURNING id, name, domain, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(domain)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn list(pool: &PgPool) -> Result<Vec<Company>, sqlx::Error> {
    let rows: Vec<CompanyRow> =
        sqlx::query_as("SELECT id, name, domain, created_at FROM companies ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
