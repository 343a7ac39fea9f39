use axum::http::HeaderMap;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use diesel::PgConnection;
use uuid::Uuid;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_conn(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

/// Run database migrations
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS).map_err(
        |e| -> Box<dyn std::error::Error + Send + Sync> {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Migration error: {}", e),
            ))
        },
    )?;
    Ok(())
}

/// Tenant isolation middleware lives upstream of this service; the resolved
/// tenant id arrives as a gateway header, with an env fallback for
/// single-tenant deployments. Without either, the nil id is used; the initial
/// migration seeds a tenants row for it so inserts keep satisfying the
/// foreign key.
pub fn tenant_from_headers(headers: &HeaderMap) -> Uuid {
    headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .or_else(|| {
            std::env::var("DEFAULT_TENANT_ID")
                .ok()
                .and_then(|s| Uuid::parse_str(&s).ok())
        })
        .unwrap_or_else(Uuid::nil)
}

pub fn actor_from_headers(headers: &HeaderMap) -> Uuid {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::nil)
}
