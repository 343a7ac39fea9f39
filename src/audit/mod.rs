//! Audit trail collaborator.
//!
//! `record_change` is fire-and-forget: callers never wait on it and a failed
//! write is logged, not propagated. The row keeps before/after snapshots for
//! history alongside the soft-deleted records themselves.
//!
//! `tenant_id` must reference an existing tenants row or the insert is
//! rejected and logged; the nil fallback id is covered by the seed row the
//! initial migration creates.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::schema::audit_log;
use crate::shared::utils::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = audit_log)]
pub struct AuditRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

pub fn record_change(
    pool: &DbPool,
    tenant_id: Uuid,
    actor_id: Uuid,
    entity_type: &str,
    entity_id: Uuid,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
) {
    let pool = pool.clone();
    let record = AuditRecord {
        id: Uuid::new_v4(),
        tenant_id,
        actor_id,
        entity_type: entity_type.to_string(),
        entity_id,
        before,
        after,
        created_at: Utc::now(),
    };
    tokio::task::spawn_blocking(move || {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("audit write skipped ({} {}): {e}", record.entity_type, record.entity_id);
                return;
            }
        };
        if let Err(e) = diesel::insert_into(audit_log::table)
            .values(&record)
            .execute(&mut conn)
        {
            warn!("audit write failed ({} {}): {e}", record.entity_type, record.entity_id);
        }
    });
}
