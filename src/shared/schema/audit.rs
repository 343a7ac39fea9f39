use crate::shared::schema::core::tenants;

diesel::table! {
    audit_log (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        actor_id -> Uuid,
        entity_type -> Varchar,
        entity_id -> Uuid,
        before -> Nullable<Jsonb>,
        after -> Nullable<Jsonb>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(audit_log -> tenants (tenant_id));
