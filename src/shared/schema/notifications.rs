use crate::shared::schema::core::tenants;

diesel::table! {
    notifications (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        user_id -> Uuid,
        title -> Varchar,
        body -> Nullable<Text>,
        kind -> Varchar,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(notifications -> tenants (tenant_id));
