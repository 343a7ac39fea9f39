use crate::shared::schema::core::tenants;

diesel::table! {
    assets (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        name -> Varchar,
        asset_tag -> Varchar,
        category -> Varchar,
        status -> Varchar,
        assigned_to -> Nullable<Uuid>,
        assigned_at -> Nullable<Timestamptz>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(assets -> tenants (tenant_id));
