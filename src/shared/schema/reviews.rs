use crate::shared::schema::core::tenants;

diesel::table! {
    performance_reviews (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        employee_id -> Uuid,
        reviewer_id -> Uuid,
        period -> Varchar,
        rating -> Nullable<Int4>,
        summary -> Nullable<Text>,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(performance_reviews -> tenants (tenant_id));
