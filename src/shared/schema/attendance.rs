use crate::shared::schema::core::tenants;

diesel::table! {
    attendance_records (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        user_id -> Uuid,
        work_date -> Date,
        clock_in -> Nullable<Timestamptz>,
        clock_out -> Nullable<Timestamptz>,
        status -> Varchar,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(attendance_records -> tenants (tenant_id));
