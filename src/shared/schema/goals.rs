use crate::shared::schema::core::tenants;

diesel::table! {
    goals (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        user_id -> Uuid,
        parent_id -> Nullable<Uuid>,
        department_id -> Nullable<Uuid>,
        title -> Varchar,
        description -> Nullable<Text>,
        goal_type -> Varchar,
        category -> Varchar,
        target_value -> Nullable<Numeric>,
        current_value -> Numeric,
        unit -> Nullable<Varchar>,
        start_date -> Date,
        due_date -> Date,
        status -> Varchar,
        progress -> Numeric,
        weight -> Numeric,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    goal_key_results (id) {
        id -> Uuid,
        goal_id -> Uuid,
        title -> Varchar,
        target_value -> Numeric,
        current_value -> Numeric,
        unit -> Nullable<Varchar>,
        weight -> Numeric,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(goals -> tenants (tenant_id));
diesel::joinable!(goal_key_results -> goals (goal_id));
diesel::allow_tables_to_appear_in_same_query!(goals, goal_key_results);
