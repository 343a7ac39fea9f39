//! Narrow data-store adapter for the goal hierarchy.
//!
//! The engine only ever talks to this trait; the Postgres implementation is
//! used by the HTTP handlers and an in-memory implementation backs the engine
//! tests.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::goals::types::{GoalFilters, GoalRecord, KeyResultRecord};
use crate::shared::schema::goals::{goal_key_results, goals};

/// A goal row as the store hands it out. Soft-deleted rows persist for audit
/// history but surface as tombstones so read paths pattern-match instead of
/// re-filtering `is_active` at every call site.
#[derive(Debug, Clone)]
pub enum StoredGoal {
    Active(GoalRecord),
    Tombstoned(Uuid),
}

impl StoredGoal {
    pub fn into_active(self) -> Option<GoalRecord> {
        match self {
            Self::Active(record) => Some(record),
            Self::Tombstoned(_) => None,
        }
    }
}

pub trait GoalStore {
    fn find_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<Option<StoredGoal>, GoalsError>;
    fn find_children(
        &mut self,
        tenant_id: Uuid,
        parent_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<GoalRecord>, GoalsError>;
    fn find_roots(&mut self, tenant_id: Uuid) -> Result<Vec<GoalRecord>, GoalsError>;
    fn find_key_results(&mut self, goal_id: Uuid) -> Result<Vec<KeyResultRecord>, GoalsError>;
    fn find_key_result(&mut self, id: Uuid) -> Result<Option<KeyResultRecord>, GoalsError>;
    fn insert_goal(&mut self, record: &GoalRecord) -> Result<(), GoalsError>;
    fn save_goal(&mut self, record: &GoalRecord) -> Result<(), GoalsError>;
    fn soft_delete_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), GoalsError>;
    fn list_goals(
        &mut self,
        tenant_id: Uuid,
        filters: &GoalFilters,
    ) -> Result<Vec<GoalRecord>, GoalsError>;
    fn insert_key_result(&mut self, record: &KeyResultRecord) -> Result<(), GoalsError>;
    fn save_key_result(&mut self, record: &KeyResultRecord) -> Result<(), GoalsError>;
    fn delete_key_result(&mut self, id: Uuid) -> Result<(), GoalsError>;
}

pub struct PgGoalStore {
    conn: PooledConnection<ConnectionManager<PgConnection>>,
}

impl PgGoalStore {
    pub fn new(conn: PooledConnection<ConnectionManager<PgConnection>>) -> Self {
        Self { conn }
    }
}

fn db_err(e: impl std::fmt::Display) -> GoalsError {
    GoalsError::Database(e.to_string())
}

impl GoalStore for PgGoalStore {
    fn find_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<Option<StoredGoal>, GoalsError> {
        let record = goals::table
            .filter(goals::tenant_id.eq(tenant_id))
            .filter(goals::id.eq(id))
            .first::<GoalRecord>(&mut self.conn)
            .optional()
            .map_err(db_err)?;
        Ok(record.map(|r| {
            if r.is_active {
                StoredGoal::Active(r)
            } else {
                StoredGoal::Tombstoned(r.id)
            }
        }))
    }

    fn find_children(
        &mut self,
        tenant_id: Uuid,
        parent_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<GoalRecord>, GoalsError> {
        let mut query = goals::table
            .filter(goals::tenant_id.eq(tenant_id))
            .filter(goals::parent_id.eq(parent_id))
            .into_boxed();
        if active_only {
            query = query.filter(goals::is_active.eq(true));
        }
        query
            .order(goals::created_at.asc())
            .load::<GoalRecord>(&mut self.conn)
            .map_err(db_err)
    }

    fn find_roots(&mut self, tenant_id: Uuid) -> Result<Vec<GoalRecord>, GoalsError> {
        goals::table
            .filter(goals::tenant_id.eq(tenant_id))
            .filter(goals::parent_id.is_null())
            .filter(goals::is_active.eq(true))
            .order(goals::created_at.asc())
            .load::<GoalRecord>(&mut self.conn)
            .map_err(db_err)
    }

    fn find_key_results(&mut self, goal_id: Uuid) -> Result<Vec<KeyResultRecord>, GoalsError> {
        goal_key_results::table
            .filter(goal_key_results::goal_id.eq(goal_id))
            .order(goal_key_results::created_at.asc())
            .load::<KeyResultRecord>(&mut self.conn)
            .map_err(db_err)
    }

    fn find_key_result(&mut self, id: Uuid) -> Result<Option<KeyResultRecord>, GoalsError> {
        goal_key_results::table
            .find(id)
            .first::<KeyResultRecord>(&mut self.conn)
            .optional()
            .map_err(db_err)
    }

    fn insert_goal(&mut self, record: &GoalRecord) -> Result<(), GoalsError> {
        diesel::insert_into(goals::table)
            .values(record)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(())
    }

    fn save_goal(&mut self, record: &GoalRecord) -> Result<(), GoalsError> {
        diesel::update(goals::table.find(record.id))
            .set(record)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(())
    }

    fn soft_delete_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), GoalsError> {
        diesel::update(
            goals::table
                .filter(goals::tenant_id.eq(tenant_id))
                .filter(goals::id.eq(id)),
        )
        .set((
            goals::is_active.eq(false),
            goals::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut self.conn)
        .map_err(db_err)?;
        Ok(())
    }

    fn list_goals(
        &mut self,
        tenant_id: Uuid,
        filters: &GoalFilters,
    ) -> Result<Vec<GoalRecord>, GoalsError> {
        let mut query = goals::table
            .filter(goals::tenant_id.eq(tenant_id))
            .filter(goals::is_active.eq(true))
            .into_boxed();

        if let Some(status) = &filters.status {
            query = query.filter(goals::status.eq(status.clone()));
        }
        if let Some(goal_type) = &filters.goal_type {
            query = query.filter(goals::goal_type.eq(goal_type.clone()));
        }
        if let Some(category) = &filters.category {
            query = query.filter(goals::category.eq(category.clone()));
        }
        if let Some(user_id) = filters.user_id {
            query = query.filter(goals::user_id.eq(user_id));
        }
        if let Some(department_id) = filters.department_id {
            query = query.filter(goals::department_id.eq(department_id));
        }
        if let Some(parent_id) = filters.parent_id {
            query = query.filter(goals::parent_id.eq(parent_id));
        }

        query = query.order(goals::created_at.desc());

        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }

        query.load::<GoalRecord>(&mut self.conn).map_err(db_err)
    }

    fn insert_key_result(&mut self, record: &KeyResultRecord) -> Result<(), GoalsError> {
        diesel::insert_into(goal_key_results::table)
            .values(record)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(())
    }

    fn save_key_result(&mut self, record: &KeyResultRecord) -> Result<(), GoalsError> {
        diesel::update(goal_key_results::table.find(record.id))
            .set(record)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(())
    }

    fn delete_key_result(&mut self, id: Uuid) -> Result<(), GoalsError> {
        diesel::delete(goal_key_results::table.find(id))
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(())
    }
}
