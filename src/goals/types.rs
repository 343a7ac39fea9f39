//! Types for the goals module: database records, API shapes and requests.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::shared::schema::goals::{goal_key_results, goals};

// Database model - matches schema exactly
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = goals)]
pub struct GoalRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub goal_type: String,
    pub category: String,
    pub target_value: Option<BigDecimal>,
    pub current_value: BigDecimal,
    pub unit: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub progress: BigDecimal,
    pub weight: BigDecimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = goal_key_results)]
pub struct KeyResultRecord {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub target_value: BigDecimal,
    pub current_value: BigDecimal,
    pub unit: Option<String>,
    pub weight: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// API model - plain numerics and typed enums
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub goal_type: GoalType,
    pub category: String,
    pub target_value: Option<f64>,
    pub current_value: f64,
    pub unit: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: GoalStatus,
    pub progress: f64,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: Option<String>,
    pub weight: f64,
    pub status: KeyResultStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Individual,
    Team,
    Company,
}

impl GoalType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "team" => Self::Team,
            "company" => Self::Company,
            _ => Self::Individual,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
            Self::Company => "company",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    AtRisk,
    Completed,
    Cancelled,
}

impl GoalStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "at_risk" => Self::AtRisk,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::NotStarted,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::AtRisk => "at_risk",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyResultStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl KeyResultStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::NotStarted,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_type: Option<GoalType>,
    pub category: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub unit: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub parent_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub key_results: Option<Vec<CreateKeyResultRequest>>,
}

// Absent fields are left untouched; there is no way to null a field here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_type: Option<GoalType>,
    pub category: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
    pub weight: Option<f64>,
    pub parent_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProgressRequest {
    pub current_value: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyResultRequest {
    pub title: String,
    pub target_value: f64,
    pub current_value: Option<f64>,
    pub unit: Option<String>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResultValueUpdate {
    pub id: Uuid,
    pub current_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateKeyResultsRequest {
    pub updates: Vec<KeyResultValueUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoalFilters {
    pub status: Option<String>,
    pub goal_type: Option<String>,
    pub category: Option<String>,
    pub user_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HierarchyQuery {
    pub root_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalTreeNode {
    pub goal: Goal,
    pub key_results: Vec<KeyResult>,
    pub children: Vec<GoalTreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalStats {
    pub total: i64,
    pub avg_progress: f64,
    pub overdue_count: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
}

pub fn record_to_goal(record: GoalRecord) -> Goal {
    Goal {
        id: record.id,
        tenant_id: record.tenant_id,
        user_id: record.user_id,
        parent_id: record.parent_id,
        department_id: record.department_id,
        title: record.title,
        description: record.description.unwrap_or_default(),
        goal_type: GoalType::from_str(&record.goal_type),
        category: record.category,
        target_value: record.target_value.and_then(|v| v.to_f64()),
        current_value: record.current_value.to_f64().unwrap_or(0.0),
        unit: record.unit,
        start_date: record.start_date,
        due_date: record.due_date,
        status: GoalStatus::from_str(&record.status),
        progress: record.progress.to_f64().unwrap_or(0.0),
        weight: record.weight.to_f64().unwrap_or(1.0),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub fn record_to_key_result(record: KeyResultRecord) -> KeyResult {
    KeyResult {
        id: record.id,
        goal_id: record.goal_id,
        title: record.title,
        target_value: record.target_value.to_f64().unwrap_or(0.0),
        current_value: record.current_value.to_f64().unwrap_or(0.0),
        unit: record.unit,
        weight: record.weight.to_f64().unwrap_or(1.0),
        status: KeyResultStatus::from_str(&record.status),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub fn to_decimal(value: f64) -> BigDecimal {
    BigDecimal::try_from(value).unwrap_or_else(|_| BigDecimal::from(0))
}
