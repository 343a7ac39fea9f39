//! Daily attendance records. Plain CRUD; leave balances and hour totals are
//! computed by the payroll integration, not here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::attendance_records;
use crate::shared::state::AppState;
use crate::shared::utils::tenant_from_headers;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = attendance_records)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub work_date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttendanceRequest {
    pub user_id: Uuid,
    pub work_date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAttendanceRequest {
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttendanceFilters {
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AttendanceError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn db_err(e: impl std::fmt::Display) -> AttendanceError {
    AttendanceError::Database(e.to_string())
}

pub async fn list_attendance(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(filters): Query<AttendanceFilters>,
) -> Result<Json<Vec<AttendanceRecord>>, AttendanceError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let records = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut query = attendance_records::table
            .filter(attendance_records::tenant_id.eq(tenant_id))
            .into_boxed();
        if let Some(user_id) = filters.user_id {
            query = query.filter(attendance_records::user_id.eq(user_id));
        }
        if let Some(status) = filters.status {
            query = query.filter(attendance_records::status.eq(status));
        }
        if let Some(from) = filters.from {
            query = query.filter(attendance_records::work_date.ge(from));
        }
        if let Some(to) = filters.to {
            query = query.filter(attendance_records::work_date.le(to));
        }
        query = query.order(attendance_records::work_date.desc());
        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }
        query.load::<AttendanceRecord>(&mut conn).map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(records))
}

pub async fn create_attendance(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CreateAttendanceRequest>,
) -> Result<Json<AttendanceRecord>, AttendanceError> {
    if let (Some(clock_in), Some(clock_out)) = (req.clock_in, req.clock_out) {
        if clock_out < clock_in {
            return Err(AttendanceError::Validation(
                "clock_out cannot be before clock_in".to_string(),
            ));
        }
    }

    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let now = Utc::now();
    let record = AttendanceRecord {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: req.user_id,
        work_date: req.work_date,
        clock_in: req.clock_in,
        clock_out: req.clock_out,
        status: req.status.unwrap_or_else(|| "present".to_string()),
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    let response = record.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        diesel::insert_into(attendance_records::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    info!(
        "Created attendance record for {} on {} ({})",
        response.user_id, response.work_date, response.id
    );
    Ok(Json(response))
}

pub async fn get_attendance(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendanceRecord>, AttendanceError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        attendance_records::table
            .filter(attendance_records::tenant_id.eq(tenant_id))
            .filter(attendance_records::id.eq(id))
            .first::<AttendanceRecord>(&mut conn)
            .optional()
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    record
        .map(Json)
        .ok_or_else(|| AttendanceError::NotFound("Attendance record not found".to_string()))
}

pub async fn update_attendance(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceRecord>, AttendanceError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut record = attendance_records::table
            .filter(attendance_records::tenant_id.eq(tenant_id))
            .filter(attendance_records::id.eq(id))
            .first::<AttendanceRecord>(&mut conn)
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| {
                AttendanceError::NotFound("Attendance record not found".to_string())
            })?;

        if let Some(clock_in) = req.clock_in {
            record.clock_in = Some(clock_in);
        }
        if let Some(clock_out) = req.clock_out {
            record.clock_out = Some(clock_out);
        }
        if let (Some(clock_in), Some(clock_out)) = (record.clock_in, record.clock_out) {
            if clock_out < clock_in {
                return Err(AttendanceError::Validation(
                    "clock_out cannot be before clock_in".to_string(),
                ));
            }
        }
        if let Some(status) = req.status {
            record.status = status;
        }
        if let Some(notes) = req.notes {
            record.notes = Some(notes);
        }
        record.updated_at = Utc::now();

        diesel::update(attendance_records::table.find(id))
            .set(&record)
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok::<_, AttendanceError>(record)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(record))
}

pub async fn delete_attendance(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AttendanceError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        let deleted = diesel::delete(
            attendance_records::table
                .filter(attendance_records::tenant_id.eq(tenant_id))
                .filter(attendance_records::id.eq(id)),
        )
        .execute(&mut conn)
        .map_err(db_err)?;

        if deleted > 0 {
            info!("Deleted attendance record: {id}");
            Ok::<_, AttendanceError>(())
        } else {
            Err(AttendanceError::NotFound(
                "Attendance record not found".to_string(),
            ))
        }
    })
    .await
    .map_err(db_err)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_attendance_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/attendance",
            get(list_attendance).post(create_attendance),
        )
        .route(
            "/api/attendance/:id",
            get(get_attendance)
                .put(update_attendance)
                .delete(delete_attendance),
        )
}
