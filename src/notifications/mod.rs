//! Per-user notifications. Fan-out and delivery channels are handled by the
//! messaging service; this module only stores and serves the records.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::notifications::notifications;
use crate::shared::state::AppState;
use crate::shared::utils::tenant_from_headers;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationFilters {
    pub user_id: Option<Uuid>,
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for NotificationsError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn db_err(e: impl std::fmt::Display) -> NotificationsError {
    NotificationsError::Database(e.to_string())
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(filters): Query<NotificationFilters>,
) -> Result<Json<Vec<NotificationRecord>>, NotificationsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let records = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut query = notifications::table
            .filter(notifications::tenant_id.eq(tenant_id))
            .into_boxed();
        if let Some(user_id) = filters.user_id {
            query = query.filter(notifications::user_id.eq(user_id));
        }
        if filters.unread_only.unwrap_or(false) {
            query = query.filter(notifications::is_read.eq(false));
        }
        query = query.order(notifications::created_at.desc());
        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }
        query.load::<NotificationRecord>(&mut conn).map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(records))
}

pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<Json<NotificationRecord>, NotificationsError> {
    if req.title.trim().is_empty() {
        return Err(NotificationsError::Validation(
            "title is required".to_string(),
        ));
    }

    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let record = NotificationRecord {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: req.user_id,
        title: req.title,
        body: req.body,
        kind: req.kind.unwrap_or_else(|| "general".to_string()),
        is_read: false,
        created_at: Utc::now(),
    };
    let response = record.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        diesel::insert_into(notifications::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    info!(
        "Created notification for {}: {} ({})",
        response.user_id, response.title, response.id
    );
    Ok(Json(response))
}

pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, NotificationsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::tenant_id.eq(tenant_id))
                .filter(notifications::id.eq(id)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)
        .map_err(db_err)?;

        if updated > 0 {
            Ok::<_, NotificationsError>(())
        } else {
            Err(NotificationsError::NotFound(
                "Notification not found".to_string(),
            ))
        }
    })
    .await
    .map_err(db_err)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, NotificationsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        let deleted = diesel::delete(
            notifications::table
                .filter(notifications::tenant_id.eq(tenant_id))
                .filter(notifications::id.eq(id)),
        )
        .execute(&mut conn)
        .map_err(db_err)?;

        if deleted > 0 {
            Ok::<_, NotificationsError>(())
        } else {
            Err(NotificationsError::NotFound(
                "Notification not found".to_string(),
            ))
        }
    })
    .await
    .map_err(db_err)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_notifications_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/api/notifications/:id/read", post(mark_notification_read))
        .route(
            "/api/notifications/:id",
            axum::routing::delete(delete_notification),
        )
}
