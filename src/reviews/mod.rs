//! Performance review records. Plain CRUD; review-cycle workflow is handled
//! by the scheduling service upstream.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::performance_reviews;
use crate::shared::state::AppState;
use crate::shared::utils::tenant_from_headers;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = performance_reviews)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub reviewer_id: Uuid,
    pub period: String,
    pub rating: Option<i32>,
    pub summary: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub employee_id: Uuid,
    pub reviewer_id: Uuid,
    pub period: String,
    pub rating: Option<i32>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub reviewer_id: Option<Uuid>,
    pub period: Option<String>,
    pub rating: Option<i32>,
    pub summary: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReviewFilters {
    pub employee_id: Option<Uuid>,
    pub reviewer_id: Option<Uuid>,
    pub period: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for ReviewsError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn db_err(e: impl std::fmt::Display) -> ReviewsError {
    ReviewsError::Database(e.to_string())
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(filters): Query<ReviewFilters>,
) -> Result<Json<Vec<ReviewRecord>>, ReviewsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let records = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut query = performance_reviews::table
            .filter(performance_reviews::tenant_id.eq(tenant_id))
            .into_boxed();
        if let Some(employee_id) = filters.employee_id {
            query = query.filter(performance_reviews::employee_id.eq(employee_id));
        }
        if let Some(reviewer_id) = filters.reviewer_id {
            query = query.filter(performance_reviews::reviewer_id.eq(reviewer_id));
        }
        if let Some(period) = filters.period {
            query = query.filter(performance_reviews::period.eq(period));
        }
        if let Some(status) = filters.status {
            query = query.filter(performance_reviews::status.eq(status));
        }
        query = query.order(performance_reviews::created_at.desc());
        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }
        query.load::<ReviewRecord>(&mut conn).map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(records))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CreateReviewRequest>,
) -> Result<Json<ReviewRecord>, ReviewsError> {
    if req.period.trim().is_empty() {
        return Err(ReviewsError::Validation("period is required".to_string()));
    }
    if let Some(rating) = req.rating {
        if !(1..=5).contains(&rating) {
            return Err(ReviewsError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
    }

    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let now = Utc::now();
    let record = ReviewRecord {
        id: Uuid::new_v4(),
        tenant_id,
        employee_id: req.employee_id,
        reviewer_id: req.reviewer_id,
        period: req.period,
        rating: req.rating,
        summary: req.summary,
        status: "draft".to_string(),
        created_at: now,
        updated_at: now,
    };
    let response = record.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        diesel::insert_into(performance_reviews::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    info!("Created review: {} ({})", response.period, response.id);
    Ok(Json(response))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewRecord>, ReviewsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        performance_reviews::table
            .filter(performance_reviews::tenant_id.eq(tenant_id))
            .filter(performance_reviews::id.eq(id))
            .first::<ReviewRecord>(&mut conn)
            .optional()
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    record
        .map(Json)
        .ok_or_else(|| ReviewsError::NotFound("Review not found".to_string()))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewRecord>, ReviewsError> {
    if let Some(rating) = req.rating {
        if !(1..=5).contains(&rating) {
            return Err(ReviewsError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
    }

    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut record = performance_reviews::table
            .filter(performance_reviews::tenant_id.eq(tenant_id))
            .filter(performance_reviews::id.eq(id))
            .first::<ReviewRecord>(&mut conn)
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| ReviewsError::NotFound("Review not found".to_string()))?;

        if let Some(reviewer_id) = req.reviewer_id {
            record.reviewer_id = reviewer_id;
        }
        if let Some(period) = req.period {
            record.period = period;
        }
        if let Some(rating) = req.rating {
            record.rating = Some(rating);
        }
        if let Some(summary) = req.summary {
            record.summary = Some(summary);
        }
        if let Some(status) = req.status {
            record.status = status;
        }
        record.updated_at = Utc::now();

        diesel::update(performance_reviews::table.find(id))
            .set(&record)
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok::<_, ReviewsError>(record)
    })
    .await
    .map_err(db_err)??;

    info!("Updated review: {} ({})", record.period, record.id);
    Ok(Json(record))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ReviewsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        let deleted = diesel::delete(
            performance_reviews::table
                .filter(performance_reviews::tenant_id.eq(tenant_id))
                .filter(performance_reviews::id.eq(id)),
        )
        .execute(&mut conn)
        .map_err(db_err)?;

        if deleted > 0 {
            info!("Deleted review: {id}");
            Ok::<_, ReviewsError>(())
        } else {
            Err(ReviewsError::NotFound("Review not found".to_string()))
        }
    })
    .await
    .map_err(db_err)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_reviews_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reviews", get(list_reviews).post(create_review))
        .route(
            "/api/reviews/:id",
            get(get_review).put(update_review).delete(delete_review),
        )
}
