//! Company asset registry. Plain CRUD plus assign/return; depreciation and
//! lifecycle tracking live elsewhere.

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

use crate::shared::schema::assets::assets;
use crate::shared::state::AppState;
use crate::shared::utils::tenant_from_headers;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = assets)]
pub struct AssetRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub asset_tag: String,
    pub category: String,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssetRequest {
    pub name: String,
    pub asset_tag: String,
    pub category: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAssetRequest {
    pub name: Option<String>,
    pub asset_tag: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignAssetRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssetFilters {
    pub category: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AssetsError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn db_err(e: impl std::fmt::Display) -> AssetsError {
    AssetsError::Database(e.to_string())
}

pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(filters): Query<AssetFilters>,
) -> Result<Json<Vec<AssetRecord>>, AssetsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let records = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut query = assets::table
            .filter(assets::tenant_id.eq(tenant_id))
            .into_boxed();
        if let Some(category) = filters.category {
            query = query.filter(assets::category.eq(category));
        }
        if let Some(status) = filters.status {
            query = query.filter(assets::status.eq(status));
        }
        if let Some(assigned_to) = filters.assigned_to {
            query = query.filter(assets::assigned_to.eq(assigned_to));
        }
        query = query.order(assets::created_at.desc());
        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }
        query.load::<AssetRecord>(&mut conn).map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(records))
}

pub async fn create_asset(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CreateAssetRequest>,
) -> Result<Json<AssetRecord>, AssetsError> {
    if req.name.trim().is_empty() {
        return Err(AssetsError::Validation("name is required".to_string()));
    }
    if req.asset_tag.trim().is_empty() {
        return Err(AssetsError::Validation("asset_tag is required".to_string()));
    }

    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let now = Utc::now();
    let record = AssetRecord {
        id: Uuid::new_v4(),
        tenant_id,
        name: req.name,
        asset_tag: req.asset_tag,
        category: req.category.unwrap_or_else(|| "hardware".to_string()),
        status: "available".to_string(),
        assigned_to: None,
        assigned_at: None,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    let response = record.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        diesel::insert_into(assets::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    info!("Created asset: {} ({})", response.name, response.id);
    Ok(Json(response))
}

pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetRecord>, AssetsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        assets::table
            .filter(assets::tenant_id.eq(tenant_id))
            .filter(assets::id.eq(id))
            .first::<AssetRecord>(&mut conn)
            .optional()
            .map_err(db_err)
    })
    .await
    .map_err(db_err)??;

    record
        .map(Json)
        .ok_or_else(|| AssetsError::NotFound("Asset not found".to_string()))
}

pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAssetRequest>,
) -> Result<Json<AssetRecord>, AssetsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut record = assets::table
            .filter(assets::tenant_id.eq(tenant_id))
            .filter(assets::id.eq(id))
            .first::<AssetRecord>(&mut conn)
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| AssetsError::NotFound("Asset not found".to_string()))?;

        if let Some(name) = req.name {
            record.name = name;
        }
        if let Some(asset_tag) = req.asset_tag {
            record.asset_tag = asset_tag;
        }
        if let Some(category) = req.category {
            record.category = category;
        }
        if let Some(status) = req.status {
            record.status = status;
        }
        if let Some(notes) = req.notes {
            record.notes = Some(notes);
        }
        record.updated_at = Utc::now();

        diesel::update(assets::table.find(id))
            .set(&record)
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok::<_, AssetsError>(record)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(record))
}

pub async fn assign_asset(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignAssetRequest>,
) -> Result<Json<AssetRecord>, AssetsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;

        let mut record = assets::table
            .filter(assets::tenant_id.eq(tenant_id))
            .filter(assets::id.eq(id))
            .first::<AssetRecord>(&mut conn)
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| AssetsError::NotFound("Asset not found".to_string()))?;

        if record.status == "assigned" {
            return Err(AssetsError::Conflict(
                "Asset is already assigned".to_string(),
            ));
        }
        record.assigned_to = Some(req.user_id);
        record.assigned_at = Some(Utc::now());
        record.status = "assigned".to_string();
        record.updated_at = Utc::now();

        diesel::update(assets::table.find(id))
            .set(&record)
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok::<_, AssetsError>(record)
    })
    .await
    .map_err(db_err)??;

    info!("Assigned asset {} to {:?}", record.id, record.assigned_to);
    Ok(Json(record))
}

pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AssetsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(db_err)?;
        let deleted = diesel::delete(
            assets::table
                .filter(assets::tenant_id.eq(tenant_id))
                .filter(assets::id.eq(id)),
        )
        .execute(&mut conn)
        .map_err(db_err)?;

        if deleted > 0 {
            info!("Deleted asset: {id}");
            Ok::<_, AssetsError>(())
        } else {
            Err(AssetsError::NotFound("Asset not found".to_string()))
        }
    })
    .await
    .map_err(db_err)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_assets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/assets", get(list_assets).post(create_asset))
        .route(
            "/api/assets/:id",
            get(get_asset).put(update_asset).delete(delete_asset),
        )
        .route("/api/assets/:id/assign", post(assign_asset))
}
