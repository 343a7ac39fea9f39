//! HTTP handlers for the goals API.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::{delete, get, put};
use axum::Router;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit;
use crate::goals::engine::GoalEngine;
use crate::goals::error::GoalsError;
use crate::goals::hierarchy;
use crate::goals::store::PgGoalStore;
use crate::goals::types::{
    record_to_goal, record_to_key_result, CreateGoalRequest, CreateKeyResultRequest, Goal,
    GoalFilters, GoalStats, GoalTreeNode, HierarchyQuery, KeyResult, UpdateGoalRequest,
    UpdateKeyResultsRequest, UpdateProgressRequest,
};
use crate::shared::state::AppState;
use crate::shared::utils::{actor_from_headers, tenant_from_headers};

fn db_err(e: impl std::fmt::Display) -> GoalsError {
    GoalsError::Database(e.to_string())
}

pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateGoalRequest>,
) -> Result<Json<Goal>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).create_goal(tenant_id, actor_id, req)
    })
    .await
    .map_err(db_err)??;

    info!("Created goal: {} ({})", record.title, record.id);
    audit::record_change(
        &state.conn,
        tenant_id,
        actor_id,
        "goal",
        record.id,
        None,
        serde_json::to_value(&record).ok(),
    );
    Ok(Json(record_to_goal(record)))
}

pub async fn list_goals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filters): Query<GoalFilters>,
) -> Result<Json<Vec<Goal>>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let records = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).list_goals(tenant_id, &filters)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(records.into_iter().map(record_to_goal).collect()))
}

pub async fn get_goal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).get_goal(tenant_id, id)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(record_to_goal(record)))
}

pub async fn update_goal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).update_goal_fields(tenant_id, id, req)
    })
    .await
    .map_err(db_err)??;

    info!("Updated goal: {} ({})", record.title, record.id);
    audit::record_change(
        &state.conn,
        tenant_id,
        actor_id,
        "goal",
        record.id,
        None,
        serde_json::to_value(&record).ok(),
    );
    Ok(Json(record_to_goal(record)))
}

pub async fn update_goal_progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<Json<Goal>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);
    let note = req.note.clone();

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).update_goal_progress(tenant_id, id, req)
    })
    .await
    .map_err(db_err)??;

    info!(
        "Updated goal progress: {} -> {} ({})",
        record.title, record.progress, record.id
    );
    audit::record_change(
        &state.conn,
        tenant_id,
        actor_id,
        "goal",
        record.id,
        None,
        serde_json::to_value(serde_json::json!({ "goal": record, "note": note })).ok(),
    );
    Ok(Json(record_to_goal(record)))
}

pub async fn delete_goal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);

    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).delete_goal(tenant_id, id)
    })
    .await
    .map_err(db_err)??;

    info!("Deleted goal: {id}");
    audit::record_change(&state.conn, tenant_id, actor_id, "goal", id, None, None);
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn get_hierarchy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HierarchyQuery>,
) -> Result<Json<Vec<GoalTreeNode>>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let tree = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        hierarchy::get_hierarchy(&mut store, tenant_id, query.root_id)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(tree))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filters): Query<GoalFilters>,
) -> Result<Json<GoalStats>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let stats = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).get_stats(tenant_id, &filters)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(stats))
}

pub async fn list_key_results(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<KeyResult>>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);

    let records = tokio::task::spawn_blocking(move || {
        use crate::goals::store::GoalStore;
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        // Tenant scope check before exposing the key results.
        GoalEngine::new(&mut store).get_goal(tenant_id, id)?;
        store.find_key_results(id)
    })
    .await
    .map_err(db_err)??;

    Ok(Json(
        records.into_iter().map(record_to_key_result).collect(),
    ))
}

pub async fn add_key_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateKeyResultRequest>,
) -> Result<Json<KeyResult>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).add_key_result(tenant_id, id, req)
    })
    .await
    .map_err(db_err)??;

    info!("Created key result: {} ({})", record.title, record.id);
    audit::record_change(
        &state.conn,
        tenant_id,
        actor_id,
        "key_result",
        record.id,
        None,
        serde_json::to_value(&record).ok(),
    );
    Ok(Json(record_to_key_result(record)))
}

pub async fn update_key_results(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateKeyResultsRequest>,
) -> Result<Json<Goal>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).update_key_results(tenant_id, id, req.updates)
    })
    .await
    .map_err(db_err)??;

    info!(
        "Updated key results for goal: {} -> {} ({})",
        record.title, record.progress, record.id
    );
    audit::record_change(
        &state.conn,
        tenant_id,
        actor_id,
        "goal",
        record.id,
        None,
        serde_json::to_value(&record).ok(),
    );
    Ok(Json(record_to_goal(record)))
}

pub async fn delete_key_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, GoalsError> {
    let pool = state.conn.clone();
    let tenant_id = tenant_from_headers(&headers);
    let actor_id = actor_from_headers(&headers);

    let record = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(db_err)?;
        let mut store = PgGoalStore::new(conn);
        GoalEngine::new(&mut store).remove_key_result(tenant_id, id)
    })
    .await
    .map_err(db_err)??;

    info!("Deleted key result {id} from goal {}", record.id);
    audit::record_change(&state.conn, tenant_id, actor_id, "key_result", id, None, None);
    Ok(Json(record_to_goal(record)))
}

pub fn configure_goals_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route("/api/goals/hierarchy", get(get_hierarchy))
        .route("/api/goals/stats", get(get_stats))
        .route(
            "/api/goals/:id",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/api/goals/:id/progress", put(update_goal_progress))
        .route(
            "/api/goals/:id/key-results",
            get(list_key_results)
                .post(add_key_result)
                .put(update_key_results),
        )
        .route("/api/goals/key-results/:id", delete(delete_key_result))
}
