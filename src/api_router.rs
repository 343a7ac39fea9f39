use axum::Router;
use std::sync::Arc;

use crate::assets::configure_assets_routes;
use crate::attendance::configure_attendance_routes;
use crate::goals::configure_goals_routes;
use crate::notifications::configure_notifications_routes;
use crate::reviews::configure_reviews_routes;
use crate::shared::state::AppState;

/// Central route registry. Every module exposes a `configure_*_routes`
/// builder and gets merged here so main.rs stays small.
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(configure_goals_routes())
        .merge(configure_reviews_routes())
        .merge(configure_attendance_routes())
        .merge(configure_assets_routes())
        .merge(configure_notifications_routes())
}
