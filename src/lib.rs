pub mod api_router;
pub mod assets;
pub mod attendance;
pub mod audit;
pub mod config;
pub mod goals;
pub mod notifications;
pub mod reviews;
pub mod shared;
