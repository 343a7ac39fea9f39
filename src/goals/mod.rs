//! Goal/OKR hierarchy and progress engine.
//!
//! Goals form a per-tenant forest (company -> team -> individual); each goal
//! may own weighted key results that drive its progress. Mutations pass
//! through [`engine::GoalEngine`], which validates structure, derives
//! progress/status and rolls the recomputation up the ancestor chain.

pub mod engine;
pub mod error;
pub mod handlers;
pub mod hierarchy;
pub mod progress;
pub mod store;
pub mod types;

pub use handlers::configure_goals_routes;
