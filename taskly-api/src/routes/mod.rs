/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and the current user
/// - `teams`: Team CRUD and membership management
/// - `tasks`: Task CRUD, per-user and per-team listings, stats
///
/// Every guarded handler follows the same shape: load the team (and task),
/// check the capability table, then read or write through the store.

pub mod auth;
pub mod health;
pub mod tasks;
pub mod teams;
