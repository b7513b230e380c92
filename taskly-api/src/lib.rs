//! # Taskly API Server Library
//!
//! HTTP surface of Taskly: authentication, teams and team-scoped tasks.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON and path extractors with API-shaped rejections
//! - `middleware`: Security response headers
//! - `routes`: API route handlers
//! - `views`: Response bodies with references expanded

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod views;
