//! # Taskly Shared Library
//!
//! This crate contains the domain types, access-control rules and storage
//! layer used by the Taskly API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, teams and tasks, with their PostgreSQL CRUD operations
//! - `auth`: Password hashing, JWT tokens, request identity and the capability table
//! - `store`: Storage abstraction with PostgreSQL and in-memory backends
//! - `db`: Connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the Taskly shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
