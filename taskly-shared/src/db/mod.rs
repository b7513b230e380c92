/// Database layer for Taskly
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded schema migrations
///
/// Row types and their queries live in the `models` module; the
/// [`PgStore`](crate::store::PgStore) ties them together behind the `Store`
/// trait.

pub mod migrations;
pub mod pool;
