/// Middleware modules for the API server
///
/// - `security`: Security response headers
///
/// The JWT gate is a plain `from_fn_with_state` function in `app`.

pub mod security;
