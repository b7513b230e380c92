/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskly_api::{app::{build_router, AppState}, config::Config};
/// use taskly_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{expose_internal_detail, ApiError},
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use taskly_shared::{
    auth::{middleware::authenticate, password::HashParams},
    store::SharedStore,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// User, team and task storage
    pub store: SharedStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn hash_params(&self) -> &HashParams {
        &self.config.password
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                         public
/// └── /api
///     ├── /auth
///     │   ├── POST /register              public
///     │   ├── POST /login                 public
///     │   └── GET  /me
///     ├── /teams
///     │   ├── POST|GET /
///     │   ├── GET  /members
///     │   ├── GET|PUT|DELETE /:team_id
///     │   ├── POST /:team_id/members
///     │   └── DELETE /:team_id/members/:user_id
///     └── /tasks
///         ├── POST|GET /
///         ├── GET  /my-tasks
///         ├── GET  /stats
///         ├── GET  /team/:team_id
///         └── GET|PUT|DELETE /:task_id
/// ```
///
/// Everything except `/health`, register and login sits behind the JWT gate.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_gate = axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let private_auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(auth_gate.clone());

    let team_routes = Router::new()
        .route(
            "/",
            post(routes::teams::create_team).get(routes::teams::list_teams),
        )
        .route("/members", get(routes::teams::list_teammates))
        .route(
            "/:team_id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/:team_id/members", post(routes::teams::add_member))
        .route(
            "/:team_id/members/:user_id",
            delete(routes::teams::remove_member),
        )
        .route_layer(auth_gate.clone());

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/my-tasks", get(routes::tasks::my_tasks))
        .route("/stats", get(routes::tasks::task_stats))
        .route("/team/:team_id", get(routes::tasks::team_tasks))
        .route(
            "/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(auth_gate);

    let api_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(private_auth_routes))
        .nest("/teams", team_routes)
        .nest("/tasks", task_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .fallback(route_not_found)
        .layer(axum::middleware::map_response_with_state(
            state.clone(),
            internal_detail_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Resolves the bearer token to a stored user and injects the resulting
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&*state.store, state.jwt_secret(), req.headers()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Fills in the `detail` field of 500 responses outside production
async fn internal_detail_layer(State(state): State<AppState>, response: Response) -> Response {
    if state.config.api.production {
        response
    } else {
        expose_internal_detail(response)
    }
}

async fn route_not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(format!("Not Found - {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DatabaseConfig, JwtConfig, MEMORY_DATABASE_URL};
    use axum::body::Body;
    use taskly_shared::store::MemoryStore;
    use tower::ServiceExt;

    fn state(production: bool) -> AppState {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production,
            },
            database: DatabaseConfig {
                url: MEMORY_DATABASE_URL.to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "app-test-secret-of-at-least-32-bytes".to_string(),
                expiration_hours: 1,
            },
            password: HashParams::default(),
        };
        AppState::new(Arc::new(MemoryStore::new()), config)
    }

    fn failing_router(state: AppState) -> Router {
        Router::new()
            .route(
                "/fail",
                get(|| async { ApiError::InternalError("connection reset".to_string()) }),
            )
            .layer(axum::middleware::map_response_with_state(
                state.clone(),
                internal_detail_layer,
            ))
            .with_state(state)
    }

    async fn fail_detail(app: &Router) -> Option<String> {
        let request = axum::http::Request::builder()
            .uri("/fail")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["detail"].as_str().map(str::to_string)
    }

    #[tokio::test]
    async fn test_internal_detail_is_per_router() {
        let development = failing_router(state(false));
        let production = failing_router(state(true));

        assert_eq!(fail_detail(&development).await.as_deref(), Some("connection reset"));
        assert_eq!(fail_detail(&production).await, None);
        assert_eq!(fail_detail(&development).await.as_deref(), Some("connection reset"));

        // Building a full router must not affect routers built before it
        let _full = build_router(state(true));
        assert_eq!(fail_detail(&development).await.as_deref(), Some("connection reset"));
    }
}
