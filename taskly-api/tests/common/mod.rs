//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An application backed by the in-memory store
//! - Cheap password hashing so registration stays fast
//! - User registration and team creation helpers
//! - A JSON request helper returning status and parsed body

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use taskly_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig, MEMORY_DATABASE_URL},
};
use taskly_shared::{auth::password::HashParams, store::MemoryStore};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "password123";

/// Test context with a fresh in-memory application
pub struct TestContext {
    pub app: Router,
    pub config: Config,
}

/// Registered user as seen by the tests
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

/// Status and parsed JSON body of a response
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            expiration_hours: 1,
        },
        password: HashParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
    }
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let state = AppState::new(Arc::new(MemoryStore::new()), config.clone());

        TestContext {
            app: build_router(state),
            config,
        }
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a user and returns their ID and token
    pub async fn register(&self, name: &str, email: &str) -> TestUser {
        let response = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "register failed: {}",
            response.body
        );

        TestUser {
            id: response.body["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: response.body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a team owned by `owner` and returns its ID
    pub async fn create_team(&self, owner: &TestUser, name: &str) -> String {
        let response = self
            .post("/api/teams", &owner.token, json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Adds `member` to a team owned by `owner`
    pub async fn add_member(&self, owner: &TestUser, team_id: &str, member: &TestUser) {
        let response = self
            .post(
                &format!("/api/teams/{}/members", team_id),
                &owner.token,
                json!({ "email": member.email }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    }

    /// Creates a task in a team and returns its ID
    pub async fn create_task(&self, creator: &TestUser, team_id: &str, body: Value) -> String {
        let mut body = body;
        body["teamId"] = json!(team_id);
        let response = self.post("/api/tasks", &creator.token, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}

/// IDs of the members listed in a team body
pub fn member_ids(team: &Value) -> Vec<String> {
    team["members"]
        .as_array()
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// IDs of the items in a JSON array body
pub fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
