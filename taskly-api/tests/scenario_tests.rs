/// End-to-end walkthrough of a three-user collaboration

mod common;

use axum::http::{Method, StatusCode};
use common::{ids, member_ids, TestContext, TEST_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_team_collaboration_walkthrough() {
    let ctx = TestContext::new();

    // A registers and creates "Eng" as sole member
    let a = ctx.register("Alice", "alice@example.com").await;
    let b = ctx.register("Bruno", "bruno@example.com").await;
    let c = ctx.register("Chen", "chen@example.com").await;

    let created = ctx.post("/api/teams", &a.token, json!({ "name": "Eng" })).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(member_ids(&created.body), vec![a.id.clone()]);
    let team_id = created.body["id"].as_str().unwrap().to_string();

    // A adds B by email; B now sees the team
    ctx.add_member(&a, &team_id, &b).await;
    let b_teams = ctx.get("/api/teams", &b.token).await;
    assert_eq!(b_teams.body[0]["name"], "Eng");

    // A creates a task assigned to B
    let task = ctx
        .post(
            "/api/tasks",
            &a.token,
            json!({ "title": "Write docs", "teamId": team_id, "assignedTo": b.id }),
        )
        .await;
    assert_eq!(task.status, StatusCode::CREATED);
    let task_id = task.body["id"].as_str().unwrap().to_string();
    let task_uri = format!("/api/tasks/{}", task_id);

    // B cannot hand it to C, who is not a member
    let reassigned = ctx.put(&task_uri, &b.token, json!({ "assignedTo": c.id })).await;
    assert_eq!(reassigned.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        ctx.get(&task_uri, &a.token).await.body["assignedTo"]["id"],
        b.id
    );

    // B is neither task creator nor team creator
    let b_delete = ctx.delete(&task_uri, &b.token).await;
    assert_eq!(b_delete.status, StatusCode::FORBIDDEN);

    // A may delete, and the team no longer lists it
    let a_delete = ctx.delete(&task_uri, &a.token).await;
    assert_eq!(a_delete.status, StatusCode::OK);

    let team = ctx.get(&format!("/api/teams/{}", team_id), &a.token).await;
    assert!(!ids(&team.body["tasks"]).contains(&task_id));
}

#[tokio::test]
async fn test_wrong_password_then_right_password() {
    let ctx = TestContext::new();
    let a = ctx.register("Alice", "alice@example.com").await;

    let wrong = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password124" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert!(wrong.body.get("token").is_none());

    let right = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(right.status, StatusCode::OK);
    assert_eq!(right.body["user"]["id"], a.id);

    let token = right.body["token"].as_str().unwrap();
    assert_eq!(ctx.get("/api/auth/me", token).await.status, StatusCode::OK);
}
