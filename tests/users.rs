mod common;

use common::{TestApp, routes};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn register_and_fetch() {
    let app = TestApp::spawn().await;

    let res = app
        .post_json(
            routes::USERS,
            &json!({"username": "carol", "email": " Carol@Example.COM ", "fullName": "Carol C"}),
            None,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["statusCode"], 201);
    assert_eq!(res.data()["email"], "carol@example.com");
    assert_eq!(res.data()["fullName"], "Carol C");

    let id = res.data()["id"].as_str().unwrap();
    let res = app.get(&routes::user(id)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["username"], "carol");
}

#[tokio::test]
async fn duplicates_conflict() {
    let app = TestApp::spawn().await;
    app.create_user("dave").await;

    let res = app
        .post_json(
            routes::USERS,
            &json!({"username": "dave", "email": "other@example.com", "fullName": "Dave"}),
            None,
        )
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(res.message(), "User with email or username already exists");
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .post_json(routes::USERS, &json!({"username": "erin"}), None)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["success"], false);

    let res = app
        .post_json(
            routes::USERS,
            &json!({"username": "erin", "email": "no-at-sign", "fullName": "Erin"}),
            None,
        )
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = TestApp::spawn().await;
    let res = app.get(&routes::user(&Uuid::new_v4().to_string())).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.message(), "User not found");
}
