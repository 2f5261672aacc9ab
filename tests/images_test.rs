mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::http::StatusCode;
use migration::{Migrator, MigratorTrait};
use serde_json::json;

use gamevault_api::config::{Config, Environment};
use gamevault_api::images::ImageStore;
use gamevault_api::state::AppState;

static DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

// Row ids restart at 1 for every in-memory database, so parallel tests would
// collide on filenames in a shared directory. Each app gets its own.
async fn test_app() -> Router {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let image_dir = std::env::temp_dir().join(format!(
        "gamevault-images-{}-{}",
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let state = AppState {
        db,
        config: Config {
            database_url: String::new(),
            server_host: std::net::IpAddr::from([127, 0, 0, 1]),
            server_port: 0,
            environment: Environment::Development,
            log_level: "warn".to_string(),
            image_dir: image_dir.to_string_lossy().into_owned(),
        },
        images: ImageStore::new(image_dir),
    };

    gamevault_api::routes::router().with_state(state)
}

async fn signup(app: &Router, email: &str) -> (i64, String) {
    let (status, body) = common::post_json(
        app,
        "/api/v1/users/register",
        &json!({
            "firstName": "Sage",
            "lastName": "Okafor",
            "email": email,
            "password": "Password1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let (status, body) = common::post_json(
        app,
        "/api/v1/users/login",
        &json!({ "email": email, "password": "Password1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    (
        json["userId"].as_i64().unwrap_or_default(),
        json["token"].as_str().unwrap_or_default().to_string(),
    )
}

async fn create_game(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = common::post_json_with_auth(
        app,
        "/api/v1/games",
        &json!({
            "title": title,
            "description": "A pictured game",
            "genreId": 1,
            "price": 1000,
            "platformIds": [1],
        }),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    json["gameId"].as_i64().unwrap_or_default()
}

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 4, 5, 6];

// ──────────────────────────────────────────────────────────────────────────────
// Game images
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn game_image_round_trips_bytes_and_content_type() {
    let app = test_app().await;
    let (_id, token) = signup(&app, "gimg@example.com").await;
    let game_id = create_game(&app, &token, "Pictured").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/games/{game_id}/image"),
        "image/png",
        PNG_BYTES.to_vec(),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, content_type, bytes) =
        common::get_binary(&app, &format!("/api/v1/games/{game_id}/image")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/png");
    assert_eq!(bytes, PNG_BYTES);
}

#[tokio::test]
async fn replacing_game_image_returns_200_and_new_type() {
    let app = test_app().await;
    let (_id, token) = signup(&app, "replace@example.com").await;
    let game_id = create_game(&app, &token, "Recovered").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/games/{game_id}/image"),
        "image/png",
        PNG_BYTES.to_vec(),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/games/{game_id}/image"),
        "image/jpeg",
        JPEG_BYTES.to_vec(),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, content_type, bytes) =
        common::get_binary(&app, &format!("/api/v1/games/{game_id}/image")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(bytes, JPEG_BYTES);
}

#[tokio::test]
async fn invalid_content_type_returns_400() {
    let app = test_app().await;
    let (_id, token) = signup(&app, "badtype@example.com").await;
    let game_id = create_game(&app, &token, "Unsupported").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/games/{game_id}/image"),
        "image/webp",
        vec![1, 2, 3],
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_creator_cannot_set_game_image() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "imgowner@example.com").await;
    let game_id = create_game(&app, &creator, "Owned Image").await;
    let (_id, other) = signup(&app, "imgother@example.com").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/games/{game_id}/image"),
        "image/png",
        PNG_BYTES.to_vec(),
        &other,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_game_image_returns_404() {
    let app = test_app().await;
    let (_id, token) = signup(&app, "noimg@example.com").await;
    let game_id = create_game(&app, &token, "Faceless").await;

    let (status, _content_type, _bytes) =
        common::get_binary(&app, &format!("/api/v1/games/{game_id}/image")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn game_image_for_unknown_game_returns_404() {
    let app = test_app().await;
    let (_id, token) = signup(&app, "ghostimg@example.com").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        "/api/v1/games/9999/image",
        "image/png",
        PNG_BYTES.to_vec(),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ──────────────────────────────────────────────────────────────────────────────
// User images
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_image_upload_fetch_delete() {
    let app = test_app().await;
    let (user_id, token) = signup(&app, "uimg@example.com").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/users/{user_id}/image"),
        "image/gif",
        vec![0x47, 0x49, 0x46, 7, 8],
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, content_type, bytes) =
        common::get_binary(&app, &format!("/api/v1/users/{user_id}/image")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/gif");
    assert_eq!(bytes, vec![0x47, 0x49, 0x46, 7, 8]);

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/users/{user_id}/image"), &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _content_type, _bytes) =
        common::get_binary(&app, &format!("/api/v1/users/{user_id}/image")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cannot_set_another_users_image() {
    let app = test_app().await;
    let (victim_id, _victim_token) = signup(&app, "victimimg@example.com").await;
    let (_id, attacker_token) = signup(&app, "attackerimg@example.com").await;

    let (status, _body) = common::put_bytes_with_auth(
        &app,
        &format!("/api/v1/users/{victim_id}/image"),
        "image/png",
        PNG_BYTES.to_vec(),
        &attacker_token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_missing_user_image_returns_404() {
    let app = test_app().await;
    let (user_id, token) = signup(&app, "bald@example.com").await;

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/users/{user_id}/image"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
