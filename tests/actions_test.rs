mod common;

use axum::Router;
use axum::http::StatusCode;
use migration::{Migrator, MigratorTrait};
use serde_json::json;

use gamevault_api::config::{Config, Environment};
use gamevault_api::images::ImageStore;
use gamevault_api::state::AppState;

async fn test_app() -> Router {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let image_dir = std::env::temp_dir().join(format!("gamevault-actions-{}", std::process::id()));
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
            "firstName": "Devon",
            "lastName": "Park",
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
            "description": "A test game",
            "genreId": 1,
            "price": 1500,
            "platformIds": [1],
        }),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    json["gameId"].as_i64().unwrap_or_default()
}

async fn detail(app: &Router, game_id: i64) -> serde_json::Value {
    let (status, body) = common::get(app, &format!("/api/v1/games/{game_id}")).await;
    assert_eq!(status, StatusCode::OK, "detail failed: {body}");
    serde_json::from_str(&body).unwrap_or_default()
}

// ──────────────────────────────────────────────────────────────────────────────
// Wishlist
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wishlist_add_and_remove() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "wlcreator@example.com").await;
    let game_id = create_game(&app, &creator, "Wishable").await;
    let (_id, fan) = signup(&app, "wlfan@example.com").await;

    let (status, _body) =
        common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &fan).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail(&app, game_id).await["numberOfWishlists"], 1);

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &fan).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail(&app, game_id).await["numberOfWishlists"], 0);
}

#[tokio::test]
async fn wishlist_add_is_idempotent() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "idemcreator@example.com").await;
    let game_id = create_game(&app, &creator, "Twice Wished").await;
    let (_id, fan) = signup(&app, "idemfan@example.com").await;

    for _ in 0..2 {
        let (status, _body) =
            common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &fan).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(detail(&app, game_id).await["numberOfWishlists"], 1);
}

#[tokio::test]
async fn creator_cannot_wishlist_own_game() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "selfwish@example.com").await;
    let game_id = create_game(&app, &creator, "My Own").await;

    let (status, _body) =
        common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &creator).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cannot_wishlist_an_owned_game() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "ownedwish@example.com").await;
    let game_id = create_game(&app, &creator, "Already Mine").await;
    let (_id, fan) = signup(&app, "ownedwishfan@example.com").await;

    common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &fan).await;

    let (status, _body) =
        common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &fan).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn removing_unwishlisted_game_returns_403() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "nowish@example.com").await;
    let game_id = create_game(&app, &creator, "Never Wished").await;
    let (_id, fan) = signup(&app, "nowishfan@example.com").await;

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &fan).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wishlist_unknown_game_returns_404() {
    let app = test_app().await;
    let (_id, fan) = signup(&app, "ghostwish@example.com").await;
    let (status, _body) = common::post_with_auth(&app, "/api/v1/games/9999/wishlist", &fan).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remove_wishlist_for_unknown_game_returns_403() {
    let app = test_app().await;
    let (_id, fan) = signup(&app, "ghostunwish@example.com").await;
    let (status, _body) =
        common::delete_with_auth(&app, "/api/v1/games/9999/wishlist", &fan).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ──────────────────────────────────────────────────────────────────────────────
// Owned
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mark_owned_clears_wishlist_entry() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "movecreator@example.com").await;
    let game_id = create_game(&app, &creator, "Moving On Up").await;
    let (_id, fan) = signup(&app, "movefan@example.com").await;

    common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/wishlist"), &fan).await;
    assert_eq!(detail(&app, game_id).await["numberOfWishlists"], 1);

    let (status, _body) =
        common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &fan).await;
    assert_eq!(status, StatusCode::OK);

    // Never in both lists: the wishlist row is gone, the owned row exists
    let json = detail(&app, game_id).await;
    assert_eq!(json["numberOfWishlists"], 0);
    assert_eq!(json["numberOfOwners"], 1);
}

#[tokio::test]
async fn mark_owned_is_idempotent() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "reowncreator@example.com").await;
    let game_id = create_game(&app, &creator, "Twice Owned").await;
    let (_id, fan) = signup(&app, "reownfan@example.com").await;

    for _ in 0..2 {
        let (status, _body) =
            common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &fan).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(detail(&app, game_id).await["numberOfOwners"], 1);
}

#[tokio::test]
async fn creator_cannot_own_own_game() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "selfown@example.com").await;
    let game_id = create_game(&app, &creator, "Self Owned").await;

    let (status, _body) =
        common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &creator).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unmark_owned_removes_entry() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "unowncreator@example.com").await;
    let game_id = create_game(&app, &creator, "Returnable").await;
    let (_id, fan) = signup(&app, "unownfan@example.com").await;

    common::post_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &fan).await;
    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &fan).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail(&app, game_id).await["numberOfOwners"], 0);
}

#[tokio::test]
async fn unmark_not_owned_returns_403() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "neverown@example.com").await;
    let game_id = create_game(&app, &creator, "Never Owned").await;
    let (_id, fan) = signup(&app, "neverownfan@example.com").await;

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/games/{game_id}/owned"), &fan).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unmark_owned_for_unknown_game_returns_403() {
    let app = test_app().await;
    let (_id, fan) = signup(&app, "ghostown@example.com").await;
    let (status, _body) = common::delete_with_auth(&app, "/api/v1/games/9999/owned", &fan).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owned_actions_require_auth() {
    let app = test_app().await;
    let (_id, creator) = signup(&app, "authown@example.com").await;
    let game_id = create_game(&app, &creator, "Login First").await;

    let (status, _body) =
        common::post_json(&app, &format!("/api/v1/games/{game_id}/owned"), &json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
