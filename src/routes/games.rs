use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::Query;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::middleware::{AuthUser, OptionalAuthUser},
    entities::{game, game_platform, game_review, genre, owned, platform, user, wishlist},
    error::{AppError, is_unique_violation},
    images::ImageStore,
    search::{self, GameSearchParams},
    state::AppState,
};

use super::parse_body;

/// Game catalogue router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_games).post(create_game))
        .route("/genres", get(list_genres))
        .route("/platforms", get(list_platforms))
        .route(
            "/{id}",
            get(get_game).patch(update_game).delete(delete_game),
        )
        .route("/{id}/reviews", get(list_reviews).post(create_review))
        .route(
            "/{id}/wishlist",
            axum::routing::post(add_to_wishlist).delete(remove_from_wishlist),
        )
        .route(
            "/{id}/owned",
            axum::routing::post(mark_owned).delete(unmark_owned),
        )
        .route("/{id}/image", get(get_game_image).put(set_game_image))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest {
    title: String,
    description: String,
    genre_id: i32,
    price: i32,
    platform_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGameRequest {
    title: Option<String>,
    description: Option<String>,
    genre_id: Option<i32>,
    price: Option<i32>,
    platform_ids: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReviewRequest {
    rating: i32,
    review: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameDetailResponse {
    game_id: i32,
    title: String,
    description: String,
    genre_id: i32,
    creation_date: chrono::DateTime<chrono::FixedOffset>,
    creator_id: i32,
    price: i32,
    creator_first_name: String,
    creator_last_name: String,
    rating: f64,
    platform_ids: Vec<i32>,
    number_of_wishlists: u64,
    number_of_owners: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenreResponse {
    genre_id: i32,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlatformResponse {
    platform_id: i32,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewResponse {
    reviewer_id: i32,
    rating: i32,
    review: Option<String>,
    reviewer_first_name: String,
    reviewer_last_name: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /games` — Search the catalogue.
async fn list_games(
    State(state): State<AppState>,
    OptionalAuthUser(opt_user): OptionalAuthUser,
    Query(params): Query<GameSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = opt_user.as_ref().map(|u| u.id);
    let result = search::search_games(&state.db, &params, user_id).await?;
    Ok(Json(result))
}

/// `POST /games` — Create a new game listing.
async fn create_game(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: CreateGameRequest = parse_body(body)?;

    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if req.price < 0 {
        return Err(AppError::BadRequest(
            "Price must be zero or greater".to_string(),
        ));
    }

    check_genre_exists(&state.db, req.genre_id).await?;
    check_platform_ids(&state.db, &req.platform_ids).await?;

    // Pre-check gives the fixed message; the unique index closes the race
    let title_taken = game::Entity::find()
        .filter(game::Column::Title.eq(&req.title))
        .count(&state.db)
        .await?
        > 0;
    if title_taken {
        return Err(AppError::BadRequest("Title must be unique".to_string()));
    }

    let txn = state.db.begin().await?;

    let inserted = game::ActiveModel {
        title: ActiveValue::Set(req.title),
        description: ActiveValue::Set(req.description),
        genre_id: ActiveValue::Set(req.genre_id),
        price: ActiveValue::Set(req.price),
        creator_id: ActiveValue::Set(user.id),
        creation_date: ActiveValue::Set(chrono::Utc::now().into()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::BadRequest("Title must be unique".to_string())
        } else {
            e.into()
        }
    })?;

    for platform_id in &req.platform_ids {
        game_platform::ActiveModel {
            game_id: ActiveValue::Set(inserted.id),
            platform_id: ActiveValue::Set(*platform_id),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "gameId": inserted.id })),
    ))
}

/// `GET /games/:id` — Full game detail.
async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state.db, id).await?;

    let creator = user::Entity::find_by_id(game.creator_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Creator not found".to_string()))?;

    let rating = search::average_rating(&state.db, id).await?;
    let platform_ids = search::load_game_platforms(&state.db, vec![id])
        .await?
        .remove(&id)
        .unwrap_or_default();

    let number_of_wishlists = wishlist::Entity::find()
        .filter(wishlist::Column::GameId.eq(id))
        .count(&state.db)
        .await?;
    let number_of_owners = owned::Entity::find()
        .filter(owned::Column::GameId.eq(id))
        .count(&state.db)
        .await?;

    Ok(Json(GameDetailResponse {
        game_id: game.id,
        title: game.title,
        description: game.description,
        genre_id: game.genre_id,
        creation_date: game.creation_date,
        creator_id: game.creator_id,
        price: game.price,
        creator_first_name: creator.first_name,
        creator_last_name: creator.last_name,
        rating,
        platform_ids,
        number_of_wishlists,
        number_of_owners,
    }))
}

/// `PATCH /games/:id` — Partial update by the creator.
async fn update_game(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: UpdateGameRequest = parse_body(body)?;

    let game = find_game(&state.db, id).await?;
    if game.creator_id != user.id {
        return Err(AppError::Forbidden(
            "You are not the creator of this game".to_string(),
        ));
    }

    if let Some(genre_id) = req.genre_id {
        check_genre_exists(&state.db, genre_id).await?;
    }
    if let Some(platform_ids) = &req.platform_ids {
        check_platform_ids(&state.db, platform_ids).await?;
    }
    if let Some(price) = req.price {
        if price < 0 {
            return Err(AppError::BadRequest(
                "Price must be zero or greater".to_string(),
            ));
        }
    }
    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("Title cannot be empty".to_string()));
        }
        let taken = game::Entity::find()
            .filter(game::Column::Title.eq(title))
            .filter(game::Column::Id.ne(id))
            .count(&state.db)
            .await?
            > 0;
        if taken {
            return Err(AppError::BadRequest("Title must be unique".to_string()));
        }
    }

    let txn = state.db.begin().await?;

    let mut active: game::ActiveModel = game.into();
    if let Some(title) = req.title {
        active.title = ActiveValue::Set(title);
    }
    if let Some(description) = req.description {
        active.description = ActiveValue::Set(description);
    }
    if let Some(genre_id) = req.genre_id {
        active.genre_id = ActiveValue::Set(genre_id);
    }
    if let Some(price) = req.price {
        active.price = ActiveValue::Set(price);
    }
    active.update(&txn).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::BadRequest("Title must be unique".to_string())
        } else {
            e.into()
        }
    })?;

    // platformIds fully replaces the association set
    if let Some(platform_ids) = req.platform_ids {
        game_platform::Entity::delete_many()
            .filter(game_platform::Column::GameId.eq(id))
            .exec(&txn)
            .await?;
        for platform_id in platform_ids {
            game_platform::ActiveModel {
                game_id: ActiveValue::Set(id),
                platform_id: ActiveValue::Set(platform_id),
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;

    Ok(StatusCode::OK)
}

/// `DELETE /games/:id` — Remove a game and its associations.
async fn delete_game(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state.db, id).await?;
    if game.creator_id != user.id {
        return Err(AppError::Forbidden(
            "You are not the creator of this game".to_string(),
        ));
    }

    let has_reviews = game_review::Entity::find()
        .filter(game_review::Column::GameId.eq(id))
        .count(&state.db)
        .await?
        > 0;
    if has_reviews {
        return Err(AppError::Forbidden(
            "Cannot delete a game that has reviews".to_string(),
        ));
    }

    let txn = state.db.begin().await?;
    game_platform::Entity::delete_many()
        .filter(game_platform::Column::GameId.eq(id))
        .exec(&txn)
        .await?;
    wishlist::Entity::delete_many()
        .filter(wishlist::Column::GameId.eq(id))
        .exec(&txn)
        .await?;
    owned::Entity::delete_many()
        .filter(owned::Column::GameId.eq(id))
        .exec(&txn)
        .await?;
    game::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    if let Some(filename) = game.image_filename {
        state.images.remove(&filename).await?;
    }

    Ok(StatusCode::OK)
}

/// `GET /games/genres` — All genres.
async fn list_genres(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let genres = genre::Entity::find()
        .order_by_asc(genre::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(
        genres
            .into_iter()
            .map(|g| GenreResponse {
                genre_id: g.id,
                name: g.name,
            })
            .collect::<Vec<_>>(),
    ))
}

/// `GET /games/platforms` — All platforms.
async fn list_platforms(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let platforms = platform::Entity::find()
        .order_by_asc(platform::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(
        platforms
            .into_iter()
            .map(|p| PlatformResponse {
                platform_id: p.id,
                name: p.name,
            })
            .collect::<Vec<_>>(),
    ))
}

/// `GET /games/:id/reviews` — Reviews, newest first.
async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    find_game(&state.db, id).await?;

    let reviews = game_review::Entity::find()
        .filter(game_review::Column::GameId.eq(id))
        .find_also_related(user::Entity)
        .order_by_desc(game_review::Column::Timestamp)
        .all(&state.db)
        .await?;

    let body: Vec<ReviewResponse> = reviews
        .into_iter()
        .map(|(review, reviewer)| {
            let (first_name, last_name) = reviewer
                .map(|u| (u.first_name, u.last_name))
                .unwrap_or_default();
            ReviewResponse {
                reviewer_id: review.user_id,
                rating: review.rating,
                review: review.review,
                reviewer_first_name: first_name,
                reviewer_last_name: last_name,
                timestamp: review.timestamp,
            }
        })
        .collect();

    Ok(Json(body))
}

/// `POST /games/:id/reviews` — Review a game (once, not your own).
async fn create_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: CreateReviewRequest = parse_body(body)?;

    if !(1..=10).contains(&req.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 10".to_string(),
        ));
    }

    let game = find_game(&state.db, id).await?;
    if game.creator_id == user.id {
        return Err(AppError::Forbidden(
            "Cannot review your own game".to_string(),
        ));
    }

    let already_reviewed = game_review::Entity::find_by_id((id, user.id))
        .one(&state.db)
        .await?
        .is_some();
    if already_reviewed {
        return Err(AppError::Forbidden(
            "Can only review a game once".to_string(),
        ));
    }

    game_review::ActiveModel {
        game_id: ActiveValue::Set(id),
        user_id: ActiveValue::Set(user.id),
        rating: ActiveValue::Set(req.rating),
        review: ActiveValue::Set(req.review),
        timestamp: ActiveValue::Set(chrono::Utc::now().into()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Forbidden("Can only review a game once".to_string())
        } else {
            e.into()
        }
    })?;

    Ok(StatusCode::CREATED)
}

/// `POST /games/:id/wishlist` — Add to the caller's wishlist.
async fn add_to_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state.db, id).await?;
    if game.creator_id == user.id {
        return Err(AppError::Forbidden(
            "Cannot wishlist your own game".to_string(),
        ));
    }

    let owns = owned::Entity::find_by_id((id, user.id))
        .one(&state.db)
        .await?
        .is_some();
    if owns {
        return Err(AppError::Forbidden(
            "Cannot wishlist a game you already own".to_string(),
        ));
    }

    // Adding twice is a no-op; a concurrent duplicate insert is too
    let result = wishlist::ActiveModel {
        game_id: ActiveValue::Set(id),
        user_id: ActiveValue::Set(user.id),
    }
    .insert(&state.db)
    .await;
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(StatusCode::OK)
}

/// `DELETE /games/:id/wishlist` — Remove from the caller's wishlist.
///
/// No existence check: an unknown game id is simply not in the wishlist,
/// so it reports the same 403 as any other missing entry.
async fn remove_from_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = wishlist::Entity::delete_by_id((id, user.id))
        .exec(&state.db)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::Forbidden(
            "Game is not in your wishlist".to_string(),
        ));
    }

    Ok(StatusCode::OK)
}

/// `POST /games/:id/owned` — Mark a game as owned.
///
/// Moving a game from wishlist to owned is atomic: a concurrent reader never
/// sees the game in both lists or in neither after it has been added.
async fn mark_owned(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state.db, id).await?;
    if game.creator_id == user.id {
        return Err(AppError::Forbidden(
            "Cannot mark your own game as owned".to_string(),
        ));
    }

    let already_owned = owned::Entity::find_by_id((id, user.id))
        .one(&state.db)
        .await?
        .is_some();
    if already_owned {
        return Ok(StatusCode::OK);
    }

    let txn = state.db.begin().await?;
    wishlist::Entity::delete_by_id((id, user.id)).exec(&txn).await?;
    let result = owned::ActiveModel {
        game_id: ActiveValue::Set(id),
        user_id: ActiveValue::Set(user.id),
    }
    .insert(&txn)
    .await;
    match result {
        Ok(_) => txn.commit().await?,
        // Lost the race to another request marking the same game owned
        Err(e) if is_unique_violation(&e) => txn.rollback().await?,
        Err(e) => return Err(e.into()),
    }

    Ok(StatusCode::OK)
}

/// `DELETE /games/:id/owned` — Unmark a game as owned.
///
/// Like the wishlist removal, an unknown game id falls through to the 403.
async fn unmark_owned(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = owned::Entity::delete_by_id((id, user.id))
        .exec(&state.db)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::Forbidden(
            "Game is not marked as owned".to_string(),
        ));
    }

    Ok(StatusCode::OK)
}

/// `GET /games/:id/image` — Serve the game's image.
async fn get_game_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state.db, id).await?;
    let filename = game
        .image_filename
        .ok_or_else(|| AppError::NotFound("Game has no image".to_string()))?;
    let bytes = state
        .images
        .read(&filename)
        .await?
        .ok_or_else(|| AppError::NotFound("Game has no image".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, ImageStore::content_type_for(&filename))],
        bytes,
    ))
}

/// `PUT /games/:id/image` — Upload or replace the game's image.
async fn set_game_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let extension = ImageStore::extension_for(content_type)
        .ok_or_else(|| AppError::BadRequest("Invalid image file type".to_string()))?;

    let game = find_game(&state.db, id).await?;
    if game.creator_id != user.id {
        return Err(AppError::Forbidden(
            "You are not the creator of this game".to_string(),
        ));
    }

    let new_filename = ImageStore::game_filename(id, extension);
    let old_filename = game.image_filename.clone();

    // Write, update the row, then drop the old file: a crash can only
    // strand a file, never dangle a reference. Strays go in the boot sweep.
    state.images.write(&new_filename, &body).await?;

    let mut active: game::ActiveModel = game.into();
    active.image_filename = ActiveValue::Set(Some(new_filename.clone()));
    active.update(&state.db).await?;

    match old_filename {
        Some(old) if old != new_filename => {
            state.images.remove(&old).await?;
            Ok(StatusCode::OK)
        }
        Some(_) => Ok(StatusCode::OK),
        None => Ok(StatusCode::CREATED),
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn find_game(db: &DatabaseConnection, id: i32) -> Result<game::Model, AppError> {
    game::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))
}

async fn check_genre_exists(db: &DatabaseConnection, genre_id: i32) -> Result<(), AppError> {
    let exists = genre::Entity::find_by_id(genre_id).one(db).await?.is_some();
    if exists {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid genreId".to_string()))
    }
}

/// Validate a platform id list: no duplicates, non-empty, all known.
async fn check_platform_ids(db: &DatabaseConnection, platform_ids: &[i32]) -> Result<(), AppError> {
    let mut seen = std::collections::HashSet::new();
    if !platform_ids.iter().all(|id| seen.insert(*id)) {
        return Err(AppError::BadRequest(
            "Duplicate platform IDs are not allowed.".to_string(),
        ));
    }
    if platform_ids.is_empty() {
        return Err(AppError::BadRequest(
            "Invalid or missing platformIds".to_string(),
        ));
    }
    let found = platform::Entity::find()
        .filter(platform::Column::Id.is_in(platform_ids.to_vec()))
        .count(db)
        .await?;
    if found != u64::try_from(platform_ids.len()).unwrap_or(u64::MAX) {
        return Err(AppError::BadRequest(
            "Invalid or missing platformIds".to_string(),
        ));
    }
    Ok(())
}
