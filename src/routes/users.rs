use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{AUTH_HEADER, AuthUser};
use crate::auth::{password, token};
use crate::entities::user;
use crate::error::{AppError, is_unique_violation};
use crate::images::ImageStore;
use crate::state::AppState;

use super::parse_body;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the user route group: `/users/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/{id}", get(get_user).patch(update_user))
        .route(
            "/{id}/image",
            get(get_user_image)
                .put(set_user_image)
                .delete(delete_user_image),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: i32,
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    current_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    first_name: String,
    last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/users/register`
async fn register(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: RegisterRequest = parse_body(body)?;

    password::validate_name(&req.first_name).map_err(AppError::BadRequest)?;
    password::validate_name(&req.last_name).map_err(AppError::BadRequest)?;
    password::validate_email(&req.email).map_err(AppError::BadRequest)?;
    password::validate_password(&req.password).map_err(AppError::BadRequest)?;

    let email_taken = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .count(&state.db)
        .await?
        > 0;
    if email_taken {
        return Err(AppError::Forbidden("Email already in use".to_string()));
    }

    let hash = password::hash_password(&req.password)?;

    let inserted = user::ActiveModel {
        first_name: Set(req.first_name),
        last_name: Set(req.last_name),
        email: Set(req.email),
        password: Set(hash),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Forbidden("Email already in use".to_string())
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "userId": inserted.id })),
    ))
}

/// `POST /api/v1/users/login`
///
/// Issues a fresh token on every login; any previous session token for the
/// account stops working.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: LoginRequest = parse_body(body)?;
    password::validate_email(&req.email).map_err(AppError::BadRequest)?;
    if req.password.is_empty() {
        return Err(AppError::BadRequest("Password is required.".to_string()));
    }

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Email doesn't exist".to_string()))?;

    let valid = password::verify_password(&req.password, &user_model.password)?;
    if !valid {
        return Err(AppError::Unauthorized("Incorrect password".to_string()));
    }

    let session_token = token::generate();
    let user_id = user_model.id;

    let mut active: user::ActiveModel = user_model.into();
    active.auth_token = Set(Some(session_token.clone()));
    active.update(&state.db).await?;

    Ok(Json(LoginResponse {
        user_id,
        token: session_token,
    }))
}

/// `POST /api/v1/users/logout`
async fn logout(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let mut active: user::ActiveModel = user_model.into();
    active.auth_token = Set(None);
    active.update(&state.db).await?;

    Ok(StatusCode::OK)
}

/// `GET /api/v1/users/{id}`
///
/// The email field is only present when the caller's raw token matches the
/// viewed user's own stored token, so users see their own email and nothing
/// more.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_model = find_user(&state, id).await?;

    let caller_token = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());
    let is_self = match (caller_token, user_model.auth_token.as_deref()) {
        (Some(sent), Some(stored)) => sent == stored,
        _ => false,
    };

    Ok(Json(UserResponse {
        first_name: user_model.first_name,
        last_name: user_model.last_name,
        email: is_self.then_some(user_model.email),
    }))
}

/// `PATCH /api/v1/users/{id}`
async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: UpdateUserRequest = parse_body(body)?;

    let user_model = find_user(&state, id).await?;
    if caller.id != user_model.id {
        return Err(AppError::Forbidden(
            "Can't update another user's info".to_string(),
        ));
    }

    if let Some(ref first_name) = req.first_name {
        password::validate_name(first_name).map_err(AppError::BadRequest)?;
    }
    if let Some(ref last_name) = req.last_name {
        password::validate_name(last_name).map_err(AppError::BadRequest)?;
    }
    if let Some(ref email) = req.email {
        password::validate_email(email).map_err(AppError::BadRequest)?;
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::Id.ne(id))
            .count(&state.db)
            .await?
            > 0;
        if taken {
            return Err(AppError::Forbidden("Email already in use".to_string()));
        }
    }

    // A password change needs the current password, and must actually change it
    let new_password_hash = match (&req.password, &req.current_password) {
        (None, None) => None,
        (Some(new_password), Some(current_password)) => {
            password::validate_password(new_password).map_err(AppError::BadRequest)?;
            if new_password == current_password {
                return Err(AppError::Forbidden(
                    "New password must differ from the current password".to_string(),
                ));
            }
            let valid = password::verify_password(current_password, &user_model.password)?;
            if !valid {
                return Err(AppError::Unauthorized(
                    "Incorrect currentPassword".to_string(),
                ));
            }
            Some(password::hash_password(new_password)?)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Both password and currentPassword are required to change password".to_string(),
            ));
        }
    };

    let mut active: user::ActiveModel = user_model.into();
    if let Some(first_name) = req.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = req.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(email) = req.email {
        active.email = Set(email);
    }
    if let Some(hash) = new_password_hash {
        active.password = Set(hash);
    }
    active.update(&state.db).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Forbidden("Email already in use".to_string())
        } else {
            e.into()
        }
    })?;

    Ok(StatusCode::OK)
}

/// `GET /api/v1/users/{id}/image`
async fn get_user_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let user_model = find_user(&state, id).await?;
    let filename = user_model
        .image_filename
        .ok_or_else(|| AppError::NotFound("User has no image".to_string()))?;
    let bytes = state
        .images
        .read(&filename)
        .await?
        .ok_or_else(|| AppError::NotFound("User has no image".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, ImageStore::content_type_for(&filename))],
        bytes,
    ))
}

/// `PUT /api/v1/users/{id}/image`
async fn set_user_image(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
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

    let user_model = find_user(&state, id).await?;
    if caller.id != user_model.id {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    let new_filename = ImageStore::user_filename(id, extension);
    let old_filename = user_model.image_filename.clone();

    state.images.write(&new_filename, &body).await?;

    let mut active: user::ActiveModel = user_model.into();
    active.image_filename = Set(Some(new_filename.clone()));
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

/// `DELETE /api/v1/users/{id}/image`
async fn delete_user_image(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let user_model = find_user(&state, id).await?;
    if caller.id != user_model.id {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    let filename = user_model
        .image_filename
        .clone()
        .ok_or_else(|| AppError::NotFound("User has no image".to_string()))?;

    let mut active: user::ActiveModel = user_model.into();
    active.image_filename = Set(None);
    active.update(&state.db).await?;

    state.images.remove(&filename).await?;

    Ok(StatusCode::OK)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn find_user(state: &AppState, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
