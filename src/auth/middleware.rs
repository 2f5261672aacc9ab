use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::entities::user;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the opaque session token.
///
/// The token is a random value stored server-side on the user row, so
/// resolving it is a database lookup rather than local verification.
pub const AUTH_HEADER: &str = "x-authorization";

/// Authenticated user resolved from the `X-Authorization` header.
///
/// Use as an extractor in handler parameters to require authentication:
/// ```ignore
/// async fn handler(AuthUser(user): AuthUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized("Unauthorized: Missing or invalid token".to_string())
            })?;

        let user_model = user::Entity::find()
            .filter(user::Column::AuthToken.eq(token))
            .one(&state.db)
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .ok_or_else(|| {
                AppError::Unauthorized("Unauthorized: Token not recognized".to_string())
            })?;

        Ok(Self(user_model))
    }
}

/// Optional variant of [`AuthUser`].
///
/// A missing header yields `None`; a header carrying an unrecognized token is
/// still rejected with 401 rather than silently downgraded to anonymous.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<user::Model>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.get(AUTH_HEADER).is_none() {
            return Ok(Self(None));
        }

        let AuthUser(user_model) = AuthUser::from_request_parts(parts, state).await?;
        Ok(Self(Some(user_model)))
    }
}
