//! Game search: typed filters composed into a single `Condition` tree that
//! both the page query and the count query share.

use std::collections::HashMap;

use sea_orm::sea_query::{Alias, Expr, Func, IntoColumnRef, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};

use crate::entities::{game, game_platform, game_review, owned, user, wishlist};
use crate::error::AppError;

/// Query-string parameters for `GET /api/v1/games`.
///
/// `genreIds` and `platformIds` may repeat (`genreIds=1&genreIds=2`), which
/// is why the list handler uses `axum_extra::extract::Query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSearchParams {
    pub q: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub platform_ids: Vec<i32>,
    pub price: Option<i32>,
    pub creator_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    #[serde(default)]
    pub owned_by_me: bool,
    #[serde(default)]
    pub wishlisted_by_me: bool,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub start_index: u64,
    #[serde(default = "default_page_size")]
    pub count: u64,
}

const fn default_page_size() -> u64 {
    100
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortBy {
    AlphabeticalAsc,
    AlphabeticalDesc,
    PriceAsc,
    PriceDesc,
    #[default]
    CreatedAsc,
    CreatedDesc,
    RatingAsc,
    RatingDesc,
}

/// Validated filter set, ready to run.
#[derive(Debug, Clone)]
pub struct GameFilter {
    condition: Condition,
    sort_by: SortBy,
    start_index: u64,
    count: u64,
}

impl GameFilter {
    /// Build the filter condition from request parameters.
    ///
    /// # Errors
    ///
    /// Returns 401 when `ownedByMe` or `wishlistedByMe` is set without an
    /// authenticated user.
    pub fn from_params(params: &GameSearchParams, user_id: Option<i32>) -> Result<Self, AppError> {
        let mut condition = Condition::all();

        if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(game::Column::Title.contains(q))
                    .add(game::Column::Description.contains(q)),
            );
        }
        if !params.genre_ids.is_empty() {
            condition = condition.add(game::Column::GenreId.is_in(params.genre_ids.clone()));
        }
        if !params.platform_ids.is_empty() {
            condition = condition.add(platform_exists(&params.platform_ids));
        }
        if let Some(price) = params.price {
            condition = condition.add(game::Column::Price.lte(price));
        }
        if let Some(creator_id) = params.creator_id {
            condition = condition.add(game::Column::CreatorId.eq(creator_id));
        }
        if let Some(reviewer_id) = params.reviewer_id {
            condition = condition.add(reviewed_by_exists(reviewer_id));
        }
        if params.owned_by_me {
            let user_id = user_id.ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;
            condition = condition.add(owned_by_exists(user_id));
        }
        if params.wishlisted_by_me {
            let user_id = user_id.ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;
            condition = condition.add(wishlisted_by_exists(user_id));
        }

        Ok(Self {
            condition,
            sort_by: params.sort_by,
            start_index: params.start_index,
            // An explicit count=0 means "unspecified", not an empty page
            count: if params.count == 0 {
                default_page_size()
            } else {
                params.count
            },
        })
    }
}

fn platform_exists(platform_ids: &[i32]) -> SimpleExpr {
    Expr::exists(
        Query::select()
            .expr(Expr::val(1))
            .from(game_platform::Entity)
            .and_where(
                Expr::col((game_platform::Entity, game_platform::Column::GameId))
                    .equals((game::Entity, game::Column::Id)),
            )
            .and_where(
                Expr::col((game_platform::Entity, game_platform::Column::PlatformId))
                    .is_in(platform_ids.iter().copied()),
            )
            .take(),
    )
}

fn reviewed_by_exists(reviewer_id: i32) -> SimpleExpr {
    Expr::exists(
        Query::select()
            .expr(Expr::val(1))
            .from(game_review::Entity)
            .and_where(
                Expr::col((game_review::Entity, game_review::Column::GameId))
                    .equals((game::Entity, game::Column::Id)),
            )
            .and_where(
                Expr::col((game_review::Entity, game_review::Column::UserId)).eq(reviewer_id),
            )
            .take(),
    )
}

fn owned_by_exists(user_id: i32) -> SimpleExpr {
    Expr::exists(
        Query::select()
            .expr(Expr::val(1))
            .from(owned::Entity)
            .and_where(
                Expr::col((owned::Entity, owned::Column::GameId))
                    .equals((game::Entity, game::Column::Id)),
            )
            .and_where(Expr::col((owned::Entity, owned::Column::UserId)).eq(user_id))
            .take(),
    )
}

fn wishlisted_by_exists(user_id: i32) -> SimpleExpr {
    Expr::exists(
        Query::select()
            .expr(Expr::val(1))
            .from(wishlist::Entity)
            .and_where(
                Expr::col((wishlist::Entity, wishlist::Column::GameId))
                    .equals((game::Entity, game::Column::Id)),
            )
            .and_where(Expr::col((wishlist::Entity, wishlist::Column::UserId)).eq(user_id))
            .take(),
    )
}

/// `ROUND(AVG(rating), 1)` cast to a float so both Postgres (numeric) and
/// SQLite (real) decode as `f64`.
fn rating_expr() -> SimpleExpr {
    SimpleExpr::from(Func::round_with_precision(
        Func::avg(Expr::col((game_review::Entity, game_review::Column::Rating))),
        1,
    ))
    .cast_as(Alias::new("double precision"))
}

/// Sort key for rating sorts. The `rating` alias is NULL when a game has no
/// reviews, and Postgres places NULLs opposite to SQLite and MySQL; COALESCE
/// pins unrated games at 0 so every backend orders them the same way.
fn rating_order_expr() -> SimpleExpr {
    Func::coalesce([
        SimpleExpr::Column(Alias::new("rating").into_column_ref()),
        Expr::val(0.0).into(),
    ])
    .into()
}

#[derive(Debug, FromQueryResult)]
struct GameRow {
    id: i32,
    title: String,
    genre_id: i32,
    creator_id: i32,
    creator_first_name: String,
    creator_last_name: String,
    price: i32,
    creation_date: chrono::DateTime<chrono::FixedOffset>,
    rating: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: i32,
    pub title: String,
    pub genre_id: i32,
    pub creation_date: chrono::DateTime<chrono::FixedOffset>,
    pub creator_id: i32,
    pub price: i32,
    pub creator_first_name: String,
    pub creator_last_name: String,
    pub rating: f64,
    pub platform_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct GameSearchResult {
    pub games: Vec<GameSummary>,
    pub count: u64,
}

/// Run a search: shared condition for page and count, rating aggregated per
/// game, platform ids batch-loaded for the page in one extra query.
///
/// # Errors
///
/// Returns 400 "Bad request" when the page has no rows, 500 on query failure.
pub async fn search_games(
    db: &DatabaseConnection,
    params: &GameSearchParams,
    user_id: Option<i32>,
) -> Result<GameSearchResult, AppError> {
    let filter = GameFilter::from_params(params, user_id)?;

    let count = game::Entity::find()
        .filter(filter.condition.clone())
        .count(db)
        .await?;

    let mut select = game::Entity::find()
        .select_only()
        .column(game::Column::Id)
        .column(game::Column::Title)
        .column(game::Column::GenreId)
        .column(game::Column::CreatorId)
        .column(game::Column::Price)
        .column(game::Column::CreationDate)
        .column_as(user::Column::FirstName, "creator_first_name")
        .column_as(user::Column::LastName, "creator_last_name")
        .expr_as(rating_expr(), "rating")
        .join(JoinType::InnerJoin, game::Relation::Creator.def())
        .join(JoinType::LeftJoin, game::Relation::Reviews.def())
        .filter(filter.condition.clone())
        .group_by(game::Column::Id)
        .group_by(game::Column::Title)
        .group_by(game::Column::GenreId)
        .group_by(game::Column::CreatorId)
        .group_by(game::Column::Price)
        .group_by(game::Column::CreationDate)
        .group_by(user::Column::FirstName)
        .group_by(user::Column::LastName);

    select = match filter.sort_by {
        SortBy::AlphabeticalAsc => select.order_by_asc(game::Column::Title),
        SortBy::AlphabeticalDesc => select.order_by_desc(game::Column::Title),
        SortBy::PriceAsc => select.order_by_asc(game::Column::Price),
        SortBy::PriceDesc => select.order_by_desc(game::Column::Price),
        SortBy::CreatedAsc => select.order_by_asc(game::Column::CreationDate),
        SortBy::CreatedDesc => select.order_by_desc(game::Column::CreationDate),
        SortBy::RatingAsc => select.order_by(rating_order_expr(), Order::Asc),
        SortBy::RatingDesc => select.order_by(rating_order_expr(), Order::Desc),
    };
    // Stable paging when the sort key ties
    select = select.order_by_asc(game::Column::Id);

    let rows: Vec<GameRow> = select
        .offset(filter.start_index)
        .limit(filter.count)
        .into_model()
        .all(db)
        .await?;

    if rows.is_empty() {
        return Err(AppError::BadRequest("Bad request".into()));
    }

    let platforms = load_game_platforms(db, rows.iter().map(|r| r.id).collect()).await?;

    let games = rows
        .into_iter()
        .map(|row| {
            let platform_ids = platforms.get(&row.id).cloned().unwrap_or_default();
            GameSummary {
                game_id: row.id,
                title: row.title,
                genre_id: row.genre_id,
                creation_date: row.creation_date,
                creator_id: row.creator_id,
                price: row.price,
                creator_first_name: row.creator_first_name,
                creator_last_name: row.creator_last_name,
                rating: row.rating.unwrap_or(0.0),
                platform_ids,
            }
        })
        .collect();

    Ok(GameSearchResult { games, count })
}

/// Platform ids for a set of games, grouped in-process, ascending per game.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn load_game_platforms(
    db: &DatabaseConnection,
    game_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<i32>>, DbErr> {
    let mut by_game: HashMap<i32, Vec<i32>> = HashMap::new();
    if game_ids.is_empty() {
        return Ok(by_game);
    }
    let links = game_platform::Entity::find()
        .filter(game_platform::Column::GameId.is_in(game_ids))
        .order_by_asc(game_platform::Column::PlatformId)
        .all(db)
        .await?;
    for link in links {
        by_game.entry(link.game_id).or_default().push(link.platform_id);
    }
    Ok(by_game)
}

/// Average rating for a single game, 0 when it has no reviews.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn average_rating(db: &DatabaseConnection, game_id: i32) -> Result<f64, DbErr> {
    #[derive(FromQueryResult)]
    struct RatingRow {
        rating: Option<f64>,
    }

    let row: Option<RatingRow> = game_review::Entity::find()
        .select_only()
        .expr_as(rating_expr(), "rating")
        .filter(game_review::Column::GameId.eq(game_id))
        .into_model()
        .one(db)
        .await?;

    Ok(row.and_then(|r| r.rating).unwrap_or(0.0))
}
