use log::info;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::{authorize, Action, Resource},
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    jwt::SessionData,
    pagination::{check_offset, PageContext},
    schema::{Id, RecipeCompact, SubscriptionDetail, SubscriptionRow, UserProfile},
};

use super::users::{get_profile, get_user_by_id};

fn check_recipes_limit(recipes_limit: Option<i64>) -> Result<(), ApiError> {
    match recipes_limit {
        Some(limit) if limit < 0 => Err(ApiError::validation(
            "recipes_limit",
            "Must be a non-negative number",
        )),
        _ => Ok(()),
    }
}

async fn list_author_recipes(
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeCompact>, ApiError> {
    let rows: Vec<RecipeCompact> = sqlx::query_as(
        "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Checks run in order: author exists, author is not the subscriber, pair is new.
pub async fn subscribe(
    user_id: Id,
    author_id: Id,
    session: &SessionData,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionDetail, ApiError> {
    authorize(
        Some(session),
        Action::Create,
        Resource::UserRelation { owner_id: user_id },
    )?;
    check_recipes_limit(recipes_limit)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::not_found("author", author_id));
    }
    if user_id == author_id {
        return Err(ApiError::validation(
            "author",
            "You cannot subscribe to yourself",
        ));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(String::from(
            "You are already subscribed to this author",
        )));
    }

    info!("User {user_id} subscribed to {author_id}");

    Ok(SubscriptionDetail {
        author: get_profile(author_id, Some(session), pool).await?,
        recipes: list_author_recipes(author_id, recipes_limit, pool).await?,
        recipes_count: count_author_recipes(author_id, pool).await?,
    })
}

pub async fn unsubscribe(
    user_id: Id,
    author_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    authorize(
        Some(session),
        Action::Delete,
        Resource::UserRelation { owner_id: user_id },
    )?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("subscription", author_id));
    }

    info!("User {user_id} unsubscribed from {author_id}");
    Ok(())
}

pub async fn list_subscriptions(
    session: &SessionData,
    recipes_limit: Option<i64>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionDetail>, ApiError> {
    check_recipes_limit(recipes_limit)?;
    check_offset(offset)?;

    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);

    let mut details = Vec::with_capacity(rows.len());
    for row in rows {
        let recipes = list_author_recipes(row.id, recipes_limit, pool).await?;
        details.push(SubscriptionDetail {
            author: UserProfile {
                email: row.email,
                id: row.id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                is_subscribed: true,
            },
            recipes,
            recipes_count: row.recipes_count,
        });
    }

    Ok(PageContext::from_rows(
        details,
        total_count,
        SUBSCRIPTION_COUNT_PER_PAGE,
        offset,
    ))
}
