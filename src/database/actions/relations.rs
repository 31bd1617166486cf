use log::info;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::{authorize, Action, Resource},
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, RecipeCompact},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
}

impl RelationKind {
    fn table(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_cart",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "the shopping cart",
        }
    }
}

pub async fn get_recipe_compact(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeCompact>, ApiError> {
    let row: Option<RecipeCompact> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn has_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn add_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeCompact, ApiError> {
    authorize(
        Some(session),
        Action::Create,
        Resource::UserRelation { owner_id: user_id },
    )?;

    let recipe = get_recipe_compact(recipe_id, pool)
        .await?
        .ok_or(ApiError::not_found("recipe", recipe_id))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(format!(
            "Recipe is already in {}",
            kind.label()
        )));
    }

    info!("User {user_id} added recipe {recipe_id} to {}", kind.table());
    Ok(recipe)
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    authorize(
        Some(session),
        Action::Delete,
        Resource::UserRelation { owner_id: user_id },
    )?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(
            match kind {
                RelationKind::Favorite => "favorite",
                RelationKind::ShoppingCart => "shopping cart entry",
            },
            recipe_id,
        ));
    }

    info!("User {user_id} removed recipe {recipe_id} from {}", kind.table());
    Ok(())
}
