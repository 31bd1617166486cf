use log::info;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::{authorize, Action, Resource},
    constants::{INGREDIENT_FIELD_MAX_LENGTH, INGREDIENT_SEARCH_LIMIT},
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, Ingredient, NewIngredient, RecipeIngredientLine},
};

/// `LIKE` pattern matching names that start with `prefix` literally.
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn search_ingredients(
    prefix: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name LIKE $1 ESCAPE '\\' ORDER BY name, measurement_unit LIMIT $2",
    )
    .bind(prefix_pattern(prefix))
    .bind(INGREDIENT_SEARCH_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    session: &SessionData,
    ingredient: NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ApiError> {
    authorize(Some(session), Action::Create, Resource::Catalog)?;

    for (field, value) in [
        ("name", &ingredient.name),
        ("measurement_unit", &ingredient.measurement_unit),
    ] {
        if value.trim().is_empty() || value.chars().count() > INGREDIENT_FIELD_MAX_LENGTH {
            return Err(ApiError::validation(
                field,
                format!("Must be 1 to {INGREDIENT_FIELD_MAX_LENGTH} characters"),
            ));
        }
    }

    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&ingredient.name)
    .bind(&ingredient.measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| {
        ApiError::Conflict(format!(
            "Ingredient {} ({}) already exists",
            ingredient.name, ingredient.measurement_unit
        ))
    })?;

    info!("Created ingredient {} ({})", row.name, row.id);
    Ok(row)
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredientLine>, ApiError> {
    let rows: Vec<RecipeIngredientLine> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
