use std::collections::HashSet;

use log::info;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::{authorize, Action, Resource},
    constants::RECIPE_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    jwt::SessionData,
    linker::link_relations,
    pagination::{check_offset, PageContext},
    schema::{Id, Recipe, RecipeDetail, RecipeFilter, RecipePayload, RecipeRow},
    validation::{load_catalog_refs, validate_recipe, ValidatedRecipe},
};

use super::{
    ingredients::list_recipe_ingredients,
    relations::{has_relation, RelationKind},
    tags::list_recipe_tags,
    users::get_profile,
};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    action: Action,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(ApiError::not_found("recipe", id))?;

    authorize(
        Some(session),
        action,
        Resource::Recipe {
            author_id: recipe.author_id,
        },
    )?;

    Ok(recipe)
}

async fn validate_payload(
    payload: RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<ValidatedRecipe, ApiError> {
    let catalog = load_catalog_refs(&payload, pool).await?;
    validate_recipe(payload, &catalog)
}

pub async fn create_recipe(
    session: &SessionData,
    payload: RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ApiError> {
    authorize(Some(session), Action::Create, Resource::NewRecipe)?;
    let recipe = validate_payload(payload, pool).await?;
    let fields = recipe.payload();

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&fields.name)
    .bind(&fields.text)
    .bind(&fields.image)
    .bind(fields.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    link_relations(&mut *tr, id.0, &recipe).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    info!("User {} created recipe {}", session.user_id, id.0);
    get_recipe_detail(id.0, Some(session), pool).await
}

pub async fn update_recipe(
    id: Id,
    session: &SessionData,
    payload: RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ApiError> {
    get_recipe_mut(id, session, Action::Update, pool).await?;
    let recipe = validate_payload(payload, pool).await?;
    let fields = recipe.payload();

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5")
        .bind(&fields.name)
        .bind(&fields.text)
        .bind(&fields.image)
        .bind(fields.cooking_time)
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    link_relations(&mut *tr, id, &recipe).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    info!("User {} updated recipe {}", session.user_id, id);
    get_recipe_detail(id, Some(session), pool).await
}

pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    get_recipe_mut(id, session, Action::Delete, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    for table in [
        "recipe_tags",
        "recipe_ingredients",
        "favorites",
        "shopping_cart",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
            .bind(id)
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
    }

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    info!("User {} deleted recipe {}", session.user_id, id);
    Ok(())
}

pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(ApiError::not_found("recipe", id))?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            has_relation(RelationKind::Favorite, viewer.user_id, id, pool).await?,
            has_relation(RelationKind::ShoppingCart, viewer.user_id, id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetail {
        id: recipe.id,
        tags: list_recipe_tags(id, pool).await?,
        author: get_profile(recipe.author_id, viewer, pool).await?,
        ingredients: list_recipe_ingredients(id, pool).await?,
        is_favorited,
        is_in_shopping_cart,
        image: recipe.image,
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

/// Viewer flags are skipped for anonymous viewers; `false` is the complement of `true`.
pub fn push_recipe_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
) {
    query.push(" WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        for (flag, table) in [
            (filter.is_favorited, "favorites"),
            (filter.is_in_shopping_cart, "shopping_cart"),
        ] {
            if let Some(flag) = flag {
                query
                    .push(if flag { " AND EXISTS" } else { " AND NOT EXISTS" })
                    .push(format!(
                        " (SELECT 1 FROM {table} x WHERE x.recipe_id = r.id AND x.user_id = "
                    ))
                    .push_bind(viewer.user_id)
                    .push(")");
            }
        }
    }
}

fn first_unknown_slug<'a>(requested: &'a [String], found: &HashSet<String>) -> Option<&'a str> {
    requested
        .iter()
        .find(|slug| !found.contains(*slug))
        .map(String::as_str)
}

async fn check_tag_slugs(slugs: &[String], pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if slugs.is_empty() {
        return Ok(());
    }

    let rows: Vec<(String,)> = sqlx::query_as("SELECT slug FROM tags WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<String> = rows.into_iter().map(|r| r.0).collect();

    match first_unknown_slug(slugs, &found) {
        Some(slug) => Err(ApiError::validation("tags", format!("Unknown tag {slug}"))),
        None => Ok(()),
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, ApiError> {
    check_offset(offset)?;
    check_tag_slugs(&filter.tags, pool).await?;
    let viewer_id = viewer.map(|v| v.user_id);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query
        .push_bind(viewer_id)
        .push(") AS is_favorited, EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
        .push_bind(viewer_id)
        .push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r");

    push_recipe_filter(&mut query, filter, viewer);

    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(RECIPE_COUNT_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok(PageContext::from_rows(
        rows,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}
