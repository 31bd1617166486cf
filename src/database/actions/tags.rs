use std::sync::LazyLock;

use log::info;
use regex::Regex;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::{authorize, Action, Resource},
    constants::TAG_FIELD_MAX_LENGTH,
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, NewTag, Tag},
};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color pattern"));
static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

pub fn validate_tag(tag: &NewTag) -> Result<(), ApiError> {
    if tag.name.trim().is_empty() || tag.name.chars().count() > TAG_FIELD_MAX_LENGTH {
        return Err(ApiError::validation(
            "name",
            format!("Name must be 1 to {TAG_FIELD_MAX_LENGTH} characters"),
        ));
    }
    if !HEX_COLOR.is_match(&tag.color) {
        return Err(ApiError::validation("color", "Color must be in #RRGGBB format"));
    }
    if tag.slug.chars().count() > TAG_FIELD_MAX_LENGTH || !SLUG.is_match(&tag.slug) {
        return Err(ApiError::validation(
            "slug",
            "Slug may only contain letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

pub async fn create_tag(
    session: &SessionData,
    tag: NewTag,
    pool: &Pool<Postgres>,
) -> Result<Tag, ApiError> {
    authorize(Some(session), Action::Create, Resource::Catalog)?;
    validate_tag(&tag)?;

    let row: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| {
        ApiError::Conflict(String::from(
            "A tag with that name, color or slug already exists",
        ))
    })?;

    info!("Created tag {} ({})", row.slug, row.id);
    Ok(row)
}

pub async fn update_tag(
    id: Id,
    session: &SessionData,
    tag: NewTag,
    pool: &Pool<Postgres>,
) -> Result<Tag, ApiError> {
    authorize(Some(session), Action::Update, Resource::Catalog)?;
    validate_tag(&tag)?;

    if get_tag(id, pool).await?.is_none() {
        return Err(ApiError::not_found("tag", id));
    }

    let clash: Option<(Id,)> = sqlx::query_as(
        "SELECT id FROM tags WHERE id <> $1 AND (name = $2 OR color = $3 OR slug = $4)",
    )
    .bind(id)
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;
    if clash.is_some() {
        return Err(ApiError::Conflict(String::from(
            "A tag with that name, color or slug already exists",
        )));
    }

    let row: Tag = sqlx::query_as(
        "UPDATE tags SET name = $1, color = $2, slug = $3 WHERE id = $4 RETURNING *",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
