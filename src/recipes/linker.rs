use std::collections::BTreeSet;

use log::debug;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    error::{ApiError, QueryError},
    schema::Id,
};

use super::validation::ValidatedRecipe;

#[derive(Debug, Clone, PartialEq)]
pub struct LinkPlan {
    pub recipe_id: Id,
    pub tags: Vec<Id>,
    pub ingredients: Vec<(Id, i32)>,
}

impl LinkPlan {
    pub fn new(recipe_id: Id, recipe: &ValidatedRecipe) -> Self {
        let payload = recipe.payload();

        let mut tags = payload.tags.clone();
        tags.sort_unstable();

        let mut ingredients: Vec<(Id, i32)> =
            payload.ingredients.iter().map(|i| (i.id, i.amount)).collect();
        ingredients.sort_unstable_by_key(|(id, _)| *id);

        Self {
            recipe_id,
            tags,
            ingredients,
        }
    }

    pub fn ingredient_ids(&self) -> Vec<Id> {
        self.ingredients.iter().map(|(id, _)| *id).collect()
    }
}

pub fn missing_ids(requested: &[Id], found: &[Id]) -> Vec<Id> {
    let found: BTreeSet<Id> = found.iter().copied().collect();
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect::<BTreeSet<Id>>()
        .into_iter()
        .collect()
}

/// Must run inside the caller's transaction.
pub async fn link_relations(
    conn: &mut PgConnection,
    recipe_id: Id,
    recipe: &ValidatedRecipe,
) -> Result<(), ApiError> {
    let plan = LinkPlan::new(recipe_id, recipe);

    let locked: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(recipe_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    if locked.is_none() {
        return Err(ApiError::not_found("recipe", recipe_id));
    }

    ensure_catalog_rows(conn, &plan).await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut tag_rows: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    tag_rows.push_values(plan.tags.iter(), |mut row, tag_id| {
        row.push_bind(plan.recipe_id).push_bind(*tag_id);
    });
    tag_rows
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut ingredient_rows: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    ingredient_rows.push_values(plan.ingredients.iter(), |mut row, (ingredient_id, amount)| {
        row.push_bind(plan.recipe_id)
            .push_bind(*ingredient_id)
            .push_bind(*amount);
    });
    ingredient_rows
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    debug!(
        "Linked recipe {} to {} tags and {} ingredients",
        recipe_id,
        plan.tags.len(),
        plan.ingredients.len()
    );

    Ok(())
}

async fn ensure_catalog_rows(conn: &mut PgConnection, plan: &LinkPlan) -> Result<(), ApiError> {
    let tags: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&plan.tags[..])
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let tags: Vec<Id> = tags.into_iter().map(|t| t.0).collect();
    if let Some(&missing) = missing_ids(&plan.tags, &tags).first() {
        return Err(ApiError::not_found("tag", missing));
    }

    let ingredient_ids = plan.ingredient_ids();
    let ingredients: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids[..])
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let ingredients: Vec<Id> = ingredients.into_iter().map(|i| i.0).collect();
    if let Some(&missing) = missing_ids(&ingredient_ids, &ingredients).first() {
        return Err(ApiError::not_found("ingredient", missing));
    }

    Ok(())
}
