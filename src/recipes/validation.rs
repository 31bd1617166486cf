use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    constants::RECIPE_NAME_MAX_LENGTH,
    error::{ApiError, QueryError},
    schema::{Id, RecipePayload},
};

#[derive(Debug, Clone, Default)]
pub struct CatalogRefs {
    pub tags: HashSet<Id>,
    pub ingredients: HashSet<Id>,
}

impl CatalogRefs {
    pub fn has_tag(&self, id: Id) -> bool {
        self.tags.contains(&id)
    }

    pub fn has_ingredient(&self, id: Id) -> bool {
        self.ingredients.contains(&id)
    }
}

/// A payload that passed [`validate_recipe`]. Only the validator builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecipe(RecipePayload);

impl ValidatedRecipe {
    pub fn payload(&self) -> &RecipePayload {
        &self.0
    }

    pub fn into_inner(self) -> RecipePayload {
        self.0
    }
}

pub async fn load_catalog_refs(
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<CatalogRefs, ApiError> {
    let tag_ids: Vec<Id> = payload.tags.clone();
    let ingredient_ids: Vec<Id> = payload.ingredients.iter().map(|i| i.id).collect();

    let tags: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&tag_ids[..])
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let ingredients: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids[..])
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(CatalogRefs {
        tags: tags.into_iter().map(|t| t.0).collect(),
        ingredients: ingredients.into_iter().map(|i| i.0).collect(),
    })
}

/// Fails on the first violation: name, text, cooking time, tags, ingredients.
pub fn validate_recipe(
    payload: RecipePayload,
    catalog: &CatalogRefs,
) -> Result<ValidatedRecipe, ApiError> {
    validate_name(&payload.name)?;

    if payload.text.trim().is_empty() {
        return Err(ApiError::validation("text", "Text is required"));
    }

    if payload.cooking_time < 1 {
        return Err(ApiError::validation(
            "cooking_time",
            "Cooking time must be at least 1 minute",
        ));
    }

    validate_tags(&payload.tags, catalog)?;
    validate_ingredients(&payload, catalog)?;

    Ok(ValidatedRecipe(payload))
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("name", "Name is required"));
    }
    if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(ApiError::validation(
            "name",
            format!("Name must be at most {RECIPE_NAME_MAX_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_tags(tags: &[Id], catalog: &CatalogRefs) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("tags", "At least one tag is required"));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    for &tag in tags {
        if !seen.insert(tag) {
            return Err(ApiError::validation("tags", "Tags must not repeat"));
        }
    }

    match tags.iter().find(|&&tag| !catalog.has_tag(tag)) {
        Some(&missing) => Err(ApiError::not_found("tag", missing)),
        None => Ok(()),
    }
}

fn validate_ingredients(payload: &RecipePayload, catalog: &CatalogRefs) -> Result<(), ApiError> {
    if payload.ingredients.is_empty() {
        return Err(ApiError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }

    let mut seen = HashSet::with_capacity(payload.ingredients.len());
    for line in &payload.ingredients {
        if !seen.insert(line.id) {
            return Err(ApiError::validation(
                "ingredients",
                "Ingredients must not repeat",
            ));
        }
        if !catalog.has_ingredient(line.id) {
            return Err(ApiError::not_found("ingredient", line.id));
        }
        if line.amount < 1 {
            return Err(ApiError::validation(
                "ingredients",
                format!("Amount of ingredient {} must be at least 1", line.id),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientAmount;
    use pretty_assertions::assert_eq;

    fn catalog() -> CatalogRefs {
        CatalogRefs {
            tags: HashSet::from([1, 2, 3]),
            ingredients: HashSet::from([10, 11, 12]),
        }
    }

    fn payload() -> RecipePayload {
        RecipePayload {
            name: String::from("Flatbread"),
            text: String::from("Knead, rest, bake."),
            image: None,
            cooking_time: 30,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount { id: 10, amount: 200 },
                IngredientAmount { id: 11, amount: 1 },
            ],
        }
    }

    fn field_of(err: ApiError) -> &'static str {
        match err {
            ApiError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_payload_unchanged() {
        let validated = validate_recipe(payload(), &catalog()).unwrap();
        assert_eq!(validated.into_inner(), payload());
    }

    #[test]
    fn rejects_empty_and_overlong_names() {
        let mut p = payload();
        p.name = String::from("   ");
        assert_eq!(field_of(validate_recipe(p, &catalog()).unwrap_err()), "name");

        let mut p = payload();
        p.name = "a".repeat(RECIPE_NAME_MAX_LENGTH + 1);
        assert_eq!(field_of(validate_recipe(p, &catalog()).unwrap_err()), "name");

        let mut p = payload();
        p.name = "a".repeat(RECIPE_NAME_MAX_LENGTH);
        assert!(validate_recipe(p, &catalog()).is_ok());
    }

    #[test]
    fn rejects_cooking_time_below_one() {
        for time in [0, -5] {
            let mut p = payload();
            p.cooking_time = time;
            assert_eq!(
                field_of(validate_recipe(p, &catalog()).unwrap_err()),
                "cooking_time"
            );
        }

        let mut p = payload();
        p.cooking_time = 1;
        assert!(validate_recipe(p, &catalog()).is_ok());
    }

    #[test]
    fn rejects_empty_or_duplicate_tags() {
        let mut p = payload();
        p.tags.clear();
        assert_eq!(field_of(validate_recipe(p, &catalog()).unwrap_err()), "tags");

        let mut p = payload();
        p.tags = vec![1, 3, 1];
        assert_eq!(field_of(validate_recipe(p, &catalog()).unwrap_err()), "tags");
    }

    #[test]
    fn unknown_tag_is_not_found() {
        let mut p = payload();
        p.tags = vec![1, 99];

        let err = validate_recipe(p, &catalog()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { entity: "tag", id: 99 }));
    }

    #[test]
    fn rejects_empty_or_duplicate_ingredients() {
        let mut p = payload();
        p.ingredients.clear();
        assert_eq!(
            field_of(validate_recipe(p, &catalog()).unwrap_err()),
            "ingredients"
        );

        let mut p = payload();
        p.ingredients.push(IngredientAmount { id: 10, amount: 5 });
        assert_eq!(
            field_of(validate_recipe(p, &catalog()).unwrap_err()),
            "ingredients"
        );
    }

    #[test]
    fn unknown_ingredient_names_missing_id() {
        let mut p = payload();
        p.ingredients.push(IngredientAmount { id: 404, amount: 1 });

        let err = validate_recipe(p, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::NotFound {
                entity: "ingredient",
                id: 404
            }
        ));
    }

    #[test]
    fn rejects_amount_below_one() {
        let mut p = payload();
        p.ingredients[1].amount = 0;
        assert_eq!(
            field_of(validate_recipe(p, &catalog()).unwrap_err()),
            "ingredients"
        );
    }

    #[test]
    fn reports_only_the_first_violation() {
        // Bad cooking time, duplicate tags and an unknown ingredient at once.
        let mut p = payload();
        p.cooking_time = 0;
        p.tags = vec![2, 2];
        p.ingredients.push(IngredientAmount { id: 404, amount: 0 });

        assert_eq!(
            field_of(validate_recipe(p.clone(), &catalog()).unwrap_err()),
            "cooking_time"
        );

        p.cooking_time = 10;
        assert_eq!(field_of(validate_recipe(p.clone(), &catalog()).unwrap_err()), "tags");

        p.tags = vec![2];
        assert!(matches!(
            validate_recipe(p, &catalog()).unwrap_err(),
            ApiError::NotFound {
                entity: "ingredient",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_reported_before_missing_in_ingredient_order() {
        let mut p = payload();
        p.ingredients = vec![
            IngredientAmount { id: 10, amount: 1 },
            IngredientAmount { id: 10, amount: 1 },
            IngredientAmount { id: 500, amount: 1 },
        ];

        assert_eq!(
            field_of(validate_recipe(p, &catalog()).unwrap_err()),
            "ingredients"
        );
    }
}
