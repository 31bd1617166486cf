use serde::{Deserialize, Serialize};

use crate::{
    constants::{FALSY_VALUES, TRUTHY_VALUES},
    error::ApiError,
};

pub type Id = i32;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub text: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeIngredientLine {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    #[serde(skip)]
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeCompact {
    pub id: Id,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SubscriptionRow {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub recipes_count: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetail {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeCompact>,
    pub recipes_count: i64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    // `tags` may repeat; unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Result<Self, ApiError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "author" => {
                    let author = value
                        .parse::<Id>()
                        .map_err(|_| ApiError::validation("author", "Expected a user id"))?;
                    filter.author = Some(author);
                }
                "tags" => filter.tags.push(value.to_owned()),
                "is_favorited" => filter.is_favorited = Some(parse_flag("is_favorited", value)?),
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = Some(parse_flag("is_in_shopping_cart", value)?)
                }
                _ => {}
            }
        }

        Ok(filter)
    }
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ApiError> {
    let value = value.to_ascii_lowercase();
    if TRUTHY_VALUES.contains(&value.as_str()) {
        return Ok(true);
    }
    if FALSY_VALUES.contains(&value.as_str()) {
        return Ok(false);
    }
    Err(ApiError::validation(field, "Expected one of 1, 0, true, false"))
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}
