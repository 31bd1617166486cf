#![allow(dead_code)]

use recipe_share_sdk::{
    actions::{ingredients::create_ingredient, tags::create_tag, users::create_user},
    jwt::SessionData,
    schema::{Id, IngredientAmount, NewIngredient, NewTag, NewUser, RecipePayload},
};
use sqlx::PgPool;

pub fn session_for(user_id: Id, is_admin: bool) -> SessionData {
    SessionData {
        user_id,
        username: format!("user{user_id}"),
        is_admin,
    }
}

pub async fn user(pool: &PgPool, username: &str, is_admin: bool) -> SessionData {
    let user = create_user(
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_owned(),
            first_name: String::from("Test"),
            last_name: String::from("User"),
            is_admin,
        },
        pool,
    )
    .await
    .unwrap();

    session_for(user.id, is_admin)
}

pub async fn catalog(pool: &PgPool, admin: &SessionData) -> (Vec<Id>, Vec<Id>) {
    let mut tags = vec![];
    for (name, color) in [("breakfast", "#E26C2D"), ("lunch", "#49B64E"), ("dinner", "#8775D2")] {
        let tag = create_tag(
            admin,
            NewTag {
                name: name.to_owned(),
                color: color.to_owned(),
                slug: name.to_owned(),
            },
            pool,
        )
        .await
        .unwrap();
        tags.push(tag.id);
    }

    let mut ingredients = vec![];
    for (name, unit) in [("flour", "g"), ("milk", "ml"), ("eggs", "pcs")] {
        let ingredient = create_ingredient(
            admin,
            NewIngredient {
                name: name.to_owned(),
                measurement_unit: unit.to_owned(),
            },
            pool,
        )
        .await
        .unwrap();
        ingredients.push(ingredient.id);
    }

    (tags, ingredients)
}

pub fn payload(name: &str, tags: Vec<Id>, ingredients: Vec<(Id, i32)>) -> RecipePayload {
    RecipePayload {
        name: name.to_owned(),
        text: String::from("Combine and cook."),
        image: Some(String::from("recipes/images/test.png")),
        cooking_time: 15,
        tags,
        ingredients: ingredients
            .into_iter()
            .map(|(id, amount)| IngredientAmount { id, amount })
            .collect(),
    }
}
