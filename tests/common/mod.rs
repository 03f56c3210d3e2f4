#![allow(dead_code)]

use foodgram_sdk::{
    connect, create_recipe, create_tag,
    import::IngredientRecord,
    import_ingredients,
    jwt::SessionData,
    list_ingredients,
    schema::{Id, IngredientAmount, RecipeDraft, RecipeView, UserRole},
};
use sqlx::{Pool, Sqlite};

pub struct Catalog {
    pub breakfast: Id,
    pub dinner: Id,
    pub flour: Id,
    pub sugar: Id,
    pub eggs: Id,
}

pub async fn memory_pool() -> Pool<Sqlite> {
    connect("sqlite::memory:", 1).await.unwrap()
}

pub async fn seed(pool: &Pool<Sqlite>) -> Catalog {
    let breakfast = create_tag("Breakfast", "breakfast", pool).await.unwrap();
    let dinner = create_tag("Dinner", "dinner", pool).await.unwrap();

    let records: Vec<IngredientRecord> = [("flour", "g"), ("sugar", "g"), ("eggs", "pcs")]
        .into_iter()
        .map(|(name, unit)| IngredientRecord {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        })
        .collect();
    import_ingredients(&records, pool).await.unwrap();

    Catalog {
        breakfast,
        dinner,
        flour: ingredient_id(pool, "flour").await,
        sugar: ingredient_id(pool, "sugar").await,
        eggs: ingredient_id(pool, "eggs").await,
    }
}

pub async fn ingredient_id(pool: &Pool<Sqlite>, name: &str) -> Id {
    list_ingredients(Some(name), pool).await.unwrap()[0].id
}

pub fn user(user_id: Id) -> SessionData {
    SessionData {
        user_id,
        role: UserRole::User,
    }
}

pub fn admin(user_id: Id) -> SessionData {
    SessionData {
        user_id,
        role: UserRole::Admin,
    }
}

pub fn draft(name: &str, tags: &[Id], ingredients: &[(Id, i64)]) -> RecipeDraft {
    RecipeDraft {
        name: name.to_string(),
        image: format!("recipes/{}.png", name.to_lowercase()),
        text: format!("How to make {name}"),
        cooking_time: 30,
        tags: tags.to_vec(),
        ingredients: amounts(ingredients),
    }
}

pub fn amounts(ingredients: &[(Id, i64)]) -> Vec<IngredientAmount> {
    ingredients
        .iter()
        .map(|&(id, amount)| IngredientAmount { id, amount })
        .collect()
}

pub async fn publish(
    pool: &Pool<Sqlite>,
    author: &SessionData,
    name: &str,
    tags: &[Id],
    ingredients: &[(Id, i64)],
) -> RecipeView {
    create_recipe(author, draft(name, tags, ingredients), pool)
        .await
        .unwrap()
}
