use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    authentication::permissions::ActionType,
    constants::{MAX_BINDS_PER_STATEMENT, RECIPE_COUNT_PER_PAGE},
    error::{Error, QueryError, TypeError},
    form::Form,
    jwt::SessionData,
    pagination::{PageContext, PageWindow},
    schema::{
        Id, IngredientAmount, MembershipKind, Recipe, RecipeDraft, RecipeIngredient, RecipePatch,
        RecipeRow, RecipeView,
    },
    validation::{validate_composition, KnownCatalog},
};

use super::{
    ingredients::find_known_ingredients,
    memberships::membership_flags,
    short_links::assign_short_link,
    subscriptions::is_subscribed,
    tags::{find_known_tags, list_recipe_tags},
};

/// Listing criteria for [`fetch_recipes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Any-of match on tag slugs.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            author: None,
            tags: vec![],
            is_favorited: false,
            is_in_shopping_cart: false,
            limit: RECIPE_COUNT_PER_PAGE,
            offset: 0,
        }
    }
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        let window = PageWindow::from_form(form, RECIPE_COUNT_PER_PAGE)?;

        Ok(Self {
            author: form.get_number("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_bool("is_favorited")?,
            is_in_shopping_cart: form.get_bool("is_in_shopping_cart")?,
            limit: window.limit,
            offset: window.offset,
        })
    }
}

pub(crate) async fn recipe_exists(recipe_id: Id, conn: &mut SqliteConnection) -> Result<bool, Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(row.is_some())
}

async fn find_recipe(recipe_id: Id, conn: &mut SqliteConnection) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session is allowed to change: its author, or anyone allowed to manage all recipes.
async fn get_recipe_mut(
    recipe_id: Id,
    session: &SessionData,
    conn: &mut SqliteConnection,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = find_recipe(recipe_id, conn).await?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    log::warn!(
                        "User {} tried to modify recipe {recipe_id} of user {}",
                        session.user_id,
                        recipe.author_id
                    );
                    Err(Error::Forbidden)
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(Error::RecipeNotFound(recipe_id)),
    }
}

async fn load_known_catalog(
    tags: &[Id],
    ingredients: &[IngredientAmount],
    conn: &mut SqliteConnection,
) -> Result<KnownCatalog, Error> {
    let ingredient_ids: Vec<Id> = ingredients.iter().map(|line| line.id).collect();

    Ok(KnownCatalog {
        tags: find_known_tags(tags, conn).await?,
        ingredients: find_known_ingredients(&ingredient_ids, conn).await?,
    })
}

/// Drops every ingredient line and tag link of the recipe and writes the given sets.
/// Runs inside the caller's transaction.
async fn replace_composition(
    recipe_id: Id,
    tags: &[Id],
    ingredients: &[IngredientAmount],
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(Error::integrity)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(Error::integrity)?;

    for chunk in ingredients.chunks(MAX_BINDS_PER_STATEMENT / 3) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        query_builder.push_values(chunk, |mut b, line| {
            b.push_bind(recipe_id).push_bind(line.id).push_bind(line.amount);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(Error::integrity)?;
    }

    for chunk in tags.chunks(MAX_BINDS_PER_STATEMENT / 2) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(chunk, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(Error::integrity)?;
    }

    Ok(())
}

async fn list_recipe_ingredients(
    recipe_id: Id,
    conn: &mut SqliteConnection,
) -> Result<Vec<RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY i.name, i.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Builds the read model; membership flags are computed for `viewer` and are false for anonymous callers.
async fn load_recipe_view(
    recipe: Recipe,
    viewer: Option<Id>,
    conn: &mut SqliteConnection,
) -> Result<RecipeView, Error> {
    let ingredients = list_recipe_ingredients(recipe.id, conn).await?;
    let tags = list_recipe_tags(recipe.id, conn).await?;
    let (is_favorited, is_in_shopping_cart) = membership_flags(recipe.id, viewer, conn).await?;
    let is_subscribed = is_subscribed(viewer, recipe.author_id, conn).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author_id: recipe.author_id,
        is_subscribed,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        created_at: recipe.created_at,
    })
}

pub async fn create_recipe(
    session: &SessionData,
    draft: RecipeDraft,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    session.authenticate(ActionType::CreateRecipes)?;

    let known = {
        let mut conn = pool.acquire().await.map_err(QueryError::from)?;
        load_known_catalog(&draft.tags, &draft.ingredients, &mut conn).await?
    };
    validate_composition(
        &draft.tags,
        &draft.ingredients,
        Some(draft.cooking_time),
        &known,
    )?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let recipe_id = sqlx::query(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
    ",
    )
    .bind(session.user_id)
    .bind(&draft.name)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(Utc::now())
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?
    .last_insert_rowid();

    replace_composition(recipe_id, &draft.tags, &draft.ingredients, &mut tr).await?;
    assign_short_link(recipe_id, &mut tr).await?;

    let recipe = find_recipe(recipe_id, &mut tr)
        .await?
        .ok_or(Error::RecipeNotFound(recipe_id))?;
    let view = load_recipe_view(recipe, Some(session.user_id), &mut tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    log::info!("User {} created recipe {recipe_id}", session.user_id);

    Ok(view)
}

pub async fn update_recipe(
    recipe_id: Id,
    session: &SessionData,
    patch: RecipePatch,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    let known = {
        let mut conn = pool.acquire().await.map_err(QueryError::from)?;
        get_recipe_mut(recipe_id, session, &mut conn).await?;
        load_known_catalog(&patch.tags, &patch.ingredients, &mut conn).await?
    };
    validate_composition(&patch.tags, &patch.ingredients, patch.cooking_time, &known)?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;
    persist_update(recipe_id, &patch, &mut tr).await?;

    let recipe = find_recipe(recipe_id, &mut tr)
        .await?
        .ok_or(Error::RecipeNotFound(recipe_id))?;
    let view = load_recipe_view(recipe, Some(session.user_id), &mut tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    log::info!("User {} updated recipe {recipe_id}", session.user_id);

    Ok(view)
}

async fn persist_update(
    recipe_id: Id,
    patch: &RecipePatch,
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    let result = sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE(?, name),
        image = COALESCE(?, image),
        text = COALESCE(?, text),
        cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
    ",
    )
    .bind(&patch.name)
    .bind(&patch.image)
    .bind(&patch.text)
    .bind(patch.cooking_time)
    .bind(recipe_id)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    // deleted between the ownership check and this write
    if result.rows_affected() == 0 {
        return Err(Error::RecipeNotFound(recipe_id));
    }

    replace_composition(recipe_id, &patch.tags, &patch.ingredients, conn).await
}

/// Removes a recipe; ingredient lines, tag links, memberships and its short link go with it.
pub async fn delete_recipe(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    get_recipe_mut(recipe_id, session, &mut conn).await?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::RecipeNotFound(recipe_id));
    }
    log::info!("User {} deleted recipe {recipe_id}", session.user_id);

    Ok(())
}

pub async fn get_recipe(
    recipe_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    let recipe = find_recipe(recipe_id, &mut conn)
        .await?
        .ok_or(Error::RecipeNotFound(recipe_id))?;

    load_recipe_view(recipe, viewer, &mut conn).await
}

/// Appends the listing criteria to a query selecting from `recipes r`.
fn push_recipe_filters(
    query_builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &RecipeFilter,
    viewer: Option<Id>,
) {
    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query_builder.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.clone());
        }
        separated.push_unseparated("))");
    }

    if let Some(user_id) = viewer {
        for (enabled, kind) in [
            (filter.is_favorited, MembershipKind::Favorite),
            (filter.is_in_shopping_cart, MembershipKind::CartItem),
        ] {
            if enabled {
                query_builder
                    .push(" AND EXISTS (SELECT 1 FROM memberships m WHERE m.recipe_id = r.id AND m.user_id = ")
                    .push_bind(user_id)
                    .push(" AND m.kind = ")
                    .push_bind(kind)
                    .push(")");
            }
        }
    }
}

async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<i64, Error> {
    let mut query_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE 1 = 1");
    push_recipe_filters(&mut query_builder, filter, viewer);

    let (count,): (i64,) = query_builder
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count)
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<RecipeView>, Error> {
    // anonymous viewers have no memberships to filter by
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok(PageContext::no_rows(filter.limit, filter.offset));
    }

    let mut query_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE 1 = 1");
    push_recipe_filters(&mut query_builder, filter, viewer);
    query_builder
        .push(" ORDER BY r.name, r.id LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    // the window count is only carried by returned rows
    let total_count = match rows.first() {
        Some(row) => row.count,
        None if filter.offset > 0 => count_recipes(filter, viewer, pool).await?,
        None => 0,
    };

    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(load_recipe_view(row.into(), viewer, &mut conn).await?);
    }

    Ok(PageContext::from_rows(
        views,
        total_count,
        filter.limit,
        filter.offset,
    ))
}
