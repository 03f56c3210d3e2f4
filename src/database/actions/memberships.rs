use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::{
    error::{Error, QueryError},
    schema::{Id, MembershipEntry, MembershipKind, RecipeMinified},
};

async fn get_recipe_minified(
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Option<RecipeMinified>, Error> {
    let row: Option<RecipeMinified> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = ?")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Puts the recipe into the user's `kind` collection.
///
/// The unique index on `(user_id, recipe_id, kind)` decides between concurrent
/// callers: whichever insert affects no row reports `AlreadyExists`.
pub async fn add_membership(
    user_id: Id,
    recipe_id: Id,
    kind: MembershipKind,
    pool: &Pool<Sqlite>,
) -> Result<(MembershipEntry, RecipeMinified), Error> {
    let recipe = get_recipe_minified(recipe_id, pool)
        .await?
        .ok_or(Error::RecipeNotFound(recipe_id))?;

    let result = sqlx::query(
        "INSERT INTO memberships (user_id, recipe_id, kind) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .execute(pool)
    .await
    .map_err(|e| {
        let e = QueryError::from(e);
        if e.is_foreign_key_violation() {
            // the recipe was deleted after the lookup above
            Error::RecipeNotFound(recipe_id)
        } else if e.is_unique_violation() {
            Error::AlreadyExists { kind, recipe_id }
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyExists { kind, recipe_id });
    }
    log::info!("User {user_id} added recipe {recipe_id} to {kind}");

    Ok((
        MembershipEntry {
            user_id,
            recipe_id,
            kind,
        },
        recipe,
    ))
}

pub async fn remove_membership(
    user_id: Id,
    recipe_id: Id,
    kind: MembershipKind,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    if get_recipe_minified(recipe_id, pool).await?.is_none() {
        return Err(Error::RecipeNotFound(recipe_id));
    }

    let result =
        sqlx::query("DELETE FROM memberships WHERE user_id = ? AND recipe_id = ? AND kind = ?")
            .bind(user_id)
            .bind(recipe_id)
            .bind(kind)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound { kind, recipe_id });
    }
    log::info!("User {user_id} removed recipe {recipe_id} from {kind}");

    Ok(())
}

pub async fn has_membership(
    user_id: Id,
    recipe_id: Id,
    kind: MembershipKind,
    conn: &mut SqliteConnection,
) -> Result<bool, Error> {
    let row: Option<(Id,)> = sqlx::query_as(
        "SELECT recipe_id FROM memberships WHERE user_id = ? AND recipe_id = ? AND kind = ?",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .fetch_optional(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(row.is_some())
}

/// `(is_favorited, is_in_shopping_cart)` of a recipe for the viewer.
pub(crate) async fn membership_flags(
    recipe_id: Id,
    viewer: Option<Id>,
    conn: &mut SqliteConnection,
) -> Result<(bool, bool), Error> {
    match viewer {
        Some(user_id) => Ok((
            has_membership(user_id, recipe_id, MembershipKind::Favorite, conn).await?,
            has_membership(user_id, recipe_id, MembershipKind::CartItem, conn).await?,
        )),
        None => Ok((false, false)),
    }
}

pub async fn list_memberships(
    user_id: Id,
    kind: MembershipKind,
    pool: &Pool<Sqlite>,
) -> Result<Vec<RecipeMinified>, Error> {
    let rows: Vec<RecipeMinified> = sqlx::query_as(
        "
        SELECT r.id AS id, r.name AS name, r.image AS image, r.cooking_time AS cooking_time
        FROM memberships m
        INNER JOIN recipes r ON r.id = m.recipe_id
        WHERE m.user_id = ? AND m.kind = ?
        ORDER BY r.name, r.id
    ",
    )
    .bind(user_id)
    .bind(kind)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
