use std::collections::HashSet;

use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::MAX_BINDS_PER_STATEMENT,
    error::{Error, QueryError},
    schema::{Id, Tag},
};

/// Adds a catalog tag. Slugs are unique.
pub async fn create_tag(name: &str, slug: &str, pool: &Pool<Sqlite>) -> Result<Id, Error> {
    let result = sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?) ON CONFLICT DO NOTHING")
        .bind(name)
        .bind(slug)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::InvalidRequest(format!(
            "Tag with slug {slug:?} already exists"
        )));
    }

    Ok(result.last_insert_rowid())
}

pub async fn get_tag(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Sqlite>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub(crate) async fn list_recipe_tags(
    recipe_id: Id,
    conn: &mut SqliteConnection,
) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Returns the subset of `ids` present in the catalog.
pub(crate) async fn find_known_tags(
    ids: &[Id],
    conn: &mut SqliteConnection,
) -> Result<HashSet<Id>, Error> {
    let mut known = HashSet::new();

    for chunk in ids.chunks(MAX_BINDS_PER_STATEMENT) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
        let mut separated = query_builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<(Id,)> = query_builder
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(QueryError::from)?;
        known.extend(rows.into_iter().map(|row| row.0));
    }

    Ok(known)
}
