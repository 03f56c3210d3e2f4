use std::collections::HashSet;

use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::MAX_BINDS_PER_STATEMENT,
    error::{Error, QueryError},
    import::IngredientRecord,
    schema::{Id, Ingredient},
};

pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE name LIKE ? || '%' ESCAPE '\\' ORDER BY name, id",
        )
        .bind(escape_like(name))
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates every record in one transaction; either all land or none.
pub async fn import_ingredients(
    records: &[IngredientRecord],
    pool: &Pool<Sqlite>,
) -> Result<u64, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;
    let mut created = 0;

    for chunk in records.chunks(MAX_BINDS_PER_STATEMENT / 2) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, record| {
            b.push_bind(record.name.clone())
                .push_bind(record.measurement_unit.clone());
        });

        created += query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?
            .rows_affected();
    }

    tr.commit().await.map_err(QueryError::from)?;
    log::info!("Imported {created} ingredients");

    Ok(created)
}

/// Returns the subset of `ids` present in the catalog.
pub(crate) async fn find_known_ingredients(
    ids: &[Id],
    conn: &mut SqliteConnection,
) -> Result<HashSet<Id>, Error> {
    let mut known = HashSet::new();

    for chunk in ids.chunks(MAX_BINDS_PER_STATEMENT) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
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

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("мука"), "мука");
    }
}
