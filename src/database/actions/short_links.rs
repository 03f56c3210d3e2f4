use sha2::{Digest, Sha256};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::{
    constants::{SHORT_LINK_LENGTH, SHORT_LINK_MAX_ATTEMPTS},
    error::{Error, QueryError},
    schema::Id,
};

use super::recipes::recipe_exists;

/// Candidate code for `recipe_id`. Salt 0 hashes the bare id, later salts hash `"{id}:{salt}"`.
pub fn short_code(recipe_id: Id, salt: u32) -> String {
    let input = match salt {
        0 => recipe_id.to_string(),
        salt => format!("{recipe_id}:{salt}"),
    };
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));

    digest[..SHORT_LINK_LENGTH].to_string()
}

async fn find_code(recipe_id: Id, conn: &mut SqliteConnection) -> Result<Option<String>, Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT code FROM short_links WHERE recipe_id = ?")
        .bind(recipe_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(row.map(|r| r.0))
}

/// Returns the recipe's code, claiming the first free candidate if it has none yet.
pub(crate) async fn assign_short_link(
    recipe_id: Id,
    conn: &mut SqliteConnection,
) -> Result<String, Error> {
    if let Some(code) = find_code(recipe_id, conn).await? {
        return Ok(code);
    }

    claim_short_link(recipe_id, conn).await
}

/// Tries salted candidates in order, starting with an insert so a fresh
/// transaction takes the write lock before it reads anything.
///
/// `code` is the primary key of `short_links`, so a candidate already held by
/// another recipe fails the insert and the next salt is tried.
async fn claim_short_link(recipe_id: Id, conn: &mut SqliteConnection) -> Result<String, Error> {
    for salt in 0..SHORT_LINK_MAX_ATTEMPTS {
        let code = short_code(recipe_id, salt);
        let result = sqlx::query(
            "INSERT INTO short_links (code, recipe_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(&code)
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            let e = QueryError::from(e);
            if e.is_foreign_key_violation() {
                Error::RecipeNotFound(recipe_id)
            } else {
                e.into()
            }
        })?;

        if result.rows_affected() > 0 {
            log::trace!("> Assigned short link {code} to recipe {recipe_id}");
            return Ok(code);
        }

        // a concurrent caller may have assigned this recipe meanwhile
        if let Some(code) = find_code(recipe_id, conn).await? {
            return Ok(code);
        }

        log::warn!("Short link {code} collides; retrying recipe {recipe_id} with salt {}", salt + 1);
    }

    Err(Error::ShortLinkSpaceExhausted(recipe_id))
}

pub async fn encode_short_link(recipe_id: Id, pool: &Pool<Sqlite>) -> Result<String, Error> {
    {
        let mut conn = pool.acquire().await.map_err(QueryError::from)?;
        if !recipe_exists(recipe_id, &mut conn).await? {
            return Err(Error::RecipeNotFound(recipe_id));
        }
        if let Some(code) = find_code(recipe_id, &mut conn).await? {
            return Ok(code);
        }
    }

    let mut tr = pool.begin().await.map_err(QueryError::from)?;
    let code = claim_short_link(recipe_id, &mut tr).await?;
    tr.commit().await.map_err(QueryError::from)?;

    Ok(code)
}

pub async fn decode_short_link(code: &str, pool: &Pool<Sqlite>) -> Result<Id, Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT recipe_id FROM short_links WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.map(|r| r.0)
        .ok_or_else(|| Error::ShortLinkNotFound(code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_fixed_width_lowercase_hex() {
        let code = short_code(1, 0);
        assert_eq!(code.len(), SHORT_LINK_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn codes_are_deterministic() {
        assert_eq!(short_code(42, 0), short_code(42, 0));
        assert_eq!(short_code(42, 3), short_code(42, 3));
    }

    #[test]
    fn salt_changes_the_code() {
        assert_ne!(short_code(42, 0), short_code(42, 1));
        assert_ne!(short_code(1, 0), short_code(2, 0));
    }

    #[test]
    fn unsalted_code_is_a_prefix_of_the_id_digest() {
        // sha256("1")
        assert_eq!(short_code(1, 0), "6b86b2");
    }
}
