use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::{
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::{Error, QueryError, TypeError},
    form::Form,
    pagination::{PageContext, PageWindow},
    schema::{AuthorView, Id, RecipeMinified, Subscription},
};

/// Listing parameters for [`list_subscriptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Caps the recipe preview of each author; `None` shows every recipe.
    pub recipes_limit: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            recipes_limit: None,
            limit: SUBSCRIPTION_COUNT_PER_PAGE,
            offset: 0,
        }
    }
}

impl SubscriptionFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        let window = PageWindow::from_form(form, SUBSCRIPTION_COUNT_PER_PAGE)?;
        let recipes_limit = form.get_number::<i64>("recipes_limit")?;
        if recipes_limit.is_some_and(|limit| limit < 0) {
            return Err(TypeError::new("Invalid recipes_limit"));
        }

        Ok(Self {
            recipes_limit,
            limit: window.limit,
            offset: window.offset,
        })
    }
}

pub(crate) async fn is_subscribed(
    viewer: Option<Id>,
    author_id: Id,
    conn: &mut SqliteConnection,
) -> Result<bool, Error> {
    let Some(user_id) = viewer else {
        return Ok(false);
    };

    let row: Option<(Id,)> =
        sqlx::query_as("SELECT author_id FROM subscriptions WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(QueryError::from)?;

    Ok(row.is_some())
}

async fn load_author_view(
    author_id: Id,
    viewer: Option<Id>,
    recipes_limit: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<AuthorView, Error> {
    // a negative LIMIT is unbounded in sqlite
    let recipes: Vec<RecipeMinified> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ?
        ORDER BY name, id
        LIMIT ?
    ",
    )
    .bind(author_id)
    .bind(recipes_limit.unwrap_or(-1))
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    let (recipes_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(QueryError::from)?;

    Ok(AuthorView {
        id: author_id,
        is_subscribed: is_subscribed(viewer, author_id, conn).await?,
        recipes,
        recipes_count,
    })
}

/// Makes `user_id` follow `author_id`.
///
/// The unique key on `(user_id, author_id)` decides between concurrent
/// callers; the insert that affects no row reports `AlreadySubscribed`.
pub async fn subscribe(
    user_id: Id,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Sqlite>,
) -> Result<(Subscription, AuthorView), Error> {
    if user_id == author_id {
        return Err(Error::SelfSubscription);
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadySubscribed { author_id });
    }
    log::info!("User {user_id} subscribed to author {author_id}");

    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    let author = load_author_view(author_id, Some(user_id), recipes_limit, &mut conn).await?;

    Ok((Subscription { user_id, author_id }, author))
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Sqlite>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotSubscribed { author_id });
    }
    log::info!("User {user_id} unsubscribed from author {author_id}");

    Ok(())
}

pub async fn list_subscriptions(
    user_id: Id,
    filter: &SubscriptionFilter,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<AuthorView>, Error> {
    let rows: Vec<(Id, i64)> = sqlx::query_as(
        "
        SELECT author_id, COUNT(*) OVER() AS count
        FROM subscriptions
        WHERE user_id = ?
        ORDER BY author_id
        LIMIT ? OFFSET ?
    ",
    )
    .bind(user_id)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut conn = pool.acquire().await.map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some((_, count)) => *count,
        None => {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(QueryError::from)?;
            count
        }
    };

    let mut authors = Vec::with_capacity(rows.len());
    for (author_id, _) in rows {
        authors.push(
            load_author_view(author_id, Some(user_id), filter.recipes_limit, &mut conn).await?,
        );
    }

    Ok(PageContext::from_rows(
        authors,
        total_count,
        filter.limit,
        filter.offset,
    ))
}
