use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::error::{Error, QueryError};

/// Opens the database and brings its schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<Pool<Sqlite>, Error> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(QueryError::from)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
    if database_url.contains(":memory:") {
        // an in-memory database disappears with its last connection
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(QueryError::from)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("Connected to {database_url} ({max_connections} connections)");

    Ok(pool)
}
