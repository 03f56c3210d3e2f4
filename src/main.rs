use std::{env, error::Error, fs::File, net::SocketAddr, sync::Arc};

use foodgram_sdk::{
    config::Config,
    connect, import_ingredients,
    import::parse_ingredients,
    routes::{handle_rejection, routes, State},
};
use log::info;
use warp::Filter;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let pool = connect(&config.database_url, config.max_connections).await?;

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("import-ingredients") => {
            let path = args
                .next()
                .ok_or("usage: foodgram import-ingredients <file.csv>")?;
            let records = parse_ingredients(File::open(&path)?)?;
            let inserted = import_ingredients(&records, &pool).await?;
            info!("Imported {inserted} of {} ingredients from {path}", records.len());
            Ok(())
        }
        Some(other) => Err(format!("Unknown command: {other}").into()),
        None => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            let state = Arc::new(State { pool, config });
            let api = routes(state)
                .recover(handle_rejection)
                .with(warp::log("foodgram"));

            info!("Listening on {addr}");
            warp::serve(api).run(addr).await;
            Ok(())
        }
    }
}
