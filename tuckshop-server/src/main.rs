use std::{env, process, sync::Arc};

use log::{error, info};
use tuckshop_core::{PgDatabase, Tuckshop};
use tuckshop_server::{logging, run_server};

#[tokio::main]
async fn main() {
    logging::init_logger();

    let url = match env::var("TUCKSHOP_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            error!("TUCKSHOP_DATABASE_URL must be set to a Postgres connection string.");
            process::exit(1);
        }
    };

    info!("Connecting to database...");

    let database = match PgDatabase::new(&url).await {
        Ok(database) => database,
        Err(error) => {
            error!("Could not connect to database: {error}");
            error!("Hint: make sure the Postgres instance is running and the connection string is correct, then try again.");
            process::exit(1);
        }
    };

    let tuckshop = Arc::new(Tuckshop::new(database));

    info!("Initialized successfully.");
    run_server(tuckshop).await
}
