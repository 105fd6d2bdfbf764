use std::{env, io, sync::Arc};

use colored::Colorize;
use jukebox_collab::{
    ArcedDatabase, Collab, Config, DatabaseError, MemoryDatabase, PgDatabase, SpotifyClient,
};
use log::{error, info, warn};
use thiserror::Error;

mod logging;

#[derive(Debug, Error)]
enum JukeboxError {
    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Server stopped: {0}")]
    Server(#[from] io::Error),
}

impl JukeboxError {
    fn hint(&self) -> String {
        match self {
            JukeboxError::Database(_) => "This is a database error. Make sure JUKEBOX_DATABASE_URL points to a running Postgres instance, or unset it to keep rooms in memory.".to_string(),
            JukeboxError::Server(_) => "Make sure the port is free, or pick another one with JUKEBOX_SERVER_PORT.".to_string(),
        }
    }
}

fn config() -> Config {
    let mut config = Config::default();

    if let Ok(url) = env::var("JUKEBOX_SPOTIFY_API_URL") {
        config.spotify_api_url = url;
    }

    config
}

async fn database() -> Result<ArcedDatabase, JukeboxError> {
    match env::var("JUKEBOX_DATABASE_URL") {
        Ok(url) => {
            info!("Connecting to database...");
            Ok(Arc::new(PgDatabase::new(&url).await?))
        }
        Err(_) => {
            warn!("JUKEBOX_DATABASE_URL is not set, rooms will be lost on restart.");
            Ok(Arc::new(MemoryDatabase::new()))
        }
    }
}

async fn run() -> Result<(), JukeboxError> {
    let config = config();
    let database = database().await?;
    let spotify = Arc::new(SpotifyClient::new(&config));

    let collab = Collab::new(config, database, spotify.clone(), spotify.clone(), spotify);
    info!("Initialized successfully.");

    jukebox_server::run_server(Arc::new(collab)).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    if let Err(error) = run().await {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "Jukebox failed to start!".bold().red());
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}
