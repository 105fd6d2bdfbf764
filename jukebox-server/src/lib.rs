use std::{
    env, io,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use context::ServerContext;
use jukebox_collab::Collab;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod context;
mod docs;
mod errors;
mod participants;
mod rooms;
mod schemas;
mod serialized;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub(crate) type Router = axum::Router<ServerContext>;

/// Builds the application with every route and the CORS layer
pub fn app(collab: Arc<Collab>) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/rooms", rooms::router())
        .nest("/participants", participants::router());

    Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(ServerContext { collab })
}

/// Starts the jukebox server
pub async fn run_server(collab: Arc<Collab>) -> io::Result<()> {
    let port = match env::var("JUKEBOX_SERVER_PORT") {
        Ok(port) => port.parse::<u16>().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("JUKEBOX_SERVER_PORT must be a number, got {}", port),
            )
        })?,
        Err(_) => DEFAULT_PORT,
    };

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);
    axum::serve(listener, app(collab).into_make_service()).await
}
