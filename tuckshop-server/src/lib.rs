mod auth;
mod cheer;
mod context;
mod docs;
mod errors;
mod items;
mod orders;
mod schemas;
mod serialized;
mod sse;
mod users;

pub mod logging;

use axum::routing::{get, post};
use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tuckshop_core::Tuckshop;

pub use context::ServerContext;
pub use sse::{ServerEvent, ServerSentEvents};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9070;

pub(crate) type Router = axum::Router<ServerContext>;

/// Starts the tuckshop server
pub async fn run_server(tuckshop: Arc<Tuckshop>) {
    let port = env::var("TUCKSHOP_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sse = ServerSentEvents::new();
    tokio::spawn(sse::forward_events(tuckshop.events.receiver(), sse.clone()));

    let context = ServerContext { tuckshop, sse };

    let root_router = Router::new()
        .nest("/items", items::router())
        .nest("/orders", orders::router())
        .nest("/auth", auth::router())
        .nest("/students", users::students_router())
        .nest("/teachers", users::teachers_router())
        .nest("/cheer", cheer::router())
        .route("/events", get(sse::event_stream))
        .route("/chat", post(sse::send_chat))
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}
