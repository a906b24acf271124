use std::sync::Arc;

use axum::extract::FromRef;
use tuckshop_core::Tuckshop;

use crate::sse::ServerSentEvents;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub tuckshop: Arc<Tuckshop>,
    pub sse: Arc<ServerSentEvents>,
}
