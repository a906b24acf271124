//! Headless client for the tuckshop server: a typed REST wrapper, the order
//! submission flow, and the live-update consumer that keeps the staff
//! pending counter and the requester alert flag in sync with the event
//! channel. Rendering is up to the embedder.

mod api;
mod feed;
mod form;
mod models;
mod state;

pub use api::*;
pub use feed::*;
pub use form::*;
pub use models::*;
pub use state::*;
