//! Service wiring: shared state and routes.

use std::sync::Arc;

use http::Method;
use strata_core::{Empty, Handler};
use strata_middleware::{Chain, CodecSettings};
use strata_server::{Endpoint, Router};

use crate::errors::{translation, ErrorData};
use crate::handlers::{self, MessageReply, PingQuery, SetValueRequest, ValueReply};
use crate::storage::Storage;

/// State shared by every request.
#[derive(Debug)]
pub struct AppState {
    storage: Storage,
}

impl AppState {
    /// Creates the state around an opened storage.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Returns the key-value storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

/// Builds the router with every endpoint of the service.
///
/// Each endpoint runs the standard chain: request id, request logger, codec
/// and error translation, outermost first.
pub fn build_router(state: Arc<AppState>, codec: CodecSettings) -> Router {
    let ping = Endpoint::<_, Empty, PingQuery, MessageReply, ErrorData>::builder(
        "ping",
        Arc::clone(&state),
        Handler::from_fn(handlers::ping),
    )
    .chain(Chain::standard(translation(), codec))
    .build();

    let set_value = Endpoint::<_, SetValueRequest, Empty, MessageReply, ErrorData>::builder(
        "set_value",
        Arc::clone(&state),
        Handler::from_fn(handlers::set_value),
    )
    .chain(Chain::standard(translation(), codec))
    .build();

    let get_value = Endpoint::<_, Empty, Empty, ValueReply, ErrorData>::builder(
        "get_value",
        state,
        Handler::from_fn(handlers::get_value),
    )
    .chain(Chain::standard(translation(), codec))
    .build();

    Router::new()
        .route(Method::GET, "/ping", ping)
        .route(Method::POST, "/set_value", set_value)
        .route(Method::POST, "/get_value/{key}", get_value)
}
