//! Core handlers of the key-value service.

use serde::{de, Deserialize, Deserializer, Serialize};
use strata_core::{Empty, Envelope, HandlerError, HandlerResult, RequestContext};
use tracing::info;

use crate::app::AppState;
use crate::errors::{ErrorData, RandomError};
use crate::storage::StorageError;

/// Query parameters of `GET /ping`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PingQuery {
    /// Message echoed back.
    #[serde(default = "default_msg")]
    pub msg: String,
    /// Fail with probability one half.
    #[serde(default, deserialize_with = "flag")]
    pub mayfail: bool,
    /// Always fail.
    #[serde(default, deserialize_with = "flag")]
    pub mustfail: bool,
}

fn default_msg() -> String {
    "pong".to_string()
}

impl Default for PingQuery {
    fn default() -> Self {
        Self {
            msg: default_msg(),
            mayfail: false,
            mustfail: false,
        }
    }
}

/// Reads a query flag: `1`/`true` or `0`/`false`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        other => Err(de::Error::invalid_value(
            de::Unexpected::Str(other),
            &"1, 0, true or false",
        )),
    }
}

/// Reply carrying a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    /// The message.
    pub message: String,
}

/// Body of `POST /set_value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SetValueRequest {
    /// Key to create.
    pub key: String,
    /// Value to store.
    pub value: String,
}

/// Reply of `POST /get_value/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReply {
    /// The stored value.
    pub value: String,
}

/// `GET /ping`: echoes `msg`, failing on demand.
pub async fn ping(
    ctx: RequestContext<AppState, Empty, PingQuery>,
) -> HandlerResult<MessageReply, ErrorData> {
    let query = ctx.query().cloned().unwrap_or_default();
    info!(parent: ctx.span(), "preparing pong");

    if query.mustfail || (query.mayfail && rand::random::<bool>()) {
        return Err(HandlerError::domain(RandomError));
    }

    Ok(Envelope::ok(MessageReply { message: query.msg }))
}

/// `POST /set_value`: stores a new key.
pub async fn set_value(
    mut ctx: RequestContext<AppState, SetValueRequest, Empty>,
) -> HandlerResult<MessageReply, ErrorData> {
    let body = ctx.take_body().unwrap_or_default();
    info!(parent: ctx.span(), key = %body.key, "setting key");

    let state = ctx.service_handle();
    blocking(move || state.storage().set(&body.key, &body.value)).await?;

    Ok(Envelope::ok(MessageReply {
        message: "ok".to_string(),
    }))
}

/// `POST /get_value/{key}`: reads a stored value.
pub async fn get_value(
    ctx: RequestContext<AppState, Empty, Empty>,
) -> HandlerResult<ValueReply, ErrorData> {
    let key = ctx.path_param("key").unwrap_or_default().to_string();
    let state = ctx.service_handle();
    let value = blocking(move || state.storage().get(&key)).await?;

    Ok(Envelope::ok(ValueReply { value }))
}

/// Runs a storage call on the blocking thread pool.
///
/// SQLite calls hold the connection lock for their whole duration, so they
/// never run on a runtime worker.
async fn blocking<R, F>(call: F) -> Result<R, HandlerError>
where
    F: FnOnce() -> Result<R, StorageError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(HandlerError::domain)?
        .map_err(HandlerError::domain)
}
