//! # Strata Demo
//!
//! A small key-value service on the Strata pipeline, backed by SQLite.
//!
//! | Route | Body | Query | Reply |
//! |-------|------|-------|-------|
//! | `GET /ping` | - | `msg`, `mayfail`, `mustfail` | `{"message": msg}` |
//! | `POST /set_value` | `{"key", "value"}` | - | `{"message": "ok"}` |
//! | `POST /get_value/{key}` | - | - | `{"value": ...}` |
//!
//! Domain errors are translated to `418 TEAPOT` ([`RandomError`]) and
//! `424 DATABASE` ([`StorageError`]) with an [`ErrorData`] body.

#![doc(html_root_url = "https://docs.rs/strata-demo/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod errors;
pub mod handlers;
pub mod storage;

pub use app::{build_router, AppState};
pub use errors::{translation, ErrorData, RandomError};
pub use storage::{Storage, StorageError};
