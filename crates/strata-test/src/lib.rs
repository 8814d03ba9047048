//! # Strata Test
//!
//! In-memory HTTP testing for Strata services. Requests are handed straight
//! to a [`strata_server::Router`], so they run through routing, the composed
//! middleware chain and response writing without binding a port.
//!
//! - [`TestClient`] - sends requests to a router or any request function
//! - [`TestRequest`] / [`TestRequestBuilder`] - fluent request construction
//!   with JSON bodies and URL-encoded query strings
//! - [`TestResponse`] - buffered response with status, header and JSON
//!   assertions
//!
//! ## Example
//!
//! ```ignore
//! use strata_test::TestClient;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn set_then_get() {
//!     let client = TestClient::new(build_router());
//!
//!     client
//!         .post("/set_value")
//!         .json(&json!({"key": "k1", "value": "v1"}))
//!         .send()
//!         .await
//!         .assert_status(http::StatusCode::OK);
//!
//!     client
//!         .get("/get_value/k1")
//!         .send()
//!         .await
//!         .assert_json_field("value", &json!("v1"));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/strata-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
