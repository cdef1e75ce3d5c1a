//! # iland Cloud API Client
//!
//! Connection and session layer for the iland cloud console API.
//!
//! ## Features
//!
//! - Password-grant login on first use, automatic token renewal with
//!   fallback to a full login when the refresh grant is rejected
//! - One authenticated dispatcher (`get`/`post`/`put`/`delete`) with uniform
//!   error handling
//! - Event socket subscription that reconnects on its own
//! - Blocking wait for asynchronous server tasks, with deadline and
//!   cancellation
//!
//! ## Example
//!
//! ```no_run
//! use iland_api::api::{EventApi, TaskApi};
//! use iland_api::{Client, ClientConfig, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new("client-id", "client-secret", "user", "password");
//!     let client = Client::new(credentials, ClientConfig::new())?;
//!
//!     // The first call logs in; later calls reuse or renew the token
//!     let task = client.track_task("a7c4-task-uuid").await?;
//!     println!("task finished with status {}", task.status.as_str());
//!
//!     let mut events = client.stream_events(None);
//!     while let Some(event) = events.next_event().await {
//!         println!("{} {}", event.kind, event.entity_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod stream;

pub use auth::{Credentials, IssuedToken, Token};
pub use client::{Body, Client, ClientConfig};
pub use error::{ApiError, ApiResult};
pub use stream::{EventStream, StreamOptions};
