//! Synchronous API client core for the todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A caller-supplied
//! `Transport` performs the round-trip; `TodoApi` wires the two together.
//!
//! # Design
//! - `TodoClient` is stateless: base URL and optional API key only.
//! - Each operation is split into `build_*` (validates input, produces a
//!   request) and `parse_*` (maps status, validates the body).
//! - Status codes are mapped in one function, `client::check_status`.
//! - Connection settings come from `config::Resolver`, which folds
//!   defaults, the YAML config file and `TAPI_*` variables in that order.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use api::TodoApi;
pub use client::TodoClient;
pub use config::{ConfigError, Resolver, Settings, Source};
pub use error::{ApiError, FieldError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use types::{
    Field, HealthStatus, NewTodo, Priority, QueryFilter, Timestamp, TodoItem, TodoPatch, TodoStatus,
};
