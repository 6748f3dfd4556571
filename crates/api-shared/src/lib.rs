//! # API Shared
//!
//! Shared request/response types for the critique APIs.
//!
//! Contains:
//! - JSON wire types (`dto` module), documented for OpenAPI via `utoipa`
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the workspace's `critique-run` binary.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
