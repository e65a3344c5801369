//! REST API server: read routes, admin triggers, DTOs and OpenAPI documentation.

pub mod auth;
pub mod dto;
pub mod error;
pub mod live;
pub mod openapi;
pub mod routes;
pub mod state;
