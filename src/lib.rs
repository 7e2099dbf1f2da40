//! Library crate for quiz-rush-back, exposing modules for binaries and integration tests.

pub mod config;
pub mod dto;
pub mod error;
pub mod model;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
