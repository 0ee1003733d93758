//! Content Store Kernel Library
//!
//! This library exposes kernel internals for integration testing.
//! The main entry point for running the server is the `content-store` binary.

pub mod arbiter;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod paths;
pub mod presenter;
pub mod queue;
pub mod routes;
pub mod state;
pub mod store;
pub mod update;
